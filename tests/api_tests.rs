mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{FakeAdapter, FakeDeals, MemoryStore, as_dyn, healthy_adapters, total_calls};
use http_body_util::BodyExt;
use serde_json::Value;
use shopscout::api;
use shopscout::clients::DealsAdapter;
use shopscout::config::Config;
use shopscout::db::{DealsStore, OfflineStore, ResultStore};
use shopscout::domain::Platform;
use shopscout::state::SharedState;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    adapters: Vec<Arc<FakeAdapter>>,
}

fn spawn_app_with(
    adapters: Vec<Arc<FakeAdapter>>,
    deals: FakeDeals,
    results: Arc<dyn ResultStore>,
    deals_store: Arc<dyn DealsStore>,
) -> TestApp {
    let shared = SharedState::with_components(
        Config::default(),
        as_dyn(&adapters),
        Arc::new(deals) as Arc<dyn DealsAdapter>,
        results,
        deals_store,
    );
    let state = api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: api::router(state),
        adapters,
    }
}

fn spawn_app() -> TestApp {
    let store = MemoryStore::new();
    spawn_app_with(
        healthy_adapters(),
        FakeDeals::returning(3),
        Arc::clone(&store) as Arc<dyn ResultStore>,
        store as Arc<dyn DealsStore>,
    )
}

fn spawn_offline_app() -> TestApp {
    let offline = Arc::new(OfflineStore::new("connection refused"));
    spawn_app_with(
        healthy_adapters(),
        FakeDeals::returning(3),
        Arc::clone(&offline) as Arc<dyn ResultStore>,
        offline as Arc<dyn DealsStore>,
    )
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_lists_configured_scrapers() {
    let app = spawn_app();
    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(
        json["available_scrapers"],
        serde_json::json!(["amazon", "flipkart", "meesho", "myntra"])
    );
}

#[tokio::test]
async fn test_search_live_then_cached() {
    let app = spawn_app();

    let (status, json) = get(&app, "/search?query=Cotton%20Socks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["query"], "cotton socks");
    assert_eq!(json["platform"], "all");
    assert_eq!(json["source"], "live");
    assert_eq!(json["total_results"], 8);
    assert_eq!(json["results"][0]["site"], "Amazon");
    assert_eq!(json["results"][0]["total_products"], 2);
    assert!(json["processing_time"].as_str().unwrap().ends_with('s'));
    assert!(json.get("cached_at").is_none());

    let (_, cached) = get(&app, "/search?q=cotton+socks").await;
    assert_eq!(cached["source"], "cache");
    assert_eq!(cached["message"], "Results retrieved from cache");
    assert!(cached["cached_at"].is_string());
    assert_eq!(cached["results"], json["results"]);
    assert_eq!(total_calls(&app.adapters), 4);
}

#[tokio::test]
async fn test_search_force_refresh_flag() {
    let app = spawn_app();

    get(&app, "/search?query=socks").await;
    let (_, json) = get(&app, "/search?query=socks&force_refresh=true").await;

    assert_eq!(json["source"], "live");
    assert_eq!(total_calls(&app.adapters), 8);
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let app = spawn_app();

    for uri in ["/search", "/search?query=", "/search?query=%20%20"] {
        let (status, json) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
    assert_eq!(total_calls(&app.adapters), 0);
}

#[tokio::test]
async fn test_search_rejects_unknown_platform_filter() {
    let app = spawn_app();
    let (status, json) = get(&app, "/search?query=socks&platform=snapdeal").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("snapdeal"));
}

#[tokio::test]
async fn test_single_platform_search() {
    let app = spawn_app();
    let (status, json) = get(&app, "/search/Myntra?query=kurti").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["platform"], "myntra");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["site"], "Myntra");
    assert_eq!(app.adapters[3].calls(), 1);
    assert_eq!(total_calls(&app.adapters), 1);
}

#[tokio::test]
async fn test_single_platform_search_unknown_platform() {
    let app = spawn_app();
    let (status, json) = get(&app, "/search/ebay?query=kurti").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Available platforms")
    );
}

#[tokio::test]
async fn test_search_reports_failed_platforms() {
    let adapters = vec![
        Arc::new(FakeAdapter::returning(Platform::Amazon, 1)),
        Arc::new(FakeAdapter::failing(Platform::Flipkart, "HTTP 500")),
    ];
    let store = MemoryStore::new();
    let app = spawn_app_with(
        adapters,
        FakeDeals::returning(1),
        Arc::clone(&store) as Arc<dyn ResultStore>,
        store as Arc<dyn DealsStore>,
    );

    let (status, json) = get(&app, "/search?query=socks").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["results"][1]["site"], "Flipkart");
    assert_eq!(json["results"][1]["total_products"], 0);
    assert_eq!(json["results"][1]["error"], "scrape failed: HTTP 500");
    assert!(json["results"][0].get("error").is_none());
}

#[tokio::test]
async fn test_search_post_body() {
    let app = spawn_app();
    let request = Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"query":"desk lamp","platform":"meesho"}"#))
        .unwrap();

    let (status, json) = read_json(app.router.clone().oneshot(request).await.unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["query"], "desk lamp");
    assert_eq!(json["results"][0]["site"], "Meesho");
}

#[tokio::test]
async fn test_amazon_deals() {
    let app = spawn_app();

    let (status, json) = get(&app, "/amazon/deals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["total_deals"], 3);
    assert_eq!(json["data"]["source"], "live");
    assert_eq!(json["data"]["stale"], false);
    assert!(json["data"]["expires_at"].is_string());

    let (_, again) = get(&app, "/amazon/deals").await;
    assert_eq!(again["data"]["source"], "cache");
}

#[tokio::test]
async fn test_amazon_deals_unavailable() {
    let store = MemoryStore::new();
    let app = spawn_app_with(
        healthy_adapters(),
        FakeDeals::failing("HTTP 503"),
        Arc::clone(&store) as Arc<dyn ResultStore>,
        store as Arc<dyn DealsStore>,
    );

    let (status, json) = get(&app, "/amazon/deals").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_results_history() {
    let app = spawn_app();
    get(&app, "/search?query=socks").await;
    get(&app, "/search?query=lamp&platform=amazon").await;

    let (status, json) = get(&app, "/api/results").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 2);
    let first = &json["data"]["results"][0];
    assert_eq!(first["cache_key"], "amazon:lamp");
    assert_eq!(first["platform"], "amazon");

    let (_, limited) = get(&app, "/api/results?limit=1").await;
    assert_eq!(limited["data"]["count"], 1);
}

#[tokio::test]
async fn test_results_limit_validation() {
    let app = spawn_app();

    for uri in ["/api/results?limit=0", "/api/results?limit=5000"] {
        let (status, json) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json["error"].as_str().unwrap().contains("Invalid limit"));
    }
}

#[tokio::test]
async fn test_history_clamps_limit() {
    let app = spawn_app();
    for term in ["socks", "lamp", "mug"] {
        get(&app, &format!("/search?query={term}")).await;
    }

    let (status, json) = get(&app, "/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 3);

    let (status, json) = get(&app, "/history?limit=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["results"][0]["query"], "mug");

    let (status, json) = get(&app, "/history?limit=5000").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 3);
}

#[tokio::test]
async fn test_cached_result_by_key() {
    let app = spawn_app();
    get(&app, "/search?query=Desk%20Lamp&platform=flipkart").await;

    let (status, json) = get(&app, "/cached/flipkart:desk%20lamp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["cache_key"], "flipkart:desk lamp");
    assert_eq!(json["data"]["query"], "desk lamp");
    assert_eq!(json["data"]["results"][0]["site"], "Flipkart");
}

#[tokio::test]
async fn test_cached_result_missing() {
    let app = spawn_app();
    let (status, json) = get(&app, "/cached/all:nothing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("all:nothing"));
}

#[tokio::test]
async fn test_status_with_connected_store() {
    let app = spawn_app();
    get(&app, "/search?query=socks").await;

    let (status, json) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["api_status"], "online");
    assert_eq!(json["mongodb_status"], "connected");
    assert_eq!(json["cache_expiry_hours"], 24);
    assert_eq!(json["deals_expiry_hours"], 6);
    assert_eq!(json["cached_queries"], 1);
    assert_eq!(json["in_flight_searches"], 0);

    let (_, test) = get(&app, "/test").await;
    assert_eq!(test["success"], true);
    assert_eq!(test["mongodb_connected"], true);
}

#[tokio::test]
async fn test_offline_store_degrades_gracefully() {
    let app = spawn_offline_app();

    let (status, json) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mongodb_status"], "disconnected");
    assert!(json.get("cached_queries").is_none());

    let (_, test) = get(&app, "/test").await;
    assert_eq!(test["mongodb_connected"], false);

    let (status, search) = get(&app, "/search?query=socks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(search["source"], "live");
    let (_, again) = get(&app, "/search?query=socks").await;
    assert_eq!(again["source"], "live");

    let (status, _) = get(&app, "/api/results").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, json) = get(&app, "/cached/all:socks").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_unknown_path_returns_json_404() {
    let app = spawn_app();
    let (status, json) = get(&app, "/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("/nope"));
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = spawn_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Metrics not enabled"));
}

#[tokio::test]
async fn test_app_from_config_with_sqlite() {
    let mut config = Config::default();
    let path = std::env::temp_dir().join(format!("shopscout-api-{}.db", uuid::Uuid::new_v4()));
    config.general.database_path = format!("sqlite:{}?mode=rwc", path.display());

    let state = api::create_app_state_from_config(config, None).await.unwrap();
    let router = api::router(state);
    let app = TestApp {
        router,
        adapters: Vec::new(),
    };

    let (_, status) = get(&app, "/status").await;
    assert_eq!(status["mongodb_status"], "connected");
    assert_eq!(status["cached_queries"], 0);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["available_scrapers"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_app_from_config_with_unopenable_database() {
    let mut config = Config::default();
    config.general.database_path = "sqlite:/proc/shopscout/cache.db".to_string();

    let state = api::create_app_state_from_config(config, None).await.unwrap();
    let app = TestApp {
        router: api::router(state),
        adapters: Vec::new(),
    };

    let (_, status) = get(&app, "/status").await;
    assert_eq!(status["mongodb_status"], "disconnected");
}
