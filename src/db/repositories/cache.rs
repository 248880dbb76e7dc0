use crate::cache::CacheKey;
use crate::db::{CacheEntry, StoreError, format_timestamp, parse_timestamp};
use crate::domain::AggregatedResult;
use crate::entities::{prelude::*, search_cache};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::warn;

pub struct SearchCacheRepository {
    conn: DatabaseConnection,
}

impl SearchCacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let row = SearchCache::find()
            .filter(search_cache::Column::CacheKey.eq(key.as_str()))
            .one(&self.conn)
            .await?;

        row.map(entry_from_row).transpose()
    }

    pub async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let result_json = serde_json::to_string(&entry.result)?;

        let active_model = search_cache::ActiveModel {
            cache_key: Set(entry.key.as_str().to_string()),
            query: Set(entry.result.query.clone()),
            filter: Set(entry.result.filter.as_str().to_string()),
            result_json: Set(result_json),
            stored_at: Set(format_timestamp(entry.stored_at)),
            ..Default::default()
        };

        SearchCache::insert(active_model)
            .on_conflict(
                OnConflict::column(search_cache::Column::CacheKey)
                    .update_columns([
                        search_cache::Column::Query,
                        search_cache::Column::Filter,
                        search_cache::Column::ResultJson,
                        search_cache::Column::StoredAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Most recently stored first. Rows that no longer decode are skipped.
    pub async fn list(&self, limit: u64) -> Result<Vec<CacheEntry>, StoreError> {
        let rows = SearchCache::find()
            .order_by_desc(search_cache::Column::StoredAt)
            .order_by_desc(search_cache::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let key = row.cache_key.clone();
                match entry_from_row(row) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(cache_key = %key, error = %e, "Skipping unreadable cache row");
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        Ok(SearchCache::find().count(&self.conn).await?)
    }
}

fn entry_from_row(row: search_cache::Model) -> Result<CacheEntry, StoreError> {
    let result: AggregatedResult = serde_json::from_str(&row.result_json)?;
    Ok(CacheEntry {
        key: CacheKey::from_stored(row.cache_key),
        result,
        stored_at: parse_timestamp(&row.stored_at)?,
    })
}
