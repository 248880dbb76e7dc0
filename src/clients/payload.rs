//! Normalization of whatever the scraping service returns.
//!
//! Scrapers answer with a bare list, `{"products": [...]}` or Meesho's
//! `{"basic_products": [...]}`, and individual items use a handful of field
//! spellings. Everything is mapped onto [`Listing`] here; nothing untyped
//! crosses this boundary.

use serde::Deserialize;
use url::Url;

use crate::domain::{Listing, Platform};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScrapePayload {
    List(Vec<RawListing>),
    Products { products: Vec<RawListing> },
    BasicProducts { basic_products: Vec<RawListing> },
    Deals { deals: Vec<RawListing> },
}

impl ScrapePayload {
    #[must_use]
    pub fn into_items(self) -> Vec<RawListing> {
        match self {
            Self::List(items)
            | Self::Products { products: items }
            | Self::BasicProducts {
                basic_products: items,
            }
            | Self::Deals { deals: items } => items,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawListing {
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(deserialize_with = "price_from_any")]
    pub price: Option<String>,
    #[serde(alias = "url")]
    pub link: Option<String>,
    #[serde(alias = "image_url", alias = "img")]
    pub image: Option<String>,
    #[serde(alias = "discount_label")]
    pub discount: Option<String>,
}

/// Prices arrive as strings ("₹1,299") or bare numbers.
fn price_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| html_escape::decode_html_entities(v.trim()).trim().to_string())
        .filter(|v| !v.is_empty())
}

fn absolutize(link: &str, platform: Platform) -> String {
    if link.is_empty() {
        return String::new();
    }
    if let Ok(url) = Url::parse(link) {
        return url.to_string();
    }
    Url::parse(platform.site_url())
        .and_then(|base| base.join(link))
        .map_or_else(|_| link.to_string(), |url| url.to_string())
}

impl RawListing {
    /// Maps a raw item onto a [`Listing`]; items with neither a title nor a
    /// price carry nothing useful and are dropped.
    #[must_use]
    pub fn normalize(self, platform: Platform) -> Option<Listing> {
        let title = clean(self.title);
        let price = clean(self.price);
        if title.is_none() && price.is_none() {
            return None;
        }

        let link = clean(self.link).unwrap_or_default();
        let image = clean(self.image).map(|img| absolutize(&img, platform));

        Some(Listing {
            title: title.unwrap_or_default(),
            price: price.unwrap_or_default(),
            link: absolutize(&link, platform),
            image,
            discount: clean(self.discount),
            platform,
        })
    }
}

/// Decodes a response body into listings for `platform`, preserving order.
pub fn parse_listings(body: &str, platform: Platform) -> Result<Vec<Listing>, serde_json::Error> {
    let payload: ScrapePayload = serde_json::from_str(body)?;
    Ok(payload
        .into_items()
        .into_iter()
        .filter_map(|item| item.normalize(platform))
        .collect())
}
