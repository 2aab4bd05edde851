use serde::Deserialize;
use tracing::debug;

use super::client::{ApiClient, Fetched};
use crate::error::ApiError;

/// Shown when the thumbnail service has nothing for us.
pub const PLACEHOLDER_THUMBNAIL: &str = "https://robloxians.com/resources/bkg-blur.png";

/// Canonical catalog page for an item.
pub fn catalog_url(item_id: u64) -> String {
    format!("https://www.roblox.com/catalog/{}", item_id)
}

/// Asset details as returned by the economy API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AssetDetails {
    pub name: String,
    pub description: String,
    pub creator: Creator,
    pub updated: String,
    pub is_for_sale: bool,
    pub price_in_robux: Option<i64>,
    pub is_public_domain: bool,
    pub is_limited: bool,
    pub is_limited_unique: bool,
    pub remaining: Option<i64>,
    pub collectibles_item_details: Option<CollectibleDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Creator {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CollectibleDetails {
    pub is_limited: bool,
    pub collectible_lowest_resale_price: Option<i64>,
}

impl AssetDetails {
    /// Legacy limited (the old resale market).
    pub fn is_legacy_limited(&self) -> bool {
        self.is_limited || self.is_limited_unique
    }

    /// New-style collectible whose resale price comes in this response.
    pub fn is_collectible(&self) -> bool {
        self.collectibles_item_details
            .as_ref()
            .is_some_and(|c| c.is_limited)
    }

    pub fn collectible_resale_price(&self) -> Option<i64> {
        self.collectibles_item_details
            .as_ref()
            .and_then(|c| c.collectible_lowest_resale_price)
    }
}

/// Outcome of a detail lookup that reached the API.
#[derive(Debug)]
pub enum DetailLookup {
    Found(AssetDetails),
    NotFound,
}

/// Fetch item details. Exhausted retries are an error here, callers decide
/// whether that is fatal.
pub async fn fetch_details(client: &ApiClient, item_id: u64) -> Result<DetailLookup, ApiError> {
    let url = format!("{}/v2/assets/{}/details", client.endpoints().economy, item_id);

    match client.get(&url).await? {
        Fetched::Body(body) => Ok(DetailLookup::Found(serde_json::from_value(body)?)),
        Fetched::NotFound => Ok(DetailLookup::NotFound),
        Fetched::Exhausted { last_status } => Err(ApiError::Degraded { url, last_status }),
    }
}

#[derive(Debug, Deserialize)]
struct ThumbnailResponse {
    #[serde(default)]
    data: Vec<ThumbnailEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailEntry {
    state: Option<String>,
    image_url: Option<String>,
}

/// Thumbnail URL, or `None` when the service could not give one.
///
/// Only an unreachable host is an error.
pub async fn fetch_thumbnail(
    client: &ApiClient,
    item_id: u64,
) -> Result<Option<String>, ApiError> {
    let url = format!(
        "{}/v1/assets?assetIds={}&returnPolicy=PlaceHolder&size=420x420&format=Png&isCircular=false",
        client.endpoints().thumbnails,
        item_id
    );

    let body = match client.get(&url).await {
        Ok(Fetched::Body(body)) => body,
        Ok(other) => {
            debug!("Thumbnail unavailable for {}: {:?}", item_id, other);
            return Ok(None);
        }
        Err(e @ ApiError::Unreachable { .. }) => return Err(e),
        Err(e) => {
            debug!("Malformed thumbnail response for {}: {}", item_id, e);
            return Ok(None);
        }
    };

    let Ok(response) = serde_json::from_value::<ThumbnailResponse>(body) else {
        debug!("Unexpected thumbnail response for {}", item_id);
        return Ok(None);
    };

    Ok(response
        .data
        .into_iter()
        .find(|entry| entry.state.as_deref() == Some("Completed"))
        .and_then(|entry| entry.image_url)
        .filter(|url| !url.is_empty()))
}
