use serde::Deserialize;
use tracing::debug;

use super::client::{ApiClient, Fetched};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct ResellersResponse {
    #[serde(default)]
    data: Vec<ResaleListing>,
}

#[derive(Debug, Deserialize)]
struct ResaleListing {
    seller: Option<serde_json::Value>,
    price: Option<i64>,
}

/// Lowest active resale price of a legacy limited.
///
/// `Ok(None)` means nobody is reselling right now. Running out of retries is
/// an error so the caller can skip the cycle instead of recording "no price".
pub async fn resolve_resale_price(
    client: &ApiClient,
    item_id: u64,
) -> Result<Option<i64>, ApiError> {
    let url = format!("{}/v1/assets/{}/resellers", client.endpoints().economy, item_id);
    debug!("Fetching lowest resale price for {}", item_id);

    match client.get(&url).await? {
        Fetched::Body(body) => {
            let response: ResellersResponse = serde_json::from_value(body)?;
            Ok(lowest_price(&response.data))
        }
        Fetched::NotFound => Ok(None),
        Fetched::Exhausted { last_status } => Err(ApiError::Degraded { url, last_status }),
    }
}

fn lowest_price(listings: &[ResaleListing]) -> Option<i64> {
    listings
        .iter()
        .filter(|l| l.seller.is_some())
        .filter_map(|l| l.price)
        .min()
}
