use std::fmt;

use crate::api::{resolve_resale_price, ApiClient, AssetDetails};
use crate::error::ApiError;

/// Concrete item price. "No price" is `Option::None` around this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    /// Public-domain item.
    Free,
    Robux(i64),
}

impl Price {
    pub fn robux(&self) -> Option<i64> {
        match self {
            Price::Robux(amount) => Some(*amount),
            Price::Free => None,
        }
    }

    /// Free, either by being public domain or by costing nothing.
    pub fn is_free(&self) -> bool {
        matches!(self, Price::Free | Price::Robux(0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Free => write!(f, "Free"),
            Price::Robux(amount) => write!(f, "{} Robux", amount),
        }
    }
}

/// Everything the price of an item can depend on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceInputs {
    pub public_domain: bool,
    pub collectible: bool,
    pub limited: bool,
    pub collectible_resale: Option<i64>,
    pub resale: Option<i64>,
    pub direct: Option<i64>,
}

impl PriceInputs {
    pub fn from_details(details: &AssetDetails, resale: Option<i64>) -> Self {
        Self {
            public_domain: details.is_public_domain,
            collectible: details.is_collectible(),
            limited: details.is_legacy_limited(),
            collectible_resale: details.collectible_resale_price(),
            resale,
            direct: details.price_in_robux,
        }
    }
}

/// Public domain, then collectible resale, then legacy resale, then list price.
pub fn derive_price(inputs: &PriceInputs) -> Option<Price> {
    if inputs.public_domain {
        Some(Price::Free)
    } else if inputs.collectible {
        inputs.collectible_resale.map(Price::Robux)
    } else if inputs.limited {
        inputs.resale.map(Price::Robux)
    } else {
        inputs.direct.map(Price::Robux)
    }
}

/// Whether pricing this item takes a trip to the reseller endpoint.
pub fn needs_resale_lookup(details: &AssetDetails) -> bool {
    !details.is_public_domain && !details.is_collectible() && details.is_legacy_limited()
}

/// Observable state of the monitored item at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub name: String,
    pub for_sale: bool,
    pub price: Option<Price>,
    pub description: String,
    pub creator: String,
    /// Opaque timestamp as sent by the API.
    pub updated: String,
    pub is_limited: bool,
    pub is_collectible: bool,
    pub remaining: Option<i64>,
    pub thumbnail: String,
}

impl ItemSnapshot {
    /// Pure mapping. `resale` is only consulted for legacy limiteds.
    pub fn from_details(details: &AssetDetails, resale: Option<i64>, thumbnail: String) -> Self {
        Self {
            name: details.name.clone(),
            for_sale: details.is_for_sale,
            price: derive_price(&PriceInputs::from_details(details, resale)),
            description: details.description.clone(),
            creator: details.creator.name.clone(),
            updated: details.updated.clone(),
            is_limited: details.is_legacy_limited() || details.is_collectible(),
            is_collectible: details.is_collectible(),
            remaining: details.remaining,
            thumbnail,
        }
    }
}

/// Build a snapshot, resolving the resale price when the item needs one.
pub async fn build_snapshot(
    client: &ApiClient,
    item_id: u64,
    details: &AssetDetails,
    thumbnail: String,
) -> Result<ItemSnapshot, ApiError> {
    let resale = if needs_resale_lookup(details) {
        resolve_resale_price(client, item_id).await?
    } else {
        None
    };
    Ok(ItemSnapshot::from_details(details, resale, thumbnail))
}
