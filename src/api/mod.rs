pub mod auth;
pub mod catalog;
pub mod client;
pub mod resale;

pub use auth::AuthToken;
pub use catalog::{catalog_url, AssetDetails, DetailLookup, PLACEHOLDER_THUMBNAIL};
pub use client::{ApiClient, Endpoints, Fetched, RetryPolicy};
pub use resale::resolve_resale_price;
