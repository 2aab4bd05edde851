//! Monitoring session: initialization and the poll loop.
//!
//! One [`Monitor`] owns everything a session needs (API client, webhook,
//! thresholds, last snapshot) and runs on a single task. The only concurrency
//! is fetching details and thumbnail side by side.

use futures_util::try_join;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::catalog::{fetch_details, fetch_thumbnail};
use crate::api::{catalog_url, ApiClient, AssetDetails, DetailLookup, PLACEHOLDER_THUMBNAIL};
use crate::error::{ApiError, MonitorError};
use crate::policy::{decide, Alert, Decision, Thresholds};
use crate::state::{build_snapshot, diff, ItemSnapshot};
use crate::webhook::Webhook;

/// How a run ended. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A trigger fired and the thresholds say not to keep going.
    Terminated,
    /// Shutdown was requested.
    Cancelled,
}

pub struct Monitor {
    client: ApiClient,
    webhook: Webhook,
    item_id: u64,
    url: String,
    thresholds: Thresholds,
    previous: ItemSnapshot,
}

impl Monitor {
    /// Validate the credential, take the first snapshot and announce it.
    ///
    /// Every failure here is fatal for the session.
    pub async fn initialize(
        client: ApiClient,
        webhook: Webhook,
        item_id: u64,
        thresholds: Thresholds,
    ) -> Result<Self, MonitorError> {
        info!("Initializing RoMonitor...");

        client.validate_credential().await.map_err(auth_error)?;
        client.acquire_token().await.map_err(auth_error)?;

        let (details, thumbnail) = fetch_item(&client, item_id).await?;
        let thumbnail = thumbnail.unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string());
        let snapshot = build_snapshot(&client, item_id, &details, thumbnail).await?;

        let monitor = Self {
            client,
            webhook,
            item_id,
            url: catalog_url(item_id),
            thresholds,
            previous: snapshot,
        };

        info!(
            "Now monitoring [{}] by [{}]",
            monitor.previous.name, monitor.previous.creator
        );
        let alert = Alert::monitoring(&monitor.previous, &monitor.url);
        monitor
            .webhook
            .dispatch(&alert, Some(monitor.previous.thumbnail.as_str()))
            .await;

        Ok(monitor)
    }

    pub fn snapshot(&self) -> &ItemSnapshot {
        &self.previous
    }

    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    /// One cycle: fetch, snapshot, diff, decide, dispatch, replace.
    ///
    /// On error nothing is dispatched and the previous snapshot is kept.
    pub async fn poll_once(&mut self) -> Result<Decision, MonitorError> {
        let (details, thumbnail) = fetch_item(&self.client, self.item_id).await?;
        // A thumbnail hiccup should not look like a thumbnail change.
        let thumbnail = thumbnail.unwrap_or_else(|| self.previous.thumbnail.clone());
        let current = build_snapshot(&self.client, self.item_id, &details, thumbnail).await?;

        let changes = diff(&self.previous, &current);
        if changes.is_empty() {
            debug!("Item data matched");
        } else {
            debug!("Item data changed: {:?}", changes.keys());
        }

        let decision = decide(&self.previous, &current, &changes, &self.thresholds, &self.url);
        for alert in &decision.alerts {
            if alert.is_field_changed() {
                info!("Change detected: {}", alert.message);
            }
            self.webhook.dispatch(alert, Some(current.thumbnail.as_str())).await;
        }

        self.previous = current;
        Ok(decision)
    }

    /// Poll until a trigger ends the session or `shutdown` turns true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunOutcome {
        let interval = self.thresholds.interval();
        debug!("Polling every {:?}", interval);

        loop {
            let cycle = tokio::select! {
                result = self.poll_once() => result,
                _ = cancelled(&mut shutdown) => return RunOutcome::Cancelled,
            };

            match cycle {
                Ok(decision) if decision.stop => {
                    info!("Trigger fired, monitoring finished");
                    return RunOutcome::Terminated;
                }
                Ok(_) => {}
                Err(MonitorError::ItemNotFound(id)) => {
                    warn!("Item {} was reported missing, skipping this cycle", id);
                }
                Err(e) => error!("Failed to retrieve item data: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancelled(&mut shutdown) => return RunOutcome::Cancelled,
            }
        }
    }
}

/// Details and thumbnail, fetched together. Both must come back.
async fn fetch_item(
    client: &ApiClient,
    item_id: u64,
) -> Result<(AssetDetails, Option<String>), MonitorError> {
    let (lookup, thumbnail) = try_join!(
        fetch_details(client, item_id),
        fetch_thumbnail(client, item_id)
    )?;

    match lookup {
        DetailLookup::Found(details) => Ok((details, thumbnail)),
        DetailLookup::NotFound => Err(MonitorError::ItemNotFound(item_id)),
    }
}

fn auth_error(err: ApiError) -> MonitorError {
    match err {
        ApiError::InvalidCredential(_) | ApiError::TokenUnavailable(_) => {
            MonitorError::Authentication(err)
        }
        other => MonitorError::Api(other),
    }
}

/// Resolves once shutdown is requested. A dropped sender never cancels.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|&stop| stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
