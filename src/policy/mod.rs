mod alerts;

pub use alerts::{Alert, AlertKind};

use crate::state::{ChangeSet, Field, ItemSnapshot, Price};
use std::time::Duration;

/// Polls never run closer together than this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// What a free item does to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreePolicy {
    /// Going free always ends monitoring, even with run-forever.
    #[default]
    AlwaysStop,
    /// Going free is an ordinary trigger.
    FollowRunForever,
}

/// Notification settings for one monitoring session.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Alert when the price drops to this many Robux or less. 0 disables.
    pub min_price: i64,
    /// Discord user to mention. 0 mentions nobody.
    pub mention: u64,
    /// Keep going after a trigger.
    pub run_forever: bool,
    /// Alert on every change, including lone price/sale changes.
    pub track_all: bool,
    pub free_policy: FreePolicy,
    interval: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_price: 0,
            mention: 0,
            run_forever: false,
            track_all: false,
            free_policy: FreePolicy::AlwaysStop,
            interval: Duration::from_secs(60),
        }
    }
}

impl Thresholds {
    /// Set the poll interval, silently raised to [`MIN_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mention(&self) -> Option<u64> {
        (self.mention != 0).then_some(self.mention)
    }

    pub fn threshold(&self) -> Option<i64> {
        (self.min_price > 0).then_some(self.min_price)
    }

    fn is_under(&self, price: Option<Price>) -> bool {
        match (self.threshold(), price) {
            (Some(threshold), Some(Price::Robux(amount))) => amount <= threshold,
            _ => false,
        }
    }
}

/// Alerts to send for one cycle, and whether the loop should end after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    pub alerts: Vec<Alert>,
    pub stop: bool,
}

/// Decide what to send for the changes between two snapshots.
///
/// Per changed field, first match wins:
/// 1. price/sale change that moved the price into the threshold
/// 2. price became free (also sent alongside 1)
/// 3. several fields changed, or a field other than price/sale changed
/// 4. anything else, only with `track_all`
pub fn decide(
    previous: &ItemSnapshot,
    current: &ItemSnapshot,
    changes: &ChangeSet,
    thresholds: &Thresholds,
    url: &str,
) -> Decision {
    let mut alerts = Vec::new();
    let mut threshold_sent = false;

    let now_free = changes.contains(Field::Price) && current.price.is_some_and(|p| p.is_free());

    for &field in changes.fields() {
        let mut handled = false;
        if field.is_price_or_sale() && !threshold_sent {
            if let Some(alert) = threshold_alert(previous, current, thresholds, url) {
                threshold_sent = true;
                handled = true;
                alerts.push(alert);
            }
        }

        // Free is reported even when the same drop crossed the threshold.
        if field == Field::Price && now_free {
            alerts.push(Alert::now_free(current, url));
            continue;
        }

        if handled {
            continue;
        }

        if changes.len() > 1 || !field.is_price_or_sale() || thresholds.track_all {
            alerts.push(Alert::field_changed(field, previous, current, url));
        }
    }

    let forced_stop = now_free && thresholds.free_policy == FreePolicy::AlwaysStop;
    let stop = forced_stop || (!alerts.is_empty() && !thresholds.run_forever);
    Decision { alerts, stop }
}

/// Edge-triggered: only fires on the cycle the price enters the threshold.
fn threshold_alert(
    previous: &ItemSnapshot,
    current: &ItemSnapshot,
    thresholds: &Thresholds,
    url: &str,
) -> Option<Alert> {
    let threshold = thresholds.threshold()?;
    let price = current.price?.robux()?;

    if !thresholds.is_under(current.price) || thresholds.is_under(previous.price) {
        return None;
    }

    Some(Alert::below_threshold(
        current,
        url,
        threshold,
        price,
        previous.price,
    ))
}
