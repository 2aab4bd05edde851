use crate::state::{Field, ItemSnapshot, Price};

/// What triggered an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertKind {
    /// Monitoring started.
    Monitoring,

    /// Price crossed into the threshold.
    BelowThreshold {
        threshold: i64,
        /// New price in Robux
        price: i64,
        previous: Option<Price>,
        /// How far under the threshold the new price is
        difference: i64,
    },

    /// Price became free (public domain or 0 Robux).
    NowFree,

    /// Any other reportable change.
    FieldChanged {
        field: Field,
        old: String,
        new: String,
    },
}

/// A notification ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub title: String,
    pub url: String,
}

impl Alert {
    pub fn monitoring(current: &ItemSnapshot, url: &str) -> Self {
        Self {
            kind: AlertKind::Monitoring,
            message: format!("Now monitoring {} by {}.", current.name, current.creator),
            title: current.name.clone(),
            url: url.to_string(),
        }
    }

    pub fn below_threshold(
        current: &ItemSnapshot,
        url: &str,
        threshold: i64,
        price: i64,
        previous: Option<Price>,
    ) -> Self {
        let difference = (threshold - price).abs();
        let mut message = format!(
            "{} is now {} Robux, at or below your {} Robux threshold ({} under).",
            current.name, price, threshold, difference
        );
        if let Some(old) = previous.and_then(|p| p.robux()) {
            message.push_str(&format!(
                " It was {} Robux, a drop of {}.",
                old,
                (old - price).abs()
            ));
        }

        Self {
            kind: AlertKind::BelowThreshold {
                threshold,
                price,
                previous,
                difference,
            },
            message,
            title: current.name.clone(),
            url: url.to_string(),
        }
    }

    pub fn now_free(current: &ItemSnapshot, url: &str) -> Self {
        Self {
            kind: AlertKind::NowFree,
            message: format!("{} is now free!", current.name),
            title: current.name.clone(),
            url: url.to_string(),
        }
    }

    pub fn field_changed(
        field: Field,
        previous: &ItemSnapshot,
        current: &ItemSnapshot,
        url: &str,
    ) -> Self {
        let old = field.render(previous);
        let new = field.render(current);
        Self {
            message: format!(
                "The {} of {} changed from {} to {}.",
                field.label(),
                current.name,
                old,
                new
            ),
            kind: AlertKind::FieldChanged { field, old, new },
            title: current.name.clone(),
            url: url.to_string(),
        }
    }

    pub fn is_below_threshold(&self) -> bool {
        matches!(self.kind, AlertKind::BelowThreshold { .. })
    }

    pub fn is_now_free(&self) -> bool {
        matches!(self.kind, AlertKind::NowFree)
    }

    pub fn is_field_changed(&self) -> bool {
        matches!(self.kind, AlertKind::FieldChanged { .. })
    }
}
