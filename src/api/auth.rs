use std::time::{Duration, Instant};

/// How long a CSRF token is trusted before it is renewed.
pub const TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// Short-lived `x-csrf-token` plus when we got it.
#[derive(Debug, Clone)]
pub struct AuthToken {
    value: String,
    acquired_at: Option<Instant>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>, acquired_at: Instant) -> Self {
        Self {
            value: value.into(),
            acquired_at: Some(acquired_at),
        }
    }

    /// Placeholder before the first refresh. Always stale.
    pub fn empty() -> Self {
        Self {
            value: String::new(),
            acquired_at: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_stale_at(&self, now: Instant) -> bool {
        match self.acquired_at {
            Some(at) => now.saturating_duration_since(at) > TOKEN_TTL,
            None => true,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }
}
