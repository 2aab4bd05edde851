use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::client::REQUEST_TIMEOUT;
use crate::policy::Alert;

const USERNAME: &str = "RoMonitor";
const AVATAR_URL: &str = "https://robloxians.com/resources/bkg-blur.png";
const EMBED_COLOR: u32 = 923269;

/// Discord webhook body.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    username: &'a str,
    avatar_url: &'a str,
    content: String,
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    color: u32,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedImage<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

pub fn render_payload<'a>(
    alert: &'a Alert,
    mention: Option<u64>,
    thumbnail: Option<&'a str>,
) -> WebhookPayload<'a> {
    WebhookPayload {
        username: USERNAME,
        avatar_url: AVATAR_URL,
        content: mention.map(|id| format!("<@{}>", id)).unwrap_or_default(),
        embeds: vec![Embed {
            color: EMBED_COLOR,
            description: &alert.message,
            title: non_empty(&alert.title),
            url: non_empty(&alert.url),
            thumbnail: thumbnail.and_then(non_empty).map(|url| EmbedImage { url }),
        }],
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Outbound notification channel.
pub struct Webhook {
    http: Client,
    url: Url,
    mention: Option<u64>,
    timeout: Duration,
}

impl Webhook {
    pub fn new(url: Url, mention: Option<u64>) -> Self {
        Self {
            http: Client::new(),
            url,
            mention,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn send(&self, alert: &Alert, thumbnail: Option<&str>) -> Result<(), reqwest::Error> {
        let payload = render_payload(alert, self.mention, thumbnail);
        self.http
            .post(self.url.clone())
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fire-and-forget: delivery failures are logged and dropped.
    pub async fn dispatch(&self, alert: &Alert, thumbnail: Option<&str>) {
        match self.send(alert, thumbnail).await {
            Ok(()) => info!("Sent notification: {}", alert.message),
            Err(e) => warn!("Failed to deliver notification \"{}\": {}", alert.message, e),
        }
    }
}
