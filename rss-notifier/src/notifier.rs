use crate::rss_utils::text::{extract_text_from_html, truncate_chars};
use crate::traits::NotifySink;
use crate::types::{Candidate, RelayError, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Discord rejects message content above this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;
const MAX_EMBED_DESCRIPTION_CHARS: usize = 4096;
/// Used when a 429 carries no usable retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Webhook payload: plain content, embeds, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(truncate_chars(&content.into(), MAX_CONTENT_CHARS)),
            embeds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Result of one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    RateLimited {
        retry_after: Duration,
    },
    Failed {
        status: Option<u16>,
        reason: String,
        /// Worth trying again (5xx, transport errors).
        retryable: bool,
    },
}

impl SinkOutcome {
    /// The endpoint itself is gone or refuses us; nothing else will get through.
    pub fn is_endpoint_rejection(&self) -> bool {
        matches!(
            self,
            SinkOutcome::Failed {
                status: Some(401 | 403 | 404),
                ..
            }
        )
    }
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Waits too long to represent saturate, so the scheduler's ceiling rejects them.
fn retry_after_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Map a webhook HTTP response onto the tri-state outcome.
pub fn classify_response(status: u16, retry_after_header: Option<&str>, body: &str) -> SinkOutcome {
    match status {
        200..=299 => SinkOutcome::Delivered,
        429 => {
            let from_body = serde_json::from_str::<RateLimitBody>(body)
                .ok()
                .and_then(|b| b.retry_after);
            let from_header = retry_after_header.and_then(|h| h.trim().parse::<f64>().ok());
            let retry_after = from_body
                .or(from_header)
                .filter(|secs| *secs >= 0.0)
                .map(retry_after_duration)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            SinkOutcome::RateLimited { retry_after }
        }
        _ => SinkOutcome::Failed {
            status: Some(status),
            reason: truncate_chars(body.trim(), 200),
            retryable: status >= 500,
        },
    }
}

/// Discord-compatible webhook endpoint.
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !crate::rss_utils::url::is_valid_webhook_url(&url) {
            return Err(RelayError::Config("webhook URL must be an https URL".to_string()));
        }

        let client = Client::builder()
            .user_agent("RSS-Notifier/1.0")
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotifySink for DiscordWebhook {
    fn sink_name(&self) -> String {
        crate::rss_utils::url::extract_domain(&self.url)
            .map(|d| format!("webhook({})", d))
            .unwrap_or_else(|| "webhook".to_string())
    }

    async fn send(&self, message: &WebhookMessage) -> SinkOutcome {
        let response = match self.client.post(&self.url).json(message).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Webhook request failed: {}", e);
                return SinkOutcome::Failed {
                    status: None,
                    reason: e.to_string(),
                    retryable: true,
                };
            }
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        debug!("Webhook responded {}", status);
        classify_response(status, retry_after.as_deref(), &body)
    }
}

/// Logs messages instead of posting them.
pub struct DryRunSink;

#[async_trait]
impl NotifySink for DryRunSink {
    fn sink_name(&self) -> String {
        "dry-run".to_string()
    }

    async fn send(&self, message: &WebhookMessage) -> SinkOutcome {
        match serde_json::to_string(message) {
            Ok(json) => info!("[dry-run] would post: {}", json),
            Err(e) => warn!("[dry-run] unserializable message: {}", e),
        }
        SinkOutcome::Delivered
    }
}

fn default_embed_color() -> u32 {
    0x7289DA
}

/// How a candidate is rendered into a webhook message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum MessageFormat {
    /// `**title**` and the link, nothing else.
    #[default]
    Headline,
    /// A randomly chosen opener line above the headline.
    Announcement { openers: Vec<String> },
    /// Filing notice with the company name taken from the summary.
    Filing { heading: String },
    /// Discord embed card.
    Embed {
        title: String,
        #[serde(default = "default_embed_color")]
        color: u32,
        #[serde(default)]
        footer: Option<String>,
    },
}

impl MessageFormat {
    pub fn render(&self, candidate: &Candidate) -> WebhookMessage {
        let entry = &candidate.entry;
        let headline = format!("**{}**\n{}", entry.title, entry.link);

        match self {
            MessageFormat::Headline => WebhookMessage::text(headline),
            MessageFormat::Announcement { openers } => match openers.choose(&mut rand::thread_rng()) {
                Some(opener) => WebhookMessage::text(format!("{}\n\n{}", opener, headline)),
                None => WebhookMessage::text(headline),
            },
            MessageFormat::Filing { heading } => {
                let heading = match &candidate.tag {
                    Some(tag) => format!("{} • {}", heading, tag),
                    None => heading.clone(),
                };
                WebhookMessage::text(format!(
                    "📄 **{}**\n**{}** — {}\n{}",
                    heading,
                    company_context(&entry.summary),
                    entry.title,
                    entry.link
                ))
            }
            MessageFormat::Embed { title, color, footer } => {
                let title = match &candidate.tag {
                    Some(tag) => format!("{} • {}", title, tag),
                    None => title.clone(),
                };
                let description = format!(
                    "**{}**\n\n{}\n\n[🔗 View]({})",
                    company_context(&entry.summary),
                    entry.title,
                    entry.link
                );
                WebhookMessage {
                    content: None,
                    embeds: vec![Embed {
                        title,
                        description: truncate_chars(&description, MAX_EMBED_DESCRIPTION_CHARS),
                        url: Some(entry.link.clone()),
                        color: *color,
                        footer: footer.clone().map(|text| EmbedFooter { text }),
                    }],
                }
            }
        }
    }
}

/// Company (or issuer) name from a filing summary: the text before the first
/// " - " or "(", else the first 200 characters.
pub fn company_context(summary: &str) -> String {
    let text = extract_text_from_html(summary);
    let cut = [text.find(" - "), text.find('(')].into_iter().flatten().min();

    let company = match cut {
        Some(idx) => text[..idx].trim().to_string(),
        None => truncate_chars(text.trim(), 200),
    };

    if company.is_empty() {
        "Unknown Company".to_string()
    } else {
        company
    }
}

/// Formats candidates and hands them to the sink.
pub struct Notifier {
    sink: Box<dyn NotifySink>,
    format: MessageFormat,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotifySink>, format: MessageFormat) -> Self {
        Self { sink, format }
    }

    pub fn sink_name(&self) -> String {
        self.sink.sink_name()
    }

    pub fn render(&self, candidate: &Candidate) -> WebhookMessage {
        self.format.render(candidate)
    }

    pub async fn notify(&self, candidate: &Candidate) -> SinkOutcome {
        let message = self.render(candidate);
        self.sink.send(&message).await
    }
}
