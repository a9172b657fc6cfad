use chrono::Utc;
use rss_notifier::notifier::{classify_response, company_context, MAX_CONTENT_CHARS};
use rss_notifier::{Candidate, DiscordWebhook, FeedEntry, MessageFormat, SinkOutcome};
use std::time::Duration;

fn candidate(title: &str, summary: &str, tag: Option<&str>) -> Candidate {
    Candidate::new(FeedEntry {
        id: "https://www.sec.gov/filing/1".to_string(),
        title: title.to_string(),
        link: "https://www.sec.gov/filing/1".to_string(),
        published_at: Utc::now(),
        summary: summary.to_string(),
        source_url: "https://www.sec.gov/feed".to_string(),
    })
    .with_tag(tag.map(str::to_string))
}

#[test]
fn test_success_statuses_are_delivered() {
    assert_eq!(classify_response(204, None, ""), SinkOutcome::Delivered);
    assert_eq!(classify_response(200, None, "{}"), SinkOutcome::Delivered);
}

#[test]
fn test_rate_limit_reads_body_then_header() {
    assert_eq!(
        classify_response(429, Some("9"), r#"{"message": "You are being rate limited.", "retry_after": 2.5, "global": false}"#),
        SinkOutcome::RateLimited {
            retry_after: Duration::from_millis(2500)
        }
    );
    assert_eq!(
        classify_response(429, Some("3"), "rate limited"),
        SinkOutcome::RateLimited {
            retry_after: Duration::from_secs(3)
        }
    );
    assert_eq!(
        classify_response(429, None, ""),
        SinkOutcome::RateLimited {
            retry_after: Duration::from_secs(1)
        }
    );
    // Out of range waits saturate instead of panicking.
    assert_eq!(
        classify_response(429, None, r#"{"retry_after": 1e30}"#),
        SinkOutcome::RateLimited {
            retry_after: Duration::MAX
        }
    );
    assert_eq!(
        classify_response(429, Some("inf"), ""),
        SinkOutcome::RateLimited {
            retry_after: Duration::MAX
        }
    );
    assert_eq!(
        classify_response(429, Some("NaN"), ""),
        SinkOutcome::RateLimited {
            retry_after: Duration::from_secs(1)
        }
    );
}

#[test]
fn test_failures_are_classified_by_status() {
    match classify_response(503, None, "upstream unavailable") {
        SinkOutcome::Failed { status, retryable, .. } => {
            assert_eq!(status, Some(503));
            assert!(retryable);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let rejected = classify_response(404, None, r#"{"message": "Unknown Webhook", "code": 10015}"#);
    assert!(rejected.is_endpoint_rejection());
    assert!(matches!(rejected, SinkOutcome::Failed { retryable: false, .. }));

    let bad_request = classify_response(400, None, "bad");
    assert!(!bad_request.is_endpoint_rejection());
}

#[test]
fn test_headline_format() {
    let message = MessageFormat::Headline.render(&candidate("Chip export rules change", "", None));

    assert_eq!(
        message.content.as_deref(),
        Some("**Chip export rules change**\nhttps://www.sec.gov/filing/1")
    );
    assert!(message.embeds.is_empty());
    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        serde_json::json!({"content": "**Chip export rules change**\nhttps://www.sec.gov/filing/1"})
    );
}

#[test]
fn test_announcement_picks_one_of_the_openers() {
    let openers = vec!["⚡ First opener —".to_string(), "🚀 Second opener —".to_string()];
    let format = MessageFormat::Announcement {
        openers: openers.clone(),
    };

    for _ in 0..10 {
        let content = format.render(&candidate("Rollup news", "", None)).content.unwrap();
        assert!(openers.iter().any(|o| content.starts_with(o.as_str())));
        assert!(content.ends_with("**Rollup news**\nhttps://www.sec.gov/filing/1"));
    }
}

#[test]
fn test_filing_format_includes_company_and_tag() {
    let format = MessageFormat::Filing {
        heading: "New SEC Filing (AI Sector)".to_string(),
    };
    let message = format.render(&candidate(
        "8-K - NVIDIA CORP (NVDA)",
        "NVIDIA CORP (Filer) - Current report",
        Some("NVDA"),
    ));

    assert_eq!(
        message.content.as_deref(),
        Some("📄 **New SEC Filing (AI Sector) • NVDA**\n**NVIDIA CORP** — 8-K - NVIDIA CORP (NVDA)\nhttps://www.sec.gov/filing/1")
    );
}

#[test]
fn test_embed_format() {
    let format = MessageFormat::Embed {
        title: "🛰️ New SEC Filing (Crypto)".to_string(),
        color: 0x7289DA,
        footer: Some("Filings Feed".to_string()),
    };
    let message = format.render(&candidate("10-K - Coin Miner Inc", "Coin Miner Inc - annual report", Some("mining")));

    assert!(message.content.is_none());
    assert_eq!(message.embeds.len(), 1);
    let embed = &message.embeds[0];
    assert_eq!(embed.title, "🛰️ New SEC Filing (Crypto) • mining");
    assert_eq!(embed.color, 0x7289DA);
    assert!(embed.description.starts_with("**Coin Miner Inc**"));
    assert_eq!(embed.footer.as_ref().map(|f| f.text.as_str()), Some("Filings Feed"));
}

#[test]
fn test_long_content_is_truncated() {
    let title = "x".repeat(5000);
    let message = MessageFormat::Headline.render(&candidate(&title, "", None));

    assert_eq!(message.content.unwrap().chars().count(), MAX_CONTENT_CHARS);
}

#[test]
fn test_company_context() {
    assert_eq!(company_context("Acme Holdings - 10-K annual report"), "Acme Holdings");
    assert_eq!(company_context("<b>Beta Corp</b> (Filer)"), "Beta Corp");
    assert_eq!(company_context("Gamma Industries"), "Gamma Industries");
    assert_eq!(company_context(""), "Unknown Company");
}

#[test]
fn test_webhook_requires_https() {
    assert!(DiscordWebhook::new("http://discord.com/api/webhooks/1/abc").is_err());
    assert!(DiscordWebhook::new("not a url").is_err());
    assert!(DiscordWebhook::new("https://discord.com/api/webhooks/1/abc").is_ok());
    assert!(DiscordWebhook::new("http://127.0.0.1:8080/hook").is_ok());
}
