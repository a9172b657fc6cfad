/// Helpers shared by the feed and webhook sides of the relay

/// URL checks
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str).ok()?.domain().map(|d| d.to_string())
    }

    /// Feeds are only fetched over http(s)
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host_str().is_some(),
            Err(_) => false,
        }
    }

    /// Webhook endpoints must be https; plain http is allowed for loopback
    /// hosts only (local relays, test doubles).
    pub fn is_valid_webhook_url(url_str: &str) -> bool {
        let Ok(url) = Url::parse(url_str) else {
            return false;
        };
        match url.scheme() {
            "https" => url.host_str().is_some(),
            "http" => matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]")),
            _ => false,
        }
    }
}

/// Text cleanup for message bodies
pub mod text {
    /// Extract clean text content from HTML
    pub fn extract_text_from_html(html: &str) -> String {
        // Simple tag stripping; feed summaries rarely need more than this
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cut to at most `max_chars` characters, marking the cut with an ellipsis.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
