use chrono::Utc;
use rss_notifier::filter::{AllOf, KeywordFilter, MatchFields, TickerFilter, TrustedSource};
use rss_notifier::{FeedEntry, FilterDecision, FilterSpec, RelayError, RelevanceFilter};

fn entry(title: &str, summary: &str) -> FeedEntry {
    FeedEntry {
        id: "https://news.example.com/1".to_string(),
        title: title.to_string(),
        link: "https://news.example.com/1".to_string(),
        published_at: Utc::now(),
        summary: summary.to_string(),
        source_url: "https://feeds.example.com/eth".to_string(),
    }
}

fn eth_filter() -> KeywordFilter {
    KeywordFilter::new(&["ethereum", "staking"], &["bitcoin", "scandal"], false, MatchFields::TitleAndSummary).unwrap()
}

#[test]
fn test_block_term_wins_over_allow_term() {
    let filter = eth_filter();
    let decision = filter.evaluate(&entry("Ethereum and Bitcoin ETFs see inflows", ""));

    assert_eq!(
        decision,
        FilterDecision::Blocked {
            term: "bitcoin".to_string()
        }
    );
}

#[test]
fn test_allow_term_is_case_insensitive_and_tags_the_entry() {
    let filter = eth_filter();

    assert_eq!(
        filter.evaluate(&entry("ETHEREUM devnet launches", "")),
        FilterDecision::Accept {
            tag: Some("ethereum".to_string())
        }
    );
    assert!(filter.evaluate(&entry("Validators", "Liquid Staking grows")).is_accept());
    assert_eq!(filter.evaluate(&entry("Weather report", "")), FilterDecision::NoMatch);
}

#[test]
fn test_block_terms_also_look_at_the_summary() {
    let filter = eth_filter();
    let decision = filter.evaluate(&entry("Ethereum foundation news", "A new scandal unfolds"));

    assert!(matches!(decision, FilterDecision::Blocked { .. }));
}

#[test]
fn test_title_only_matching_ignores_summary() {
    let filter = KeywordFilter::new(&["eth"], &["btc"], false, MatchFields::Title).unwrap();

    assert!(filter.evaluate(&entry("ETH gas fees drop", "btc mentioned below")).is_accept());
    assert_eq!(filter.evaluate(&entry("Markets wrap", "eth up")), FilterDecision::NoMatch);
}

#[test]
fn test_substring_vs_word_boundary() {
    let substring = KeywordFilter::new(&["token"], &[], false, MatchFields::TitleAndSummary).unwrap();
    let bounded = KeywordFilter::new(&["token"], &[], true, MatchFields::TitleAndSummary).unwrap();
    let e = entry("Company announces tokenization pilot", "");

    assert!(substring.evaluate(&e).is_accept());
    assert_eq!(bounded.evaluate(&e), FilterDecision::NoMatch);
    assert!(bounded.evaluate(&entry("Utility Token offering filed", "")).is_accept());
}

#[test]
fn test_word_boundary_handles_multi_word_and_regex_characters() {
    let filter = KeywordFilter::new(&["digital asset", "c++"], &[], true, MatchFields::TitleAndSummary).unwrap();

    assert!(filter.evaluate(&entry("10-K", "Digital Asset holdings disclosed")).is_accept());
    assert_eq!(filter.evaluate(&entry("Digital assets", "")), FilterDecision::NoMatch);
}

#[test]
fn test_ticker_filter_finds_first_known_symbol() {
    let filter = TickerFilter::new(&["NVDA", "AMD", "AI"]);

    assert_eq!(
        filter.find_ticker("8-K - NVIDIA CORP (NVDA) (Filer)"),
        Some("NVDA".to_string())
    );
    assert_eq!(filter.find_ticker("4 - amd, nvda holdings"), Some("AMD".to_string()));
    assert_eq!(filter.find_ticker("SC 13G - AIRBNB INC"), None);

    assert_eq!(
        filter.evaluate(&entry("10-Q - C3.ai, Inc. (AI)", "")),
        FilterDecision::Accept {
            tag: Some("AI".to_string())
        }
    );
}

#[test]
fn test_trusted_source_accepts_everything() {
    assert!(TrustedSource.evaluate(&entry("Anything at all", "")).is_accept());
}

#[test]
fn test_all_of_checks_every_block_list_first() {
    let tickers: Box<dyn RelevanceFilter> = Box::new(TickerFilter::new(&["NVDA"]));
    let keywords: Box<dyn RelevanceFilter> =
        Box::new(KeywordFilter::new(&["8-k"], &["amendment"], false, MatchFields::Title).unwrap());
    let filter = AllOf::new(vec![tickers, keywords]);

    assert_eq!(
        filter.evaluate(&entry("8-K - NVIDIA CORP (NVDA)", "")),
        FilterDecision::Accept {
            tag: Some("NVDA".to_string())
        }
    );
    assert!(matches!(
        filter.evaluate(&entry("8-K amendment - NVIDIA CORP (NVDA)", "")),
        FilterDecision::Blocked { .. }
    ));
    assert_eq!(filter.evaluate(&entry("10-K - NVIDIA CORP (NVDA)", "")), FilterDecision::NoMatch);
}

#[test]
fn test_filter_spec_from_json() {
    let spec: FilterSpec = serde_json::from_str(
        r#"{"kind": "keywords", "allow": ["defi"], "block": ["scam"], "word_boundary": true}"#,
    )
    .unwrap();
    spec.validate().unwrap();
    let filter = spec.build().unwrap();

    assert!(filter.evaluate(&entry("DeFi protocol upgrade", "")).is_accept());
    assert!(matches!(
        filter.evaluate(&entry("DeFi scam exposed", "")),
        FilterDecision::Blocked { .. }
    ));
}

#[test]
fn test_filter_spec_rejects_empty_allow_list() {
    let spec = FilterSpec::keywords(&[], &["bitcoin"]);
    assert!(matches!(spec.validate(), Err(RelayError::Config(_))));

    let spec = FilterSpec::AllOf { filters: vec![] };
    assert!(spec.validate().is_err());
}
