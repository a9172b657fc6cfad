//! Built-in profiles for the feeds this relay is usually pointed at.

use crate::config::{DedupModeKind, FeedSpec, Profile, QuietHours};
use crate::filter::{FilterSpec, MatchFields};
use crate::normalizer::IdentifierKey;
use crate::notifier::MessageFormat;

pub const PRESET_NAMES: &[&str] = &[
    "ethereum-news",
    "ai-infra",
    "tech-watch",
    "crypto-news",
    "edgar-ai",
    "edgar-crypto",
];

const EASTERN: &str = "America/New_York";
const QUIET_FROM_HOUR: u32 = 19;

const SEC_CURRENT_FILINGS: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&CIK=&type=&company=&owner=exclude&count=100&output=atom";
const SEC_CURRENT_FILINGS_200: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&CIK=&type=&owner=exclude&count=200&output=atom";

const ETHEREUM_FEEDS: &[&str] = &[
    "https://blog.ethereum.org/en/feed.xml",
    "https://ethereum.org/en/atom.xml",
    "https://ethereum-magicians.org/latest.rss",
    "https://www.ethereumcatherders.com/blog-feed.xml",
    "https://docs.ethhub.io/rss/",
    "https://arbitrum.foundation/feed",
    "https://optimism.mirror.xyz/feed",
    "https://base.mirror.xyz/feed",
    "https://blog.matter-labs.io/feed",
    "https://community.starknet.io/latest.rss",
    "https://scroll.mirror.xyz/feed",
    "https://lido.fi/feed/",
    "https://medium.com/feed/rocket-pool",
    "https://blog.eigenlayer.xyz/feed",
    "https://blog.chain.link/feed/",
    "https://etherscan.io/feeds/blog",
    "https://hardhat.org/feed.xml",
    "https://blog.openzeppelin.com/feed",
    "https://thedefiant.io/feed",
    "https://bankless.ghost.io/rss/",
    "https://decrypt.co/feed/ethereum",
    "https://cointelegraph.com/tags/ethereum/feed",
    "https://www.coindesk.com/tag/ethereum/feed/",
    "https://www.coinbureau.com/ethereum/feed/",
];

const ETHEREUM_KEYWORDS: &[&str] = &[
    "ethereum", "eth", "layer-2", "l2", "arbitrum", "optimism", "base", "scroll", "zksync", "starknet", "eip",
    "staking",
];

const ETHEREUM_BLOCKED: &[&str] = &[
    "bitcoin",
    "btc",
    "solana",
    "xrp",
    "cardano",
    "binance",
    "tether",
    "crime",
    "scandal",
    "controversy",
];

const ETHEREUM_OPENERS: &[&str] = &[
    "🛰️ Layer-2 networks just pinged us —",
    "⚡ Ethereum nodes relayed a fresh update —",
    "🔗 The chain just finalized a new transmission —",
    "🧠 ETH validators surfaced new activity —",
    "🚀 Rollup ecosystems just delivered intel —",
];

const AI_FEEDS: &[&str] = &[
    "https://venturebeat.com/category/ai/feed/",
    "https://techcrunch.com/tag/artificial-intelligence/feed/",
    "https://www.theverge.com/rss/artificial-intelligence/index.xml",
    "https://www.wired.com/feed/tag/artificial-intelligence/latest/rss",
    "https://arstechnica.com/tag/artificial-intelligence/feed/",
    "https://www.cnbc.com/id/19854910/device/rss/rss.html",
    "https://feeds.feedburner.com/thenextweb",
    "https://www.marktechpost.com/feed/",
    "https://ai.googleblog.com/feeds/posts/default?alt=rss",
    "https://openai.com/blog/rss.xml",
    "https://deepmind.google/discover/rss.xml",
    "https://huggingface.co/blog/feed.xml",
    "https://www.infoq.com/ai-ml/rss/",
    "https://aws.amazon.com/blogs/machine-learning/feed/",
    "https://cloud.google.com/blog/topics/ai-ml-feed.xml",
    "https://azure.microsoft.com/en-us/blog/topics/ai/feed/",
    "https://machinelearningmastery.com/blog/feed/",
    "https://paperswithcode.com/feeds/latest",
    "https://aiweekly.co/feed",
    "https://www.brookings.edu/tag/artificial-intelligence/feed/",
    "https://www.nature.com/subjects/artificial-intelligence.rss",
];

const AI_OPENERS: &[&str] = &[
    "🛰️ Stack satellites just intercepted an AI broadcast —",
    "🤖 The Stack’s sensors picked up new activity in AI systems —",
    "📡 Transmission received from the neural frontier —",
    "🧠 Stack AI just decoded a new artificial intelligence signal —",
    "🚀 Stack satellites relayed this fresh AI intelligence —",
];

const TECH_FEEDS: &[&str] = &[
    "https://www.reutersagency.com/feed/?best-topics=technology",
    "https://feeds.arstechnica.com/arstechnica/technology-lab",
    "https://techcrunch.com/feed/",
    "https://www.datacenterdynamics.com/en/rss/",
    "https://www.prnewswire.com/rss/technology-latest-news.rss",
];

const TECH_KEYWORDS: &[&str] = &[
    "nasdaq",
    "ai",
    "machine learning",
    "infrastructure",
    "cloud",
    "startup",
    "hardware",
    "software",
    "platform",
    "semiconductor",
    "data center",
    "robotics",
    "chip",
    "quantum",
];

const CRYPTO_NEWS_FEED: &str = "https://www.coindesk.com/arc/outboundfeeds/rss/?outputType=xml";
const CRYPTO_NEWS_KEYWORDS: &[&str] = &["ethereum", "defi", "layer 2", "bitcoin", "web3", "crypto regulation"];

const AI_TICKERS: &[&str] = &[
    "NVDA", "AMD", "AVGO", "SMCI", "TSLA", "GOOGL", "MSFT", "META", "AMZN", "AAPL", "IBM", "QCOM", "DELL", "MU",
    "PLTR", "ADBE", "ORCL", "SNOW", "CRWD", "NET", "DDOG", "ZS", "PATH", "AI", "UPST", "SOFI", "RBLX", "DOCN",
    "IONQ", "AEHR", "UI", "CLSK",
];

const FILING_CRYPTO_KEYWORDS: &[&str] = &[
    "crypto",
    "cryptocurrency",
    "digital asset",
    "bitcoin",
    "ethereum",
    "blockchain",
    "token",
    "web3",
    "smart contract",
    "mining",
    "stablecoin",
    "ledger",
    "exchange",
    "defi",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn feeds(urls: &[&str], trusted: bool, entry_limit: Option<usize>) -> Vec<FeedSpec> {
    urls.iter()
        .map(|url| FeedSpec {
            url: url.to_string(),
            trusted,
            entry_limit,
        })
        .collect()
}

fn base(name: &str, feeds: Vec<FeedSpec>, filter: FilterSpec, format: MessageFormat) -> Profile {
    Profile {
        name: name.to_string(),
        feeds,
        filter,
        format,
        dedup: DedupModeKind::Bounded,
        id_key: IdentifierKey::Link,
        quiet_hours: None,
        max_posts_per_run: None,
        per_feed_entry_limit: None,
        lookback_days: None,
        retry: None,
    }
}

fn title_keywords(allow: &[&str], block: &[&str]) -> FilterSpec {
    FilterSpec::Keywords {
        allow: strings(allow),
        block: strings(block),
        word_boundary: false,
        fields: MatchFields::Title,
    }
}

/// Look up a built-in profile by name.
pub fn preset(name: &str) -> Option<Profile> {
    let profile = match name {
        // Posts the single newest matching article, remembering only that one.
        "ethereum-news" => {
            let mut p = base(
                name,
                feeds(ETHEREUM_FEEDS, false, None),
                title_keywords(ETHEREUM_KEYWORDS, ETHEREUM_BLOCKED),
                MessageFormat::Announcement {
                    openers: strings(ETHEREUM_OPENERS),
                },
            );
            p.dedup = DedupModeKind::Cursor;
            p.max_posts_per_run = Some(1);
            p
        }
        "ai-infra" => {
            let mut p = base(
                name,
                feeds(AI_FEEDS, true, None),
                FilterSpec::AcceptAll,
                MessageFormat::Announcement {
                    openers: strings(AI_OPENERS),
                },
            );
            p.dedup = DedupModeKind::Cursor;
            p.max_posts_per_run = Some(1);
            p
        }
        "tech-watch" => {
            let mut p = base(
                name,
                feeds(TECH_FEEDS, false, Some(8)),
                title_keywords(TECH_KEYWORDS, &[]),
                MessageFormat::Headline,
            );
            p.quiet_hours = Some(QuietHours::evenings(EASTERN, QUIET_FROM_HOUR));
            p
        }
        "crypto-news" => {
            let mut p = base(
                name,
                feeds(&[CRYPTO_NEWS_FEED], false, Some(5)),
                title_keywords(CRYPTO_NEWS_KEYWORDS, &[]),
                MessageFormat::Headline,
            );
            p.quiet_hours = Some(QuietHours::evenings(EASTERN, QUIET_FROM_HOUR));
            p
        }
        "edgar-ai" => base(
            name,
            feeds(&[SEC_CURRENT_FILINGS], false, Some(100)),
            FilterSpec::Tickers {
                tickers: strings(AI_TICKERS),
            },
            MessageFormat::Filing {
                heading: "New SEC Filing (AI Sector)".to_string(),
            },
        ),
        "edgar-crypto" => base(
            name,
            feeds(&[SEC_CURRENT_FILINGS_200], false, Some(200)),
            FilterSpec::Keywords {
                allow: strings(FILING_CRYPTO_KEYWORDS),
                block: Vec::new(),
                word_boundary: true,
                fields: MatchFields::TitleAndSummary,
            },
            MessageFormat::Embed {
                title: "🛰️ New SEC Filing (Crypto)".to_string(),
                color: 0x7289DA,
                footer: Some("Crypto + Ethereum Filings Feed • Powered by The Stack".to_string()),
            },
        ),
        _ => return None,
    };
    Some(profile)
}
