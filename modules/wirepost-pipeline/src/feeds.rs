use std::sync::LazyLock;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use regex::Regex;
use tracing::{info, warn};

use wirepost_common::NewsItem;

/// Where the pipeline gets its raw items from.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch whatever is currently available. Individual source failures
    /// are absorbed, not surfaced.
    async fn fetch(&self) -> Vec<NewsItem>;
}

/// A configured news feed.
pub struct Feed {
    pub url: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

/// Hardcoded seed list of tech/industry RSS feeds.
pub const NEWS_FEEDS: &[Feed] = &[
    // Tech news
    Feed {
        url: "https://techcrunch.com/feed/",
        name: "TechCrunch",
        category: "tech",
    },
    Feed {
        url: "https://www.theverge.com/rss/index.xml",
        name: "The Verge",
        category: "tech",
    },
    Feed {
        url: "https://feeds.arstechnica.com/arstechnica/index",
        name: "Ars Technica",
        category: "tech",
    },
    Feed {
        url: "https://www.wired.com/feed/rss",
        name: "Wired",
        category: "tech",
    },
    // AI & machine learning
    Feed {
        url: "https://www.marktechpost.com/feed/",
        name: "MarkTechPost",
        category: "ai",
    },
    Feed {
        url: "https://www.artificialintelligence-news.com/feed/",
        name: "AI News",
        category: "ai",
    },
    // Startup & business
    Feed {
        url: "https://venturebeat.com/feed/",
        name: "VentureBeat",
        category: "startup",
    },
    // Cloud & infrastructure
    Feed {
        url: "https://aws.amazon.com/blogs/aws/feed/",
        name: "AWS Blog",
        category: "cloud",
    },
    // Security
    Feed {
        url: "https://krebsonsecurity.com/feed/",
        name: "Krebs on Security",
        category: "security",
    },
    Feed {
        url: "https://www.darkreading.com/rss.xml",
        name: "Dark Reading",
        category: "security",
    },
    // Development
    Feed {
        url: "https://dev.to/feed",
        name: "Dev.to",
        category: "development",
    },
    Feed {
        url: "https://hackernoon.com/feed",
        name: "HackerNoon",
        category: "development",
    },
];

/// Per-feed cap on ingested entries.
const MAX_ITEMS_PER_FEED: usize = 10;

/// Fetches configured feeds and normalizes entries into `NewsItem`s.
pub struct FeedReader {
    client: reqwest::Client,
}

impl FeedReader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()
            .expect("Failed to build feed HTTP client");
        Self { client }
    }

    /// Fetch every configured feed. A failing feed is logged and skipped;
    /// this never errors.
    pub async fn fetch_all(&self) -> Vec<NewsItem> {
        let mut all_items = Vec::new();
        for feed in NEWS_FEEDS {
            match self.fetch_feed(feed).await {
                Ok(items) => {
                    info!(feed = feed.name, items = items.len(), "Fetched feed");
                    all_items.extend(items);
                }
                Err(e) => {
                    warn!(feed = feed.name, error = %e, "Failed to fetch feed");
                }
            }
        }
        all_items
    }

    async fn fetch_feed(&self, feed: &Feed) -> Result<Vec<NewsItem>> {
        let resp = self
            .client
            .get(feed.url)
            .header("User-Agent", "wirepost/0.1")
            .send()
            .await
            .context("Feed fetch failed")?;

        let bytes = resp.bytes().await.context("Failed to read feed body")?;
        let parsed = feed_rs::parser::parse(&bytes[..]).context("Failed to parse RSS/Atom feed")?;
        Ok(items_from_feed(feed, parsed))
    }
}

impl Default for FeedReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsSource for FeedReader {
    async fn fetch(&self) -> Vec<NewsItem> {
        self.fetch_all().await
    }
}

/// Normalize parsed feed entries into `NewsItem`s, capped per feed.
pub fn items_from_feed(feed: &Feed, parsed: feed_rs::model::Feed) -> Vec<NewsItem> {
    parsed
        .entries
        .into_iter()
        .take(MAX_ITEMS_PER_FEED)
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

            let content = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            Some(NewsItem {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link,
                image_urls: extract_image_urls(&content),
                content,
                published_at,
                source_name: feed.name.to_string(),
                category: Some(feed.category.to_string()),
            })
        })
        .collect()
}

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img[^>]+src\s*=\s*["']([^"']+)["']"#).expect("Invalid img regex")
});
static DIRECT_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"']+\.(?:jpg|jpeg|png|gif|webp)"#)
        .expect("Invalid image URL regex")
});

/// Pull image URLs out of an entry's HTML body: `<img src>` attributes plus
/// bare image links. Order-preserving, deduplicated.
pub fn extract_image_urls(html: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for cap in IMG_SRC.captures_iter(html) {
        let src = cap[1].to_string();
        if !urls.contains(&src) {
            urls.push(src);
        }
    }
    for m in DIRECT_IMAGE_URL.find_iter(html) {
        let url = m.as_str().to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Retain items published within the recency window.
pub fn filter_recent(items: Vec<NewsItem>, window: Duration) -> Vec<NewsItem> {
    let cutoff = Utc::now() - window;
    items
        .into_iter()
        .filter(|item| item.published_at > cutoff)
        .collect()
}
