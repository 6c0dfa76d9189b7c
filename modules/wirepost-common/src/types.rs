use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized feed entry. Immutable once ingested: downstream stages read
/// it, never mutate it, and it is discarded at the end of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Stable URL; the unique key for deduplication across runs.
    pub link: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub category: Option<String>,
    /// Image URLs found in the entry's HTML body. These are the free
    /// editorial image source for the image subsystem.
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// A set of news items judged thematically related, keyed by a canonical
/// label. Invariant: no two items share a `link`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicGroup {
    pub name: String,
    pub items: Vec<NewsItem>,
}

impl TopicGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Append items whose link is not already present, preserving order.
    pub fn extend_unique(&mut self, items: impl IntoIterator<Item = NewsItem>) {
        for item in items {
            if !self.items.iter().any(|existing| existing.link == item.link) {
                self.items.push(item);
            }
        }
    }

    pub fn links(&self) -> Vec<String> {
        self.items.iter().map(|i| i.link.clone()).collect()
    }
}

/// Which image source served a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSourceKind {
    /// Free: an image embedded in a fetched feed entry.
    Editorial,
    /// Paid-API: a stock photo provider (Unsplash or Pexels).
    Stock,
}

impl ImageSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSourceKind::Editorial => "editorial",
            ImageSourceKind::Stock => "stock",
        }
    }
}

/// A candidate or selected image. `relevance_score` is attached by the
/// scorer and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub alt_text: String,
    pub source_kind: ImageSourceKind,
    pub attribution: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub relevance_score: Option<f32>,
    /// Set for editorial images: which feed the image came from.
    pub feed_name: Option<String>,
    /// Set for editorial images: the article the image illustrates.
    pub article_url: Option<String>,
}

/// Snapshot of image-source usage counters.
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_runs: u64,
    pub editorial_usage: u64,
    pub stock_usage: u64,
    pub editorial_percentage: f64,
    pub stock_percentage: f64,
    pub next_source: ImageSourceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str) -> NewsItem {
        NewsItem {
            title: format!("title for {link}"),
            link: link.to_string(),
            content: String::new(),
            published_at: Utc::now(),
            source_name: "Test Feed".to_string(),
            category: None,
            image_urls: Vec::new(),
        }
    }

    #[test]
    fn extend_unique_dedups_by_link() {
        let mut group = TopicGroup::new("AI");
        group.extend_unique(vec![item("a"), item("b")]);
        group.extend_unique(vec![item("b"), item("c")]);
        assert_eq!(group.links(), vec!["a", "b", "c"]);
    }

    #[test]
    fn extend_unique_preserves_first_occurrence() {
        let mut group = TopicGroup::new("Cloud");
        let mut first = item("x");
        first.title = "first".to_string();
        let mut second = item("x");
        second.title = "second".to_string();
        group.extend_unique(vec![first, second]);
        assert_eq!(group.items.len(), 1);
        assert_eq!(group.items[0].title, "first");
    }
}
