//! In-memory doubles for the pipeline's seams, plus fixture helpers.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use llm_client::Completions;
use stockphoto_client::{ImageSearcher, StockPhoto};
use wirepost_common::NewsItem;

use crate::feeds::NewsSource;
use crate::ledger::LinkLedger;
use crate::publish::{PublishRequest, PublishedPost, Publisher};

/// A news item with a distinct link, published an hour ago.
pub fn news_item(link: &str) -> NewsItem {
    news_item_aged(link, 1)
}

/// A news item published `age_hours` ago.
pub fn news_item_aged(link: &str, age_hours: i64) -> NewsItem {
    NewsItem {
        title: format!("Story at {link}"),
        link: link.to_string(),
        content: "Something happened in the industry today.".to_string(),
        published_at: Utc::now() - Duration::hours(age_hours),
        source_name: "Test Feed".to_string(),
        category: Some("tech".to_string()),
        image_urls: Vec::new(),
    }
}

/// The set of links across a slice of items.
pub fn link_set(items: &[NewsItem]) -> HashSet<String> {
    items.iter().map(|i| i.link.clone()).collect()
}

/// A fixed batch of items standing in for live feeds.
pub struct StaticNewsSource {
    items: Vec<NewsItem>,
}

impl StaticNewsSource {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl NewsSource for StaticNewsSource {
    async fn fetch(&self) -> Vec<NewsItem> {
        self.items.clone()
    }
}

/// Scripted text-completion model. Responses are popped in push order; an
/// exhausted script errors, which surfaces as a model failure upstream.
pub struct MockCompletions {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletions {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(self, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(response.to_string()));
        self
    }

    pub fn push_err(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockCompletions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Completions for MockCompletions {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("mock completions script exhausted")),
        }
    }
}

/// HashSet-backed ledger.
pub struct MemoryLedger {
    links: Mutex<HashSet<String>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            links: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_seen(links: &[&str]) -> Self {
        Self {
            links: Mutex::new(links.iter().map(|l| l.to_string()).collect()),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkLedger for MemoryLedger {
    async fn seen_links(&self) -> Result<HashSet<String>> {
        Ok(self.links.lock().unwrap().clone())
    }

    async fn mark_seen(&self, links: &[String]) -> Result<()> {
        let mut seen = self.links.lock().unwrap();
        for link in links {
            seen.insert(link.clone());
        }
        Ok(())
    }
}

/// Canned image search provider that records every query it receives.
pub struct MockImageSearcher {
    provider: &'static str,
    results: Mutex<VecDeque<Result<Vec<StockPhoto>, String>>>,
    queries: Mutex<Vec<Vec<String>>>,
}

impl MockImageSearcher {
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            results: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn push_results(self, photos: Vec<StockPhoto>) -> Self {
        self.results.lock().unwrap().push_back(Ok(photos));
        self
    }

    pub fn push_err(self, message: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Keyword lists received, in call order.
    pub fn queries(&self) -> Vec<Vec<String>> {
        self.queries.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageSearcher for MockImageSearcher {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn search(&self, keywords: &[String], _count: usize) -> Result<Vec<StockPhoto>> {
        self.queries.lock().unwrap().push(keywords.to_vec());
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(photos)) => Ok(photos),
            Some(Err(message)) => Err(anyhow!("{message}")),
            // No scripted result means the provider has nothing to offer.
            None => Ok(Vec::new()),
        }
    }
}

/// A stock photo with the given alt text and a distinct URL.
pub fn stock_photo(alt: &str) -> StockPhoto {
    StockPhoto {
        url: format!("https://images.example/{}", alt.replace(' ', "-")),
        alt: alt.to_string(),
        attribution: Some("Photo by Test on Example".to_string()),
        description: None,
        tags: Vec::new(),
    }
}

/// Publisher double that records requests and optionally fails.
pub struct MockPublisher {
    fail_with: Option<String>,
    requests: Mutex<Vec<PublishRequest>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.fail_with {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(PublishedPost {
                id: "urn:li:share:test".to_string(),
                url: "https://www.linkedin.com/feed/update/urn:li:share:test".to_string(),
            }),
        }
    }
}
