use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::Duration;
use rand::Rng;
use tracing::{info, warn};

use llm_client::Completions;
use wirepost_common::{GeneratedImage, WirepostError};

use crate::cluster::{pause_for_rpm, TopicClusterer};
use crate::compose::PostComposer;
use crate::feeds::{filter_recent, NewsSource};
use crate::images::ImagePicker;
use crate::ledger::LinkLedger;
use crate::merge::TopicMerger;
use crate::publish::{PublishRequest, Publisher};
use crate::select::{select_topic, MIN_GROUP_SIZE};

/// What a pipeline run ended with.
#[derive(Debug)]
pub enum Outcome {
    Posted {
        topic: String,
        post_text: String,
        post_url: String,
        image: Option<GeneratedImage>,
        used_links: usize,
    },
    /// A clean exit with nothing published. Not an error.
    NothingToDo(String),
}

/// One end-to-end run: ingest, cluster, compose, illustrate, publish.
pub struct Pipeline {
    source: Arc<dyn NewsSource>,
    ledger: Arc<dyn LinkLedger>,
    model: Arc<dyn Completions>,
    picker: ImagePicker,
    publisher: Arc<dyn Publisher>,
    recency: Duration,
    batch_pause: StdDuration,
    image_count: usize,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn NewsSource>,
        ledger: Arc<dyn LinkLedger>,
        model: Arc<dyn Completions>,
        picker: ImagePicker,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            source,
            ledger,
            model,
            picker,
            publisher,
            recency: Duration::hours(72),
            batch_pause: pause_for_rpm(5),
            image_count: 1,
        }
    }

    pub fn with_recency_hours(mut self, hours: i64) -> Self {
        self.recency = Duration::hours(hours);
        self
    }

    pub fn with_model_rpm(mut self, rpm: u32) -> Self {
        self.batch_pause = pause_for_rpm(rpm);
        self
    }

    /// Direct pause override, for tests.
    pub fn with_batch_pause(mut self, pause: StdDuration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_image_count(mut self, count: usize) -> Self {
        self.image_count = count;
        self
    }

    pub async fn run<R: Rng>(&self, rng: &mut R) -> Result<Outcome> {
        let fetched = self.source.fetch().await;
        let recent = filter_recent(fetched, self.recency);
        info!(items = recent.len(), "Fetched recent items");

        let seen = self
            .ledger
            .seen_links()
            .await
            .map_err(|e| WirepostError::Ledger(e.to_string()))?;
        let unprocessed = dedup_unseen(recent, &seen);
        if unprocessed.len() < MIN_GROUP_SIZE {
            return Ok(Outcome::NothingToDo(format!(
                "only {} unprocessed items, need at least {MIN_GROUP_SIZE}",
                unprocessed.len()
            )));
        }
        info!(items = unprocessed.len(), "Items left after ledger filter");

        let clusterer = TopicClusterer::new(self.model.as_ref(), self.batch_pause);
        let groups = clusterer.cluster(&unprocessed).await;
        let groups = TopicMerger::new(self.model.as_ref()).merge(groups).await;

        let Some((topic, group)) = select_topic(&groups, rng) else {
            return Ok(Outcome::NothingToDo(
                "no topic reached the minimum group size".to_string(),
            ));
        };

        let post = PostComposer::new(self.model.as_ref())
            .compose(&topic, &group, rng)
            .await
            .map_err(|e| WirepostError::Model(e.to_string()))?;

        // Best-effort illustration. A post without an image still goes out.
        let keywords = image_keywords(&topic, &post.topics);
        let images = self
            .picker
            .pick(&group.items, &post.text, &keywords, self.image_count)
            .await;
        if images.is_empty() {
            warn!(topic = topic.as_str(), "Publishing without an image");
        }

        let request = PublishRequest {
            text: post.text.clone(),
            image: images.first().cloned(),
        };
        let published = self
            .publisher
            .publish(&request)
            .await
            .map_err(|e| WirepostError::Publish(e.to_string()))?;

        // Only a successful publish consumes the items. A failed run leaves
        // them eligible for the next one.
        let used = group.links();
        self.ledger
            .mark_seen(&used)
            .await
            .map_err(|e| WirepostError::Ledger(e.to_string()))?;

        Ok(Outcome::Posted {
            topic,
            post_text: post.text,
            post_url: published.url,
            image: images.into_iter().next(),
            used_links: used.len(),
        })
    }
}

/// Drop items already in the ledger and same-run duplicates, preserving
/// order of first appearance.
fn dedup_unseen(
    items: Vec<wirepost_common::NewsItem>,
    seen: &HashSet<String>,
) -> Vec<wirepost_common::NewsItem> {
    let mut links = HashSet::new();
    items
        .into_iter()
        .filter(|item| !seen.contains(&item.link) && links.insert(item.link.clone()))
        .collect()
}

/// Search terms for the image subsystem: the topic label plus whatever
/// topics the composer attached.
fn image_keywords(topic: &str, topics: &[String]) -> Vec<String> {
    let mut keywords = vec![topic.to_string()];
    for t in topics {
        if !keywords.iter().any(|k| k.eq_ignore_ascii_case(t)) {
            keywords.push(t.clone());
        }
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::SourceBalancer;
    use crate::testing::{
        news_item, news_item_aged, MemoryLedger, MockCompletions, MockImageSearcher,
        MockPublisher, StaticNewsSource,
    };

    struct Harness {
        ledger: Arc<MemoryLedger>,
        model: Arc<MockCompletions>,
        publisher: Arc<MockPublisher>,
        pipeline: Pipeline,
    }

    fn harness(
        items: Vec<wirepost_common::NewsItem>,
        ledger: MemoryLedger,
        model: MockCompletions,
        publisher: MockPublisher,
    ) -> Harness {
        let ledger = Arc::new(ledger);
        let model = Arc::new(model);
        let publisher = Arc::new(publisher);
        let picker = ImagePicker::new(
            Arc::new(MockImageSearcher::new("unsplash")),
            Arc::new(MockImageSearcher::new("pexels")),
            Arc::new(SourceBalancer::new()),
        );
        let pipeline = Pipeline::new(
            Arc::new(StaticNewsSource::new(items)),
            ledger.clone(),
            model.clone(),
            picker,
            publisher.clone(),
        )
        .with_batch_pause(StdDuration::ZERO);
        Harness {
            ledger,
            model,
            publisher,
            pipeline,
        }
    }

    const POST_RESPONSE: &str =
        r#"{"linkedinPost": "Big week in cloud.", "topics": ["Cloud", "Infrastructure"]}"#;

    #[tokio::test]
    async fn full_run_publishes_and_marks_the_group_seen() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
            news_item("https://example.com/c"),
        ];
        let h = harness(
            items,
            MemoryLedger::new(),
            MockCompletions::new()
                .push_ok(r#"{"Cloud": [0, 1, 2]}"#)
                .push_ok(POST_RESPONSE),
            MockPublisher::new(),
        );

        let outcome = h.pipeline.run(&mut rand::rng()).await.unwrap();

        let Outcome::Posted {
            topic,
            post_text,
            used_links,
            ..
        } = outcome
        else {
            panic!("expected a published post");
        };
        assert_eq!(topic, "Cloud");
        assert_eq!(post_text, "Big week in cloud.");
        assert_eq!(used_links, 3);

        // One clustering call, one composition call; a single group skips
        // the merge call.
        assert_eq!(h.model.calls(), 2);
        assert_eq!(h.publisher.requests().len(), 1);
        assert_eq!(h.ledger.seen_links().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn already_seen_items_lead_to_nothing_to_do() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let h = harness(
            items,
            MemoryLedger::with_seen(&["https://example.com/a", "https://example.com/b"]),
            MockCompletions::new(),
            MockPublisher::new(),
        );

        let outcome = h.pipeline.run(&mut rand::rng()).await.unwrap();

        assert!(matches!(outcome, Outcome::NothingToDo(_)));
        assert_eq!(h.model.calls(), 0);
        assert!(h.publisher.requests().is_empty());
    }

    #[tokio::test]
    async fn stale_items_never_reach_the_model() {
        let items = vec![
            news_item_aged("https://example.com/old1", 200),
            news_item_aged("https://example.com/old2", 300),
        ];
        let h = harness(
            items,
            MemoryLedger::new(),
            MockCompletions::new(),
            MockPublisher::new(),
        );

        let outcome = h.pipeline.run(&mut rand::rng()).await.unwrap();

        assert!(matches!(outcome, Outcome::NothingToDo(_)));
        assert_eq!(h.model.calls(), 0);
    }

    #[tokio::test]
    async fn all_singleton_groups_publish_nothing() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let h = harness(
            items,
            MemoryLedger::new(),
            MockCompletions::new().push_ok(r#"{"One": [0], "Other": [1]}"#).push_ok(r#"{}"#),
            MockPublisher::new(),
        );

        let outcome = h.pipeline.run(&mut rand::rng()).await.unwrap();

        assert!(matches!(outcome, Outcome::NothingToDo(_)));
        assert!(h.publisher.requests().is_empty());
        assert!(h.ledger.seen_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_leaves_the_ledger_untouched() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let h = harness(
            items,
            MemoryLedger::new(),
            MockCompletions::new()
                .push_ok(r#"{"Cloud": [0, 1]}"#)
                .push_ok(POST_RESPONSE),
            MockPublisher::failing("expired token"),
        );

        let result = h.pipeline.run(&mut rand::rng()).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WirepostError>(),
            Some(WirepostError::Publish(_))
        ));
        assert!(h.ledger.seen_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_links_across_feeds_collapse_before_clustering() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let h = harness(
            items,
            MemoryLedger::new(),
            MockCompletions::new()
                .push_ok(r#"{"Cloud": [0, 1]}"#)
                .push_ok(POST_RESPONSE),
            MockPublisher::new(),
        );

        let outcome = h.pipeline.run(&mut rand::rng()).await.unwrap();

        let Outcome::Posted { used_links, .. } = outcome else {
            panic!("expected a published post");
        };
        assert_eq!(used_links, 2);
    }

    #[test]
    fn image_keywords_combine_topic_and_model_topics() {
        let keywords = image_keywords("Cloud", &["cloud".to_string(), "Kubernetes".to_string()]);
        assert_eq!(keywords, vec!["Cloud", "Kubernetes"]);
    }
}
