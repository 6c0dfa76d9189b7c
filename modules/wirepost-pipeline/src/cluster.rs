use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{info, warn};

use llm_client::util::{extract_json_object, truncate_to_char_boundary};
use llm_client::Completions;
use wirepost_common::{NewsItem, TopicGroup};

/// Items per model call.
pub const BATCH_SIZE: usize = 25;

/// How much of each item's content goes into the clustering prompt.
const CONTENT_SNIPPET_BYTES: usize = 200;

/// Pause between consecutive batch calls: one request slot at the given
/// requests-per-minute ceiling plus a one-second safety margin.
pub fn pause_for_rpm(rpm: u32) -> Duration {
    Duration::from_millis(60_000 / u64::from(rpm.max(1)) + 1_000)
}

/// Deterministic name for the synthetic group covering a failed batch.
pub fn fallback_group_name(batch_number: usize) -> String {
    format!("General News (Batch {batch_number})")
}

/// Groups unprocessed items into named topics via repeated bounded-size
/// model calls.
pub struct TopicClusterer<'a> {
    model: &'a dyn Completions,
    batch_size: usize,
    batch_pause: Duration,
}

impl<'a> TopicClusterer<'a> {
    /// `batch_pause` is typically [`pause_for_rpm`] of the provider's
    /// rate limit; zero disables pacing.
    pub fn new(model: &'a dyn Completions, batch_pause: Duration) -> Self {
        Self {
            model,
            batch_size: BATCH_SIZE,
            batch_pause,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Cluster items into topic groups. Never errors and never drops an
    /// item: a batch whose model call or parse fails becomes one synthetic
    /// group covering the whole batch.
    pub async fn cluster(&self, items: &[NewsItem]) -> HashMap<String, TopicGroup> {
        if items.is_empty() {
            return HashMap::new();
        }

        info!(
            items = items.len(),
            batch_size = self.batch_size,
            "Starting topic clustering"
        );

        let mut groups: HashMap<String, TopicGroup> = HashMap::new();
        let batches: Vec<&[NewsItem]> = items.chunks(self.batch_size).collect();
        let batch_count = batches.len();

        for (ordinal, batch) in batches.into_iter().enumerate() {
            let batch_number = ordinal + 1;
            match self.cluster_batch(batch, batch_number).await {
                Ok(labeled) => {
                    for (label, batch_items) in labeled {
                        groups
                            .entry(label.clone())
                            .or_insert_with(|| TopicGroup::new(label))
                            .extend_unique(batch_items);
                    }
                }
                Err(e) => {
                    let name = fallback_group_name(batch_number);
                    warn!(
                        batch = batch_number,
                        error = %e,
                        fallback = name.as_str(),
                        "Batch clustering failed, grouping whole batch under fallback topic"
                    );
                    groups
                        .entry(name.clone())
                        .or_insert_with(|| TopicGroup::new(name))
                        .extend_unique(batch.iter().cloned());
                }
            }

            // Pace calls to stay under the provider's rate limit. No pause
            // after the final batch.
            if batch_number < batch_count && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        info!(topics = groups.len(), "Finished topic clustering");
        groups
    }

    async fn cluster_batch(
        &self,
        batch: &[NewsItem],
        batch_number: usize,
    ) -> Result<Vec<(String, Vec<NewsItem>)>> {
        let prompt = build_batch_prompt(batch, batch_number);
        let completion = self.model.complete(&prompt, 0.3).await?;
        parse_grouping(&completion, batch)
    }
}

fn build_batch_prompt(batch: &[NewsItem], batch_number: usize) -> String {
    let listing = batch
        .iter()
        .enumerate()
        .map(|(index, item)| {
            format!(
                "{index}: {}\n{}...",
                item.title,
                truncate_to_char_boundary(&item.content, CONTENT_SNIPPET_BYTES)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze the following news items (batch {batch_number}) and group them by similar topics or themes.\n\
         Return a JSON object where keys are topic names and values are arrays of indices of related news items from THIS BATCH.\n\n\
         News items (batch):\n{listing}\n\n\
         Important: Use indices from the batch list provided (0 to {max_index}).\n\
         Return only valid JSON like: {{\"AI Innovation\": [0, 2, 5], \"Cloud Computing\": [1, 3]}}",
        max_index = batch.len().saturating_sub(1)
    )
}

/// Map a raw completion back to labeled item lists. Labels are trimmed,
/// out-of-range indices dropped silently, non-array values skipped.
fn parse_grouping(completion: &str, batch: &[NewsItem]) -> Result<Vec<(String, Vec<NewsItem>)>> {
    let json =
        extract_json_object(completion).ok_or_else(|| anyhow!("no JSON object in completion"))?;
    let value: Value = serde_json::from_str(json)?;
    let map = value
        .as_object()
        .ok_or_else(|| anyhow!("grouping is not a JSON object"))?;

    let mut labeled = Vec::new();
    for (raw_label, indices) in map {
        let Some(indices) = indices.as_array() else {
            continue;
        };
        let items: Vec<NewsItem> = indices
            .iter()
            .filter_map(|v| v.as_u64())
            .filter_map(|i| batch.get(i as usize).cloned())
            .collect();

        let label = raw_label.trim();
        if !label.is_empty() && !items.is_empty() {
            labeled.push((label.to_string(), items));
        }
    }
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{link_set, news_item, MockCompletions};
    use std::collections::HashSet;

    fn clusterer(model: &MockCompletions) -> TopicClusterer<'_> {
        TopicClusterer::new(model, Duration::ZERO)
    }

    #[tokio::test]
    async fn empty_input_makes_no_model_calls() {
        let model = MockCompletions::new();
        let groups = clusterer(&model).cluster(&[]).await;
        assert!(groups.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn groups_items_by_returned_indices() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
            news_item("https://example.com/c"),
        ];
        let model = MockCompletions::new().push_ok(
            "```json\n{\" AI \": [0, 2], \"Cloud\": [1], \"Ghost\": [99]}\n```",
        );

        let groups = clusterer(&model).cluster(&items).await;

        // Labels are trimmed; the out-of-range index leaves "Ghost" empty
        // and therefore absent.
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["AI"].links(), vec![
            "https://example.com/a",
            "https://example.com/c"
        ]);
        assert_eq!(groups["Cloud"].links(), vec!["https://example.com/b"]);
    }

    #[tokio::test]
    async fn same_label_across_batches_unions_without_duplicates() {
        let items: Vec<_> = (0..4)
            .map(|i| news_item(&format!("https://example.com/{i}")))
            .collect();
        let model = MockCompletions::new()
            .push_ok(r#"{"Security": [0, 1]}"#)
            .push_ok(r#"{"Security": [0, 1]}"#);

        let groups = clusterer(&model)
            .with_batch_size(2)
            .cluster(&items)
            .await;

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Security"].items.len(), 4);
    }

    #[tokio::test]
    async fn failed_batch_falls_back_and_loses_nothing() {
        // 30 items across 2 batches (B=25); batch 1's model call throws.
        let items: Vec<_> = (0..30)
            .map(|i| news_item(&format!("https://example.com/{i}")))
            .collect();
        let model = MockCompletions::new()
            .push_err("model unavailable")
            .push_ok(r#"{"AI": [0, 1, 2], "Chips": [3, 4]}"#);

        let groups = clusterer(&model).cluster(&items).await;

        let fallback = &groups[&fallback_group_name(1)];
        assert_eq!(fallback.items.len(), 25);

        let grouped: HashSet<String> = groups
            .values()
            .flat_map(|g| g.links())
            .collect();
        assert_eq!(grouped, link_set(&items));
    }

    #[tokio::test]
    async fn unparsable_completion_uses_fallback_group() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let model = MockCompletions::new().push_ok("I could not find any groupings, sorry!");

        let groups = clusterer(&model).cluster(&items).await;

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&fallback_group_name(1)].items.len(), 2);
    }

    #[tokio::test]
    async fn non_array_values_are_skipped() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let model = MockCompletions::new()
            .push_ok(r#"{"Notes": "not an array", "Tech": [0, 1]}"#);

        let groups = clusterer(&model).cluster(&items).await;

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Tech"].items.len(), 2);
    }

    #[test]
    fn pause_derives_from_rpm_with_margin() {
        assert_eq!(pause_for_rpm(5), Duration::from_millis(13_000));
        assert_eq!(pause_for_rpm(60), Duration::from_millis(2_000));
        // rpm 0 is clamped rather than dividing by zero
        assert_eq!(pause_for_rpm(0), Duration::from_millis(61_000));
    }

    #[test]
    fn prompt_mentions_batch_bounds() {
        let items = vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ];
        let prompt = build_batch_prompt(&items, 3);
        assert!(prompt.contains("batch 3"));
        assert!(prompt.contains("(0 to 1)"));
    }
}
