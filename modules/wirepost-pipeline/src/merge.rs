use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{info, warn};

use llm_client::util::extract_json_object;
use llm_client::Completions;
use wirepost_common::TopicGroup;

/// Collapses near-duplicate topic labels from independent clustering
/// batches into canonical ones with a single model call.
pub struct TopicMerger<'a> {
    model: &'a dyn Completions,
}

impl<'a> TopicMerger<'a> {
    pub fn new(model: &'a dyn Completions) -> Self {
        Self { model }
    }

    /// Merge similar topics. On model or parse failure the input map is
    /// returned unchanged; items are only ever regrouped, never invented
    /// or dropped.
    pub async fn merge(
        &self,
        groups: HashMap<String, TopicGroup>,
    ) -> HashMap<String, TopicGroup> {
        if groups.len() < 2 {
            return groups;
        }

        let prompt = build_merge_prompt(&groups);
        let mapping = match self.model.complete(&prompt, 0.3).await {
            Ok(completion) => match parse_merge_mapping(&completion) {
                Ok(mapping) => mapping,
                Err(e) => {
                    warn!(error = %e, "Unparsable merge response, keeping topics as-is");
                    return groups;
                }
            },
            Err(e) => {
                warn!(error = %e, "Topic merge call failed, keeping topics as-is");
                return groups;
            }
        };

        let before = groups.len();
        let merged = apply_merge_mapping(groups, &mapping);
        info!(before, after = merged.len(), "Merged similar topics");
        merged
    }
}

fn build_merge_prompt(groups: &HashMap<String, TopicGroup>) -> String {
    let mut labels: Vec<&String> = groups.keys().collect();
    labels.sort();
    let listing = labels
        .iter()
        .map(|label| format!("- {label} ({} items)", groups[*label].items.len()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "The following topic names came from clustering separate batches of news items, so some of them describe the same theme under different wording.\n\n\
         Topics:\n{listing}\n\n\
         Merge topics that describe the same theme. Return a JSON object mapping each canonical topic name to an array of the original topic names it absorbs (including itself). Leave distinct topics out.\n\
         Return only valid JSON like: {{\"AI and Machine Learning\": [\"AI Innovation\", \"Machine Learning News\"]}}"
    )
}

/// Canonical label to original labels. Accepts both a flat mapping and one
/// wrapped in a `canonicalTopics` key.
fn parse_merge_mapping(completion: &str) -> Result<HashMap<String, Vec<String>>> {
    let json =
        extract_json_object(completion).ok_or_else(|| anyhow!("no JSON object in completion"))?;
    let value: Value = serde_json::from_str(json)?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("merge mapping is not a JSON object"))?;
    let object = match object.get("canonicalTopics").and_then(|v| v.as_object()) {
        Some(inner) => inner,
        None => object,
    };

    let mut mapping = HashMap::new();
    for (canonical, originals) in object {
        let Some(originals) = originals.as_array() else {
            continue;
        };
        let originals: Vec<String> = originals
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let canonical = canonical.trim();
        if !canonical.is_empty() && !originals.is_empty() {
            mapping.insert(canonical.to_string(), originals);
        }
    }
    Ok(mapping)
}

/// Regroup items under canonical labels. Original labels the mapping never
/// mentions pass through untouched; labels it mentions but that do not
/// exist are ignored.
fn apply_merge_mapping(
    mut groups: HashMap<String, TopicGroup>,
    mapping: &HashMap<String, Vec<String>>,
) -> HashMap<String, TopicGroup> {
    let mut merged: HashMap<String, TopicGroup> = HashMap::new();

    for (canonical, originals) in mapping {
        let mut combined = TopicGroup::new(canonical.clone());
        for original in originals {
            if let Some(group) = groups.remove(original) {
                combined.extend_unique(group.items);
            }
        }
        if !combined.items.is_empty() {
            merged
                .entry(canonical.clone())
                .or_insert_with(|| TopicGroup::new(canonical.clone()))
                .extend_unique(combined.items);
        }
    }

    // Whatever the mapping left alone survives under its original name.
    for (label, group) in groups {
        merged
            .entry(label)
            .or_insert_with(|| TopicGroup::new(group.name.clone()))
            .extend_unique(group.items);
    }

    merged
}
