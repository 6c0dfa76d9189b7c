use std::sync::LazyLock;

use anyhow::{Context, Result};
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use llm_client::util::{extract_json_object, truncate_to_char_boundary};
use llm_client::Completions;
use wirepost_common::TopicGroup;

use crate::prompts::{random_prompt, PostPrompt};

/// Posts longer than this get a condensing pass.
pub const MAX_POST_CHARS: usize = 2800;
const SHORTEN_MIN_CHARS: usize = 1500;
const SHORTEN_MAX_CHARS: usize = 1800;

/// How much of each article body goes into the composition context.
const CONTEXT_SNIPPET_BYTES: usize = 300;

/// Topics attached when the model's answer cannot be parsed.
const DEFAULT_TOPICS: [&str; 2] = ["Technology", "Innovation"];

#[derive(Debug, Clone)]
pub struct ComposedPost {
    pub text: String,
    pub topics: Vec<String>,
    pub style: &'static str,
}

#[derive(Deserialize)]
struct ModelPost {
    #[serde(rename = "linkedinPost")]
    linkedin_post: String,
    #[serde(default)]
    topics: Vec<String>,
}

/// Turns a selected topic group into publishable post text.
pub struct PostComposer<'a> {
    model: &'a dyn Completions,
}

impl<'a> PostComposer<'a> {
    pub fn new(model: &'a dyn Completions) -> Self {
        Self { model }
    }

    /// Compose a post for the topic using a randomly drawn style template.
    /// A malformed model answer degrades to the cleaned raw text; a failed
    /// model call is an error.
    pub async fn compose<R: Rng>(
        &self,
        topic_name: &str,
        group: &TopicGroup,
        rng: &mut R,
    ) -> Result<ComposedPost> {
        let prompt = random_prompt(rng);
        let request = build_request(prompt, topic_name, group);

        let completion = self
            .model
            .complete(&request, 0.7)
            .await
            .context("Post composition call failed")?;

        let (text, topics) = match parse_post(&completion) {
            Some((text, topics)) => (text, topics),
            None => {
                warn!(
                    topic = topic_name,
                    "Unstructured composition response, using raw text"
                );
                (
                    completion,
                    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
                )
            }
        };

        let text = clean_post_text(&text);
        let text = self.shorten_if_needed(text).await;

        info!(
            topic = topic_name,
            style = prompt.style,
            chars = text.chars().count(),
            "Composed post"
        );
        Ok(ComposedPost {
            text,
            topics,
            style: prompt.style,
        })
    }

    /// Condense an over-long post into the target range. The original text
    /// survives a failed condensing call.
    async fn shorten_if_needed(&self, text: String) -> String {
        let length = text.chars().count();
        if length <= MAX_POST_CHARS {
            return text;
        }

        let request = format!(
            "Condense the following LinkedIn post to between {SHORTEN_MIN_CHARS} and \
             {SHORTEN_MAX_CHARS} characters. Preserve the voice, the key points, the call \
             to action, and all existing line breaks between paragraphs. Return only the \
             condensed post text.\n\n{text}"
        );
        match self.model.complete(&request, 0.5).await {
            Ok(shortened) => {
                let shortened = clean_post_text(&shortened);
                info!(
                    from = length,
                    to = shortened.chars().count(),
                    "Condensed over-long post"
                );
                shortened
            }
            Err(e) => {
                warn!(error = %e, chars = length, "Condensing call failed, keeping long post");
                text
            }
        }
    }
}

fn build_request(prompt: &PostPrompt, topic_name: &str, group: &TopicGroup) -> String {
    let digest = group
        .items
        .iter()
        .map(|item| {
            format!(
                "Title: {}\nSource: {}\nSummary: {}\nLink: {}",
                item.title,
                item.source_name,
                truncate_to_char_boundary(&item.content, CONTEXT_SNIPPET_BYTES),
                item.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let context = format!("Topic: {topic_name}\n\n{digest}");

    format!(
        "{}\n\nReturn only valid JSON like: {{\"linkedinPost\": \"the post text\", \"topics\": [\"topic1\", \"topic2\"]}}",
        prompt.template.replace("{context}", &context)
    )
}

fn parse_post(completion: &str) -> Option<(String, Vec<String>)> {
    let json = extract_json_object(completion)?;
    let parsed: ModelPost = serde_json::from_str(json).ok()?;
    if parsed.linkedin_post.trim().is_empty() {
        return None;
    }
    Some((parsed.linkedin_post, parsed.topics))
}

static HASHTAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("Invalid hashtag regex"));

/// Strip formatting the target platform renders poorly: hashtags, bold
/// markers, stray indentation.
pub fn clean_post_text(text: &str) -> String {
    let text = HASHTAGS.replace_all(text, "");
    let text = text.replace("**", "");
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{news_item, MockCompletions};

    fn sample_group() -> TopicGroup {
        let mut group = TopicGroup::new("AI".to_string());
        group.extend_unique(vec![
            news_item("https://example.com/a"),
            news_item("https://example.com/b"),
        ]);
        group
    }

    #[tokio::test]
    async fn parses_structured_response() {
        let model = MockCompletions::new().push_ok(
            r#"{"linkedinPost": "Big week for AI.\n\nWhat do you think?", "topics": ["AI", "ML"]}"#,
        );

        let post = PostComposer::new(&model)
            .compose("AI", &sample_group(), &mut rand::rng())
            .await
            .unwrap();

        assert_eq!(post.text, "Big week for AI.\n\nWhat do you think?");
        assert_eq!(post.topics, vec!["AI", "ML"]);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn unstructured_response_degrades_to_cleaned_text() {
        let model =
            MockCompletions::new().push_ok("Big week for **AI**. #ai #technology \n  Thoughts?");

        let post = PostComposer::new(&model)
            .compose("AI", &sample_group(), &mut rand::rng())
            .await
            .unwrap();

        assert_eq!(post.text, "Big week for AI.\nThoughts?");
        assert_eq!(post.topics, vec!["Technology", "Innovation"]);
    }

    #[tokio::test]
    async fn over_long_post_gets_a_condensing_pass() {
        let long_text = "word ".repeat(700); // ~3500 chars
        let model = MockCompletions::new()
            .push_ok(&format!(r#"{{"linkedinPost": "{long_text}", "topics": ["AI"]}}"#))
            .push_ok("Condensed version of the post.");

        let post = PostComposer::new(&model)
            .compose("AI", &sample_group(), &mut rand::rng())
            .await
            .unwrap();

        assert_eq!(post.text, "Condensed version of the post.");
        assert_eq!(model.calls(), 2);

        // The condensing request must keep paragraph structure intact.
        assert!(model.prompts()[1].contains("line breaks"));
    }

    #[tokio::test]
    async fn failed_condensing_keeps_the_long_post() {
        let long_text = "word ".repeat(700);
        let model = MockCompletions::new()
            .push_ok(&format!(r#"{{"linkedinPost": "{long_text}", "topics": ["AI"]}}"#))
            .push_err("rate limited");

        let post = PostComposer::new(&model)
            .compose("AI", &sample_group(), &mut rand::rng())
            .await
            .unwrap();

        assert!(post.text.chars().count() > MAX_POST_CHARS);
    }

    #[tokio::test]
    async fn failed_composition_call_is_an_error() {
        let model = MockCompletions::new().push_err("model unavailable");
        let result = PostComposer::new(&model)
            .compose("AI", &sample_group(), &mut rand::rng())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn cleanup_strips_hashtags_and_bold() {
        let cleaned = clean_post_text("  **Bold** claim #ai \n   next line #ml  ");
        assert_eq!(cleaned, "Bold claim\nnext line");
    }

    #[test]
    fn short_posts_are_left_alone_by_cleanup() {
        assert_eq!(clean_post_text("Just a post."), "Just a post.");
    }
}
