use anyhow::Result;
use async_trait::async_trait;

/// One textual prompt in, one textual completion out.
///
/// The completion is untrusted free text: callers that expect JSON must run
/// it through [`crate::util::extract_json_object`] before parsing and keep a
/// deterministic fallback for unparsable responses.
#[async_trait]
pub trait Completions: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}
