use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use wirepost_common::GeneratedImage;

const LINKEDIN_API_URL: &str = "https://api.linkedin.com/v2";

/// A finished post ready for the platform.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub text: String,
    /// Not attached to the share yet; kept for logging and future media
    /// upload support.
    pub image: Option<GeneratedImage>,
}

#[derive(Debug, Clone)]
pub struct PublishedPost {
    pub id: String,
    pub url: String,
}

/// Terminal side effect of a pipeline run.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost>;
}

/// Publishes text shares through the LinkedIn UGC posts API.
pub struct LinkedInPublisher {
    client: reqwest::Client,
    access_token: String,
    person_urn: String,
    base_url: Option<String>,
}

impl LinkedInPublisher {
    pub fn new(access_token: String, person_urn: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            person_urn,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(LINKEDIN_API_URL)
    }
}

#[async_trait]
impl Publisher for LinkedInPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost> {
        let payload = json!({
            "author": self.person_urn,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": request.text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let response = self
            .client
            .post(format!("{}/ugcPosts", self.base_url()))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .context("LinkedIn request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("LinkedIn API error ({status}): {body}"));
        }

        let id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("LinkedIn response missing x-restli-id header"))?;

        let url = format!("https://www.linkedin.com/feed/update/{id}");
        info!(post_id = id.as_str(), "Published post");
        Ok(PublishedPost { id, url })
    }
}
