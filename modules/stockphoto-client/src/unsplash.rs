use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, StockPhotoError};
use crate::types::StockPhoto;
use crate::{per_page, ImageSearcher};

const UNSPLASH_API_URL: &str = "https://api.unsplash.com";
const UNSPLASH_MAX_PER_PAGE: usize = 30;

pub struct UnsplashClient {
    client: reqwest::Client,
    access_key: Option<String>,
    base_url: String,
}

impl UnsplashClient {
    /// `access_key` is optional: without one the client reports itself
    /// unavailable and every search returns an empty result set.
    pub fn new(access_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_key,
            base_url: UNSPLASH_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn search_photos(&self, keywords: &[String], count: usize) -> Result<Vec<StockPhoto>> {
        let Some(ref access_key) = self.access_key else {
            warn!("Unsplash access key not configured, skipping search");
            return Ok(Vec::new());
        };

        let query = keywords.join(" ");
        let per_page = per_page(count, UNSPLASH_MAX_PER_PAGE);

        debug!(query = %query, per_page, "Unsplash photo search");

        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .query(&[
                ("query", query.as_str()),
                ("per_page", &per_page.to_string()),
                ("orientation", "landscape"),
                ("content_filter", "high"),
                ("order_by", "relevance"),
            ])
            .header("Authorization", format!("Client-ID {access_key}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StockPhotoError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let results: SearchResponse = response.json().await?;
        Ok(results
            .results
            .into_iter()
            .map(|photo| StockPhoto {
                url: photo.urls.regular,
                alt: photo
                    .alt_description
                    .unwrap_or_else(|| format!("Image related to {query}")),
                attribution: Some(format!("Photo by {} on Unsplash", photo.user.name)),
                description: photo.description,
                tags: photo.tags.into_iter().map(|t| t.title).collect(),
            })
            .collect())
    }
}

#[async_trait]
impl ImageSearcher for UnsplashClient {
    fn provider(&self) -> &'static str {
        "unsplash"
    }

    async fn search(&self, keywords: &[String], count: usize) -> anyhow::Result<Vec<StockPhoto>> {
        Ok(self.search_photos(keywords, count).await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: PhotoUrls,
    alt_description: Option<String>,
    description: Option<String>,
    user: PhotoUser,
    #[serde(default)]
    tags: Vec<PhotoTag>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PhotoTag {
    title: String,
}
