use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, StockPhotoError};
use crate::types::StockPhoto;
use crate::{per_page, ImageSearcher};

const PEXELS_API_URL: &str = "https://api.pexels.com/v1";
const PEXELS_MAX_PER_PAGE: usize = 80;

pub struct PexelsClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl PexelsClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: PEXELS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn search_photos(&self, keywords: &[String], count: usize) -> Result<Vec<StockPhoto>> {
        let Some(ref api_key) = self.api_key else {
            warn!("Pexels API key not configured, skipping search");
            return Ok(Vec::new());
        };

        let query = keywords.join(" ");
        let per_page = per_page(count, PEXELS_MAX_PER_PAGE);

        debug!(query = %query, per_page, "Pexels photo search");

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("query", query.as_str()),
                ("per_page", &per_page.to_string()),
                ("orientation", "landscape"),
            ])
            .header("Authorization", api_key)
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
            .photos
            .into_iter()
            .map(|photo| {
                let alt = photo
                    .alt
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| format!("Image related to {query}"));
                StockPhoto {
                    url: photo.src.large,
                    // Pexels has no separate description field; the alt text
                    // doubles as one for relevance scoring.
                    description: Some(alt.clone()),
                    alt,
                    attribution: Some(format!("Photo by {} on Pexels", photo.photographer)),
                    tags: Vec::new(),
                }
            })
            .collect())
    }
}

#[async_trait]
impl ImageSearcher for PexelsClient {
    fn provider(&self) -> &'static str {
        "pexels"
    }

    async fn search(&self, keywords: &[String], count: usize) -> anyhow::Result<Vec<StockPhoto>> {
        Ok(self.search_photos(keywords, count).await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PhotoSrc,
    alt: Option<String>,
    photographer: String,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    large: String,
}
