use std::sync::Arc;

use tracing::{info, warn};

use stockphoto_client::{ImageSearcher, StockPhoto};
use wirepost_common::{GeneratedImage, ImageSourceKind, NewsItem};

use super::balancer::SourceBalancer;
use super::feed_images;
use super::scorer::{score_and_rank, LOW_RELEVANCE_THRESHOLD};

/// Generic fallback search terms for when the topic keywords find nothing
/// usable on the primary provider. Coarse substring checks on the post
/// text add a hint of its domain to the generic base.
pub fn broaden_keywords(post_text: &str) -> Vec<String> {
    let mut broadened: Vec<String> = ["business", "professional", "technology"]
        .iter()
        .map(|k| k.to_string())
        .collect();

    let text = post_text.to_lowercase();
    if text.contains("tech") || text.contains("software") || text.contains("ai ") {
        broadened.push("innovation".to_string());
    }
    if text.contains("career") || text.contains("job") {
        broadened.push("workplace".to_string());
    }
    if text.contains("team") || text.contains("culture") {
        broadened.push("collaboration".to_string());
    }
    broadened
}

/// Picks images for a post, balancing the free editorial source against
/// the stock photo providers and cascading between providers when results
/// are weak.
pub struct ImagePicker {
    primary: Arc<dyn ImageSearcher>,
    secondary: Arc<dyn ImageSearcher>,
    balancer: Arc<SourceBalancer>,
}

impl ImagePicker {
    pub fn new(
        primary: Arc<dyn ImageSearcher>,
        secondary: Arc<dyn ImageSearcher>,
        balancer: Arc<SourceBalancer>,
    ) -> Self {
        Self {
            primary,
            secondary,
            balancer,
        }
    }

    /// Select up to `count` images for the post. Best-effort throughout:
    /// an empty result is a valid outcome, never an error. Usage is
    /// recorded only when at least one image was actually selected.
    pub async fn pick(
        &self,
        items: &[NewsItem],
        post_text: &str,
        keywords: &[String],
        count: usize,
    ) -> Vec<GeneratedImage> {
        if count == 0 {
            return Vec::new();
        }

        let editorial_first = self.balancer.prefer_editorial();
        if editorial_first {
            let picked = pick_editorial(items, post_text, keywords, count);
            if !picked.is_empty() {
                self.balancer.record_usage(ImageSourceKind::Editorial);
                return picked;
            }
            info!("No editorial images available, falling back to stock providers");
        }

        let picked = self.pick_stock(post_text, keywords, count).await;
        if !picked.is_empty() {
            self.balancer.record_usage(ImageSourceKind::Stock);
            return picked;
        }

        if !editorial_first {
            let picked = pick_editorial(items, post_text, keywords, count);
            if !picked.is_empty() {
                self.balancer.record_usage(ImageSourceKind::Editorial);
                return picked;
            }
        }

        info!("No usable image found from any source");
        Vec::new()
    }

    /// Primary provider first; weak or empty results cascade to the
    /// alternate provider with broadened keywords.
    async fn pick_stock(
        &self,
        post_text: &str,
        keywords: &[String],
        count: usize,
    ) -> Vec<GeneratedImage> {
        let mut candidates = self
            .search_scored(&*self.primary, post_text, keywords, count)
            .await;

        let best = candidates
            .first()
            .and_then(|image| image.relevance_score)
            .unwrap_or(0.0);
        if best < LOW_RELEVANCE_THRESHOLD {
            let broadened = broaden_keywords(post_text);
            info!(
                provider = self.secondary.provider(),
                best_score = best,
                "Weak primary results, trying alternate provider with broadened keywords"
            );
            let alternates = self
                .search_scored(&*self.secondary, post_text, &broadened, count)
                .await;
            candidates.extend(alternates);
            candidates.sort_by(|a, b| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        candidates.truncate(count);
        candidates
    }

    async fn search_scored(
        &self,
        provider: &dyn ImageSearcher,
        post_text: &str,
        keywords: &[String],
        count: usize,
    ) -> Vec<GeneratedImage> {
        match provider.search(keywords, count).await {
            Ok(photos) => {
                let images = photos.into_iter().map(stock_to_image).collect();
                score_and_rank(images, post_text, keywords)
            }
            Err(e) => {
                warn!(provider = provider.provider(), error = %e, "Image search failed");
                Vec::new()
            }
        }
    }
}

/// Editorial candidates ranked by relevance. No score threshold here: the
/// source is free and an on-topic article image beats no image.
fn pick_editorial(
    items: &[NewsItem],
    post_text: &str,
    keywords: &[String],
    count: usize,
) -> Vec<GeneratedImage> {
    let candidates = feed_images::harvest(items);
    if candidates.is_empty() {
        return Vec::new();
    }
    let mut ranked = score_and_rank(candidates, post_text, keywords);
    ranked.truncate(count);
    ranked
}

fn stock_to_image(photo: StockPhoto) -> GeneratedImage {
    GeneratedImage {
        url: photo.url,
        alt_text: photo.alt,
        source_kind: ImageSourceKind::Stock,
        attribution: photo.attribution,
        description: photo.description,
        tags: photo.tags,
        relevance_score: None,
        feed_name: None,
        article_url: None,
    }
}
