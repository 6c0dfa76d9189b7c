pub mod error;
pub mod pexels;
pub mod types;
pub mod unsplash;

pub use error::{Result, StockPhotoError};
pub use pexels::PexelsClient;
pub use types::StockPhoto;
pub use unsplash::UnsplashClient;

use async_trait::async_trait;

/// Keyword search against one stock-photo provider.
///
/// Implementations must tolerate zero results and missing API credentials
/// (absence of credentials means "provider unavailable", not a fatal error).
#[async_trait]
pub trait ImageSearcher: Send + Sync {
    /// Provider label used in logs and usage accounting.
    fn provider(&self) -> &'static str;

    async fn search(&self, keywords: &[String], count: usize) -> anyhow::Result<Vec<StockPhoto>>;
}

/// Request a few times more photos than needed so relevance filtering has
/// candidates to discard, capped at the provider's page limit.
pub(crate) fn per_page(count: usize, provider_max: usize) -> usize {
    (count * 3).min(provider_max).max(1)
}
