use serde::{Deserialize, Serialize};

/// A candidate photo returned by a provider search, normalized across
/// providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPhoto {
    pub url: String,
    pub alt: String,
    /// Credit line required by the provider's usage terms.
    pub attribution: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
