use thiserror::Error;

pub type Result<T> = std::result::Result<T, StockPhotoError>;

#[derive(Debug, Error)]
pub enum StockPhotoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for StockPhotoError {
    fn from(err: reqwest::Error) -> Self {
        StockPhotoError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StockPhotoError {
    fn from(err: serde_json::Error) -> Self {
        StockPhotoError::Parse(err.to_string())
    }
}
