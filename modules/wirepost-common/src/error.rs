use thiserror::Error;

/// Failures that abort a pipeline run. Feed, image provider, and parse
/// problems never reach this type: those degrade in place.
#[derive(Error, Debug)]
pub enum WirepostError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Run lock conflict: another pipeline run is in progress")]
    RunLockConflict,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
