use thiserror::Error;

/// Errors surfaced across crate boundaries. Connector-internal failures
/// stay anyhow and are absorbed into per-source results; these are the
/// ones a caller has to handle.
#[derive(Error, Debug)]
pub enum PulseWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
