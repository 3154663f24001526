
use thiserror::Error;

/// Error type for the expense processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Error originating from the underlying `lapin` library.
    #[error("RabbitMQ communication error: {0}")]
    Lapin(#[from] lapin::Error),

    /// The payload was not valid UTF-8 JSON.
    #[error("Failed to decode message payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The output folder could not be created or written to.
    #[error("Failed to write to the output folder: {0}")]
    Persist(#[from] std::io::Error),

    /// Every connection attempt allowed by the retry policy failed.
    #[error("Connection failed after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: lapin::Error },
}
