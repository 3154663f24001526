
//! Defines the core trait for message handling logic.

use crate::error::ProcessorError;
use async_trait::async_trait;

/// A trait for processing messages delivered from the bound queue.
///
/// The consume loop calls `handle` once per delivery, strictly in order.
/// Returning `Ok` acknowledges the message; returning an error rejects it
/// without requeueing.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes a single raw delivery.
    ///
    /// # Arguments
    /// * `routing_key` - The routing key the message was published with.
    /// * `payload` - The raw message bytes as received from the broker.
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> Result<(), ProcessorError>;

    /// A name for the handler, used for logging and identification.
    fn handler_name(&self) -> &str;
}
