
//! Processor configuration and the connection retry policy.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_URL: &str = "amqp://localhost";
const DEFAULT_VHOST: &str = "/";
const DEFAULT_EXCHANGE: &str = "expenses_exchange";
const DEFAULT_OUTPUT_FOLDER: &str = "./messages";

/// Configuration for an `ExpenseConsumer`.
///
/// Immutable after startup. Use [`ProcessorConfig::from_env`] in the binary,
/// or construct the struct directly in tests.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// The AMQP URL for connecting to the RabbitMQ broker.
    pub amqp_url: String,
    /// The virtual host, appended verbatim to the URL.
    pub vhost: String,
    /// The topic exchange the queue is bound to.
    pub exchange: String,
    /// Destination directory for persisted messages.
    pub output_folder: PathBuf,
}

impl ProcessorConfig {
    /// Builds the configuration from the environment.
    ///
    /// # Variables
    /// * `RABBITMQ_URL` - defaults to `amqp://localhost`.
    /// * `RABBITMQ_VHOST` - defaults to `/`.
    /// * `RABBITMQ_EXCHANGE` - defaults to `expenses_exchange`.
    /// * `OUTPUT_FOLDER` - defaults to `./messages`.
    pub fn from_env() -> Self {
        Self {
            amqp_url: env::var("RABBITMQ_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            vhost: env::var("RABBITMQ_VHOST").unwrap_or_else(|_| DEFAULT_VHOST.to_string()),
            exchange: env::var("RABBITMQ_EXCHANGE").unwrap_or_else(|_| DEFAULT_EXCHANGE.to_string()),
            output_folder: env::var("OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_FOLDER)),
        }
    }

    /// The full connection endpoint: the broker URL with the virtual host
    /// appended.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.amqp_url, self.vhost)
    }
}

/// Bounded retry policy for establishing the broker connection.
///
/// A pure parameter of `ExpenseConsumer::connect`; the caller decides what
/// to log around each attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of connection attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}
