
//! # Expense Processor
//! A RabbitMQ consumer that archives JSON expense events as individual
//! timestamped files on local storage.

pub mod archive;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;

// Re-export key components for easy access
pub use archive::FileArchive;
pub use config::{ProcessorConfig, RetryPolicy};
pub use consumer::ExpenseConsumer;
pub use error::ProcessorError;
pub use handler::MessageHandler;
