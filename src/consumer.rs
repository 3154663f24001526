
//! The expense consumer: connection lifecycle, queue topology, and the
//! receive-and-dispatch loop.

use std::future::Future;

use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, Connection, ConnectionProperties, ExchangeKind,
};

use crate::config::{ProcessorConfig, RetryPolicy};
use crate::error::ProcessorError;
use crate::handler::MessageHandler;

/// Binding pattern: exactly one routing-key segment after the `expense.` prefix.
const BINDING_PATTERN: &str = "expense.*";

/// Consumer tag registered with the broker.
const CONSUMER_TAG: &str = "expense_processor";

/// A consumer bound to the expenses exchange.
///
/// Owns the connection, the channel, and the server-named exclusive queue
/// for its whole lifetime; the queue is deleted by the broker when the
/// connection goes away.
pub struct ExpenseConsumer {
    config: ProcessorConfig,
    connection: Connection,
    channel: Channel,
    queue_name: String,
}

impl ExpenseConsumer {
    /// Connects to the broker and sets up the consumer topology.
    ///
    /// Connection attempts follow `retry`. Once connected, declares the
    /// durable topic exchange, declares a server-named exclusive queue, and
    /// binds it with the `expense.*` pattern.
    pub async fn connect(
        config: ProcessorConfig,
        retry: &RetryPolicy,
    ) -> Result<Self, ProcessorError> {
        let connection = connect_with_retry(&config.endpoint(), retry).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions { exclusive: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        let queue_name = queue.name().as_str().to_string();

        channel
            .queue_bind(
                &queue_name,
                &config.exchange,
                BINDING_PATTERN,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        log::info!(
            "Queue '{}' bound to exchange '{}' with routing key '{}'",
            queue_name,
            config.exchange,
            BINDING_PATTERN
        );

        Ok(Self { config, connection, channel, queue_name })
    }

    /// Consumes deliveries until `shutdown` resolves or the stream ends.
    ///
    /// Dispatch is strictly sequential: the next delivery is not taken until
    /// the current handler call has returned and its ack or nack has gone
    /// out. A resolved `shutdown` never interrupts an in-flight handler.
    pub async fn run<H, S>(self, handler: &H, shutdown: S) -> Result<(), ProcessorError>
    where
        H: MessageHandler,
        S: Future<Output = ()>,
    {
        let mut deliveries = self
            .channel
            .basic_consume(
                &self.queue_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        log::info!(
            "Consumer started with tag '{}' and handler '{}'",
            CONSUMER_TAG,
            handler.handler_name()
        );
        log::info!(
            "Waiting for messages from exchange '{}'. To exit press CTRL+C",
            self.config.exchange
        );
        log::info!("Listening on queue: {}", self.queue_name);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stopping consumer...");
                    break;
                }
                delivery = deliveries.next() => match delivery {
                    Some(Ok(delivery)) => self.dispatch(handler, delivery).await?,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        log::warn!("Delivery stream closed by the broker");
                        break;
                    }
                },
            }
        }

        self.shutdown().await
    }

    /// Routes one delivery through the handler and settles it.
    ///
    /// Handler failures reject the message without requeue; only transport
    /// failures while settling are propagated.
    async fn dispatch<H: MessageHandler>(
        &self,
        handler: &H,
        delivery: Delivery,
    ) -> Result<(), ProcessorError> {
        let routing_key = delivery.routing_key.as_str().to_string();
        match handler.handle(&routing_key, &delivery.data).await {
            Ok(()) => delivery.ack(BasicAckOptions::default()).await?,
            Err(e) => {
                log::error!("Error processing message (routing key '{}'): {}", routing_key, e);
                delivery
                    .nack(BasicNackOptions { requeue: false, ..Default::default() })
                    .await?;
            }
        }
        Ok(())
    }

    /// Ordered shutdown: stop delivery first, then close the transport.
    async fn shutdown(self) -> Result<(), ProcessorError> {
        self.channel
            .basic_cancel(CONSUMER_TAG, BasicCancelOptions::default())
            .await?;
        self.connection.close(200, "shutting down").await?;
        log::info!("Connection closed");
        Ok(())
    }
}

/// Establishes a connection, retrying per `policy` with its fixed delay.
///
/// Logs the 1-based attempt number on each failure; exhausting the policy
/// returns [`ProcessorError::RetriesExhausted`] carrying the final error.
async fn connect_with_retry(
    endpoint: &str,
    policy: &RetryPolicy,
) -> Result<Connection, ProcessorError> {
    let mut attempt = 1;
    loop {
        log::info!("Attempting connection to: {}", endpoint);
        match Connection::connect(endpoint, ConnectionProperties::default()).await {
            Ok(connection) => {
                log::info!("Connected to RabbitMQ successfully");
                return Ok(connection);
            }
            Err(e) if attempt < policy.max_attempts => {
                log::warn!("Connection attempt {} failed: {}", attempt, e);
                log::info!("Retrying in {} seconds...", policy.delay.as_secs());
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                log::error!("Connection attempt {} failed: {}. Max retries reached.", attempt, e);
                return Err(ProcessorError::RetriesExhausted { attempts: attempt, source: e });
            }
        }
    }
}
