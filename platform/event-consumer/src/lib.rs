//! Generic subscribe → dispatch → ack loop over an [`event_bus::EventBus`]
//! subscription, used by the projection worker (C11) and any future
//! consumer that needs the same retry-then-dead-letter shape.
//!
//! Grounded on `gl-rs`'s `consumer::gl_posting_consumer` (subscribe to a
//! subject, deserialize, process, log) combined with `event-bus`'s
//! `consumer_retry::retry_with_backoff` for the retry policy before a
//! handler failure is treated as permanent.

use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("bus error: {0}")]
    Bus(#[from] event_bus::BusError),
}

#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, message: &BusMessage) -> Result<(), String>;
}

/// Subscribes to `subject` and, for each message, retries the handler with
/// backoff before giving up and routing it to `on_dead_letter`.
pub async fn run_consumer_loop(
    bus: Arc<dyn EventBus>,
    subject: &str,
    handler: Arc<dyn EventHandler>,
    retry_config: RetryConfig,
    on_dead_letter: Arc<dyn Fn(&BusMessage, &str) + Send + Sync>,
) -> Result<(), ConsumerError> {
    let mut stream = bus.subscribe(subject).await?;
    info!(subject = %subject, "consumer loop subscribed");

    while let Some(message) = stream.next().await {
        let handler = handler.clone();
        let msg_for_retry = message.clone();
        let result = retry_with_backoff(
            || {
                let handler = handler.clone();
                let msg = msg_for_retry.clone();
                async move { handler.handle(&msg).await }
            },
            &retry_config,
            subject,
        )
        .await;

        match result {
            Ok(()) => {
                info!(subject = %message.subject, "event handled");
            }
            Err(err) => {
                warn!(subject = %message.subject, error = %err, "event handler exhausted retries, dead-lettering");
                on_dead_letter(&message, &err);
            }
        }
    }

    error!(subject = %subject, "consumer stream ended");
    Ok(())
}
