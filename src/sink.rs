use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::ConnectionInfo;
use crate::delivery::DeliveryClient;
use crate::error::FlushError;
use crate::event::LogEvent;
use crate::template::TextFormatter;
use crate::translator::{BatchTranslator, SubjectLine};

/// Receives the batches assembled by the batching worker.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn emit_batch(&self, events: &[LogEvent]) -> Result<(), FlushError>;

    /// Called when a period elapses with nothing queued.
    async fn on_empty_batch(&self) -> Result<(), FlushError> {
        Ok(())
    }
}

/// Sends every non-empty batch as one email.
pub struct EmailSink {
    translator: BatchTranslator,
    client: Arc<dyn DeliveryClient>,
}

impl EmailSink {
    /// The subject template is discarded when the connection carries a
    /// subject override.
    pub fn new(
        connection_info: ConnectionInfo,
        body: Box<dyn TextFormatter>,
        subject: Box<dyn TextFormatter>,
    ) -> Self {
        let subject = SubjectLine::resolve(connection_info.subject_override(), subject);
        let translator = BatchTranslator::new(
            connection_info.sender().clone(),
            connection_info.recipient().clone(),
            body,
            subject,
        );
        Self {
            translator,
            client: connection_info.client().clone(),
        }
    }
}

#[async_trait]
impl BatchSink for EmailSink {
    async fn emit_batch(&self, events: &[LogEvent]) -> Result<(), FlushError> {
        let message = match self.translator.translate(events)? {
            Some(message) => message,
            None => return Ok(()),
        };
        self.client.send_email(&message).await?;
        Ok(())
    }
}
