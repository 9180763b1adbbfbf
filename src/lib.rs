mod connection;
mod delivery;
mod error;
mod event;
mod layer;
mod message;
mod sink;
mod template;
mod translator;
mod worker;

use std::time::Duration;

const DEFAULT_BATCH_POSTING_LIMIT: usize = 100;
const DEFAULT_PERIOD: Duration = Duration::from_secs(30);
const DEFAULT_QUEUE_LIMIT: usize = 10_000;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SUBJECT: &str = "Log Email";

pub use connection::ConnectionInfo;
pub use delivery::{
    DeliveryClient, SendGridClient, SesDelivery, SENDGRID_API_BASE, SENDGRID_API_KEY_ENV,
};
pub use error::{ConfigError, DeliveryError, FlushError, FormatError};
pub use event::{Level, LogEvent};
pub use layer::{EmailLayer, EmailLayerBuilder, FlushGuard};
pub use message::{EmailAddress, EmailMessage};
pub use sink::{BatchSink, EmailSink};
pub use template::{
    FormatProvider, MessageTemplateFormatter, TextFormatter, DEFAULT_OUTPUT_TEMPLATE,
};
pub use translator::{most_severe, BatchTranslator, SubjectLine};
pub use worker::{batching_worker_loop, event_queue, BatchingOptions};

/// Starts configuring a layer that emails batches of events.
pub fn email(connection_info: ConnectionInfo) -> EmailLayerBuilder {
    EmailLayerBuilder::new().connection_info(connection_info)
}
