use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::sync::oneshot;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::connection::ConnectionInfo;
use crate::error::ConfigError;
use crate::event::{Level, LogEvent};
use crate::sink::EmailSink;
use crate::template::{FormatProvider, MessageTemplateFormatter, DEFAULT_OUTPUT_TEMPLATE};
use crate::worker::{batching_worker_loop, event_queue, BatchingOptions, Completion};
use crate::{DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_SUBJECT};

/// Crates whose events are never emailed, since they run while an email is sent.
const INTERNAL_TARGETS: &[&str] = &[
    "tracing_email",
    "hyper",
    "hyper_util",
    "h2",
    "reqwest",
    "rustls",
    "native_tls",
    "rusoto_core",
    "rusoto_credential",
    "rusoto_signature",
    "rusoto_ses",
];

fn is_internal(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    INTERNAL_TARGETS.contains(&krate)
}

pub struct EmailLayerBuilder {
    connection_info: Option<ConnectionInfo>,
    output_template: String,
    minimum_level: Level,
    batching: BatchingOptions,
    format_provider: Option<FormatProvider>,
    mail_subject: String,
    runtime_handle: Option<Handle>,
    shutdown_timeout: Duration,
}

impl Default for EmailLayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailLayerBuilder {
    pub fn new() -> Self {
        Self {
            connection_info: None,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            minimum_level: Level::Verbose,
            batching: BatchingOptions::default(),
            format_provider: None,
            mail_subject: DEFAULT_SUBJECT.to_string(),
            runtime_handle: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn connection_info(mut self, connection_info: ConnectionInfo) -> Self {
        self.connection_info = Some(connection_info);
        self
    }

    /// Template every event in a batch is rendered with to build the body.
    pub fn output_template(mut self, output_template: &str) -> Self {
        self.output_template = output_template.to_string();
        self
    }

    /// Events below this level are ignored.
    pub fn minimum_level(mut self, minimum_level: Level) -> Self {
        self.minimum_level = minimum_level;
        self
    }

    pub fn batch_size_limit(mut self, batch_size_limit: usize) -> Self {
        self.batching.batch_size_limit = batch_size_limit;
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.batching.period = period;
        self
    }

    pub fn queue_limit(mut self, queue_limit: usize) -> Self {
        self.batching.queue_limit = queue_limit;
        self
    }

    pub fn eagerly_emit_first_event(mut self, eagerly_emit_first_event: bool) -> Self {
        self.batching.eagerly_emit_first_event = eagerly_emit_first_event;
        self
    }

    pub fn format_provider(mut self, format_provider: FormatProvider) -> Self {
        self.format_provider = Some(format_provider);
        self
    }

    /// Subject template, rendered against the most severe event of a batch.
    /// Ignored when the connection info carries a subject.
    pub fn mail_subject(mut self, mail_subject: &str) -> Self {
        self.mail_subject = mail_subject.to_string();
        self
    }

    /// Runs the batching worker on an existing runtime instead of a
    /// dedicated background thread.
    pub fn runtime_handle(mut self, runtime_handle: Handle) -> Self {
        self.runtime_handle = Some(runtime_handle);
        self
    }

    /// How long dropping the [`FlushGuard`] waits for the final email.
    pub fn shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn batching_options(&self) -> &BatchingOptions {
        &self.batching
    }

    pub fn build(self) -> Result<(EmailLayer, FlushGuard), ConfigError> {
        let connection_info = self
            .connection_info
            .ok_or(ConfigError::MissingConnectionInfo)?;
        if self.batching.batch_size_limit == 0 {
            return Err(ConfigError::ZeroLimit("batch_size_limit"));
        }
        if self.batching.queue_limit == 0 {
            return Err(ConfigError::ZeroLimit("queue_limit"));
        }
        if self.batching.period.is_zero() {
            return Err(ConfigError::ZeroLimit("period"));
        }

        let body = MessageTemplateFormatter::new(&self.output_template, self.format_provider)?;
        let subject = MessageTemplateFormatter::new(&self.mail_subject, self.format_provider)?;
        let sink = Arc::new(EmailSink::new(
            connection_info,
            Box::new(body),
            Box::new(subject),
        ));

        let (sender, receiver) = event_queue(&self.batching);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let completion = Arc::new(Completion::default());
        let worker = {
            let completion = completion.clone();
            let options = self.batching.clone();
            async move {
                batching_worker_loop(sink, receiver, options, shutdown_rx).await;
                completion.finish();
            }
        };

        match self.runtime_handle {
            Some(handle) => {
                handle.spawn(worker);
            }
            None => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(ConfigError::Runtime)?;
                std::thread::Builder::new()
                    .name("tracing-email".to_string())
                    .spawn(move || runtime.block_on(worker))
                    .map_err(ConfigError::Runtime)?;
            }
        }

        let layer = EmailLayer {
            sender,
            minimum_level: self.minimum_level,
        };
        let guard = FlushGuard {
            shutdown: Mutex::new(Some(shutdown)),
            completion,
            timeout: self.shutdown_timeout,
        };
        Ok((layer, guard))
    }
}

/// Queues every event at or above the minimum level for the email worker.
pub struct EmailLayer {
    sender: Sender<LogEvent>,
    minimum_level: Level,
}

impl EmailLayer {
    fn enqueue(&self, event: LogEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                eprintln!("Email log queue is full, dropping event");
            }
            // Worker already shut down.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

impl<S> Layer<S> for EmailLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // ERROR events may still be raised to Fatal by their fields.
        let floor = self.minimum_level.min(Level::Error);
        if Level::from(*metadata.level()) < floor || is_internal(metadata.target()) {
            return;
        }
        let log_event = LogEvent::from_tracing(event);
        if log_event.level() >= self.minimum_level {
            self.enqueue(log_event);
        }
    }
}

/// Flushes pending events when dropped.
///
/// Dropping blocks for up to the shutdown timeout. When the worker was given
/// the handle of a current-thread runtime, drop the guard outside of it.
pub struct FlushGuard {
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    completion: Arc<Completion>,
    timeout: Duration,
}

impl FlushGuard {
    /// Signals the worker to flush and stop, without waiting for it.
    pub fn shutdown(&self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }
    }

    /// Waits up to `timeout` for the worker to finish its final flush.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.completion.wait(timeout)
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.shutdown();
        if !self.wait(self.timeout) {
            eprintln!(
                "Timed out after {:?} waiting for pending log emails",
                self.timeout
            );
        }
    }
}
