use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};

use crate::event::LogEvent;
use crate::sink::BatchSink;
use crate::{DEFAULT_BATCH_POSTING_LIMIT, DEFAULT_PERIOD, DEFAULT_QUEUE_LIMIT};

/// When and how much the worker hands to its [`BatchSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchingOptions {
    pub batch_size_limit: usize,
    pub period: Duration,
    pub queue_limit: usize,
    pub eagerly_emit_first_event: bool,
}

impl Default for BatchingOptions {
    fn default() -> Self {
        Self {
            batch_size_limit: DEFAULT_BATCH_POSTING_LIMIT,
            period: DEFAULT_PERIOD,
            queue_limit: DEFAULT_QUEUE_LIMIT,
            eagerly_emit_first_event: false,
        }
    }
}

/// Bounded queue feeding [`batching_worker_loop`]. Panics if `queue_limit` is zero.
pub fn event_queue(options: &BatchingOptions) -> (Sender<LogEvent>, Receiver<LogEvent>) {
    channel(options.queue_limit)
}

/// Collects events from `receiver` and emits them in batches.
///
/// A batch is emitted every `period`, as soon as `batch_size_limit` events are
/// pending, and for the very first event when `eagerly_emit_first_event` is
/// set. Failed batches are reported on stderr and dropped. The loop ends once
/// `shutdown` fires or every sender is gone, after flushing what is queued.
pub async fn batching_worker_loop(
    sink: Arc<dyn BatchSink>,
    mut receiver: Receiver<LogEvent>,
    options: BatchingOptions,
    mut shutdown: oneshot::Receiver<()>,
) {
    let limit = options.batch_size_limit.max(1);
    let mut batch = Vec::with_capacity(limit);
    let mut emit_first = options.eagerly_emit_first_event;
    let mut shutting_down = false;
    let mut deadline = Instant::now() + options.period;

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Some(event) => {
                    batch.push(event);
                    let eager = std::mem::take(&mut emit_first);
                    if eager || batch.len() >= limit {
                        emit(&*sink, &mut batch).await;
                    }
                }
                None => break,
            },
            _ = sleep_until(deadline), if !shutting_down => {
                if batch.is_empty() {
                    if let Err(err) = sink.on_empty_batch().await {
                        eprintln!("Failed to complete empty batch: {}", err);
                    }
                } else {
                    emit(&*sink, &mut batch).await;
                }
                deadline = Instant::now() + options.period;
            }
            _ = &mut shutdown, if !shutting_down => {
                // Stop accepting events; the receive branch drains the rest.
                shutting_down = true;
                receiver.close();
            }
        }
    }

    if !batch.is_empty() {
        emit(&*sink, &mut batch).await;
    }
}

async fn emit(sink: &dyn BatchSink, batch: &mut Vec<LogEvent>) {
    if let Err(err) = sink.emit_batch(batch).await {
        eprintln!("Failed to emit batch of {} log events: {}", batch.len(), err);
    }
    batch.clear();
}

/// Signalled by the worker once its final flush is done.
#[derive(Default)]
pub(crate) struct Completion {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl Completion {
    pub(crate) fn finish(&self) {
        *self.done.lock() = true;
        self.condvar.notify_all();
    }

    /// Returns `false` if the worker did not finish within `timeout`.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.condvar.wait_until(&mut done, deadline).timed_out() {
                break;
            }
        }
        *done
    }
}
