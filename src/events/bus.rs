use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};

use super::{EventReporter, ScenarioEvent};

pub const DEFAULT_CAPACITY: usize = 256;

/// Ordered event queue with a single consumer task feeding a reporter.
///
/// `publish` never blocks the engine; a full queue drops the event with a
/// warning and counts it in `dropped`. `drain` waits until everything published so far has been handed
/// to the reporter, whether delivery succeeded or not.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

struct Inner {
    sender: mpsc::Sender<ScenarioEvent>,
    published: AtomicU64,
    dropped: AtomicU64,
    processed: watch::Receiver<u64>,
}

impl EventBus {
    /// Must be called from within a Tokio runtime.
    pub fn new(reporter: Arc<dyn EventReporter>) -> Self {
        Self::with_capacity(reporter, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(reporter: Arc<dyn EventReporter>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (processed_tx, processed_rx) = watch::channel(0);

        tokio::spawn(consume(receiver, reporter, processed_tx));

        Self {
            inner: Arc::new(Inner {
                sender,
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                processed: processed_rx,
            }),
        }
    }

    pub fn publish(&self, event: ScenarioEvent) {
        match self.inner.sender.try_send(event) {
            Ok(()) => {
                self.inner.published.fetch_add(1, Ordering::SeqCst);
            }
            Err(TrySendError::Full(event)) => {
                self.inner.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(event = event.kind(), "event queue full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                self.inner.dropped.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(event = event.kind(), "event consumer has stopped, dropping event");
            }
        }
    }

    pub async fn drain(&self) {
        let target = self.inner.published.load(Ordering::SeqCst);
        let mut processed = self.inner.processed.clone();

        if processed.wait_for(|count| *count >= target).await.is_err() {
            tracing::warn!(target, "event consumer stopped before the queue was drained");
        }
    }

    pub fn published(&self) -> u64 {
        self.inner.published.load(Ordering::SeqCst)
    }

    /// Events rejected by `publish` and never handed to the reporter.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> u64 {
        *self.inner.processed.borrow()
    }
}

async fn consume(
    mut receiver: mpsc::Receiver<ScenarioEvent>,
    reporter: Arc<dyn EventReporter>,
    processed: watch::Sender<u64>,
) {
    let mut count = 0;
    while let Some(event) = receiver.recv().await {
        if let Err(error) = reporter.report(&event).await {
            tracing::error!(event = event.kind(), %error, "failed to deliver scenario event");
        }
        count += 1;
        processed.send_replace(count);
    }
}
