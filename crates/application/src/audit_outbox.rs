use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use stagegate_core::AppResult;

use crate::{AuditEvent, AuditRepository, TransitionAuditEvent};

/// Default number of undelivered audit records kept before the oldest is dropped.
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 10_000;

/// Record waiting for delivery to the audit sink.
#[derive(Debug, Clone)]
pub(crate) enum AuditRecord {
    Event(AuditEvent),
    Transition(TransitionAuditEvent),
}

impl AuditRecord {
    fn describe(&self) -> String {
        match self {
            Self::Event(event) => format!("{} {}", event.action.as_str(), event.resource_id),
            Self::Transition(event) => format!("{} {}", event.kind.as_str(), event.case_id),
        }
    }
}

#[derive(Default)]
struct PendingQueue {
    records: VecDeque<(u64, AuditRecord)>,
    next_sequence: u64,
    dropped: u64,
}

/// Ordered delivery queue in front of the audit sink.
///
/// Committed changes are never rolled back because their audit record could
/// not be delivered. Enqueueing only touches the in-memory queue; at most one
/// caller delivers at a time and the others return without waiting.
#[derive(Clone)]
pub(crate) struct AuditOutbox {
    repository: Arc<dyn AuditRepository>,
    pending: Arc<Mutex<PendingQueue>>,
    deliverer: Arc<AsyncMutex<()>>,
    capacity: usize,
}

impl AuditOutbox {
    pub(crate) fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self {
            repository,
            pending: Arc::new(Mutex::new(PendingQueue::default())),
            deliverer: Arc::new(AsyncMutex::new(())),
            capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
        }
    }

    /// Bounds the queue. The oldest record is dropped once it is full.
    pub(crate) fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Appends a record to the queue without touching the sink.
    pub(crate) fn enqueue(&self, record: AuditRecord) {
        let mut pending = self.lock_pending();

        if pending.records.len() >= self.capacity {
            let oldest = pending.records.pop_front();
            pending.dropped = pending.dropped.saturating_add(1);
            warn!(
                capacity = self.capacity,
                dropped_total = pending.dropped,
                record = %oldest.map(|(_, record)| record.describe()).unwrap_or_default(),
                "audit queue full, dropping oldest undelivered record"
            );
        }

        let sequence = pending.next_sequence;
        pending.next_sequence = sequence.wrapping_add(1);
        pending.records.push_back((sequence, record));
    }

    /// Delivers pending records unless another caller is already delivering.
    ///
    /// Returns how many records this call delivered.
    pub(crate) async fn deliver(&self) -> usize {
        let mut delivered = 0;

        loop {
            let Ok(guard) = self.deliverer.try_lock() else {
                return delivered;
            };
            let (count, stalled) = self.drain().await;
            delivered += count;
            drop(guard);

            // A record queued while the deliverer was finishing found the
            // lock taken and left delivery to us.
            if stalled || self.pending_count() == 0 {
                return delivered;
            }
        }
    }

    /// Waits for any running delivery, then retries everything pending.
    pub(crate) async fn flush(&self) -> usize {
        let _deliverer = self.deliverer.lock().await;
        self.drain().await.0
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.lock_pending().records.len()
    }

    /// Sends records front to back until the queue empties or the sink fails.
    ///
    /// Callers hold the deliverer lock.
    async fn drain(&self) -> (usize, bool) {
        let mut delivered = 0;

        loop {
            let Some((sequence, record)) = self.lock_pending().records.front().cloned() else {
                return (delivered, false);
            };

            match self.send(record.clone()).await {
                Ok(()) => {
                    let mut pending = self.lock_pending();
                    // The record may have been dropped for capacity while in flight.
                    if pending
                        .records
                        .front()
                        .is_some_and(|(front, _)| *front == sequence)
                    {
                        pending.records.pop_front();
                    }
                    delivered += 1;
                }
                Err(error) => {
                    warn!(
                        record = %record.describe(),
                        pending = self.pending_count(),
                        error = %error,
                        "audit sink rejected record, keeping it queued"
                    );
                    return (delivered, true);
                }
            }
        }
    }

    async fn send(&self, record: AuditRecord) -> AppResult<()> {
        match record {
            AuditRecord::Event(event) => self.repository.append_event(event).await,
            AuditRecord::Transition(event) => self.repository.append_transition(event).await,
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, PendingQueue> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
