//! Serialized, paced delivery queue.
//!
//! [`DeliveryQueue`] accepts [`MessageRequest`]s from any number of
//! concurrent callers and hands them to a [`Transport`] one at a time, in
//! submission order, waiting [`QueueConfig::pacing_interval`] after every
//! attempt. Each submission gets a [`DeliveryHandle`] that resolves with the
//! outcome of its own send; awaiting it is optional.
//!
//! The queue contents and the worker state (`Idle` / `Draining`) live under
//! one mutex. `submit` flips `Idle -> Draining` and spawns the worker in the
//! same critical section, and the worker flips back to `Idle` only while
//! holding the lock with the queue observed empty, so two workers can never
//! drain concurrently.
//!
//! The queue is bounded and rejects submissions when full. It is in-memory
//! only: anything still queued when the process exits is lost, which is why
//! the binary calls [`DeliveryQueue::close`] and awaits
//! [`DeliveryQueue::drained`] during shutdown.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use airwatch_core::message::MessageRequest;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};

use super::transport::{Transport, TransportError};

/// Default delay between two consecutive transport calls.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(1000);

/// Default maximum number of queued (not yet attempted) messages.
pub const DEFAULT_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunable parameters for the delivery queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Wait after each attempt before the next one starts.
    pub pacing_interval: Duration,
    /// Maximum queued messages; further submissions are rejected.
    pub capacity: usize,
    /// Optional upper bound on a single transport call. `None` means a hung
    /// transport blocks the whole queue.
    pub send_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing_interval: DEFAULT_PACING_INTERVAL,
            capacity: DEFAULT_CAPACITY,
            send_timeout: None,
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `DELIVERY_PACING_MS`         | `1000`  |
    /// | `DELIVERY_QUEUE_CAPACITY`    | `1024`  |
    /// | `DELIVERY_SEND_TIMEOUT_SECS` | unset   |
    pub fn from_env() -> Self {
        let pacing_interval = std::env::var("DELIVERY_PACING_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PACING_INTERVAL);

        let capacity = std::env::var("DELIVERY_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_CAPACITY);

        let send_timeout = std::env::var("DELIVERY_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&secs: &u64| secs > 0)
            .map(Duration::from_secs);

        Self {
            pacing_interval,
            capacity,
            send_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Why a single message was not delivered.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The transport reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The transport call exceeded [`QueueConfig::send_timeout`].
    #[error("Transport did not answer within {0:?}")]
    TimedOut(Duration),

    /// The transport panicked while sending this message.
    #[error("Transport panicked while sending")]
    Panicked,

    /// The worker went away before attempting the message (runtime shutdown).
    #[error("Delivery worker stopped before the message was attempted")]
    WorkerGone,
}

/// Result of one delivery attempt, reported to the submitter.
pub type DeliveryOutcome = Result<(), DeliveryError>;

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Delivery queue is full ({capacity} messages pending)")]
    Full { capacity: usize },

    #[error("Delivery queue is closed")]
    Closed,
}

/// Pending result of a submitted message.
///
/// Dropping the handle is fine: the message is still attempted, its outcome
/// is simply discarded.
#[derive(Debug)]
pub struct DeliveryHandle {
    rx: oneshot::Receiver<DeliveryOutcome>,
}

impl DeliveryHandle {
    /// Wait for the message to be attempted and return its outcome.
    pub async fn outcome(self) -> DeliveryOutcome {
        self.rx.await.unwrap_or(Err(DeliveryError::WorkerGone))
    }
}

// ---------------------------------------------------------------------------
// DeliveryQueue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Draining,
}

struct QueuedMessage {
    request: MessageRequest,
    reply: oneshot::Sender<DeliveryOutcome>,
}

struct QueueState {
    items: VecDeque<QueuedMessage>,
    worker: WorkerState,
    closed: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    transport: Arc<dyn Transport>,
    config: QueueConfig,
    /// Signalled every time the worker goes idle.
    idle: Notify,
}

/// Single-consumer delivery queue in front of a [`Transport`].
///
/// Cheap to clone; all clones share the same queue and worker.
#[derive(Clone)]
pub struct DeliveryQueue {
    shared: Arc<Shared>,
}

impl DeliveryQueue {
    pub fn new(transport: Arc<dyn Transport>, config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    items: VecDeque::new(),
                    worker: WorkerState::Idle,
                    closed: false,
                }),
                transport,
                config,
                idle: Notify::new(),
            }),
        }
    }

    /// Append `request` to the tail of the queue.
    ///
    /// Returns as soon as the message is queued. Starts the worker if it is
    /// idle. Must be called from within a Tokio runtime.
    pub fn submit(&self, request: MessageRequest) -> Result<DeliveryHandle, QueueError> {
        let (reply, rx) = oneshot::channel();

        let (start_worker, pending) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            if state.items.len() >= self.shared.config.capacity {
                return Err(QueueError::Full {
                    capacity: self.shared.config.capacity,
                });
            }
            state.items.push_back(QueuedMessage { request, reply });

            let start = state.worker == WorkerState::Idle;
            if start {
                state.worker = WorkerState::Draining;
            }
            (start, state.items.len())
        };

        tracing::debug!(pending, "Message queued for delivery");

        if start_worker {
            tokio::spawn(drain(Arc::clone(&self.shared)));
        }

        Ok(DeliveryHandle { rx })
    }

    /// Number of messages waiting to be attempted (excludes the one in flight).
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when no worker is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.worker == WorkerState::Idle && state.items.is_empty()
    }

    /// Stop accepting submissions. Already-queued messages are still sent.
    pub fn close(&self) {
        self.shared.state.lock().closed = true;
        tracing::info!("Delivery queue closed to new submissions");
    }

    /// Wait until every queued message has been attempted and the worker is idle.
    pub async fn drained(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent idle transition is not missed.
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

/// Worker loop: pop, send, report, pace; exit when the queue is empty.
async fn drain(shared: Arc<Shared>) {
    tracing::debug!("Delivery worker started");

    loop {
        let next = {
            let mut state = shared.state.lock();
            match state.items.pop_front() {
                Some(item) => item,
                None => {
                    state.worker = WorkerState::Idle;
                    shared.idle.notify_waiters();
                    break;
                }
            }
        };

        let outcome = attempt(&shared, &next.request).await;
        match &outcome {
            Ok(()) => tracing::info!(
                to = %next.request.recipient,
                subject = %next.request.subject,
                "Message delivered"
            ),
            Err(DeliveryError::Panicked) => tracing::error!(
                to = %next.request.recipient,
                subject = %next.request.subject,
                "Transport panicked, continuing with next message"
            ),
            Err(e) => tracing::warn!(
                to = %next.request.recipient,
                subject = %next.request.subject,
                error = %e,
                "Message delivery failed"
            ),
        }

        // The submitter may have dropped its handle; that is not an error.
        let _ = next.reply.send(outcome);

        tokio::time::sleep(shared.config.pacing_interval).await;
    }

    tracing::debug!("Delivery worker idle");
}

/// One transport call, isolated from panics and optionally time-boxed.
async fn attempt(shared: &Shared, request: &MessageRequest) -> DeliveryOutcome {
    let send = AssertUnwindSafe(shared.transport.send(request)).catch_unwind();

    let result = match shared.config.send_timeout {
        Some(limit) => match tokio::time::timeout(limit, send).await {
            Ok(result) => result,
            Err(_) => return Err(DeliveryError::TimedOut(limit)),
        },
        None => send.await,
    };

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeliveryError::Transport(e)),
        Err(_) => Err(DeliveryError::Panicked),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
