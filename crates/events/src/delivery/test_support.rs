//! Fake transports shared by the unit tests in this crate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use airwatch_core::message::MessageRequest;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::transport::{Transport, TransportError};

/// One observed `send` call.
#[derive(Debug, Clone)]
pub struct SendCall {
    pub recipient: String,
    pub subject: String,
    pub started_at: Instant,
}

/// Records every call, optionally failing, stalling or panicking on
/// specific subjects, and tracks how many sends overlap.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<SendCall>>,
    fail_subjects: HashSet<String>,
    panic_subjects: HashSet<String>,
    stall_subjects: HashSet<String>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, subject: &str) -> Self {
        self.fail_subjects.insert(subject.to_string());
        self
    }

    pub fn panicking_on(mut self, subject: &str) -> Self {
        self.panic_subjects.insert(subject.to_string());
        self
    }

    /// Sends with this subject never complete.
    pub fn stalling_on(mut self, subject: &str) -> Self {
        self.stall_subjects.insert(subject.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<SendCall> {
        self.calls.lock().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.subject.clone()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, message: &MessageRequest) -> Result<(), TransportError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        self.calls.lock().push(SendCall {
            recipient: message.recipient.clone(),
            subject: message.subject.clone(),
            started_at: Instant::now(),
        });

        if self.stall_subjects.contains(&message.subject) {
            std::future::pending::<()>().await;
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_subjects.contains(&message.subject) {
            panic!("transport blew up on {}", message.subject);
        }

        if self.fail_subjects.contains(&message.subject) {
            return Err(TransportError::Rejected(format!(
                "refused {}",
                message.subject
            )));
        }

        Ok(())
    }
}

pub fn message(subject: &str) -> MessageRequest {
    MessageRequest::new("ada@example.com", subject, format!("body of {subject}"))
}
