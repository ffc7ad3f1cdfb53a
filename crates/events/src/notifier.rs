//! Notification entry points used by the HTTP layer.
//!
//! [`Notifier`] combines the alert policy, the [`DeliveryQueue`] and the
//! [`UserDirectory`]:
//!
//! - lifecycle messages (welcome, login, logout, profile update) go straight
//!   to the queue, ungated;
//! - AQI readings go through [`policy::evaluate`] first, and a firing alert
//!   stamps `last_sent_at` only after the queue has accepted it.

use std::collections::HashMap;
use std::sync::Arc;

use airwatch_core::directory::{DirectoryError, UserDirectory};
use airwatch_core::error::CoreError;
use airwatch_core::message::{MessageKind, MessageRequest};
use airwatch_core::policy::{self, AlertTemplate, Decision, SuppressReason};
use airwatch_core::preferences::{NotificationPreferences, UpdateNotificationPreferences};
use airwatch_core::types::{DbId, Timestamp};
use airwatch_core::user::User;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::delivery::{DeliveryHandle, DeliveryQueue, QueueError};

/// Error type for notifier operations.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("User {0} not found")]
    UserNotFound(DbId),

    #[error("{0} is not a lifecycle message")]
    NotLifecycle(MessageKind),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// What happened to a reading.
#[derive(Debug)]
pub enum AlertDispatch {
    /// The alert was queued and the cooldown stamp persisted.
    Submitted {
        template: AlertTemplate,
        handle: DeliveryHandle,
    },
    /// No message was produced.
    Suppressed(SuppressReason),
}

/// Shared notification front door. Construct once per process.
pub struct Notifier {
    directory: Arc<dyn UserDirectory>,
    queue: DeliveryQueue,
    /// One lock per user id, serializing read-evaluate-stamp (and preference
    /// updates) so two concurrent readings for the same user cannot both slip
    /// through an expired cooldown. Different users never wait on each other.
    /// Entries live as long as the notifier; there is one per user seen.
    user_locks: parking_lot::Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl Notifier {
    pub fn new(directory: Arc<dyn UserDirectory>, queue: DeliveryQueue) -> Self {
        Self {
            directory,
            queue,
            user_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    /// Queue an arbitrary, ungated message.
    pub fn submit_message(&self, request: MessageRequest) -> Result<DeliveryHandle, QueueError> {
        self.queue.submit(request)
    }

    /// Pure alert decision; see [`policy::evaluate`].
    pub fn evaluate_alert(prefs: &NotificationPreferences, reading: f64, now: Timestamp) -> Decision {
        policy::evaluate(prefs, reading, now)
    }

    /// Current preferences of `user_id`.
    pub async fn preferences(&self, user_id: DbId) -> Result<NotificationPreferences, NotifyError> {
        Ok(self.load_user(user_id).await?.preferences)
    }

    /// Apply a partial preference update and persist it.
    ///
    /// Holds the user's lock so a concurrent reading cannot have its
    /// `last_sent_at` stamp overwritten by the stale copy loaded here.
    pub async fn update_preferences(
        &self,
        user_id: DbId,
        update: &UpdateNotificationPreferences,
    ) -> Result<NotificationPreferences, NotifyError> {
        let _guard = self.lock_user(user_id).await;

        let mut user = self.load_user(user_id).await?;
        update.apply_to(&mut user.preferences)?;
        self.directory.save(&user).await?;

        tracing::info!(user_id, "Notification preferences updated");
        Ok(user.preferences)
    }

    /// Queue a lifecycle message for `user_id`.
    ///
    /// Neither `email_enabled` nor the cooldown applies, and `last_sent_at`
    /// is left untouched.
    pub async fn send_lifecycle(
        &self,
        user_id: DbId,
        kind: MessageKind,
    ) -> Result<DeliveryHandle, NotifyError> {
        if !kind.is_lifecycle() {
            return Err(NotifyError::NotLifecycle(kind));
        }

        let user = self.load_user(user_id).await?;
        let request = MessageRequest::render(kind, &user.email, &user.username, 0.0);
        let handle = self.queue.submit(request)?;

        tracing::info!(user_id, kind = %kind, "Lifecycle message queued");
        Ok(handle)
    }

    /// Evaluate a new AQI reading for `user_id` and queue an alert if due.
    ///
    /// On a firing decision the message is submitted first; `last_sent_at`
    /// is set to `now` and saved only once the queue has accepted it. If the
    /// queue refuses, nothing is stamped. If the save fails, the message is
    /// already queued and will still go out.
    pub async fn process_reading(
        &self,
        user_id: DbId,
        reading: f64,
        now: Timestamp,
    ) -> Result<AlertDispatch, NotifyError> {
        let _guard = self.lock_user(user_id).await;

        let mut user = self.load_user(user_id).await?;

        let decision = policy::evaluate(&user.preferences, reading, now);
        let (template, request) = match decision.render(&user.email, &user.username) {
            Ok(fired) => fired,
            Err(reason) => {
                tracing::debug!(user_id, reading, reason = %reason, "Alert suppressed");
                return Ok(AlertDispatch::Suppressed(reason));
            }
        };

        let handle = self.queue.submit(request)?;

        user.preferences.mark_sent(now);
        if let Err(e) = self.directory.save(&user).await {
            tracing::error!(
                user_id,
                error = %e,
                "Alert queued but cooldown timestamp could not be saved"
            );
            return Err(e.into());
        }

        tracing::info!(user_id, reading, template = ?template, "Air quality alert queued");
        Ok(AlertDispatch::Submitted { template, handle })
    }

    async fn lock_user(&self, user_id: DbId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.user_locks.lock().entry(user_id).or_default());
        lock.lock_owned().await
    }

    async fn load_user(&self, user_id: DbId) -> Result<User, NotifyError> {
        self.directory
            .find_by_id(user_id)
            .await?
            .ok_or(NotifyError::UserNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use airwatch_core::directory::InMemoryUserDirectory;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    use super::*;

    use crate::delivery::test_support::{message, RecordingTransport};
    use crate::delivery::{QueueConfig, Transport};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn fast_queue(transport: &Arc<RecordingTransport>, capacity: usize) -> DeliveryQueue {
        DeliveryQueue::new(
            Arc::clone(transport) as Arc<dyn Transport>,
            QueueConfig {
                pacing_interval: Duration::ZERO,
                capacity,
                send_timeout: None,
            },
        )
    }

    fn setup() -> (Notifier, Arc<InMemoryUserDirectory>, Arc<RecordingTransport>) {
        let directory = Arc::new(InMemoryUserDirectory::with_users([User::new(
            1,
            "ada",
            "ada@example.com",
        )]));
        let transport = Arc::new(RecordingTransport::new());
        let notifier = Notifier::new(
            Arc::clone(&directory) as Arc<dyn UserDirectory>,
            fast_queue(&transport, 16),
        );
        (notifier, directory, transport)
    }

    #[tokio::test]
    async fn good_reading_fires_then_cooldown_suppresses() {
        let (notifier, directory, transport) = setup();

        let first = notifier.process_reading(1, 40.0, t0()).await.unwrap();
        let handle = assert_matches!(
            first,
            AlertDispatch::Submitted { template: AlertTemplate::Good, handle } => handle
        );
        assert!(handle.outcome().await.is_ok());

        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.preferences.last_sent_at, Some(t0()));

        let later = t0() + chrono::Duration::minutes(1);
        let second = notifier.process_reading(1, 40.0, later).await.unwrap();
        assert_matches!(second, AlertDispatch::Suppressed(SuppressReason::CooldownActive));

        assert_eq!(
            transport.subjects(),
            vec![MessageKind::GoodAirAlert.subject().to_string()]
        );
    }

    #[tokio::test]
    async fn suppressed_reading_leaves_stamp_untouched() {
        let (notifier, directory, transport) = setup();

        let result = notifier.process_reading(1, 75.0, t0()).await.unwrap();
        assert_matches!(result, AlertDispatch::Suppressed(SuppressReason::NoThresholdCrossed));

        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert!(stored.preferences.last_sent_at.is_none());
        notifier.queue().drained().await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let (notifier, _, _) = setup();
        assert_matches!(
            notifier.process_reading(42, 10.0, t0()).await,
            Err(NotifyError::UserNotFound(42))
        );
        assert_matches!(
            notifier.send_lifecycle(42, MessageKind::Welcome).await,
            Err(NotifyError::UserNotFound(42))
        );
    }

    #[tokio::test]
    async fn lifecycle_messages_ignore_cooldown_and_email_switch() {
        let (notifier, directory, transport) = setup();

        let mut ada = directory.find_by_id(1).await.unwrap().unwrap();
        ada.preferences.email_enabled = false;
        ada.preferences.last_sent_at = Some(Utc::now());
        directory.save(&ada).await.unwrap();

        for kind in [
            MessageKind::Welcome,
            MessageKind::Login,
            MessageKind::Logout,
            MessageKind::ProfileUpdated,
        ] {
            let handle = notifier.send_lifecycle(1, kind).await.unwrap();
            assert!(handle.outcome().await.is_ok());
        }

        assert_eq!(transport.calls().len(), 4);
        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.preferences.last_sent_at, ada.preferences.last_sent_at);
    }

    #[tokio::test]
    async fn alert_kinds_are_not_lifecycle() {
        let (notifier, _, _) = setup();
        assert_matches!(
            notifier.send_lifecycle(1, MessageKind::BadAirAlert).await,
            Err(NotifyError::NotLifecycle(MessageKind::BadAirAlert))
        );
    }

    #[tokio::test]
    async fn rejected_submission_does_not_start_cooldown() {
        let directory = Arc::new(InMemoryUserDirectory::with_users([User::new(
            1,
            "ada",
            "ada@example.com",
        )]));
        let transport = Arc::new(RecordingTransport::new());
        let queue = fast_queue(&transport, 16);
        queue.close();
        let notifier = Notifier::new(Arc::clone(&directory) as Arc<dyn UserDirectory>, queue);

        assert_matches!(
            notifier.process_reading(1, 150.0, t0()).await,
            Err(NotifyError::Queue(QueueError::Closed))
        );
        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert!(stored.preferences.last_sent_at.is_none());
    }

    #[tokio::test]
    async fn cooldown_starts_on_submit_even_if_delivery_fails() {
        let directory = Arc::new(InMemoryUserDirectory::with_users([User::new(
            1,
            "ada",
            "ada@example.com",
        )]));
        let transport = Arc::new(
            RecordingTransport::new().failing_on(MessageKind::BadAirAlert.subject()),
        );
        let notifier = Notifier::new(
            Arc::clone(&directory) as Arc<dyn UserDirectory>,
            fast_queue(&transport, 16),
        );

        let dispatch = notifier.process_reading(1, 180.0, t0()).await.unwrap();
        let handle = assert_matches!(
            dispatch,
            AlertDispatch::Submitted { template: AlertTemplate::Bad, handle } => handle
        );
        assert!(handle.outcome().await.is_err());

        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.preferences.last_sent_at, Some(t0()));
    }

    /// Directory whose writes always fail.
    struct ReadOnlyDirectory(InMemoryUserDirectory);

    #[async_trait]
    impl UserDirectory for ReadOnlyDirectory {
        async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DirectoryError> {
            self.0.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
            self.0.find_by_email(email).await
        }

        async fn save(&self, _user: &User) -> Result<(), DirectoryError> {
            Err(DirectoryError::Backend("read-only replica".to_string()))
        }
    }

    #[tokio::test]
    async fn save_failure_is_surfaced_but_message_still_sent() {
        let directory = Arc::new(ReadOnlyDirectory(InMemoryUserDirectory::with_users([
            User::new(1, "ada", "ada@example.com"),
        ])));
        let transport = Arc::new(RecordingTransport::new());
        let notifier = Notifier::new(directory, fast_queue(&transport, 16));

        assert_matches!(
            notifier.process_reading(1, 10.0, t0()).await,
            Err(NotifyError::Directory(DirectoryError::Backend(_)))
        );

        notifier.queue().drained().await;
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readings_fire_at_most_once() {
        let (notifier, _, transport) = setup();
        let notifier = Arc::new(notifier);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let notifier = Arc::clone(&notifier);
                tokio::spawn(async move { notifier.process_reading(1, 10.0, t0()).await })
            })
            .collect();

        let mut fired = 0;
        for task in tasks {
            if let AlertDispatch::Submitted { .. } = task.await.unwrap().unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);

        notifier.queue().drained().await;
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn update_preferences_merges_and_keeps_stamp() {
        let (notifier, directory, _) = setup();
        notifier.process_reading(1, 10.0, t0()).await.unwrap();

        let update = UpdateNotificationPreferences {
            bad_threshold: Some(150.0),
            cooldown_ms: Some(0),
            ..Default::default()
        };
        let prefs = notifier.update_preferences(1, &update).await.unwrap();
        assert_eq!(prefs.bad_threshold, 150.0);
        assert_eq!(prefs.cooldown_ms, 0);
        assert_eq!(prefs.last_sent_at, Some(t0()));

        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.preferences, prefs);
        assert_eq!(notifier.preferences(1).await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn invalid_update_is_rejected_and_not_saved() {
        let (notifier, directory, _) = setup();

        let update = UpdateNotificationPreferences {
            cooldown_ms: Some(-5),
            ..Default::default()
        };
        assert_matches!(
            notifier.update_preferences(1, &update).await,
            Err(NotifyError::Invalid(CoreError::Validation(_)))
        );

        let stored = directory.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.preferences, NotificationPreferences::default());
    }

    #[tokio::test]
    async fn submit_message_is_fire_and_forget() {
        let (notifier, _, transport) = setup();

        let handle = notifier
            .submit_message(message("Scheduled maintenance tonight"))
            .unwrap();
        drop(handle);

        notifier.queue().drained().await;
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].recipient, "ada@example.com");
        assert_eq!(calls[0].subject, "Scheduled maintenance tonight");
    }

    /// Directory whose lookups of user 1 wait until the gate is opened.
    struct GatedDirectory {
        inner: InMemoryUserDirectory,
        gate: Notify,
    }

    #[async_trait]
    impl UserDirectory for GatedDirectory {
        async fn find_by_id(&self, id: DbId) -> Result<Option<User>, DirectoryError> {
            if id == 1 {
                self.gate.notified().await;
            }
            self.inner.find_by_id(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
            self.inner.find_by_email(email).await
        }

        async fn save(&self, user: &User) -> Result<(), DirectoryError> {
            self.inner.save(user).await
        }
    }

    #[tokio::test]
    async fn readings_for_different_users_do_not_wait_on_each_other() {
        let directory = Arc::new(GatedDirectory {
            inner: InMemoryUserDirectory::with_users([
                User::new(1, "ada", "ada@example.com"),
                User::new(2, "bob", "bob@example.com"),
            ]),
            gate: Notify::new(),
        });
        let transport = Arc::new(RecordingTransport::new());
        let notifier = Arc::new(Notifier::new(
            Arc::clone(&directory) as Arc<dyn UserDirectory>,
            fast_queue(&transport, 16),
        ));

        let stuck = tokio::spawn({
            let notifier = Arc::clone(&notifier);
            async move { notifier.process_reading(1, 10.0, t0()).await }
        });
        tokio::task::yield_now().await;

        let other = tokio::time::timeout(
            Duration::from_secs(1),
            notifier.process_reading(2, 10.0, t0()),
        )
        .await;
        assert_matches!(other, Ok(Ok(AlertDispatch::Submitted { .. })));

        directory.gate.notify_one();
        assert_matches!(stuck.await.unwrap(), Ok(AlertDispatch::Submitted { .. }));

        notifier.queue().drained().await;
        let recipients: Vec<_> = transport.calls().into_iter().map(|c| c.recipient).collect();
        assert_eq!(recipients, vec!["bob@example.com", "ada@example.com"]);
    }

    #[test]
    fn evaluate_alert_delegates_to_policy() {
        let prefs = NotificationPreferences::default();
        assert!(Notifier::evaluate_alert(&prefs, 100.0, t0()).is_fire());
    }
}
