//! Checkpointed background projection of the event feed.
//!
//! The projector is the only writer of the read model (by convention - the
//! per-row version guards keep accidental duplicates harmless). It polls the
//! global feed from its checkpoint, applies each batch atomically, and only
//! then advances the checkpoint; a crash between the two replays the batch,
//! which the guards absorb. Delivery is therefore at-least-once.
//!
//! Transient storage failures back off and retry without advancing the
//! checkpoint. A codec failure halts the loop: the store holds events this
//! build cannot understand, and skipping them would corrupt the view.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::{
    store::{EventStore, StoreError},
    view::{BalanceView, ViewError},
};

/// Default number of feed events fetched per poll.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default sleep between polls that found nothing.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);
/// Default backoff after a failed batch.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Error from a projection cycle.
#[derive(Debug, Error)]
pub enum ProjectorError {
    /// Reading the feed failed.
    #[error("event feed failure: {0}")]
    Feed(#[from] StoreError),
    /// Updating the read model failed.
    #[error(transparent)]
    View(#[from] ViewError),
}

impl ProjectorError {
    /// Fatal errors stop the loop instead of being retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Feed(StoreError::Codec(_)))
    }
}

/// A named, long-lived worker folding the global feed into a [`BalanceView`].
pub struct Projector<S, V> {
    name: String,
    store: S,
    view: V,
    batch_size: usize,
    poll_interval: Duration,
    retry_backoff: Duration,
}

impl<S, V> Projector<S, V> {
    pub fn new(name: impl Into<String>, store: S, view: V) -> Self {
        Self {
            name: name.into(),
            store,
            view,
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Set how many feed events are fetched per poll.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the idle sleep between empty polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the backoff after a failed batch.
    #[must_use]
    pub const fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Stable identity this projector checkpoints under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S, V> Projector<S, V>
where
    S: EventStore,
    V: BalanceView,
{
    /// One poll-apply-checkpoint cycle. Returns how many events were
    /// applied; `0` means the feed was drained.
    ///
    /// The checkpoint is re-read every cycle, so a failed cycle retries from
    /// the last durable position.
    ///
    /// # Errors
    ///
    /// Feed and view failures propagate; the checkpoint is not advanced.
    pub async fn run_once(&self) -> Result<usize, ProjectorError> {
        let last_position = self.view.checkpoint(&self.name).await?;
        let batch = self.store.load_since(last_position, self.batch_size).await?;
        let Some(last) = batch.last() else {
            return Ok(0);
        };
        let max_position = last.global_position;

        self.view.apply(&batch).await?;
        self.view.save_checkpoint(&self.name, max_position).await?;

        tracing::debug!(
            projector = %self.name,
            applied = batch.len(),
            position = max_position,
            "batch projected"
        );
        Ok(batch.len())
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Cancellation is cooperative: the in-flight batch finishes (or rolls
    /// back inside the view) before the loop exits, never leaving a partial
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns the error that halted the loop; only fatal errors do (codec
    /// failures, which indicate schema drift and need operator attention).
    /// Transient failures are retried after [`Self::with_retry_backoff`].
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProjectorError> {
        tracing::info!(projector = %self.name, "projector started");

        while !*shutdown.borrow() {
            match self.run_once().await {
                Ok(0) => {
                    if wait(self.poll_interval, &mut shutdown).await {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) if error.is_fatal() => {
                    tracing::error!(projector = %self.name, %error, "projector halted");
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(projector = %self.name, %error, "projection failed, backing off");
                    if wait(self.retry_backoff, &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        tracing::info!(projector = %self.name, "projector stopped");
        Ok(())
    }
}

/// Sleep for `period`, returning early (and `true`) on shutdown.
async fn wait(period: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        () = tokio::time::sleep(period) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::{
        account::Account,
        codec::CodecError,
        event::{FeedEvent, NewEvent, RecordedEvent},
        money::Money,
        repository::Repository,
        store::{AppendResult, NonEmpty, inmemory},
        view::{BalanceView as _, inmemory::View},
    };

    fn usd(amount: &str) -> Money {
        Money::new(amount.parse().unwrap(), "USD")
    }

    async fn seeded_store() -> (inmemory::Store, Uuid) {
        let store = inmemory::Store::new();
        let repo = Repository::new(store.clone());
        let id = Uuid::new_v4();
        let mut account =
            Account::open(id, "Alice", "500.00".parse().unwrap(), usd("1000.00"), None).unwrap();
        account.deposit(usd("250.00")).unwrap();
        account.withdraw(usd("300.00")).unwrap();
        repo.save(&mut account, &json!({})).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn run_once_projects_and_checkpoints() {
        let (store, id) = seeded_store().await;
        let view = View::new();
        let projector = Projector::new("balance", store, view.clone());

        assert_eq!(projector.run_once().await.unwrap(), 3);

        let row = view.row(id).unwrap();
        assert_eq!(row.balance_amount, "950.00".parse().unwrap());
        assert_eq!(row.version, 2);
        assert_eq!(view.checkpoint("balance").await.unwrap(), 3);

        // Feed drained.
        assert_eq!(projector.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replaying_a_batch_leaves_the_row_unchanged() {
        let (store, id) = seeded_store().await;
        let view = View::new();
        let projector = Projector::new("balance", store, view.clone());

        projector.run_once().await.unwrap();
        let first = view.row(id).unwrap();

        // Simulate a crash that lost the checkpoint advance.
        view.save_checkpoint("balance", 0).await.unwrap();
        projector.run_once().await.unwrap();
        let second = view.row(id).unwrap();

        assert_eq!(first.balance_amount, second.balance_amount);
        assert_eq!(first.version, second.version);
        assert_eq!(first.status, second.status);
    }

    #[tokio::test]
    async fn small_batches_drain_incrementally() {
        let (store, _) = seeded_store().await;
        let view = View::new();
        let projector = Projector::new("balance", store, view).with_batch_size(1);

        assert_eq!(projector.run_once().await.unwrap(), 1);
        assert_eq!(projector.run_once().await.unwrap(), 1);
        assert_eq!(projector.run_once().await.unwrap(), 1);
        assert_eq!(projector.run_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (store, _) = seeded_store().await;
        let projector = Projector::new("balance", store, View::new());
        let (stop, shutdown) = watch::channel(false);

        let task = tokio::spawn(async move { projector.run(shutdown).await });
        stop.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("projector should stop promptly")
            .unwrap()
            .unwrap();
    }

    /// Store double whose feed reports schema drift.
    #[derive(Clone)]
    struct DriftingStore;

    impl EventStore for DriftingStore {
        async fn load(&self, _stream_id: Uuid) -> Result<Vec<RecordedEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn append<'a>(
            &'a self,
            _stream_id: Uuid,
            _expected_version: i64,
            _events: NonEmpty<NewEvent>,
            _metadata: &'a serde_json::Value,
        ) -> Result<AppendResult, StoreError> {
            Err(StoreError::storage(std::io::Error::other("not used")))
        }

        async fn load_since(
            &self,
            _position: i64,
            _limit: usize,
        ) -> Result<Vec<FeedEvent>, StoreError> {
            Err(StoreError::Codec(CodecError::UnknownKind {
                kind: "AccountRenamed".to_owned(),
                expected: crate::codec::KINDS,
            }))
        }
    }

    #[tokio::test]
    async fn codec_errors_halt_the_loop() {
        let projector = Projector::new("balance", DriftingStore, View::new());
        let (_stop, shutdown) = watch::channel(false);

        let error = projector.run(shutdown).await.unwrap_err();
        assert!(error.is_fatal());
        assert!(matches!(
            error,
            ProjectorError::Feed(StoreError::Codec(CodecError::UnknownKind { .. }))
        ));
    }
}
