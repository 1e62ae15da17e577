//! Aggregate lifecycle against the event store.
//!
//! The repository owns the load-replay-save cycle: history comes out of the
//! store and folds into an [`Account`]; uncommitted events drain back in
//! with the version the aggregate was loaded at, so stale writers are
//! rejected by the store rather than silently merged.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    account::{Account, ReplayError},
    store::{EventStore, NonEmpty, StoreError},
};

/// Error from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Store errors pass through unchanged, conflicts included.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The stored history does not fold into a valid account.
    #[error("corrupt event stream: {0}")]
    Replay(#[from] ReplayError),
}

/// Loads and saves [`Account`] aggregates through an [`EventStore`].
#[derive(Clone)]
pub struct Repository<S> {
    store: S,
}

impl<S> Repository<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: EventStore> Repository<S> {
    /// Rehydrate an account from its history.
    ///
    /// Returns `None` when the stream has no events.
    ///
    /// # Errors
    ///
    /// Propagates store failures; a non-contiguous history surfaces as
    /// [`RepositoryError::Replay`].
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let history = self.store.load(id).await?;
        if history.is_empty() {
            return Ok(None);
        }
        let account = Account::from_history(history)?;
        Ok(Some(account))
    }

    /// Persist the aggregate's uncommitted events.
    ///
    /// The expected version is the aggregate's version minus the number of
    /// drained events: the version it was at when loaded. Saving with no
    /// uncommitted events is a no-op. On failure the drained events are
    /// gone; discard the aggregate and reload before retrying.
    ///
    /// # Errors
    ///
    /// A [`StoreError::Conflict`] propagates unchanged; retrying (reload,
    /// reapply, resave) is the caller's decision.
    #[tracing::instrument(skip(self, account, metadata), fields(account_id = %account.id()))]
    pub async fn save(
        &self,
        account: &mut Account,
        metadata: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let events = account.take_uncommitted();
        let Some(events) = NonEmpty::from_vec(events) else {
            tracing::trace!("nothing to save");
            return Ok(());
        };

        let expected_version = account.version() - events.len() as i64;
        self.store
            .append(account.id(), expected_version, events, metadata)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{account::AccountStatus, money::Money, store::inmemory};

    fn usd(amount: &str) -> Money {
        Money::new(amount.parse().unwrap(), "USD")
    }

    fn repository() -> Repository<inmemory::Store> {
        Repository::new(inmemory::Store::new())
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_stream() {
        let repo = repository();
        let account = repo.get(Uuid::new_v4()).await.unwrap();
        assert!(account.is_none());
    }

    #[tokio::test]
    async fn save_then_get_round_trips_state() {
        let repo = repository();
        let id = Uuid::new_v4();
        let mut account =
            Account::open(id, "Alice", "500.00".parse().unwrap(), usd("1000.00"), None).unwrap();
        account.deposit(usd("250.00")).unwrap();
        repo.save(&mut account, &json!({})).await.unwrap();

        let loaded = repo.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.holder_name(), "Alice");
        assert_eq!(loaded.status(), AccountStatus::Open);
        assert_eq!(loaded.balance(), &usd("1250.00"));
        assert_eq!(loaded.version(), 1);
    }

    #[tokio::test]
    async fn save_uses_the_loaded_version_as_expectation() {
        let repo = repository();
        let id = Uuid::new_v4();
        let mut account = Account::open(id, "Alice", "0".parse().unwrap(), usd("0"), None).unwrap();
        repo.save(&mut account, &json!({})).await.unwrap();

        // Two writers load the same version.
        let mut first = repo.get(id).await.unwrap().unwrap();
        let mut second = repo.get(id).await.unwrap().unwrap();

        first.deposit(usd("10.00")).unwrap();
        second.deposit(usd("20.00")).unwrap();

        repo.save(&mut first, &json!({})).await.unwrap();
        let err = repo.save(&mut second, &json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Store(StoreError::Conflict(_))
        ));

        // Exactly one deposit won.
        let settled = repo.get(id).await.unwrap().unwrap();
        assert_eq!(settled.balance(), &usd("10.00"));
        assert_eq!(settled.version(), 1);
    }

    #[tokio::test]
    async fn save_without_uncommitted_events_is_a_no_op() {
        let repo = repository();
        let id = Uuid::new_v4();
        let mut account = Account::open(id, "Alice", "0".parse().unwrap(), usd("0"), None).unwrap();
        repo.save(&mut account, &json!({})).await.unwrap();

        let mut reloaded = repo.get(id).await.unwrap().unwrap();
        repo.save(&mut reloaded, &json!({})).await.unwrap();

        assert_eq!(repo.store().stream_version(id), 0);
    }
}
