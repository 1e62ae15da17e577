//! Command surface over the aggregate repository.
//!
//! [`AccountService`] is the thin adapter an HTTP (or any other) frontend
//! talks to: one method per aggregate command, a uniform error type, and an
//! [`ErrorKind`] classification the frontend maps onto its own status codes.
//! The service never retries on its own; [`AccountService::execute_with_retry`]
//! exists for callers that want the standard reload-reapply-resave loop with
//! a bound on attempts.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    account::{Account, AccountError},
    money::Money,
    repository::{Repository, RepositoryError},
    store::{EventStore, StoreError},
};

/// Coarse classification of a [`ServiceError`] for surface mapping.
///
/// `InvalidArgument`, `InvalidState`, and `CurrencyMismatch` are client
/// errors; `NotFound` is a lookup miss; `ConcurrencyConflict` is retry-safe;
/// `Codec` and `Storage` are server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    CurrencyMismatch,
    NotFound,
    ConcurrencyConflict,
    Codec,
    Storage,
}

/// Error from command execution.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("account {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Classify this error for the surface's status mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Account(AccountError::CurrencyMismatch(_)) => ErrorKind::CurrencyMismatch,
            Self::Account(error) if error.is_invalid_argument() => ErrorKind::InvalidArgument,
            Self::Account(_) => ErrorKind::InvalidState,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Repository(RepositoryError::Store(StoreError::Conflict(_))) => {
                ErrorKind::ConcurrencyConflict
            }
            Self::Repository(RepositoryError::Store(StoreError::Codec(_))) => ErrorKind::Codec,
            Self::Repository(
                RepositoryError::Store(StoreError::Storage(_)) | RepositoryError::Replay(_),
            ) => ErrorKind::Storage,
        }
    }
}

fn no_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Command-side entry point: load, execute, save.
#[derive(Clone)]
pub struct AccountService<S> {
    repository: Repository<S>,
}

impl<S> AccountService<S> {
    pub const fn new(store: S) -> Self {
        Self {
            repository: Repository::new(store),
        }
    }

    /// Access the underlying repository.
    pub const fn repository(&self) -> &Repository<S> {
        &self.repository
    }
}

impl<S: EventStore> AccountService<S> {
    /// Open a new account.
    ///
    /// # Errors
    ///
    /// Argument validation fails with client-mappable errors; a stream that
    /// already exists under `id` surfaces as a concurrency conflict.
    #[tracing::instrument(skip(self, holder_name, initial_balance))]
    pub async fn open_account(
        &self,
        id: Uuid,
        holder_name: &str,
        overdraft_limit: Decimal,
        initial_balance: Money,
    ) -> Result<(), ServiceError> {
        let mut account = Account::open(id, holder_name, overdraft_limit, initial_balance, None)?;
        self.repository.save(&mut account, &no_metadata()).await?;
        Ok(())
    }

    /// Load the account, run `command` against it, and save the outcome.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for unknown accounts; aggregate rejections
    /// and store failures pass through.
    pub async fn execute<F>(&self, id: Uuid, command: F) -> Result<(), ServiceError>
    where
        F: Fn(&mut Account) -> Result<(), AccountError>,
    {
        let mut account = self
            .repository
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;
        command(&mut account)?;
        self.repository.save(&mut account, &no_metadata()).await?;
        Ok(())
    }

    /// Like [`Self::execute`], retrying up to `attempts` times on
    /// concurrency conflicts (fresh reload each attempt).
    ///
    /// # Errors
    ///
    /// The final conflict is returned once attempts are exhausted -
    /// persistent conflicts mean a hot aggregate, and backing off belongs to
    /// the caller. All other errors return immediately.
    pub async fn execute_with_retry<F>(
        &self,
        id: Uuid,
        attempts: u32,
        command: F,
    ) -> Result<(), ServiceError>
    where
        F: Fn(&mut Account) -> Result<(), AccountError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.execute(id, &command).await {
                Err(error)
                    if error.kind() == ErrorKind::ConcurrencyConflict && attempt < attempts =>
                {
                    tracing::debug!(%id, attempt, "concurrency conflict, retrying");
                }
                outcome => return outcome,
            }
        }
    }

    /// Deposit money into an account.
    ///
    /// # Errors
    ///
    /// See [`Account::deposit`].
    pub async fn deposit(&self, id: Uuid, amount: Money) -> Result<(), ServiceError> {
        self.execute(id, move |account| account.deposit(amount.clone()))
            .await
    }

    /// Withdraw money from an account.
    ///
    /// # Errors
    ///
    /// See [`Account::withdraw`].
    pub async fn withdraw(&self, id: Uuid, amount: Money) -> Result<(), ServiceError> {
        self.execute(id, move |account| account.withdraw(amount.clone()))
            .await
    }

    /// Freeze an account.
    ///
    /// # Errors
    ///
    /// See [`Account::freeze`].
    pub async fn freeze(&self, id: Uuid) -> Result<(), ServiceError> {
        self.execute(id, Account::freeze).await
    }

    /// Unfreeze an account.
    ///
    /// # Errors
    ///
    /// See [`Account::unfreeze`].
    pub async fn unfreeze(&self, id: Uuid) -> Result<(), ServiceError> {
        self.execute(id, Account::unfreeze).await
    }

    /// Close an account.
    ///
    /// # Errors
    ///
    /// See [`Account::close`].
    pub async fn close(&self, id: Uuid) -> Result<(), ServiceError> {
        self.execute(id, Account::close).await
    }

    /// Change an account's overdraft limit.
    ///
    /// # Errors
    ///
    /// See [`Account::change_overdraft_limit`].
    pub async fn change_overdraft_limit(
        &self,
        id: Uuid,
        new_limit: Decimal,
    ) -> Result<(), ServiceError> {
        self.execute(id, move |account| account.change_overdraft_limit(new_limit))
            .await
    }

    /// Rename the account holder.
    ///
    /// # Errors
    ///
    /// See [`Account::change_holder_name`].
    pub async fn change_holder_name(&self, id: Uuid, new_name: &str) -> Result<(), ServiceError> {
        self.execute(id, move |account| account.change_holder_name(new_name))
            .await
    }

    /// Apply a fee to an account.
    ///
    /// # Errors
    ///
    /// See [`Account::apply_fee`].
    pub async fn apply_fee(
        &self,
        id: Uuid,
        amount: Money,
        reason: &str,
    ) -> Result<(), ServiceError> {
        self.execute(id, move |account| account.apply_fee(amount.clone(), reason))
            .await
    }
}
