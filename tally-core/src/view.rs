//! Read model contract.
//!
//! The query side keeps one row per account plus a checkpoint per projector
//! identity. Rows carry the highest aggregate version they reflect; every
//! update is guarded by that version so replays (the projector is
//! at-least-once) are no-ops the second time around.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::event::FeedEvent;

/// One account's row in the query model.
///
/// `available_to_withdraw` is denormalized as `balance_amount +
/// overdraft_limit`; `version` is the highest aggregate version reflected.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalanceRow {
    pub account_id: Uuid,
    pub holder_name: String,
    pub status: String,
    pub balance_amount: Decimal,
    pub balance_currency: String,
    pub overdraft_limit: Decimal,
    pub available_to_withdraw: Decimal,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Error from read model operations.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The underlying storage failed; possibly transient.
    #[error("read model storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ViewError {
    /// Wrap a backend error as a storage failure.
    pub fn storage(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(error))
    }
}

/// The account-balance read model, as the projector drives it.
///
/// `apply` must be atomic over the batch and idempotent per row: an event
/// whose version is not greater than the row's stored version changes
/// nothing.
pub trait BalanceView: Send + Sync {
    /// Current checkpoint for a projector, creating it at position 0 when
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Storage`] on backend failures.
    fn checkpoint<'a>(
        &'a self,
        projector_name: &'a str,
    ) -> impl Future<Output = Result<i64, ViewError>> + Send + 'a;

    /// Apply a batch of feed events atomically and idempotently.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Storage`] on backend failures; nothing from the
    /// batch is visible afterwards.
    fn apply<'a>(
        &'a self,
        batch: &'a [FeedEvent],
    ) -> impl Future<Output = Result<(), ViewError>> + Send + 'a;

    /// Durably advance a projector's checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Storage`] on backend failures.
    fn save_checkpoint<'a>(
        &'a self,
        projector_name: &'a str,
        position: i64,
    ) -> impl Future<Output = Result<(), ViewError>> + Send + 'a;
}

pub mod inmemory;
