//! In-memory read model for tests.
//!
//! Applies the same version-guarded updates the SQL implementation performs,
//! so projector semantics (idempotency in particular) can be exercised
//! without a database.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    account::AccountStatus,
    event::{AccountEvent, FeedEvent},
    view::{AccountBalanceRow, BalanceView, ViewError},
};

/// In-memory [`BalanceView`].
#[derive(Clone, Default)]
pub struct View {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<Uuid, AccountBalanceRow>,
    checkpoints: HashMap<String, i64>,
}

impl View {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one account's row, if projected.
    #[must_use]
    pub fn row(&self, account_id: Uuid) -> Option<AccountBalanceRow> {
        self.inner
            .read()
            .expect("in-memory view lock poisoned")
            .rows
            .get(&account_id)
            .cloned()
    }

    /// Number of projected rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("in-memory view lock poisoned")
            .rows
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply_one(rows: &mut HashMap<Uuid, AccountBalanceRow>, feed: &FeedEvent) {
    if let AccountEvent::Opened(payload) = &feed.event {
        let fresh = AccountBalanceRow {
            account_id: feed.stream_id,
            holder_name: payload.account_holder.clone(),
            status: AccountStatus::Open.as_str().to_owned(),
            balance_amount: payload.initial_balance.amount,
            balance_currency: payload.initial_balance.currency.clone(),
            overdraft_limit: payload.overdraft_limit,
            available_to_withdraw: payload.initial_balance.amount + payload.overdraft_limit,
            version: feed.version,
            updated_at: Utc::now(),
        };
        match rows.get_mut(&feed.stream_id) {
            Some(row) if row.version >= feed.version => {}
            Some(row) => *row = fresh,
            None => {
                rows.insert(feed.stream_id, fresh);
            }
        }
        return;
    }

    // Every other event only updates an existing row, guarded by version.
    let Some(row) = rows.get_mut(&feed.stream_id) else {
        return;
    };
    if row.version >= feed.version {
        return;
    }

    match &feed.event {
        AccountEvent::Opened(_) => unreachable!("handled above"),
        AccountEvent::Deposited(payload) => {
            row.balance_amount += payload.amount.amount;
        }
        AccountEvent::Withdrawn(payload) => {
            row.balance_amount -= payload.amount.amount;
        }
        AccountEvent::FeeApplied(payload) => {
            row.balance_amount -= payload.fee_amount.amount;
        }
        AccountEvent::Frozen => {
            row.status = AccountStatus::Frozen.as_str().to_owned();
        }
        AccountEvent::Unfrozen => {
            row.status = AccountStatus::Open.as_str().to_owned();
        }
        AccountEvent::Closed => {
            row.status = AccountStatus::Closed.as_str().to_owned();
        }
        AccountEvent::OverdraftLimitChanged(payload) => {
            row.overdraft_limit = payload.new_overdraft_limit;
        }
        AccountEvent::HolderNameChanged(payload) => {
            row.holder_name = payload.new_account_holder_name.clone();
        }
    }
    row.available_to_withdraw = row.balance_amount + row.overdraft_limit;
    row.version = feed.version;
    row.updated_at = Utc::now();
}

impl BalanceView for View {
    async fn checkpoint<'a>(&'a self, projector_name: &'a str) -> Result<i64, ViewError> {
        let mut inner = self.inner.write().expect("in-memory view lock poisoned");
        let position = *inner
            .checkpoints
            .entry(projector_name.to_owned())
            .or_insert(0);
        Ok(position)
    }

    async fn apply<'a>(&'a self, batch: &'a [FeedEvent]) -> Result<(), ViewError> {
        let mut inner = self.inner.write().expect("in-memory view lock poisoned");
        for feed in batch {
            apply_one(&mut inner.rows, feed);
        }
        Ok(())
    }

    async fn save_checkpoint<'a>(
        &'a self,
        projector_name: &'a str,
        position: i64,
    ) -> Result<(), ViewError> {
        let mut inner = self.inner.write().expect("in-memory view lock poisoned");
        inner.checkpoints.insert(projector_name.to_owned(), position);
        Ok(())
    }
}
