//! The bank account aggregate.
//!
//! [`Account`] is a pure state machine: commands validate against current
//! state and raise exactly one event (or nothing, for idempotent no-ops);
//! state is always the fold of the event history. Nothing in this module
//! performs I/O.
//!
//! Commands that would violate an invariant fail with a typed
//! [`AccountError`]; the distinction between a malformed argument and an
//! operation the current status forbids is preserved so the surface can map
//! them to different responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    event::{
        AccountEvent, AccountHolderNameChanged, BankAccountOpened, FeeApplied, MoneyDeposited,
        MoneyWithdrawn, NewEvent, OverdraftLimitChanged, RecordedEvent,
    },
    money::{Money, MoneyError},
};

/// Lifecycle status of a bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Pre-opening, in-memory only; never recorded and never projected.
    New,
    /// Fully operational; the only status that permits withdrawals.
    Open,
    /// Deposits and fees allowed; withdrawals, limit changes, and closing
    /// blocked.
    Frozen,
    /// Terminal, except for a no-op re-close.
    Closed,
}

impl AccountStatus {
    /// Canonical string form, as written to the read model.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Open => "Open",
            Self::Frozen => "Frozen",
            Self::Closed => "Closed",
        }
    }
}

/// A command was rejected by the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("account id must not be nil")]
    NilAccountId,
    #[error("account holder name must not be empty")]
    EmptyHolderName,
    #[error("overdraft limit must not be negative")]
    NegativeOverdraftLimit,
    #[error("initial balance must not be negative")]
    NegativeInitialBalance,
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error(transparent)]
    CurrencyMismatch(#[from] MoneyError),
    #[error("account has not been opened")]
    NotOpened,
    #[error("account is frozen")]
    Frozen,
    #[error("account is not frozen")]
    NotFrozen,
    #[error("account is closed")]
    Closed,
    #[error("unfreeze the account before closing it")]
    CloseWhileFrozen,
    #[error("cannot close an account with a non-zero balance of {balance}")]
    NonZeroBalance { balance: Money },
    #[error("withdrawal of {requested} exceeds the available {available}")]
    InsufficientFunds {
        requested: Money,
        available: Decimal,
    },
    #[error("overdraft limit {limit} does not cover the current exposure {exposure}")]
    LimitBelowExposure { limit: Decimal, exposure: Decimal },
}

impl AccountError {
    /// Whether the rejection was caused by a malformed argument, as opposed
    /// to an operation the current state forbids.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::NilAccountId
                | Self::EmptyHolderName
                | Self::NegativeOverdraftLimit
                | Self::NegativeInitialBalance
                | Self::NonPositiveAmount
        )
    }
}

/// The event history is not a valid account stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("cannot rebuild an account from an empty history")]
    EmptyHistory,
    #[error("event stream is not contiguous: expected version {expected}, found {found}")]
    NonContiguous { expected: i64, found: i64 },
}

/// Bank account state, reconstituted per command from its event stream.
///
/// `version` equals the number of applied events minus one (`-1` before the
/// opening event). Events raised by commands accumulate in an uncommitted
/// buffer until the repository drains them.
#[derive(Debug, Clone)]
pub struct Account {
    id: Uuid,
    holder_name: String,
    status: AccountStatus,
    balance: Money,
    overdraft_limit: Decimal,
    version: i64,
    uncommitted: Vec<NewEvent>,
}

impl Account {
    fn blank(id: Uuid) -> Self {
        Self {
            id,
            holder_name: String::new(),
            status: AccountStatus::New,
            balance: Money::zero(""),
            overdraft_limit: Decimal::ZERO,
            version: -1,
            uncommitted: Vec::new(),
        }
    }

    /// Open a fresh account. The first (and only) raised event is
    /// `BankAccountOpened`.
    ///
    /// # Errors
    ///
    /// Rejects a nil id, an empty holder name, a negative overdraft limit,
    /// and a negative initial balance.
    pub fn open(
        id: Uuid,
        holder_name: impl Into<String>,
        overdraft_limit: Decimal,
        initial_balance: Money,
        occurred_on: Option<DateTime<Utc>>,
    ) -> Result<Self, AccountError> {
        let holder_name = holder_name.into();
        if id.is_nil() {
            return Err(AccountError::NilAccountId);
        }
        if holder_name.trim().is_empty() {
            return Err(AccountError::EmptyHolderName);
        }
        if overdraft_limit < Decimal::ZERO {
            return Err(AccountError::NegativeOverdraftLimit);
        }
        if initial_balance.amount < Decimal::ZERO {
            return Err(AccountError::NegativeInitialBalance);
        }

        let mut account = Self::blank(id);
        account.raise(
            AccountEvent::Opened(BankAccountOpened {
                account_holder: holder_name,
                overdraft_limit,
                initial_balance,
            }),
            occurred_on,
        );
        Ok(account)
    }

    /// Rebuild an account by replaying its recorded history in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if the history is empty or its per-stream
    /// versions are not the contiguous sequence `0, 1, ..`.
    pub fn from_history(
        history: impl IntoIterator<Item = RecordedEvent>,
    ) -> Result<Self, ReplayError> {
        let mut account: Option<Self> = None;

        for recorded in history {
            let target = account.get_or_insert_with(|| Self::blank(recorded.stream_id));
            let expected = target.version + 1;
            if recorded.version != expected {
                return Err(ReplayError::NonContiguous {
                    expected,
                    found: recorded.version,
                });
            }
            target.apply(&recorded.event);
        }

        account.ok_or(ReplayError::EmptyHistory)
    }

    /// Deposit money. Allowed while the account is open or frozen.
    ///
    /// # Errors
    ///
    /// Rejects non-positive amounts, a currency other than the account's,
    /// and accounts that are closed or not yet opened.
    pub fn deposit(&mut self, amount: Money) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open | AccountStatus::Frozen => {}
        }
        self.check_amount(&amount)?;

        self.raise(AccountEvent::Deposited(MoneyDeposited { amount }), None);
        Ok(())
    }

    /// Withdraw money. Allowed only while the account is open, and only up
    /// to the balance plus the overdraft limit.
    ///
    /// # Errors
    ///
    /// Rejects non-positive amounts, currency mismatches, withdrawals from
    /// anything but an open account, and amounts exceeding the available
    /// funds.
    pub fn withdraw(&mut self, amount: Money) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Frozen => return Err(AccountError::Frozen),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open => {}
        }
        self.check_amount(&amount)?;

        let available = self.available_to_withdraw();
        if available < amount.amount {
            return Err(AccountError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        self.raise(AccountEvent::Withdrawn(MoneyWithdrawn { amount }), None);
        Ok(())
    }

    /// Freeze an open account.
    ///
    /// # Errors
    ///
    /// Rejects accounts that are not currently open.
    pub fn freeze(&mut self) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Frozen => return Err(AccountError::Frozen),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open => {}
        }
        self.raise(AccountEvent::Frozen, None);
        Ok(())
    }

    /// Unfreeze a frozen account.
    ///
    /// # Errors
    ///
    /// Rejects accounts that are not currently frozen.
    pub fn unfreeze(&mut self) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Open => return Err(AccountError::NotFrozen),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Frozen => {}
        }
        self.raise(AccountEvent::Unfrozen, None);
        Ok(())
    }

    /// Close an open account with a zero balance. Closing an already-closed
    /// account is a no-op.
    ///
    /// # Errors
    ///
    /// A frozen account must be unfrozen first; a non-zero balance blocks
    /// closing.
    pub fn close(&mut self) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Frozen => return Err(AccountError::CloseWhileFrozen),
            AccountStatus::Closed => return Ok(()),
            AccountStatus::Open => {}
        }
        if self.balance.amount != Decimal::ZERO {
            return Err(AccountError::NonZeroBalance {
                balance: self.balance.clone(),
            });
        }
        self.raise(AccountEvent::Closed, None);
        Ok(())
    }

    /// Change the overdraft limit of an open account. Setting the current
    /// value again is a no-op.
    ///
    /// # Errors
    ///
    /// The new limit must be non-negative and must still cover a negative
    /// balance; frozen and closed accounts reject the change.
    pub fn change_overdraft_limit(&mut self, new_limit: Decimal) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Frozen => return Err(AccountError::Frozen),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open => {}
        }
        if new_limit < Decimal::ZERO {
            return Err(AccountError::NegativeOverdraftLimit);
        }
        if self.balance.amount < Decimal::ZERO && new_limit < self.balance.amount.abs() {
            return Err(AccountError::LimitBelowExposure {
                limit: new_limit,
                exposure: self.balance.amount.abs(),
            });
        }
        if new_limit == self.overdraft_limit {
            return Ok(());
        }

        self.raise(
            AccountEvent::OverdraftLimitChanged(OverdraftLimitChanged {
                new_overdraft_limit: new_limit,
            }),
            None,
        );
        Ok(())
    }

    /// Rename the account holder. Setting the current name again is a no-op.
    ///
    /// # Errors
    ///
    /// The name must be non-empty; closed accounts reject the change.
    pub fn change_holder_name(&mut self, new_name: impl Into<String>) -> Result<(), AccountError> {
        let new_name = new_name.into();
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open | AccountStatus::Frozen => {}
        }
        if new_name.trim().is_empty() {
            return Err(AccountError::EmptyHolderName);
        }
        if new_name == self.holder_name {
            return Ok(());
        }

        self.raise(
            AccountEvent::HolderNameChanged(AccountHolderNameChanged {
                new_account_holder_name: new_name,
            }),
            None,
        );
        Ok(())
    }

    /// Apply a fee. Allowed while the account is open or frozen; fees may
    /// push the balance below zero regardless of the overdraft limit.
    ///
    /// # Errors
    ///
    /// Rejects non-positive amounts, currency mismatches, and closed or
    /// unopened accounts.
    pub fn apply_fee(&mut self, amount: Money, reason: impl Into<String>) -> Result<(), AccountError> {
        match self.status {
            AccountStatus::New => return Err(AccountError::NotOpened),
            AccountStatus::Closed => return Err(AccountError::Closed),
            AccountStatus::Open | AccountStatus::Frozen => {}
        }
        self.check_amount(&amount)?;

        self.raise(
            AccountEvent::FeeApplied(FeeApplied {
                fee_amount: amount,
                reason: reason.into(),
            }),
            None,
        );
        Ok(())
    }

    fn check_amount(&self, amount: &Money) -> Result<(), AccountError> {
        if amount.amount <= Decimal::ZERO {
            return Err(AccountError::NonPositiveAmount);
        }
        if amount.currency != self.balance.currency {
            return Err(AccountError::CurrencyMismatch(
                MoneyError::CurrencyMismatch {
                    left: self.balance.currency.clone(),
                    right: amount.currency.clone(),
                },
            ));
        }
        Ok(())
    }

    fn raise(&mut self, event: AccountEvent, occurred_on: Option<DateTime<Utc>>) {
        self.apply(&event);
        let wrapped = match occurred_on {
            Some(at) => NewEvent::at(event, at),
            None => NewEvent::now(event),
        };
        self.uncommitted.push(wrapped);
    }

    /// Fold one event into the state. Total over the closed event set; every
    /// application advances the version by one.
    fn apply(&mut self, event: &AccountEvent) {
        match event {
            AccountEvent::Opened(payload) => {
                self.holder_name = payload.account_holder.clone();
                self.overdraft_limit = payload.overdraft_limit;
                self.balance = payload.initial_balance.clone();
                self.status = AccountStatus::Open;
            }
            AccountEvent::Deposited(payload) => {
                self.balance.amount += payload.amount.amount;
            }
            AccountEvent::Withdrawn(payload) => {
                self.balance.amount -= payload.amount.amount;
            }
            AccountEvent::Frozen => self.status = AccountStatus::Frozen,
            AccountEvent::Unfrozen => self.status = AccountStatus::Open,
            AccountEvent::Closed => self.status = AccountStatus::Closed,
            AccountEvent::OverdraftLimitChanged(payload) => {
                self.overdraft_limit = payload.new_overdraft_limit;
            }
            AccountEvent::HolderNameChanged(payload) => {
                self.holder_name = payload.new_account_holder_name.clone();
            }
            AccountEvent::FeeApplied(payload) => {
                self.balance.amount -= payload.fee_amount.amount;
            }
        }
        self.version += 1;
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    #[must_use]
    pub const fn status(&self) -> AccountStatus {
        self.status
    }

    #[must_use]
    pub const fn balance(&self) -> &Money {
        &self.balance
    }

    #[must_use]
    pub const fn overdraft_limit(&self) -> Decimal {
        self.overdraft_limit
    }

    /// Per-stream version of the last applied event; `-1` before opening.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// How much can currently be withdrawn: balance plus overdraft limit.
    #[must_use]
    pub fn available_to_withdraw(&self) -> Decimal {
        self.balance.amount + self.overdraft_limit
    }

    /// Events raised since the last save, in raise order.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[NewEvent] {
        &self.uncommitted
    }

    /// Drain the uncommitted buffer for persistence.
    pub fn take_uncommitted(&mut self) -> Vec<NewEvent> {
        std::mem::take(&mut self.uncommitted)
    }
}
