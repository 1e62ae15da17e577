//! The bank account event taxonomy and its envelopes.
//!
//! [`AccountEvent`] is the closed set of facts that can be recorded for an
//! account stream. The enum is the in-memory form; the on-wire form (one
//! canonical tag plus a JSON payload per variant) is owned by
//! [`codec`](crate::codec).
//!
//! Three envelopes wrap the domain event at different lifecycle stages:
//!
//! - [`NewEvent`] - raised by the aggregate, not yet persisted
//! - [`RecordedEvent`] - persisted, with identity, versions, and positions
//!   assigned by the store
//! - [`FeedEvent`] - the global-feed row the projector consumes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Payload of [`AccountEvent::Opened`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountOpened {
    #[serde(alias = "AccountHolder")]
    pub account_holder: String,
    #[serde(alias = "OverdraftLimit")]
    pub overdraft_limit: Decimal,
    #[serde(alias = "InitialBalance")]
    pub initial_balance: Money,
}

/// Payload of [`AccountEvent::Deposited`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyDeposited {
    #[serde(alias = "Amount")]
    pub amount: Money,
}

/// Payload of [`AccountEvent::Withdrawn`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyWithdrawn {
    #[serde(alias = "Amount")]
    pub amount: Money,
}

/// Payload of [`AccountEvent::OverdraftLimitChanged`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdraftLimitChanged {
    #[serde(alias = "NewOverdraftLimit")]
    pub new_overdraft_limit: Decimal,
}

/// Payload of [`AccountEvent::HolderNameChanged`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHolderNameChanged {
    #[serde(alias = "NewAccountHolderName")]
    pub new_account_holder_name: String,
}

/// Payload of [`AccountEvent::FeeApplied`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeApplied {
    #[serde(alias = "FeeAmount")]
    pub fee_amount: Money,
    #[serde(alias = "Reason")]
    pub reason: String,
}

/// A fact recorded against a bank account stream.
///
/// `Frozen`, `Unfrozen`, and `Closed` carry no payload beyond the stream id,
/// which lives in the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    Opened(BankAccountOpened),
    Deposited(MoneyDeposited),
    Withdrawn(MoneyWithdrawn),
    Frozen,
    Unfrozen,
    Closed,
    OverdraftLimitChanged(OverdraftLimitChanged),
    HolderNameChanged(AccountHolderNameChanged),
    FeeApplied(FeeApplied),
}

impl AccountEvent {
    /// The canonical on-wire tag for this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Opened(_) => "BankAccountOpened",
            Self::Deposited(_) => "MoneyDeposited",
            Self::Withdrawn(_) => "MoneyWithdrawn",
            Self::Frozen => "AccountFrozen",
            Self::Unfrozen => "AccountUnfrozen",
            Self::Closed => "AccountClosed",
            Self::OverdraftLimitChanged(_) => "OverdraftLimitChanged",
            Self::HolderNameChanged(_) => "AccountHolderNameChanged",
            Self::FeeApplied(_) => "FeeApplied",
        }
    }
}

/// An event raised by the aggregate that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event: AccountEvent,
    pub occurred_on: DateTime<Utc>,
}

impl NewEvent {
    /// Wrap an event stamped with the current time.
    #[must_use]
    pub fn now(event: AccountEvent) -> Self {
        Self {
            event,
            occurred_on: Utc::now(),
        }
    }

    /// Wrap an event with an explicit occurrence time.
    #[must_use]
    pub const fn at(event: AccountEvent, occurred_on: DateTime<Utc>) -> Self {
        Self { event, occurred_on }
    }
}

/// An event as returned by [`EventStore::load`](crate::store::EventStore::load).
///
/// Identity, per-stream version, `recorded_at`, and the global position are
/// assigned by the store at append time and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub event_id: Uuid,
    pub stream_id: Uuid,
    /// 0-based, gap-free position within the stream.
    pub version: i64,
    pub event: AccountEvent,
    pub occurred_on: DateTime<Utc>,
    /// Opaque JSON attached by the writer; never interpreted here.
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
    /// Strictly monotonic position across all streams.
    pub global_position: i64,
}

/// A row of the global feed, as returned by
/// [`EventStore::load_since`](crate::store::EventStore::load_since).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub global_position: i64,
    pub stream_id: Uuid,
    pub version: i64,
    pub event: AccountEvent,
}

impl From<&RecordedEvent> for FeedEvent {
    fn from(recorded: &RecordedEvent) -> Self {
        Self {
            global_position: recorded.global_position,
            stream_id: recorded.stream_id,
            version: recorded.version,
            event: recorded.event.clone(),
        }
    }
}
