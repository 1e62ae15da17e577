//! Tally: an event-sourced bank account service.
//!
//! Every state change to an account is an immutable event in an append-only
//! store with per-stream optimistic concurrency; a checkpointed background
//! projector folds the globally ordered feed into a query-optimized balance
//! view. Commands go through the aggregate, queries go to the read model,
//! and the two meet only in the event log.
//!
//! # Example
//!
//! ```
//! use tally::{AccountService, Money, store::inmemory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tally::ServiceError> {
//! let service = AccountService::new(inmemory::Store::new());
//! let id = uuid::Uuid::new_v4();
//!
//! service
//!     .open_account(
//!         id,
//!         "Alice",
//!         "500.00".parse().unwrap(),
//!         Money::new("1000.00".parse().unwrap(), "USD"),
//!     )
//!     .await?;
//! service
//!     .deposit(id, Money::new("250.00".parse().unwrap(), "USD"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The `postgres` feature adds the production backends in [`postgres`].

pub use tally_core::{
    account::{Account, AccountError, AccountStatus},
    codec,
    event::{AccountEvent, FeedEvent, NewEvent, RecordedEvent},
    money::{Money, MoneyError},
    projector::{Projector, ProjectorError},
    repository::{Repository, RepositoryError},
    service::{AccountService, ErrorKind, ServiceError},
};

pub mod store {
    pub use tally_core::store::{
        AppendResult, ConcurrencyConflict, EventStore, NonEmpty, StoreError, inmemory,
    };
}

pub mod view {
    pub use tally_core::view::{AccountBalanceRow, BalanceView, ViewError, inmemory};
}

#[cfg(feature = "postgres")]
pub mod postgres {
    pub use tally_postgres::{
        Config, ConfigError, CurrencyTotal, DEFAULT_PROJECTOR_NAME, Error, ListQuery,
        OverdrawnAccount, SortColumn, SortDirection, StatusCount, Store, Summary, View,
    };
}
