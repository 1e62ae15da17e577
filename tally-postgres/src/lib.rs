//! PostgreSQL backends for the Tally banking service.
//!
//! This crate provides the production implementations of the core
//! contracts:
//!
//! - [`Store`] - an implementation of
//!   [`tally_core::store::EventStore`]
//! - [`View`] - an implementation of
//!   [`tally_core::view::BalanceView`], plus the query surface
//!
//! Both take an existing [`sqlx::PgPool`]; the event store and the read
//! model are typically separate databases (see [`Config`]), but nothing
//! stops them from sharing one in development.

pub mod config;
pub mod store;
pub mod view;

pub use config::{Config, ConfigError, DEFAULT_PROJECTOR_NAME};
pub use store::Store;
pub use view::{
    CurrencyTotal, ListQuery, OverdrawnAccount, SortColumn, SortDirection, StatusCount, Summary,
    View,
};

/// Postgres-specific failure conditions, surfaced through the core error
/// types as storage failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stream version does not fit the `INT` column storing it.
    #[error("stream version {0} does not fit the events.version column")]
    VersionOutOfRange(i64),
    /// An insert with `RETURNING` produced no rows.
    #[error("database did not return inserted rows")]
    MissingReturnedRows,
}
