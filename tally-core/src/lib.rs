//! Core types and contracts for the Tally event-sourced banking service.
//!
//! This crate holds everything that does not touch a database:
//!
//! - [`money`] - currency-tagged decimal arithmetic
//! - [`event`] - the account event taxonomy and its envelopes
//! - [`codec`] - the tag <-> payload schema registry (single source of truth
//!   for the wire format)
//! - [`account`] - the pure bank-account aggregate
//! - [`store`] - the event store contract and an in-memory implementation
//! - [`repository`] - aggregate load/replay/save against a store
//! - [`view`] - the read model contract and an in-memory implementation
//! - [`projector`] - the checkpointed feed consumer updating the read model
//! - [`service`] - the command surface and error-kind mapping
//!
//! Most users should depend on the [`tally`](https://docs.rs/tally) crate,
//! which re-exports these types together with the PostgreSQL backends.

pub mod account;
pub mod codec;
pub mod event;
pub mod money;
pub mod projector;
pub mod repository;
pub mod service;
pub mod store;
pub mod view;
