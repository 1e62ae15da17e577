//! Stable mapping between event tags and payload schemas.
//!
//! This module is the single source of truth for the on-wire form of
//! [`AccountEvent`]: both the event store and the projector go through it.
//! The tag set is closed; renaming a tag or a payload field is a schema
//! migration, not a code cleanup.
//!
//! Payloads are JSON objects with camelCase keys. Decoding also accepts
//! PascalCase keys (the drift older writers produced) and is strict on tag
//! membership: an unrecognized tag is a hard error, because it signals that
//! the store holds events this build does not understand.

use thiserror::Error;

use crate::event::{
    AccountEvent, AccountHolderNameChanged, BankAccountOpened, FeeApplied, MoneyDeposited,
    MoneyWithdrawn, OverdraftLimitChanged,
};

/// The closed set of canonical event tags.
pub const KINDS: &[&str] = &[
    "BankAccountOpened",
    "MoneyDeposited",
    "MoneyWithdrawn",
    "AccountFrozen",
    "AccountUnfrozen",
    "AccountClosed",
    "OverdraftLimitChanged",
    "AccountHolderNameChanged",
    "FeeApplied",
];

/// Error translating between [`AccountEvent`] and its wire form.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stored tag is not a member of the closed set.
    #[error("unknown event type `{kind}`, expected one of {expected:?}")]
    UnknownKind {
        kind: String,
        expected: &'static [&'static str],
    },
    /// The payload does not match the schema for its tag.
    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

fn payload_error(kind: &'static str) -> impl FnOnce(serde_json::Error) -> CodecError {
    move |source| CodecError::Payload { kind, source }
}

/// Encode an event's payload as a JSON object.
///
/// Events without payload fields encode as `{}`; the stream id lives in the
/// envelope, not the payload.
///
/// # Errors
///
/// Returns [`CodecError::Payload`] if serialization fails.
pub fn encode(event: &AccountEvent) -> Result<serde_json::Value, CodecError> {
    let kind = event.kind();
    match event {
        AccountEvent::Opened(payload) => serde_json::to_value(payload),
        AccountEvent::Deposited(payload) => serde_json::to_value(payload),
        AccountEvent::Withdrawn(payload) => serde_json::to_value(payload),
        AccountEvent::Frozen | AccountEvent::Unfrozen | AccountEvent::Closed => {
            Ok(serde_json::Value::Object(serde_json::Map::new()))
        }
        AccountEvent::OverdraftLimitChanged(payload) => serde_json::to_value(payload),
        AccountEvent::HolderNameChanged(payload) => serde_json::to_value(payload),
        AccountEvent::FeeApplied(payload) => serde_json::to_value(payload),
    }
    .map_err(payload_error(kind))
}

/// Decode a stored payload back into an [`AccountEvent`].
///
/// # Errors
///
/// Returns [`CodecError::UnknownKind`] for tags outside the closed set and
/// [`CodecError::Payload`] when the payload does not match the tag's schema.
pub fn decode(kind: &str, payload: &serde_json::Value) -> Result<AccountEvent, CodecError> {
    match kind {
        "BankAccountOpened" => serde_json::from_value::<BankAccountOpened>(payload.clone())
            .map(AccountEvent::Opened)
            .map_err(payload_error("BankAccountOpened")),
        "MoneyDeposited" => serde_json::from_value::<MoneyDeposited>(payload.clone())
            .map(AccountEvent::Deposited)
            .map_err(payload_error("MoneyDeposited")),
        "MoneyWithdrawn" => serde_json::from_value::<MoneyWithdrawn>(payload.clone())
            .map(AccountEvent::Withdrawn)
            .map_err(payload_error("MoneyWithdrawn")),
        "AccountFrozen" => Ok(AccountEvent::Frozen),
        "AccountUnfrozen" => Ok(AccountEvent::Unfrozen),
        "AccountClosed" => Ok(AccountEvent::Closed),
        "OverdraftLimitChanged" => serde_json::from_value::<OverdraftLimitChanged>(payload.clone())
            .map(AccountEvent::OverdraftLimitChanged)
            .map_err(payload_error("OverdraftLimitChanged")),
        "AccountHolderNameChanged" => {
            serde_json::from_value::<AccountHolderNameChanged>(payload.clone())
                .map(AccountEvent::HolderNameChanged)
                .map_err(payload_error("AccountHolderNameChanged"))
        }
        "FeeApplied" => serde_json::from_value::<FeeApplied>(payload.clone())
            .map(AccountEvent::FeeApplied)
            .map_err(payload_error("FeeApplied")),
        other => Err(CodecError::UnknownKind {
            kind: other.to_owned(),
            expected: KINDS,
        }),
    }
}
