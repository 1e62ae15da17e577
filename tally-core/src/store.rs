//! Event persistence contract.
//!
//! [`EventStore`] is the append-only log the whole service hangs off:
//! per-stream optimistic appends on the write path, a globally ordered feed
//! on the read path. Implementations must keep per-stream versions 0-based
//! and contiguous, commit each append atomically, and assign a strictly
//! monotonic global position consistent with per-stream order.

use std::future::Future;

pub use nonempty::NonEmpty;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    codec::CodecError,
    event::{FeedEvent, NewEvent, RecordedEvent},
};

pub mod inmemory;

/// Another writer advanced the stream since it was loaded.
///
/// `actual` is the stream's current last version, `-1` for an empty stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "concurrency conflict on stream {stream_id}: expected version {expected}, found {actual} \
     (hint: reload and retry)"
)]
pub struct ConcurrencyConflict {
    pub stream_id: Uuid,
    pub expected: i64,
    pub actual: i64,
}

/// Error from event store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The expected version did not match the stream's actual version.
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),
    /// A stored event could not be translated; indicates schema drift and is
    /// not retryable.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The underlying storage failed; possibly transient.
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Wrap a backend error as a storage failure.
    pub fn storage(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(error))
    }
}

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResult {
    /// Per-stream version of the last event written.
    pub last_version: i64,
    /// Global position of the last event written.
    pub last_position: i64,
}

/// Append-only event log with per-stream optimistic concurrency and a
/// globally ordered feed.
pub trait EventStore: Send + Sync {
    /// Load the full history of one stream in ascending version order.
    ///
    /// An unknown stream yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if a stored event cannot be decoded and
    /// [`StoreError::Storage`] on backend failures.
    fn load(
        &self,
        stream_id: Uuid,
    ) -> impl Future<Output = Result<Vec<RecordedEvent>, StoreError>> + Send;

    /// Append events to a stream, expecting its current last version.
    ///
    /// `expected_version` is `-1` for a stream that must not exist yet.
    /// Events receive versions `expected_version + 1 + i`, fresh event ids,
    /// and store-assigned global positions; the batch commits atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the stream's actual version
    /// differs from `expected_version`, [`StoreError::Codec`] if an event
    /// cannot be encoded, and [`StoreError::Storage`] on backend failures.
    fn append<'a>(
        &'a self,
        stream_id: Uuid,
        expected_version: i64,
        events: NonEmpty<NewEvent>,
        metadata: &'a serde_json::Value,
    ) -> impl Future<Output = Result<AppendResult, StoreError>> + Send + 'a;

    /// Read the global feed: events with a position strictly greater than
    /// `position`, ascending, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if a stored event cannot be decoded and
    /// [`StoreError::Storage`] on backend failures.
    fn load_since(
        &self,
        position: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<FeedEvent>, StoreError>> + Send;
}
