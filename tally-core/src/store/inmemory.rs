//! In-memory event store for tests and examples.
//!
//! Thread-safe, with a global sequence counter so cross-stream consumers see
//! the same total order a production store would assign. Appends run each
//! event through the codec's encoder, keeping the wire schema honest even in
//! tests.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use nonempty::NonEmpty;
use uuid::Uuid;

use crate::{
    codec,
    event::{FeedEvent, NewEvent, RecordedEvent},
    store::{AppendResult, ConcurrencyConflict, EventStore, StoreError},
};

/// In-memory [`EventStore`] backed by a single global log.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    log: Vec<RecordedEvent>,
    next_position: i64,
}

impl Inner {
    fn stream_version(&self, stream_id: Uuid) -> i64 {
        self.log
            .iter()
            .filter(|recorded| recorded.stream_id == stream_id)
            .map(|recorded| recorded.version)
            .max()
            .unwrap_or(-1)
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current last version of a stream, `-1` when it has no events.
    #[must_use]
    pub fn stream_version(&self, stream_id: Uuid) -> i64 {
        self.inner
            .read()
            .expect("in-memory store lock poisoned")
            .stream_version(stream_id)
    }
}

impl EventStore for Store {
    #[tracing::instrument(skip(self))]
    async fn load(&self, stream_id: Uuid) -> Result<Vec<RecordedEvent>, StoreError> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        let mut events: Vec<RecordedEvent> = inner
            .log
            .iter()
            .filter(|recorded| recorded.stream_id == stream_id)
            .cloned()
            .collect();
        events.sort_by_key(|recorded| recorded.version);
        Ok(events)
    }

    #[tracing::instrument(skip(self, events, metadata), fields(event_count = events.len()))]
    async fn append<'a>(
        &'a self,
        stream_id: Uuid,
        expected_version: i64,
        events: NonEmpty<NewEvent>,
        metadata: &'a serde_json::Value,
    ) -> Result<AppendResult, StoreError> {
        // Encode up front so a codec failure cannot leave a partial batch.
        for pending in events.iter() {
            codec::encode(&pending.event)?;
        }

        let mut inner = self.inner.write().expect("in-memory store lock poisoned");

        let actual = inner.stream_version(stream_id);
        if actual != expected_version {
            tracing::debug!(%stream_id, expected_version, actual, "rejecting stale append");
            return Err(ConcurrencyConflict {
                stream_id,
                expected: expected_version,
                actual,
            }
            .into());
        }

        let mut last_version = expected_version;
        let mut last_position = inner.next_position;
        for (i, pending) in events.into_iter().enumerate() {
            inner.next_position += 1;
            let position = inner.next_position;
            let version = expected_version + 1 + i as i64;
            inner.log.push(RecordedEvent {
                event_id: Uuid::new_v4(),
                stream_id,
                version,
                event: pending.event,
                occurred_on: pending.occurred_on,
                metadata: metadata.clone(),
                recorded_at: Utc::now(),
                global_position: position,
            });
            last_version = version;
            last_position = position;
        }

        tracing::debug!(%stream_id, last_version, last_position, "events appended");
        Ok(AppendResult {
            last_version,
            last_position,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn load_since(&self, position: i64, limit: usize) -> Result<Vec<FeedEvent>, StoreError> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        let batch = inner
            .log
            .iter()
            .filter(|recorded| recorded.global_position > position)
            .take(limit)
            .map(FeedEvent::from)
            .collect();
        Ok(batch)
    }
}
