//! Integration tests for the PostgreSQL event store.
//!
//! These tests require Docker to be running and spin up a PostgreSQL
//! container using testcontainers.

use nonempty::NonEmpty;
use serde_json::json;
use sqlx::PgPool;
use tally_core::{
    event::{AccountEvent, BankAccountOpened, MoneyDeposited, NewEvent},
    money::Money,
    store::{EventStore, StoreError},
};
use tally_postgres::Store;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

struct TestDb {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestDb {
    async fn new() -> Self {
        let container = Postgres::default().start().await.unwrap();
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();

        let connection_string = format!("postgres://postgres:postgres@{host}:{port}/postgres");
        let pool = PgPool::connect(&connection_string).await.unwrap();

        Self {
            _container: container,
            pool,
        }
    }

    async fn store(&self) -> Store {
        let store = Store::new(self.pool.clone());
        store.migrate().await.unwrap();
        store
    }
}

fn usd(amount: &str) -> Money {
    Money::new(amount.parse().unwrap(), "USD")
}

fn opened(holder: &str, limit: &str, initial: &str) -> NewEvent {
    NewEvent::now(AccountEvent::Opened(BankAccountOpened {
        account_holder: holder.to_owned(),
        overdraft_limit: limit.parse().unwrap(),
        initial_balance: usd(initial),
    }))
}

fn deposited(amount: &str) -> NewEvent {
    NewEvent::now(AccountEvent::Deposited(MoneyDeposited { amount: usd(amount) }))
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let db = TestDb::new().await;
    let store = Store::new(db.pool.clone());

    store.migrate().await.unwrap();
    store.migrate().await.unwrap();

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 'events')",
    )
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert!(exists);
}

#[tokio::test]
async fn append_then_load_round_trips_every_field() {
    let db = TestDb::new().await;
    let store = db.store().await;
    let stream = Uuid::new_v4();
    let batch = vec![
        opened("Alice", "500.00", "1000.00"),
        deposited("250.00"),
        deposited("17.50"),
    ];
    let metadata = json!({"source": "integration-test"});

    let result = store
        .append(
            stream,
            -1,
            NonEmpty::from_vec(batch.clone()).unwrap(),
            &metadata,
        )
        .await
        .unwrap();
    assert_eq!(result.last_version, 2);

    let history = store.load(stream).await.unwrap();
    assert_eq!(history.len(), 3);
    for (i, (recorded, pending)) in history.iter().zip(&batch).enumerate() {
        assert_eq!(recorded.stream_id, stream);
        assert_eq!(recorded.version, i as i64);
        assert_eq!(recorded.event, pending.event);
        assert_eq!(recorded.metadata, metadata);
        // TIMESTAMPTZ stores microseconds; allow for the rounding.
        let drift = (recorded.occurred_on - pending.occurred_on).abs();
        assert!(drift < chrono::Duration::milliseconds(1));
    }
    assert_eq!(history[2].global_position, result.last_position);
}

#[tokio::test]
async fn load_of_an_unknown_stream_is_empty() {
    let db = TestDb::new().await;
    let store = db.store().await;
    assert!(store.load(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_expected_version_is_rejected_with_the_actual_version() {
    let db = TestDb::new().await;
    let store = db.store().await;
    let stream = Uuid::new_v4();

    store
        .append(
            stream,
            -1,
            NonEmpty::from_vec(vec![opened("Alice", "0", "0"), deposited("1.00")]).unwrap(),
            &json!({}),
        )
        .await
        .unwrap();

    let err = store
        .append(stream, 0, NonEmpty::singleton(deposited("2.00")), &json!({}))
        .await
        .unwrap_err();

    match err {
        StoreError::Conflict(conflict) => {
            assert_eq!(conflict.stream_id, stream);
            assert_eq!(conflict.expected, 0);
            assert_eq!(conflict.actual, 1);
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // The losing batch left nothing behind.
    assert_eq!(store.load(stream).await.unwrap().len(), 2);
}

#[tokio::test]
async fn a_stream_can_only_be_created_once() {
    let db = TestDb::new().await;
    let store = db.store().await;
    let stream = Uuid::new_v4();

    store
        .append(
            stream,
            -1,
            NonEmpty::singleton(opened("Alice", "0", "0")),
            &json!({}),
        )
        .await
        .unwrap();

    let err = store
        .append(
            stream,
            -1,
            NonEmpty::singleton(opened("Alice", "0", "0")),
            &json!({}),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict(conflict) if conflict.actual == 0));
}

#[tokio::test]
async fn the_feed_orders_events_across_streams() {
    let db = TestDb::new().await;
    let store = db.store().await;
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store
        .append(a, -1, NonEmpty::singleton(opened("Alice", "0", "0")), &json!({}))
        .await
        .unwrap();
    store
        .append(b, -1, NonEmpty::singleton(opened("Bob", "0", "0")), &json!({}))
        .await
        .unwrap();
    store
        .append(a, 0, NonEmpty::singleton(deposited("1.00")), &json!({}))
        .await
        .unwrap();

    let feed = store.load_since(0, 100).await.unwrap();
    assert_eq!(feed.len(), 3);
    let streams: Vec<Uuid> = feed.iter().map(|e| e.stream_id).collect();
    assert_eq!(streams, vec![a, b, a]);
    for pair in feed.windows(2) {
        assert!(pair[1].global_position > pair[0].global_position);
    }

    // Position cursor and limit bound the batch.
    let rest = store.load_since(feed[0].global_position, 1).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].global_position, feed[1].global_position);
}

#[tokio::test]
async fn concurrent_appends_at_the_same_version_admit_one_winner() {
    let db = TestDb::new().await;
    let store = db.store().await;
    let stream = Uuid::new_v4();

    store
        .append(
            stream,
            -1,
            NonEmpty::singleton(opened("Eve", "0", "0")),
            &json!({}),
        )
        .await
        .unwrap();

    let task = |store: Store| async move {
        store
            .append(stream, 0, NonEmpty::singleton(deposited("10.00")), &json!({}))
            .await
    };
    let (first, second) = tokio::join!(
        tokio::spawn(task(store.clone())),
        tokio::spawn(task(store.clone()))
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|o| matches!(o, Err(StoreError::Conflict(_))))
    );
    assert_eq!(store.load(stream).await.unwrap().len(), 2);
}
