//! Integration tests for the projector against the in-memory backends.

use std::time::Duration;

use rust_decimal::Decimal;
use tally::{
    AccountService, Money, Projector,
    store::inmemory,
    view::{BalanceView as _, inmemory::View},
};
use tokio::sync::watch;
use uuid::Uuid;

fn usd(amount: &str) -> Money {
    Money::new(amount.parse().unwrap(), "USD")
}

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

async fn drain(projector: &Projector<inmemory::Store, View>) {
    while projector.run_once().await.unwrap() > 0 {}
}

#[tokio::test]
async fn projecting_the_same_events_twice_yields_the_same_row() {
    let store = inmemory::Store::new();
    let view = View::new();
    let service = AccountService::new(store.clone());
    let id = Uuid::new_v4();

    service
        .open_account(id, "Alice", dec("500.00"), usd("1000.00"))
        .await
        .unwrap();
    service.deposit(id, usd("250.00")).await.unwrap();
    service.withdraw(id, usd("300.00")).await.unwrap();

    let projector = Projector::new("account_balance_projector_v1", store, view.clone());
    drain(&projector).await;
    let first = view.row(id).unwrap();

    // Rewind the checkpoint and replay the whole feed.
    view.save_checkpoint("account_balance_projector_v1", 0)
        .await
        .unwrap();
    drain(&projector).await;
    let second = view.row(id).unwrap();

    assert_eq!(view.len(), 1);
    assert_eq!(first.holder_name, second.holder_name);
    assert_eq!(first.status, "Open");
    assert_eq!(second.balance_amount, dec("950.00"));
    assert_eq!(second.balance_currency, "USD");
    assert_eq!(second.overdraft_limit, dec("500.00"));
    assert_eq!(second.available_to_withdraw, dec("1450.00"));
    assert_eq!(second.version, 2);
    assert_eq!(first.balance_amount, second.balance_amount);
}

#[tokio::test]
async fn the_read_model_converges_to_the_aggregate_state() {
    let store = inmemory::Store::new();
    let view = View::new();
    let service = AccountService::new(store.clone());
    let id = Uuid::new_v4();

    service
        .open_account(id, "Alice", dec("500.00"), usd("1000.00"))
        .await
        .unwrap();
    service.deposit(id, usd("250.00")).await.unwrap();
    service.apply_fee(id, usd("2.50"), "maintenance").await.unwrap();
    service.freeze(id).await.unwrap();
    service.unfreeze(id).await.unwrap();
    service.change_overdraft_limit(id, dec("750.00")).await.unwrap();
    service.change_holder_name(id, "Alice Smith").await.unwrap();

    let projector = Projector::new("account_balance_projector_v1", store, view.clone());
    drain(&projector).await;

    let account = service.repository().get(id).await.unwrap().unwrap();
    let row = view.row(id).unwrap();

    assert_eq!(row.holder_name, account.holder_name());
    assert_eq!(row.status, account.status().as_str());
    assert_eq!(row.balance_amount, account.balance().amount);
    assert_eq!(row.balance_currency, account.balance().currency);
    assert_eq!(row.overdraft_limit, account.overdraft_limit());
    assert_eq!(
        row.available_to_withdraw,
        account.balance().amount + account.overdraft_limit()
    );
    assert_eq!(row.version, account.version());
}

#[tokio::test]
async fn a_running_projector_picks_up_new_events() {
    let store = inmemory::Store::new();
    let view = View::new();
    let service = AccountService::new(store.clone());
    let id = Uuid::new_v4();

    let projector = Projector::new("account_balance_projector_v1", store, view.clone())
        .with_poll_interval(Duration::from_millis(10));
    let (stop, shutdown) = watch::channel(false);
    let worker = tokio::spawn(async move { projector.run(shutdown).await });

    service
        .open_account(id, "Alice", dec("0"), usd("25.00"))
        .await
        .unwrap();

    // Eventually consistent: wait for the row to appear.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(row) = view.row(id) {
            assert_eq!(row.balance_amount, dec("25.00"));
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "projector did not catch up in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    stop.send(true).unwrap();
    worker.await.unwrap().unwrap();
}
