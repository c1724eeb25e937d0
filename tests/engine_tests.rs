mod common;

use rust_decimal::Decimal;
use soltrader::errors::EngineError;
use soltrader::models::{ExecutionOutcome, OrderKind, OrderStatus, TradeOrder};

use common::{harness, seed_free_account, seed_premium_account, BASE_ASSET};

fn market_buy(user_id: i64, amount: Decimal) -> TradeOrder {
    TradeOrder::new(
        user_id,
        OrderKind::MarketBuy,
        BASE_ASSET,
        "TOKEN",
        amount,
        Decimal::ONE,
    )
}

fn limit_buy(user_id: i64, trigger: Decimal) -> TradeOrder {
    TradeOrder::new(
        user_id,
        OrderKind::LimitBuy,
        BASE_ASSET,
        "TOKEN",
        Decimal::ONE,
        Decimal::ONE,
    )
    .with_trigger(trigger, None)
}

#[tokio::test]
async fn test_intake_rejects_unknown_account() {
    let h = harness();
    let err = h.engine.submit_order(market_buy(42, Decimal::ONE)).await;
    assert!(matches!(err, Err(EngineError::Validation(_))));
    assert_eq!(h.venue.swap_count(), 0, "rejected orders never reach the venue");
}

#[tokio::test]
async fn test_intake_rejects_out_of_bounds_amount() {
    let h = harness();
    seed_premium_account(&h, 1);

    let err = h
        .engine
        .submit_order(market_buy(1, Decimal::new(1, 3))) // 0.001, below min
        .await;
    assert!(matches!(err, Err(EngineError::Validation(_))));

    let err = h.engine.submit_order(market_buy(1, Decimal::from(100))).await;
    assert!(matches!(err, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_intake_rejects_invalid_asset() {
    let h = harness();
    seed_premium_account(&h, 1);
    h.venue.restrict_addresses(&[BASE_ASSET]);

    let err = h.engine.submit_order(market_buy(1, Decimal::ONE)).await;
    assert!(matches!(err, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_executor_runs_an_order_exactly_once() {
    let h = harness();
    seed_premium_account(&h, 1);

    let id = h.ledger.admit(market_buy(1, Decimal::ONE)).await.unwrap();

    let outcome = h.executor.execute(id).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));
    assert_eq!(h.venue.swap_count(), 1);

    // A second attempt finds the order already resolved.
    let err = h.executor.execute(id).await;
    assert!(matches!(
        err,
        Err(EngineError::AlreadyClaimed(_)) | Err(EngineError::OrderNotFound(_))
    ));
    assert_eq!(h.venue.swap_count(), 1, "the venue must never be called twice");
}

#[tokio::test]
async fn test_failed_swap_finalizes_order_as_failed() {
    let h = harness();
    seed_premium_account(&h, 1);
    h.venue.fail_swaps(true);

    let id = h.ledger.admit(market_buy(1, Decimal::ONE)).await.unwrap();
    let outcome = h.executor.execute(id).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));

    let archived = h.store.archived_order(id).unwrap();
    assert_eq!(archived.status, OrderStatus::Failed);
    assert!(archived.error_message.is_some());
}

#[tokio::test]
async fn test_completed_trade_records_fee() {
    let h = harness();
    seed_premium_account(&h, 1);

    let id = h.ledger.admit(market_buy(1, Decimal::from(2))).await.unwrap();
    h.executor.execute(id).await.unwrap();

    let fees = h.store.fees_for(1);
    assert_eq!(fees.len(), 1);
    // 0.1% of 2.0
    assert_eq!(fees[0].fee_amount, Decimal::new(2, 3));
}

#[tokio::test]
async fn test_cancel_pending_limit_order() {
    let h = harness();
    seed_premium_account(&h, 1);

    let order = h.engine.submit_order(limit_buy(1, Decimal::from(10))).await.unwrap();
    h.engine.cancel_order(1, order.id).await.unwrap();

    assert_eq!(
        h.store.archived_order(order.id).unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(h.venue.swap_count(), 0);
}

#[tokio::test]
async fn test_cancel_requires_ownership() {
    let h = harness();
    seed_premium_account(&h, 1);
    seed_premium_account(&h, 2);

    let order = h.engine.submit_order(limit_buy(1, Decimal::from(10))).await.unwrap();
    let err = h.engine.cancel_order(2, order.id).await;
    assert!(matches!(err, Err(EngineError::OrderNotFound(_))));
}

#[tokio::test]
async fn test_copy_subscription_requires_premium() {
    let h = harness();
    seed_free_account(&h, 1);

    let err = h.engine.subscribe(1, "whale-wallet", None).await;
    assert!(matches!(err, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_resubscribe_keeps_copy_stats() {
    let h = harness();
    seed_premium_account(&h, 1);

    h.engine.subscribe(1, "whale", None).await.unwrap();
    h.subscriptions
        .record_copy(1, "whale", Decimal::new(3, 1))
        .await
        .unwrap();
    h.engine.unsubscribe(1, "whale").await.unwrap();

    let revived = h.engine.subscribe(1, "whale", None).await.unwrap();
    assert!(revived.is_active && revived.enabled);
    assert_eq!(revived.stats.copied_trades, 1);
    assert_eq!(revived.stats.copied_volume, Decimal::new(3, 1));
}

#[tokio::test]
async fn test_snipe_allocation_budget_bounds() {
    let h = harness();
    seed_premium_account(&h, 1);

    let err = h
        .engine
        .create_snipe(1, "TOKEN", Decimal::from(100), Decimal::ONE, None, None)
        .await;
    assert!(matches!(err, Err(EngineError::Validation(_))));

    let alloc = h
        .engine
        .create_snipe(1, "TOKEN", Decimal::ONE, Decimal::ONE, None, None)
        .await
        .unwrap();
    assert_eq!(alloc.max_spend, Decimal::ONE);
    assert_eq!(h.engine.list_snipes(1).await.len(), 1);
}

#[tokio::test]
async fn test_restore_reloads_open_orders() {
    let h = harness();
    seed_premium_account(&h, 1);

    let order = h.engine.submit_order(limit_buy(1, Decimal::from(10))).await.unwrap();

    // A fresh ledger over the same store sees the pending order again.
    let ledger = soltrader::execution::OrderLedger::new(h.store.clone());
    let open = soltrader::store::Store::load_open_orders(h.store.as_ref())
        .await
        .unwrap();
    ledger.restore(open).await;
    assert!(ledger.get(order.id).await.is_some());
}
