use brokerdesk_application::{
    ListQuery, ORDER_SORT_FIELDS, OrderFilter, OrderRepository, PageRequest,
};
use brokerdesk_core::AppError;
use brokerdesk_domain::{
    Order, OrderDraft, OrderSide, OrderStatus, OrderType, RowVersion, TimeInForce,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::postgres_test_support::{seed_trading_references, test_pool};

use super::PostgresOrderRepository;

fn new_order(account_id: Uuid, instrument_id: Uuid) -> Order {
    let draft = OrderDraft {
        account_id,
        instrument_id,
        side: OrderSide::Sell,
        order_type: OrderType::StopLimit,
        time_in_force: TimeInForce::Day,
        status: OrderStatus::New,
        quantity: Decimal::new(150, 0),
        price: Some(Decimal::new(8_125, 2)),
        stop_price: Some(Decimal::new(8_200, 2)),
        comment: None,
    };
    Order::create(draft, Utc::now(), "tester")
        .unwrap_or_else(|error| panic!("order draft should be valid: {error}"))
}

#[tokio::test]
async fn orders_round_trip_with_normalized_decimals() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let (account_id, instrument_id) = seed_trading_references(&pool).await;
    let repository = PostgresOrderRepository::new(pool);
    let order = new_order(account_id, instrument_id);
    let inserted = repository.insert_order(&order, &[]).await;
    assert!(inserted.is_ok());

    let page = repository
        .list_orders(&ListQuery {
            filter: OrderFilter {
                account_id: Some(account_id),
                side: Some(OrderSide::Sell),
                ..OrderFilter::default()
            },
            sort: ORDER_SORT_FIELDS.default,
            page: PageRequest::default(),
        })
        .await
        .unwrap_or_else(|error| panic!("orders should list: {error}"));

    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].quantity.to_string(), "150");
    assert_eq!(page.items[0].price, Some(Decimal::new(8_125, 2)));
    assert_eq!(page.items[0].order_type, OrderType::StopLimit);
}

#[tokio::test]
async fn unknown_account_is_validation_error_and_stale_delete_is_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let (account_id, instrument_id) = seed_trading_references(&pool).await;
    let repository = PostgresOrderRepository::new(pool);

    let orphan = new_order(Uuid::new_v4(), instrument_id);
    let result = repository.insert_order(&orphan, &[]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let order = new_order(account_id, instrument_id);
    let inserted = repository.insert_order(&order, &[]).await;
    assert!(inserted.is_ok());

    let stale = repository
        .delete_order(order.id, RowVersion::new(7), &[])
        .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));
    let deleted = repository
        .delete_order(order.id, order.row_version, &[])
        .await;
    assert!(deleted.is_ok());
}
