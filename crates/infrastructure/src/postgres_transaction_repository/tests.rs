use brokerdesk_application::{
    ListQuery, PageRequest, TRANSACTION_SORT_FIELDS, TransactionFilter, TransactionRepository,
};
use brokerdesk_domain::{Transaction, TransactionDraft, TransactionStatus, TransactionType};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::postgres_test_support::{seed_trading_references, test_pool};

use super::PostgresTransactionRepository;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap_or_default()
}

fn deposit(account_id: Uuid, trade_day: u32) -> Transaction {
    let draft = TransactionDraft {
        account_id,
        instrument_id: None,
        order_id: None,
        transaction_type: TransactionType::Deposit,
        status: TransactionStatus::Settled,
        quantity: None,
        price: None,
        amount: Decimal::new(250_000, 2),
        currency: "CHF".to_owned(),
        trade_date: date(trade_day),
        settlement_date: Some(date(trade_day)),
        description: Some("wire transfer".to_owned()),
    };
    Transaction::create(draft, Utc::now(), "tester")
        .unwrap_or_else(|error| panic!("transaction draft should be valid: {error}"))
}

#[tokio::test]
async fn trade_date_range_filters_and_sorts_newest_first() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let (account_id, _) = seed_trading_references(&pool).await;
    let repository = PostgresTransactionRepository::new(pool);
    for trade_day in [3, 10, 20] {
        let inserted = repository
            .insert_transaction(&deposit(account_id, trade_day), &[])
            .await;
        assert!(inserted.is_ok());
    }

    let page = repository
        .list_transactions(&ListQuery {
            filter: TransactionFilter {
                account_id: Some(account_id),
                from: Some(date(5)),
                to: Some(date(28)),
                ..TransactionFilter::default()
            },
            sort: TRANSACTION_SORT_FIELDS.default,
            page: PageRequest::default(),
        })
        .await
        .unwrap_or_else(|error| panic!("transactions should list: {error}"));

    let trade_dates: Vec<_> = page.items.iter().map(|item| item.trade_date).collect();
    assert_eq!(trade_dates, [date(20), date(10)]);
    assert_eq!(page.items[0].amount.to_string(), "2500");
}
