use async_trait::async_trait;
use brokerdesk_application::{
    EntityChange, ListQuery, Paged, TransactionFilter, TransactionRepository,
};
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{Provenance, RowVersion, Transaction};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::{
    count_to_total, ensure_written, parse_stored, push_order_by, push_page, read_error,
    write_error,
};

#[cfg(test)]
mod tests;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("tradeDate", "trade_date"),
    ("settlementDate", "settlement_date"),
    ("amount", "amount"),
    ("createdAt", "created_at"),
];

const TRANSACTION_COLUMNS: &str = r#"
    SELECT
        id,
        account_id,
        instrument_id,
        order_id,
        transaction_type,
        status,
        quantity,
        price,
        amount,
        currency,
        trade_date,
        settlement_date,
        description,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM transactions
"#;

/// PostgreSQL-backed repository for cash and security transactions.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    instrument_id: Option<Uuid>,
    order_id: Option<Uuid>,
    transaction_type: String,
    status: String,
    quantity: Option<Decimal>,
    price: Option<Decimal>,
    amount: Decimal,
    currency: String,
    trade_date: NaiveDate,
    settlement_date: Option<NaiveDate>,
    description: Option<String>,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            instrument_id: row.instrument_id,
            order_id: row.order_id,
            transaction_type: parse_stored(row.transaction_type.as_str(), "transaction type")?,
            status: parse_stored(row.status.as_str(), "transaction status")?,
            quantity: row.quantity.map(|quantity| quantity.normalize()),
            price: row.price.map(|price| price.normalize()),
            amount: row.amount.normalize(),
            currency: row.currency,
            trade_date: row.trade_date,
            settlement_date: row.settlement_date,
            description: row.description,
            row_version: RowVersion::new(row.row_version),
            provenance: Provenance {
                created_at: row.created_at,
                created_by: row.created_by,
                updated_at: row.updated_at,
                updated_by: row.updated_by,
            },
        })
    }
}

fn push_filter<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    filter: &'args TransactionFilter,
) {
    builder.push(" WHERE true");
    if let Some(account_id) = filter.account_id {
        builder.push(" AND account_id = ").push_bind(account_id);
    }
    if let Some(transaction_type) = filter.transaction_type {
        builder
            .push(" AND transaction_type = ")
            .push_bind(transaction_type.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.from {
        builder.push(" AND trade_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND trade_date <= ").push_bind(to);
    }
}

fn duplicate_transaction(transaction: &Transaction) -> impl FnOnce() -> String + '_ {
    move || format!("transaction '{}' already exists", transaction.id)
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn list_transactions(
        &self,
        query: &ListQuery<TransactionFilter>,
    ) -> AppResult<Paged<Transaction>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count transactions"))?;

        let mut select = QueryBuilder::new(TRANSACTION_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list transactions"))?;

        let items = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_transaction(&self, transaction_id: Uuid) -> AppResult<Option<Transaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!("{TRANSACTION_COLUMNS} WHERE id = $1"))
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find transaction"))?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn insert_transaction(
        &self,
        transaction: &Transaction,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(read_error("start transaction write"))?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id,
                account_id,
                instrument_id,
                order_id,
                transaction_type,
                status,
                quantity,
                price,
                amount,
                currency,
                trade_date,
                settlement_date,
                description,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.account_id)
        .bind(transaction.instrument_id)
        .bind(transaction.order_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.quantity)
        .bind(transaction.price)
        .bind(transaction.amount)
        .bind(transaction.currency.as_str())
        .bind(transaction.trade_date)
        .bind(transaction.settlement_date)
        .bind(transaction.description.as_deref())
        .bind(transaction.row_version.value())
        .bind(transaction.provenance.created_at)
        .bind(transaction.provenance.created_by.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|error| {
            write_error(error, "insert transaction", duplicate_transaction(transaction))
        })?;

        insert_changes(&mut tx, changes).await?;

        tx
            .commit()
            .await
            .map_err(read_error("commit transaction insert"))
    }

    async fn update_transaction(
        &self,
        transaction: &Transaction,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(read_error("start transaction write"))?;

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET account_id = $3,
                instrument_id = $4,
                order_id = $5,
                transaction_type = $6,
                status = $7,
                quantity = $8,
                price = $9,
                amount = $10,
                currency = $11,
                trade_date = $12,
                settlement_date = $13,
                description = $14,
                row_version = $15,
                updated_at = $16,
                updated_by = $17
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(transaction.id)
        .bind(expected.value())
        .bind(transaction.account_id)
        .bind(transaction.instrument_id)
        .bind(transaction.order_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.quantity)
        .bind(transaction.price)
        .bind(transaction.amount)
        .bind(transaction.currency.as_str())
        .bind(transaction.trade_date)
        .bind(transaction.settlement_date)
        .bind(transaction.description.as_deref())
        .bind(transaction.row_version.value())
        .bind(transaction.provenance.updated_at)
        .bind(transaction.provenance.updated_by.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|error| {
            write_error(error, "update transaction", duplicate_transaction(transaction))
        })?;
        ensure_written(result.rows_affected(), "Transaction", &transaction.id.to_string())?;

        insert_changes(&mut tx, changes).await?;

        tx
            .commit()
            .await
            .map_err(read_error("commit transaction update"))
    }

    async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(read_error("start transaction write"))?;

        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND row_version = $2")
            .bind(transaction_id)
            .bind(expected.value())
            .execute(&mut *tx)
            .await
            .map_err(read_error("delete transaction"))?;
        ensure_written(result.rows_affected(), "Transaction", &transaction_id.to_string())?;

        insert_changes(&mut tx, changes).await?;

        tx
            .commit()
            .await
            .map_err(read_error("commit transaction delete"))
    }
}
