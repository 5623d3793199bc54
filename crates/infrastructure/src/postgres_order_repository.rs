use async_trait::async_trait;
use brokerdesk_application::{EntityChange, ListQuery, OrderFilter, OrderRepository, Paged};
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{Order, Provenance, RowVersion};
use chrono::{DateTime, Utc};
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
    ("createdAt", "created_at"),
    ("status", "status"),
    ("side", "side"),
    ("quantity", "quantity"),
];

const ORDER_COLUMNS: &str = r#"
    SELECT
        id,
        account_id,
        instrument_id,
        side,
        order_type,
        time_in_force,
        status,
        quantity,
        price,
        stop_price,
        comment,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM orders
"#;

/// PostgreSQL-backed repository for orders.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    account_id: Uuid,
    instrument_id: Uuid,
    side: String,
    order_type: String,
    time_in_force: String,
    status: String,
    quantity: Decimal,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    comment: Option<String>,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            account_id: row.account_id,
            instrument_id: row.instrument_id,
            side: parse_stored(row.side.as_str(), "order side")?,
            order_type: parse_stored(row.order_type.as_str(), "order type")?,
            time_in_force: parse_stored(row.time_in_force.as_str(), "time in force")?,
            status: parse_stored(row.status.as_str(), "order status")?,
            quantity: row.quantity.normalize(),
            price: row.price.map(|price| price.normalize()),
            stop_price: row.stop_price.map(|price| price.normalize()),
            comment: row.comment,
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

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args OrderFilter) {
    builder.push(" WHERE true");
    if let Some(account_id) = filter.account_id {
        builder.push(" AND account_id = ").push_bind(account_id);
    }
    if let Some(instrument_id) = filter.instrument_id {
        builder.push(" AND instrument_id = ").push_bind(instrument_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(side) = filter.side {
        builder.push(" AND side = ").push_bind(side.as_str());
    }
}

fn duplicate_order(order: &Order) -> impl FnOnce() -> String + '_ {
    move || format!("order '{}' already exists", order.id)
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn list_orders(&self, query: &ListQuery<OrderFilter>) -> AppResult<Paged<Order>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count orders"))?;

        let mut select = QueryBuilder::new(ORDER_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list orders"))?;

        let items = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("{ORDER_COLUMNS} WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find order"))?
            .map(Order::try_from)
            .transpose()
    }

    async fn insert_order(&self, order: &Order, changes: &[EntityChange]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start order transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id,
                account_id,
                instrument_id,
                side,
                order_type,
                time_in_force,
                status,
                quantity,
                price,
                stop_price,
                comment,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.id)
        .bind(order.account_id)
        .bind(order.instrument_id)
        .bind(order.side.as_str())
        .bind(order.order_type.as_str())
        .bind(order.time_in_force.as_str())
        .bind(order.status.as_str())
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.stop_price)
        .bind(order.comment.as_deref())
        .bind(order.row_version.value())
        .bind(order.provenance.created_at)
        .bind(order.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "insert order", duplicate_order(order)))?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit order insert"))
    }

    async fn update_order(
        &self,
        order: &Order,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start order transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET account_id = $3,
                instrument_id = $4,
                side = $5,
                order_type = $6,
                time_in_force = $7,
                status = $8,
                quantity = $9,
                price = $10,
                stop_price = $11,
                comment = $12,
                row_version = $13,
                updated_at = $14,
                updated_by = $15
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(order.id)
        .bind(expected.value())
        .bind(order.account_id)
        .bind(order.instrument_id)
        .bind(order.side.as_str())
        .bind(order.order_type.as_str())
        .bind(order.time_in_force.as_str())
        .bind(order.status.as_str())
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.stop_price)
        .bind(order.comment.as_deref())
        .bind(order.row_version.value())
        .bind(order.provenance.updated_at)
        .bind(order.provenance.updated_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "update order", duplicate_order(order)))?;
        ensure_written(result.rows_affected(), "Order", &order.id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit order update"))
    }

    async fn delete_order(
        &self,
        order_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start order transaction"))?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND row_version = $2")
            .bind(order_id)
            .bind(expected.value())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                write_error(error, "delete order", || {
                    format!("order '{order_id}' cannot be deleted")
                })
            })?;
        ensure_written(result.rows_affected(), "Order", &order_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit order delete"))
    }
}
