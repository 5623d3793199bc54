use async_trait::async_trait;
use brokerdesk_application::{
    EntityChange, EntityChangeFilter, EntityChangeRepository, OperationPage, OperationSummary,
    PageRequest, SortOrder,
};
use brokerdesk_core::AppResult;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::postgres_support::{
    count_to_total, parse_stored, push_order_by, push_page, read_error,
};


const SORT_COLUMNS: &[(&str, &str)] = &[
    ("timestamp", "MIN(timestamp)"),
    ("userName", "COALESCE((array_agg(user_name ORDER BY seq))[1], '')"),
    ("entityType", "MIN(entity_type)"),
];

/// PostgreSQL-backed append-only change history.
#[derive(Clone)]
pub struct PostgresEntityChangeRepository {
    pool: PgPool,
}

impl PostgresEntityChangeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OperationRow {
    operation_id: Uuid,
    timestamp: DateTime<Utc>,
    user_id: Option<Uuid>,
    user_name: Option<String>,
    entity_type: String,
    entity_id: String,
}

#[derive(Debug, FromRow)]
struct EntityChangeRow {
    id: Uuid,
    operation_id: Uuid,
    entity_type: String,
    entity_id: String,
    related_entity_type: Option<String>,
    related_entity_id: Option<String>,
    change_type: String,
    field_name: String,
    old_value: Option<String>,
    new_value: Option<String>,
    user_id: Option<Uuid>,
    user_name: Option<String>,
    timestamp: DateTime<Utc>,
}

impl EntityChangeRow {
    fn into_change(self) -> AppResult<EntityChange> {
        Ok(EntityChange {
            id: self.id,
            operation_id: self.operation_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            related_entity_type: self.related_entity_type,
            related_entity_id: self.related_entity_id,
            change_type: parse_stored(self.change_type.as_str(), "change type")?,
            field_name: self.field_name,
            old_value: self.old_value,
            new_value: self.new_value,
            user_id: self.user_id,
            user_name: self.user_name,
            timestamp: self.timestamp,
        })
    }
}

// A change type filter qualifies whole operations, so the summary columns stay
// identical to an unfiltered grouping.
fn push_filter<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    filter: &'args EntityChangeFilter,
) {
    builder.push(" WHERE true");
    if let Some(entity_type) = &filter.entity_type {
        builder.push(" AND entity_type = ").push_bind(entity_type);
    }
    if let Some(entity_id) = &filter.entity_id {
        builder.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND timestamp >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND timestamp <= ").push_bind(to);
    }
    if let Some(change_type) = filter.change_type {
        builder
            .push(" AND operation_id IN (SELECT operation_id FROM entity_changes")
            .push(" WHERE change_type = ")
            .push_bind(change_type.as_str())
            .push(")");
    }
}

/// Inserts the change rows of one operation inside the caller's transaction,
/// so they commit or roll back together with the entity write.
pub(crate) async fn insert_changes(
    transaction: &mut Transaction<'_, Postgres>,
    changes: &[EntityChange],
) -> AppResult<()> {
    for change in changes {
        sqlx::query(
            r#"
            INSERT INTO entity_changes (
                id,
                operation_id,
                entity_type,
                entity_id,
                related_entity_type,
                related_entity_id,
                change_type,
                field_name,
                old_value,
                new_value,
                user_id,
                user_name,
                timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(change.id)
        .bind(change.operation_id)
        .bind(change.entity_type.as_str())
        .bind(change.entity_id.as_str())
        .bind(change.related_entity_type.as_deref())
        .bind(change.related_entity_id.as_deref())
        .bind(change.change_type.as_str())
        .bind(change.field_name.as_str())
        .bind(change.old_value.as_deref())
        .bind(change.new_value.as_deref())
        .bind(change.user_id)
        .bind(change.user_name.as_deref())
        .bind(change.timestamp)
        .execute(&mut **transaction)
        .await
        .map_err(read_error("append entity change"))?;
    }

    if !changes.is_empty() {
        tracing::debug!(row_count = changes.len(), "appended entity changes");
    }
    Ok(())
}

#[async_trait]
impl EntityChangeRepository for PostgresEntityChangeRepository {
    async fn page_operations(
        &self,
        filter: &EntityChangeFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> AppResult<OperationPage> {
        let mut count =
            QueryBuilder::new("SELECT COUNT(DISTINCT operation_id) FROM entity_changes");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count change operations"))?;

        let mut select = QueryBuilder::new(
            r#"
            SELECT
                operation_id,
                MIN(timestamp) AS timestamp,
                (array_agg(user_id ORDER BY seq))[1] AS user_id,
                (array_agg(user_name ORDER BY seq))[1] AS user_name,
                MIN(entity_type) AS entity_type,
                MIN(entity_id) AS entity_id
            FROM entity_changes
            "#,
        );
        push_filter(&mut select, filter);
        select.push(" GROUP BY operation_id");
        push_order_by(&mut select, sort, SORT_COLUMNS, "operation_id");
        push_page(&mut select, page)?;

        let rows = select
            .build_query_as::<OperationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("page change operations"))?;

        Ok(OperationPage {
            operations: rows
                .into_iter()
                .map(|row| OperationSummary {
                    operation_id: row.operation_id,
                    timestamp: row.timestamp,
                    user_id: row.user_id,
                    user_name: row.user_name,
                    entity_type: row.entity_type,
                    entity_id: row.entity_id,
                })
                .collect(),
            total_count: count_to_total(total),
        })
    }

    async fn list_changes_for_operations(
        &self,
        operation_ids: &[Uuid],
    ) -> AppResult<Vec<EntityChange>> {
        if operation_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EntityChangeRow>(
            r#"
            SELECT
                id,
                operation_id,
                entity_type,
                entity_id,
                related_entity_type,
                related_entity_id,
                change_type,
                field_name,
                old_value,
                new_value,
                user_id,
                user_name,
                timestamp
            FROM entity_changes
            WHERE operation_id = ANY($1)
            ORDER BY seq
            "#,
        )
        .bind(operation_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("list operation changes"))?;

        rows.into_iter().map(EntityChangeRow::into_change).collect()
    }
}
