use async_trait::async_trait;
use brokerdesk_application::{
    AuditLogEntry, AuditLogFilter, AuditLogRecord, AuditLogRepository, ListQuery, Paged,
};
use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_support::{
    count_to_total, parse_stored, push_order_by, push_page, read_error,
};


const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("action", "action"),
    ("entityType", "COALESCE(entity_type, '')"),
    ("userName", "COALESCE(user_name, '')"),
    ("statusCode", "status_code"),
];

/// PostgreSQL-backed repository for the request audit log.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    user_id: Option<Uuid>,
    user_name: Option<String>,
    action: String,
    entity_type: Option<String>,
    entity_id: Option<String>,
    old_values: Option<Value>,
    new_values: Option<Value>,
    correlation_id: Uuid,
    request_path: String,
    request_method: String,
    status_code: i32,
    created_at: DateTime<Utc>,
}

impl AuditLogRow {
    fn into_entry(self) -> AppResult<AuditLogEntry> {
        let status_code = u16::try_from(self.status_code).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored status code '{}': {error}",
                self.status_code
            ))
        })?;

        Ok(AuditLogEntry {
            id: self.id,
            record: AuditLogRecord {
                user_id: self.user_id,
                user_name: self.user_name,
                action: parse_stored(self.action.as_str(), "audit action")?,
                entity_type: self.entity_type,
                entity_id: self.entity_id,
                old_values: self.old_values,
                new_values: self.new_values,
                correlation_id: self.correlation_id,
                request_path: self.request_path,
                request_method: self.request_method,
                status_code,
            },
            created_at: self.created_at,
        })
    }
}

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args AuditLogFilter) {
    builder.push(" WHERE true");
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(entity_type) = &filter.entity_type {
        builder.push(" AND entity_type = ").push_bind(entity_type);
    }
    if let Some(entity_id) = &filter.entity_id {
        builder.push(" AND entity_id = ").push_bind(entity_id);
    }
    if let Some(action) = filter.action {
        builder.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append_entry(&self, record: AuditLogRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id,
                user_id,
                user_name,
                action,
                entity_type,
                entity_id,
                old_values,
                new_values,
                correlation_id,
                request_path,
                request_method,
                status_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(record.user_name)
        .bind(record.action.as_str())
        .bind(record.entity_type)
        .bind(record.entity_id)
        .bind(record.old_values)
        .bind(record.new_values)
        .bind(record.correlation_id)
        .bind(record.request_path)
        .bind(record.request_method)
        .bind(i32::from(record.status_code))
        .execute(&self.pool)
        .await
        .map_err(read_error("append audit log entry"))?;

        Ok(())
    }

    async fn list_entries(
        &self,
        query: &ListQuery<AuditLogFilter>,
    ) -> AppResult<Paged<AuditLogEntry>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count audit log entries"))?;

        let mut select = QueryBuilder::new(
            r#"
            SELECT
                id,
                user_id,
                user_name,
                action,
                entity_type,
                entity_id,
                old_values,
                new_values,
                correlation_id,
                request_path,
                request_method,
                status_code,
                created_at
            FROM audit_logs
            "#,
        );
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;

        let rows = select
            .build_query_as::<AuditLogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list audit log entries"))?;

        let items = rows
            .into_iter()
            .map(AuditLogRow::into_entry)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paged::new(items, count_to_total(total), query.page))
    }
}
