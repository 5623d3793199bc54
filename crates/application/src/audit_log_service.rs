//! Request-level audit log: one row per mutating HTTP request.

use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{AuditAction, Permission};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{AuthorizationService, ListQuery, Paged, SortFields, SortOrder};

/// Sortable audit log fields.
pub const AUDIT_LOG_SORT_FIELDS: SortFields = SortFields {
    allowed: &["createdAt", "action", "entityType", "userName", "statusCode"],
    default: SortOrder::desc("createdAt"),
};

/// Audit row captured by the request interceptor.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogRecord {
    /// Acting user, when authenticated.
    pub user_id: Option<Uuid>,
    /// Acting user's display name.
    pub user_name: Option<String>,
    /// Derived action.
    pub action: AuditAction,
    /// Entity type reported by the handler.
    pub entity_type: Option<String>,
    /// Entity id reported by the handler.
    pub entity_id: Option<String>,
    /// Tracked fields before the write.
    pub old_values: Option<Value>,
    /// Tracked fields after the write.
    pub new_values: Option<Value>,
    /// Request correlation id.
    pub correlation_id: Uuid,
    /// Request path.
    pub request_path: String,
    /// HTTP method.
    pub request_method: String,
    /// Response status code.
    pub status_code: u16,
}

/// Stored audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    /// Stable row id.
    pub id: Uuid,
    /// Captured request data.
    pub record: AuditLogRecord,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
}

/// Audit log listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogFilter {
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Entity type.
    pub entity_type: Option<String>,
    /// Entity id.
    pub entity_id: Option<String>,
    /// Action.
    pub action: Option<AuditAction>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

/// Port for the append-only audit log.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Persists one audit row.
    async fn append_entry(&self, record: AuditLogRecord) -> AppResult<()>;

    /// Lists audit rows.
    async fn list_entries(
        &self,
        query: &ListQuery<AuditLogFilter>,
    ) -> AppResult<Paged<AuditLogEntry>>;
}

/// Application service for writing and reading the request audit log.
#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
    authorization_service: AuthorizationService,
}

impl AuditLogService {
    /// Creates a new audit log service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AuditLogRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Appends one audit row. Called by the request interceptor, not by users.
    pub async fn record(&self, record: AuditLogRecord) -> AppResult<()> {
        self.repository.append_entry(record).await
    }

    /// Lists audit rows for users holding `audit.read`.
    pub async fn list_entries(
        &self,
        actor: &UserIdentity,
        query: ListQuery<AuditLogFilter>,
    ) -> AppResult<Paged<AuditLogEntry>> {
        self.authorization_service
            .require_permission(actor, Permission::AuditRead)
            .await?;

        if let (Some(from), Some(to)) = (query.filter.from, query.filter.to)
            && from > to
        {
            return Err(AppError::Validation(
                "'from' must not be later than 'to'".to_owned(),
            ));
        }

        self.repository.list_entries(&query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use brokerdesk_core::{AppError, AppResult};
    use brokerdesk_domain::{AuditAction, Permission};
    use chrono::{Duration, Utc};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use crate::test_support::{actor, authorization};
    use crate::{ListQuery, PageRequest, Paged};

    use super::{
        AUDIT_LOG_SORT_FIELDS, AuditLogEntry, AuditLogFilter, AuditLogRecord, AuditLogRepository,
        AuditLogService,
    };

    #[derive(Default)]
    struct MemoryAuditLog {
        entries: Mutex<Vec<AuditLogEntry>>,
    }

    #[async_trait]
    impl AuditLogRepository for MemoryAuditLog {
        async fn append_entry(&self, record: AuditLogRecord) -> AppResult<()> {
            self.entries.lock().await.push(AuditLogEntry {
                id: Uuid::new_v4(),
                record,
                created_at: Utc::now(),
            });
            Ok(())
        }

        async fn list_entries(
            &self,
            query: &ListQuery<AuditLogFilter>,
        ) -> AppResult<Paged<AuditLogEntry>> {
            let entries = self.entries.lock().await.clone();
            let total = entries.len() as u64;
            Ok(Paged::new(entries, total, query.page))
        }
    }

    fn login_record() -> AuditLogRecord {
        AuditLogRecord {
            user_id: None,
            user_name: None,
            action: AuditAction::Login,
            entity_type: None,
            entity_id: None,
            old_values: None,
            new_values: None,
            correlation_id: Uuid::new_v4(),
            request_path: "/api/v1/auth/login".to_owned(),
            request_method: "POST".to_owned(),
            status_code: 401,
        }
    }

    fn query(filter: AuditLogFilter) -> ListQuery<AuditLogFilter> {
        ListQuery {
            filter,
            sort: AUDIT_LOG_SORT_FIELDS.default,
            page: PageRequest::default(),
        }
    }

    #[tokio::test]
    async fn recording_needs_no_permission_but_listing_does() {
        let repository = Arc::new(MemoryAuditLog::default());
        let service = AuditLogService::new(repository.clone(), authorization(&[]));

        service
            .record(login_record())
            .await
            .unwrap_or_else(|error| panic!("record should succeed: {error}"));
        assert_eq!(repository.entries.lock().await.len(), 1);

        let denied = service
            .list_entries(&actor(), query(AuditLogFilter::default()))
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn inverted_date_range_is_rejected() {
        let repository = Arc::new(MemoryAuditLog::default());
        let service = AuditLogService::new(repository, authorization(&[Permission::AuditRead]));
        let now = Utc::now();

        let result = service
            .list_entries(
                &actor(),
                query(AuditLogFilter {
                    from: Some(now),
                    to: Some(now - Duration::days(1)),
                    ..AuditLogFilter::default()
                }),
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
