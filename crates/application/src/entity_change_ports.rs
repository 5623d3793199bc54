use async_trait::async_trait;
use brokerdesk_core::AppResult;
use brokerdesk_domain::ChangeType;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{PageRequest, SortFields, SortOrder};

/// Sortable operation fields of the change feed.
pub const ENTITY_CHANGE_SORT_FIELDS: SortFields = SortFields {
    allowed: &["timestamp", "userName", "entityType"],
    default: SortOrder::desc("timestamp"),
};

/// One changed field of one entity within one operation. Never updated once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityChange {
    /// Stable row id.
    pub id: Uuid,
    /// Logical write this change belongs to.
    pub operation_id: Uuid,
    /// Root entity type.
    pub entity_type: String,
    /// Root entity id.
    pub entity_id: String,
    /// Nested entity type, when the change belongs to a child record.
    pub related_entity_type: Option<String>,
    /// Nested entity id.
    pub related_entity_id: Option<String>,
    /// Field-level change type.
    pub change_type: ChangeType,
    /// Changed field.
    pub field_name: String,
    /// Value before the operation.
    pub old_value: Option<String>,
    /// Value after the operation.
    pub new_value: Option<String>,
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Acting user's display name at the time of the change.
    pub user_name: Option<String>,
    /// Operation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Row filters applied before grouping into operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityChangeFilter {
    /// Root entity type.
    pub entity_type: Option<String>,
    /// Root entity id.
    pub entity_id: Option<String>,
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Operations containing at least one change of this type.
    pub change_type: Option<ChangeType>,
    /// Inclusive lower timestamp bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound.
    pub to: Option<DateTime<Utc>>,
}

/// One operation reduced to its sortable attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    /// Operation id.
    pub operation_id: Uuid,
    /// Earliest timestamp of the operation's rows.
    pub timestamp: DateTime<Utc>,
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Representative display name.
    pub user_name: Option<String>,
    /// Root entity type.
    pub entity_type: String,
    /// Root entity id.
    pub entity_id: String,
}

/// Page of operation summaries with the total operation count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationPage {
    /// Operations of the requested page, in sort order.
    pub operations: Vec<OperationSummary>,
    /// Operations matching the filter across all pages.
    pub total_count: u64,
}

/// Read port for the append-only change history. Rows are written by the
/// entity repositories together with the mutation they describe.
#[async_trait]
pub trait EntityChangeRepository: Send + Sync {
    /// Groups matching rows by operation, sorts and returns one page of operations.
    async fn page_operations(
        &self,
        filter: &EntityChangeFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> AppResult<OperationPage>;

    /// Lists every row belonging to the given operations.
    async fn list_changes_for_operations(
        &self,
        operation_ids: &[Uuid],
    ) -> AppResult<Vec<EntityChange>>;
}

/// One changed field in a change group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Field name.
    pub field_name: String,
    /// Field-level change type.
    pub change_type: ChangeType,
    /// Value before the operation.
    pub old_value: Option<String>,
    /// Value after the operation.
    pub new_value: Option<String>,
}

/// Field changes of one (possibly nested) entity within an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeGroup {
    /// Nested entity type; `None` for the root entity.
    pub related_entity_type: Option<String>,
    /// Nested entity id; `None` for the root entity.
    pub related_entity_id: Option<String>,
    /// Collapsed change type of the group's fields.
    pub change_type: ChangeType,
    /// Changed fields ordered by name.
    pub fields: Vec<FieldChange>,
}

/// One logical write with its grouped field changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHistory {
    /// Operation id.
    pub operation_id: Uuid,
    /// Operation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Representative display name.
    pub user_name: Option<String>,
    /// Root entity type.
    pub entity_type: String,
    /// Root entity id.
    pub entity_id: String,
    /// Collapsed change type across all fields.
    pub change_type: ChangeType,
    /// Root group first, then nested groups in first-seen order.
    pub groups: Vec<ChangeGroup>,
}
