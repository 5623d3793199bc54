use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use brokerdesk_application::{
    EntityChange, EntityChangeFilter, EntityChangeRepository, OperationPage, OperationSummary,
    PageRequest, SortOrder,
};
use brokerdesk_core::AppResult;
use tokio::sync::RwLock;
use uuid::Uuid;


/// In-memory change history with the same operation paging as the PostgreSQL store.
#[derive(Debug, Default)]
pub struct InMemoryEntityChangeRepository {
    changes: RwLock<Vec<EntityChange>>,
}

impl InMemoryEntityChangeRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the change rows of one or more operations.
    pub async fn append(&self, changes: &[EntityChange]) {
        self.changes.write().await.extend_from_slice(changes);
    }
}

fn row_matches(change: &EntityChange, filter: &EntityChangeFilter) -> bool {
    filter
        .entity_type
        .as_ref()
        .is_none_or(|entity_type| *entity_type == change.entity_type)
        && filter
            .entity_id
            .as_ref()
            .is_none_or(|entity_id| *entity_id == change.entity_id)
        && filter
            .user_id
            .is_none_or(|user_id| change.user_id == Some(user_id))
        && filter.from.is_none_or(|from| change.timestamp >= from)
        && filter.to.is_none_or(|to| change.timestamp <= to)
}

fn summarize(rows: &[&EntityChange]) -> Option<OperationSummary> {
    let first = rows.first()?;
    Some(OperationSummary {
        operation_id: first.operation_id,
        timestamp: rows.iter().map(|row| row.timestamp).min()?,
        user_id: first.user_id,
        user_name: first.user_name.clone(),
        entity_type: rows.iter().map(|row| row.entity_type.clone()).min()?,
        entity_id: rows.iter().map(|row| row.entity_id.clone()).min()?,
    })
}

fn compare(left: &OperationSummary, right: &OperationSummary, sort: SortOrder) -> Ordering {
    let ordering = match sort.field {
        "userName" => left
            .user_name
            .as_deref()
            .unwrap_or_default()
            .cmp(right.user_name.as_deref().unwrap_or_default()),
        "entityType" => left.entity_type.cmp(&right.entity_type),
        _ => left.timestamp.cmp(&right.timestamp),
    }
    .then_with(|| left.operation_id.cmp(&right.operation_id));

    if sort.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

#[async_trait]
impl EntityChangeRepository for InMemoryEntityChangeRepository {
    async fn page_operations(
        &self,
        filter: &EntityChangeFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> AppResult<OperationPage> {
        let changes = self.changes.read().await;

        let mut order = Vec::new();
        let mut by_operation: HashMap<Uuid, Vec<&EntityChange>> = HashMap::new();
        for change in changes.iter().filter(|change| row_matches(change, filter)) {
            by_operation
                .entry(change.operation_id)
                .or_insert_with(|| {
                    order.push(change.operation_id);
                    Vec::new()
                })
                .push(change);
        }

        let qualifying: Option<HashSet<Uuid>> = filter.change_type.map(|change_type| {
            changes
                .iter()
                .filter(|change| change.change_type == change_type)
                .map(|change| change.operation_id)
                .collect()
        });

        let mut operations: Vec<OperationSummary> = order
            .iter()
            .filter(|operation_id| {
                qualifying
                    .as_ref()
                    .is_none_or(|qualifying| qualifying.contains(operation_id))
            })
            .filter_map(|operation_id| by_operation.get(operation_id))
            .filter_map(|rows| summarize(rows))
            .collect();
        operations.sort_by(|left, right| compare(left, right, sort));

        let total_count = operations.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let operations = operations
            .into_iter()
            .skip(offset)
            .take(page.page_size() as usize)
            .collect();

        Ok(OperationPage {
            operations,
            total_count,
        })
    }

    async fn list_changes_for_operations(
        &self,
        operation_ids: &[Uuid],
    ) -> AppResult<Vec<EntityChange>> {
        Ok(self
            .changes
            .read()
            .await
            .iter()
            .filter(|change| operation_ids.contains(&change.operation_id))
            .cloned()
            .collect())
    }
}
