//! Field-level change history.
//!
//! Reads paginate at operation granularity: the repository pages operation
//! summaries, the service re-fetches every field row of the page's operations and
//! [`group_operations`] folds them into the nested operation / group / field shape.

mod grouping;
mod recorder;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use brokerdesk_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use brokerdesk_domain::Permission;

use crate::{
    AuthorizationService, ENTITY_CHANGE_SORT_FIELDS, EntityChangeFilter, EntityChangeRepository,
    ListQuery, OperationHistory, PageRequest, Paged, SortOrder,
};

pub use grouping::group_operations;
pub use recorder::OperationRecorder;

/// Application service for reading change history.
#[derive(Clone)]
pub struct EntityChangeService {
    repository: Arc<dyn EntityChangeRepository>,
    authorization_service: AuthorizationService,
}

impl EntityChangeService {
    /// Creates a new change history service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntityChangeRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Returns the newest-first history of one root entity.
    pub async fn entity_history(
        &self,
        actor: &UserIdentity,
        entity_type: &str,
        entity_id: &str,
        page: PageRequest,
    ) -> AppResult<Paged<OperationHistory>> {
        self.authorization_service
            .require_permission(actor, Permission::AuditChangesRead)
            .await?;

        let entity_type = NonEmptyString::for_field("entityType", entity_type)?;
        let entity_id = NonEmptyString::for_field("entityId", entity_id)?;
        let filter = EntityChangeFilter {
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.into()),
            ..EntityChangeFilter::default()
        };

        self.load_page(&filter, ENTITY_CHANGE_SORT_FIELDS.default, page)
            .await
    }

    /// Returns the global change feed.
    pub async fn all_changes(
        &self,
        actor: &UserIdentity,
        query: ListQuery<EntityChangeFilter>,
    ) -> AppResult<Paged<OperationHistory>> {
        self.authorization_service
            .require_permission(actor, Permission::AuditChangesRead)
            .await?;

        if let (Some(from), Some(to)) = (query.filter.from, query.filter.to)
            && from > to
        {
            return Err(AppError::Validation(
                "'from' must not be later than 'to'".to_owned(),
            ));
        }

        self.load_page(&query.filter, query.sort, query.page).await
    }

    async fn load_page(
        &self,
        filter: &EntityChangeFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> AppResult<Paged<OperationHistory>> {
        let operation_page = self.repository.page_operations(filter, sort, page).await?;
        if operation_page.operations.is_empty() {
            return Ok(Paged::new(Vec::new(), operation_page.total_count, page));
        }

        let operation_ids: Vec<_> = operation_page
            .operations
            .iter()
            .map(|operation| operation.operation_id)
            .collect();
        let changes = self
            .repository
            .list_changes_for_operations(&operation_ids)
            .await?;

        Ok(Paged::new(
            group_operations(operation_page.operations, changes),
            operation_page.total_count,
            page,
        ))
    }
}
