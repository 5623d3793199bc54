//! Role administration and the permission catalog.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{ChangeTracked, Permission, Role, RoleDraft, RowVersion};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthorizationService, EntityChange, ListQuery, Mutation, OperationRecorder, Paged, SortFields,
    SortOrder,
};

/// Sortable role fields.
pub const ROLE_SORT_FIELDS: SortFields = SortFields {
    allowed: &["name", "createdAt"],
    default: SortOrder::asc("name"),
};

/// Role listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFilter {
    /// Case-insensitive match on the role name.
    pub search: Option<String>,
}

/// Repository port for roles and their permission grants.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists roles with their permissions.
    async fn list_roles(&self, query: &ListQuery<RoleFilter>) -> AppResult<Paged<Role>>;

    /// Finds a role by id.
    async fn find_role(&self, role_id: Uuid) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Inserts a role and its grants. Fails with a conflict on a duplicate name.
    async fn insert_role(&self, role: &Role, changes: &[EntityChange]) -> AppResult<()>;

    /// Replaces role attributes and grants when the stored row version equals `expected`.
    async fn update_role(
        &self,
        role: &Role,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes a role when the stored row version equals `expected`.
    async fn delete_role(
        &self,
        role_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Counts users holding the role.
    async fn count_role_assignments(&self, role_id: Uuid) -> AppResult<u64>;
}

/// Application service for roles.
#[derive(Clone)]
pub struct RoleService {
    repository: Arc<dyn RoleRepository>,
    authorization_service: AuthorizationService,
}

impl RoleService {
    /// Creates a new role service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RoleRepository>,
            authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Returns the full permission catalog.
    pub async fn list_permissions(&self, actor: &UserIdentity) -> AppResult<Vec<Permission>> {
        self.authorization_service
            .require_permission(actor, Permission::PermissionsRead)
            .await?;

        Ok(Permission::all().to_vec())
    }

    /// Lists roles.
    pub async fn list_roles(
        &self,
        actor: &UserIdentity,
        query: ListQuery<RoleFilter>,
    ) -> AppResult<Paged<Role>> {
        self.authorization_service
            .require_permission(actor, Permission::RolesRead)
            .await?;

        self.repository.list_roles(&query).await
    }

    /// Returns one role.
    pub async fn get_role(&self, actor: &UserIdentity, role_id: Uuid) -> AppResult<Role> {
        self.authorization_service
            .require_permission(actor, Permission::RolesRead)
            .await?;

        self.load(role_id).await
    }

    /// Creates a custom role.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        draft: RoleDraft,
    ) -> AppResult<Mutation<Role>> {
        self.authorization_service
            .require_permission(actor, Permission::RolesCreate)
            .await?;

        let now = Utc::now();
        let role = Role::create(draft, now, actor.username())?;
        self.ensure_name_available(&role).await?;
        let mut recorder = OperationRecorder::begin(actor, &role, now);
        recorder.record(None, Some(&role));
        self.repository
            .insert_role(&role, &recorder.finish())
            .await?;

        Ok(Mutation::created(role))
    }

    /// Updates a custom role. System roles are read-only.
    pub async fn update_role(
        &self,
        actor: &UserIdentity,
        role_id: Uuid,
        row_version: RowVersion,
        draft: RoleDraft,
    ) -> AppResult<Mutation<Role>> {
        self.authorization_service
            .require_permission(actor, Permission::RolesUpdate)
            .await?;

        let existing = self.load(role_id).await?;
        existing
            .row_version
            .ensure_matches(row_version, Role::ENTITY_TYPE, &existing.tracked_id())?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        if !updated.name.eq_ignore_ascii_case(&existing.name) {
            self.ensure_name_available(&updated).await?;
        }
        updated.row_version = existing.row_version.next();
        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_role(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes a custom role that no user holds.
    pub async fn delete_role(
        &self,
        actor: &UserIdentity,
        role_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::RolesDelete)
            .await?;

        let existing = self.load(role_id).await?;
        if let Some(row_version) = row_version {
            existing
                .row_version
                .ensure_matches(row_version, Role::ENTITY_TYPE, &existing.tracked_id())?;
        }
        existing.ensure_editable()?;

        let assignments = self.repository.count_role_assignments(role_id).await?;
        if assignments > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is still assigned to {assignments} user(s)",
                existing.name
            )));
        }

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        self.repository
            .delete_role(role_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn ensure_name_available(&self, role: &Role) -> AppResult<()> {
        match self.repository.find_role_by_name(&role.name).await? {
            Some(other) if other.id != role.id => Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name
            ))),
            _ => Ok(()),
        }
    }

    async fn load(&self, role_id: Uuid) -> AppResult<Role> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }
}
