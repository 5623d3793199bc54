use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::Permission;
use uuid::Uuid;

/// Repository port for permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists the union of permissions granted through the user's roles.
    async fn list_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>>;
}

/// Application service for permission checks.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Ensures the actor holds the required permission.
    pub async fn require_permission(
        &self,
        actor: &UserIdentity,
        permission: Permission,
    ) -> AppResult<()> {
        if self.has_permission(actor, permission).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{}'",
            actor.username(),
            permission.as_str()
        )))
    }

    /// Returns whether the actor currently holds the permission.
    pub async fn has_permission(
        &self,
        actor: &UserIdentity,
        permission: Permission,
    ) -> AppResult<bool> {
        let permissions = self
            .repository
            .list_permissions_for_user(actor.user_id())
            .await?;

        Ok(permissions.contains(&permission))
    }

    /// Returns the actor's effective permissions, sorted and deduplicated.
    pub async fn effective_permissions(&self, actor: &UserIdentity) -> AppResult<Vec<Permission>> {
        let mut permissions = self
            .repository
            .list_permissions_for_user(actor.user_id())
            .await?;
        permissions.sort_unstable();
        permissions.dedup();
        Ok(permissions)
    }
}
