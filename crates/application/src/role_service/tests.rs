use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{Permission, Role, RoleDraft, RowVersion, stale_version};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::test_support::{ChangeJournal, actor, authorization, authorization_all};
use crate::{EntityChange, ListQuery, Paged};

use super::{RoleFilter, RoleRepository, RoleService};

#[derive(Default)]
struct FakeRoleRepository {
    roles: Mutex<HashMap<Uuid, Role>>,
    assignments: Mutex<HashMap<Uuid, u64>>,
    changes: ChangeJournal,
}

#[async_trait]
impl RoleRepository for FakeRoleRepository {
    async fn list_roles(&self, query: &ListQuery<RoleFilter>) -> AppResult<Paged<Role>> {
        let roles: Vec<Role> = self.roles.lock().await.values().cloned().collect();
        let total = roles.len() as u64;
        Ok(Paged::new(roles, total, query.page))
    }

    async fn find_role(&self, role_id: Uuid) -> AppResult<Option<Role>> {
        Ok(self.roles.lock().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .values()
            .find(|role| role.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn insert_role(&self, role: &Role, changes: &[EntityChange]) -> AppResult<()> {
        self.roles.lock().await.insert(role.id, role.clone());
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_role(
        &self,
        role: &Role,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut roles = self.roles.lock().await;
        match roles.get(&role.id) {
            Some(stored) if stored.row_version == expected => {
                roles.insert(role.id, role.clone());
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("Role", &role.id.to_string())),
        }
    }

    async fn delete_role(
        &self,
        role_id: Uuid,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.roles.lock().await.remove(&role_id);
        self.changes.append(changes).await;
        Ok(())
    }

    async fn count_role_assignments(&self, role_id: Uuid) -> AppResult<u64> {
        Ok(self
            .assignments
            .lock()
            .await
            .get(&role_id)
            .copied()
            .unwrap_or_default())
    }
}

fn draft(name: &str) -> RoleDraft {
    RoleDraft {
        name: name.to_owned(),
        description: Some("Front office desk".to_owned()),
        permissions: vec![Permission::ClientsRead, Permission::OrdersCreate],
    }
}

fn service(repository: &Arc<FakeRoleRepository>) -> RoleService {
    RoleService::new(repository.clone(), authorization_all())
}

#[tokio::test]
async fn duplicate_role_name_is_conflict() {
    let repository = Arc::new(FakeRoleRepository::default());
    let service = service(&repository);
    service
        .create_role(&actor(), draft("Trader"))
        .await
        .unwrap_or_else(|error| panic!("role should be created: {error}"));

    let result = service.create_role(&actor(), draft("trader")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn system_role_cannot_be_deleted() {
    let repository = Arc::new(FakeRoleRepository::default());
    let service = service(&repository);
    let role = service
        .create_role(&actor(), draft("Administrator"))
        .await
        .unwrap_or_else(|error| panic!("role should be created: {error}"))
        .value;
    if let Some(stored) = repository.roles.lock().await.get_mut(&role.id) {
        stored.is_system = true;
    }

    let result = service.delete_role(&actor(), role.id, None).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn assigned_role_cannot_be_deleted() {
    let repository = Arc::new(FakeRoleRepository::default());
    let service = service(&repository);
    let role = service
        .create_role(&actor(), draft("Back Office"))
        .await
        .unwrap_or_else(|error| panic!("role should be created: {error}"))
        .value;
    repository.assignments.lock().await.insert(role.id, 2);
    assert!(!repository.changes.recorded().await.is_empty());
    repository.changes.clear().await;

    let result = service
        .delete_role(&actor(), role.id, Some(role.row_version))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(repository.roles.lock().await.contains_key(&role.id));
    assert!(repository.changes.recorded().await.is_empty());
}

#[tokio::test]
async fn permission_catalog_requires_permission() {
    let repository = Arc::new(FakeRoleRepository::default());
    let denied = RoleService::new(repository.clone(), authorization(&[Permission::RolesRead]));
    assert!(matches!(
        denied.list_permissions(&actor()).await,
        Err(AppError::Forbidden(_))
    ));

    let catalog = service(&repository)
        .list_permissions(&actor())
        .await
        .unwrap_or_else(|error| panic!("catalog should load: {error}"));
    assert_eq!(catalog.len(), Permission::all().len());
}
