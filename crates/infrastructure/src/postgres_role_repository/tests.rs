use brokerdesk_application::RoleRepository;
use brokerdesk_core::AppError;
use brokerdesk_domain::{ADMINISTRATOR_ROLE, Permission, Role, RoleDraft};
use chrono::Utc;
use uuid::Uuid;

use crate::postgres_test_support::test_pool;

use super::PostgresRoleRepository;

fn new_role(name: &str) -> Role {
    let draft = RoleDraft {
        name: name.to_owned(),
        description: Some("Reads the trading book".to_owned()),
        permissions: vec![Permission::OrdersRead, Permission::InstrumentsRead],
    };
    Role::create(draft, Utc::now(), "tester")
        .unwrap_or_else(|error| panic!("role draft should be valid: {error}"))
}

#[tokio::test]
async fn seeded_administrator_holds_every_permission() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool);
    let administrator = repository
        .find_role_by_name(&ADMINISTRATOR_ROLE.to_lowercase())
        .await
        .unwrap_or_else(|error| panic!("role should load: {error}"))
        .unwrap_or_else(|| panic!("administrator role should be seeded"));

    assert!(administrator.is_system);
    assert_eq!(administrator.permissions, Permission::all().to_vec());
}

#[tokio::test]
async fn role_names_are_unique_ignoring_case_and_grants_are_replaced() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresRoleRepository::new(pool);
    let name = format!("Desk {}", Uuid::new_v4().simple());
    let role = new_role(&name);
    let inserted = repository.insert_role(&role, &[]).await;
    assert!(inserted.is_ok());

    let duplicate = repository
        .insert_role(&new_role(&name.to_uppercase()), &[])
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let mut narrowed = role.clone();
    narrowed.permissions = vec![Permission::OrdersRead];
    narrowed.row_version = role.row_version.next();
    let updated = repository
        .update_role(&narrowed, role.row_version, &[])
        .await;
    assert!(updated.is_ok());

    let stored = repository
        .find_role(role.id)
        .await
        .unwrap_or_else(|error| panic!("role should load: {error}"))
        .unwrap_or_else(|| panic!("role should exist"));
    assert_eq!(stored.permissions, [Permission::OrdersRead]);
    assert_eq!(
        repository.count_role_assignments(role.id).await.unwrap_or(99),
        0
    );
}
