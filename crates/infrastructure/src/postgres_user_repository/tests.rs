use brokerdesk_application::UserRepository;
use brokerdesk_core::AppError;
use uuid::Uuid;

use crate::postgres_test_support::{ADMINISTRATOR_ROLE_ID, new_user, test_pool};

use super::PostgresUserRepository;

#[tokio::test]
async fn credentials_load_with_sorted_role_ids() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresUserRepository::new(pool);
    let user = new_user(vec![ADMINISTRATOR_ROLE_ID]);
    let inserted = repository
        .insert_user(&user, "$argon2id$stub", &[])
        .await;
    assert!(inserted.is_ok());

    let credentials = repository
        .find_credentials(&user.username)
        .await
        .unwrap_or_else(|error| panic!("credentials should load: {error}"))
        .unwrap_or_else(|| panic!("user should exist"));
    assert_eq!(credentials.password_hash, "$argon2id$stub");
    assert_eq!(credentials.user.role_ids, [ADMINISTRATOR_ROLE_ID]);

    let mut renamed = user.clone();
    renamed.full_name = "Renamed Operator".to_owned();
    renamed.row_version = user.row_version.next();
    let rehashed = repository
        .update_user(&renamed, user.row_version, Some("$argon2id$other"), &[])
        .await;
    assert!(rehashed.is_ok());

    let updated = repository
        .find_credentials(&user.username)
        .await
        .unwrap_or_else(|error| panic!("credentials should load: {error}"))
        .unwrap_or_else(|| panic!("user should exist"));
    assert_eq!(updated.password_hash, "$argon2id$other");
    assert_eq!(updated.user.full_name, "Renamed Operator");

    let mut unchanged_password = renamed.clone();
    unchanged_password.row_version = renamed.row_version.next();
    let kept = repository
        .update_user(&unchanged_password, renamed.row_version, None, &[])
        .await;
    assert!(kept.is_ok());
    let stored = repository
        .find_credentials(&user.username)
        .await
        .unwrap_or_else(|error| panic!("credentials should load: {error}"))
        .unwrap_or_else(|| panic!("user should exist"));
    assert_eq!(stored.password_hash, "$argon2id$other");
}

#[tokio::test]
async fn duplicate_email_names_the_clashing_column() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresUserRepository::new(pool);
    let user = new_user(Vec::new());
    let inserted = repository.insert_user(&user, "hash", &[]).await;
    assert!(inserted.is_ok());

    let mut clash = new_user(Vec::new());
    clash.email = user.email.clone();
    let result = repository.insert_user(&clash, "hash", &[]).await;
    match result {
        Err(AppError::Conflict(message)) => assert!(message.contains("email")),
        other => panic!("expected email conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_role_is_validation_error_and_leaves_no_user() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresUserRepository::new(pool);
    let user = new_user(vec![Uuid::new_v4()]);
    let result = repository.insert_user(&user, "hash", &[]).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let stored = repository.find_user(user.id).await;
    assert!(matches!(stored, Ok(None)));
}
