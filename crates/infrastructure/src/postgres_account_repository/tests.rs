use brokerdesk_application::{
    ACCOUNT_SORT_FIELDS, AccountFilter, AccountRepository, EntityChangeRepository, ListQuery,
    OperationRecorder, PageRequest,
};
use brokerdesk_core::{AppError, UserIdentity};
use brokerdesk_domain::{
    Account, AccountDraft, AccountHolder, AccountStatus, AccountType, HolderRole,
};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::PostgresEntityChangeRepository;
use crate::postgres_test_support::test_pool;

use super::PostgresAccountRepository;

fn new_account() -> Account {
    let draft = AccountDraft {
        account_number: format!("T-{}", Uuid::new_v4().simple()),
        account_type: AccountType::Joint,
        status: AccountStatus::Active,
        currency: "CHF".to_owned(),
        opened_at: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default(),
        closed_at: None,
        comment: Some("family account".to_owned()),
    };
    Account::create(draft, Utc::now(), "tester")
        .unwrap_or_else(|error| panic!("account draft should be valid: {error}"))
}

async fn insert_client(pool: &PgPool) -> Uuid {
    let client_id = Uuid::new_v4();
    let insert = sqlx::query(
        r#"
            INSERT INTO clients
                (id, client_type, first_name, last_name, email, status, residence_country)
            VALUES ($1, 'individual', 'Nora', 'Frei', $2, 'active', 'CH')
            "#,
    )
    .bind(client_id)
    .bind(format!("nora.{}@example.test", client_id.simple()))
    .execute(pool)
    .await;

    assert!(insert.is_ok());
    client_id
}

#[tokio::test]
async fn duplicate_account_number_is_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccountRepository::new(pool.clone());
    let account = new_account();
    let inserted = repository.insert_account(&account, &[]).await;
    assert!(inserted.is_ok());

    let mut duplicate = new_account();
    duplicate.account_number = account.account_number.clone();
    let actor = UserIdentity::new(Uuid::new_v4(), "tester", "Test Operator");
    let mut recorder = OperationRecorder::begin(&actor, &duplicate, Utc::now());
    recorder.record(None, Some(&duplicate));
    let operation_id = recorder.operation_id();

    let result = repository
        .insert_account(&duplicate, &recorder.finish())
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let recorded = PostgresEntityChangeRepository::new(pool)
        .list_changes_for_operations(&[operation_id])
        .await
        .unwrap_or_else(|error| panic!("changes should load: {error}"));
    assert!(recorded.is_empty());
}

#[tokio::test]
async fn holders_load_with_account_and_filter_listing() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresAccountRepository::new(pool.clone());
    let account = new_account();
    let inserted = repository.insert_account(&account, &[]).await;
    assert!(inserted.is_ok());

    let owner = insert_client(&pool).await;
    let co_owner = insert_client(&pool).await;
    for (client_id, role, is_primary) in [
        (co_owner, HolderRole::CoOwner, false),
        (owner, HolderRole::Owner, true),
    ] {
        let added = repository
            .insert_holder(
                account.id,
                &AccountHolder {
                    client_id,
                    role,
                    is_primary,
                },
                &[],
            )
            .await;
        assert!(added.is_ok());
    }

    let stored = repository
        .find_account(account.id)
        .await
        .unwrap_or_else(|error| panic!("account should load: {error}"))
        .unwrap_or_else(|| panic!("account should exist"));
    assert_eq!(stored.holders.len(), 2);
    assert_eq!(stored.holders[0].client_id, owner);
    assert!(stored.holders[0].is_primary);

    let page = repository
        .list_accounts(&ListQuery {
            filter: AccountFilter {
                client_id: Some(co_owner),
                ..AccountFilter::default()
            },
            sort: ACCOUNT_SORT_FIELDS.default,
            page: PageRequest::default(),
        })
        .await
        .unwrap_or_else(|error| panic!("accounts should list: {error}"));
    assert_eq!(page.total_count, 1);
    assert_eq!(page.items[0].id, account.id);

    let removed = repository.delete_holder(account.id, co_owner, &[]).await;
    assert!(removed.is_ok());
    let missing = repository.delete_holder(account.id, co_owner, &[]).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
