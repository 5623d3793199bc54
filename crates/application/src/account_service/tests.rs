use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{
    Account, AccountDraft, AccountHolder, AccountStatus, AccountType, ChangeType, HolderRole,
    RowVersion, stale_version,
};
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::test_support::{ChangeJournal, actor, authorization_all};
use crate::{EntityChange, ListQuery, Paged};

use super::{AccountFilter, AccountRepository, AccountService};

#[derive(Default)]
struct FakeAccountRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
    changes: ChangeJournal,
}

#[async_trait]
impl AccountRepository for FakeAccountRepository {
    async fn list_accounts(&self, query: &ListQuery<AccountFilter>) -> AppResult<Paged<Account>> {
        let accounts: Vec<Account> = self.accounts.lock().await.values().cloned().collect();
        let total = accounts.len() as u64;
        Ok(Paged::new(accounts, total, query.page))
    }

    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.lock().await.get(&account_id).cloned())
    }

    async fn insert_account(&self, account: &Account, changes: &[EntityChange]) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        if accounts
            .values()
            .any(|existing| existing.account_number == account.account_number)
        {
            return Err(AppError::Conflict("account number already exists".to_owned()));
        }
        accounts.insert(account.id, account.clone());
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_account(
        &self,
        account: &Account,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        match accounts.get(&account.id) {
            Some(stored) if stored.row_version == expected => {
                accounts.insert(account.id, account.clone());
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("Account", &account.id.to_string())),
        }
    }

    async fn delete_account(
        &self,
        account_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut accounts = self.accounts.lock().await;
        match accounts.get(&account_id) {
            Some(stored) if stored.row_version == expected => {
                accounts.remove(&account_id);
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("Account", &account_id.to_string())),
        }
    }

    async fn insert_holder(
        &self,
        account_id: Uuid,
        holder: &AccountHolder,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        if let Some(account) = self.accounts.lock().await.get_mut(&account_id) {
            account.holders.push(holder.clone());
        }
        self.changes.append(changes).await;
        Ok(())
    }

    async fn delete_holder(
        &self,
        account_id: Uuid,
        client_id: Uuid,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        if let Some(account) = self.accounts.lock().await.get_mut(&account_id) {
            account.holders.retain(|holder| holder.client_id != client_id);
        }
        self.changes.append(changes).await;
        Ok(())
    }
}

fn draft(account_number: &str) -> AccountDraft {
    AccountDraft {
        account_number: account_number.to_owned(),
        account_type: AccountType::Joint,
        status: AccountStatus::Active,
        currency: "EUR".to_owned(),
        opened_at: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap_or_default(),
        closed_at: None,
        comment: None,
    }
}

fn holder(is_primary: bool) -> AccountHolder {
    AccountHolder {
        client_id: Uuid::new_v4(),
        role: HolderRole::CoOwner,
        is_primary,
    }
}

async fn open_account(service: &AccountService) -> Account {
    service
        .create_account(&actor(), draft("DE-1000-01"))
        .await
        .unwrap_or_else(|error| panic!("account should be created: {error}"))
        .value
}

#[tokio::test]
async fn duplicate_account_number_is_conflict() {
    let service = AccountService::new(
        Arc::new(FakeAccountRepository::default()),
        authorization_all(),
    );
    open_account(&service).await;

    let result = service.create_account(&actor(), draft("de-1000-01")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn holder_changes_are_nested_under_the_account() {
    let repository = Arc::new(FakeAccountRepository::default());
    let service = AccountService::new(repository.clone(), authorization_all());
    let account = open_account(&service).await;
    repository.changes.clear().await;

    let primary = holder(true);
    service
        .add_holder(&actor(), account.id, primary.clone())
        .await
        .unwrap_or_else(|error| panic!("holder should be added: {error}"));

    let recorded = repository.changes.recorded().await;
    assert!(!recorded.is_empty());
    assert!(recorded.iter().all(|change| {
        change.entity_id == account.id.to_string()
            && change.related_entity_type.as_deref() == Some("AccountHolder")
            && change.related_entity_id == Some(primary.client_id.to_string())
            && change.change_type == ChangeType::Created
    }));
}

#[tokio::test]
async fn second_primary_holder_is_conflict() {
    let service = AccountService::new(
        Arc::new(FakeAccountRepository::default()),
        authorization_all(),
    );
    let account = open_account(&service).await;
    service
        .add_holder(&actor(), account.id, holder(true))
        .await
        .unwrap_or_else(|error| panic!("holder should be added: {error}"));

    let result = service.add_holder(&actor(), account.id, holder(true)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn removing_unknown_holder_is_not_found() {
    let service = AccountService::new(
        Arc::new(FakeAccountRepository::default()),
        authorization_all(),
    );
    let account = open_account(&service).await;

    let result = service
        .remove_holder(&actor(), account.id, Uuid::new_v4())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn stale_delete_is_conflict() {
    let repository = Arc::new(FakeAccountRepository::default());
    let service = AccountService::new(repository.clone(), authorization_all());
    let account = open_account(&service).await;

    let result = service
        .delete_account(&actor(), account.id, Some(account.row_version.next()))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(repository.accounts.lock().await.len(), 1);
}
