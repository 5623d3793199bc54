//! Brokerage accounts and their holders.

mod holders;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    Account, AccountDraft, AccountHolder, AccountStatus, AccountType, ChangeTracked, Permission,
    RowVersion,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthorizationService, EntityChange, ListQuery, Mutation, OperationRecorder, Paged, SortFields,
    SortOrder,
};

/// Sortable account fields.
pub const ACCOUNT_SORT_FIELDS: SortFields = SortFields {
    allowed: &["createdAt", "accountNumber", "openedAt", "status"],
    default: SortOrder::desc("createdAt"),
};

/// Account listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    /// Prefix match on the account number.
    pub search: Option<String>,
    /// Status filter.
    pub status: Option<AccountStatus>,
    /// Product type filter.
    pub account_type: Option<AccountType>,
    /// Accounts held by this client.
    pub client_id: Option<Uuid>,
}

/// Repository port for accounts and account holders.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Lists accounts with holders.
    async fn list_accounts(&self, query: &ListQuery<AccountFilter>) -> AppResult<Paged<Account>>;

    /// Finds an account with holders.
    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>>;

    /// Inserts an account. Every write of this port stores `changes` in the
    /// same transaction as the account rows.
    async fn insert_account(&self, account: &Account, changes: &[EntityChange]) -> AppResult<()>;

    /// Updates account attributes when the stored row version equals `expected`.
    async fn update_account(
        &self,
        account: &Account,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes an account and its holder links when the stored row version equals `expected`.
    async fn delete_account(
        &self,
        account_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Attaches a client to an account.
    async fn insert_holder(
        &self,
        account_id: Uuid,
        holder: &AccountHolder,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Detaches a client from an account.
    async fn delete_holder(
        &self,
        account_id: Uuid,
        client_id: Uuid,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Application service for account administration.
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    authorization_service: AuthorizationService,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Lists accounts.
    pub async fn list_accounts(
        &self,
        actor: &UserIdentity,
        query: ListQuery<AccountFilter>,
    ) -> AppResult<Paged<Account>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsRead)
            .await?;

        self.repository.list_accounts(&query).await
    }

    /// Returns one account with its holders.
    pub async fn get_account(&self, actor: &UserIdentity, account_id: Uuid) -> AppResult<Account> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsRead)
            .await?;

        self.load(account_id).await
    }

    /// Opens an account.
    pub async fn create_account(
        &self,
        actor: &UserIdentity,
        draft: AccountDraft,
    ) -> AppResult<Mutation<Account>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsCreate)
            .await?;

        let now = Utc::now();
        let account = Account::create(draft, now, actor.username())?;

        let mut recorder = OperationRecorder::begin(actor, &account, now);
        recorder.record(None, Some(&account));
        self.repository
            .insert_account(&account, &recorder.finish())
            .await?;

        Ok(Mutation::created(account))
    }

    /// Updates account attributes. Holders are managed separately.
    pub async fn update_account(
        &self,
        actor: &UserIdentity,
        account_id: Uuid,
        row_version: RowVersion,
        draft: AccountDraft,
    ) -> AppResult<Mutation<Account>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsUpdate)
            .await?;

        let existing = self.load(account_id).await?;
        existing
            .row_version
            .ensure_matches(row_version, Account::ENTITY_TYPE, &existing.tracked_id())?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        updated.row_version = existing.row_version.next();

        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_account(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes an account together with its holder links.
    pub async fn delete_account(
        &self,
        actor: &UserIdentity,
        account_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::AccountsDelete)
            .await?;

        let existing = self.load(account_id).await?;
        if let Some(row_version) = row_version {
            existing
                .row_version
                .ensure_matches(row_version, Account::ENTITY_TYPE, &existing.tracked_id())?;
        }

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        recorder.record_related_set(&existing.holders, &[]);
        self.repository
            .delete_account(account_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn load(&self, account_id: Uuid) -> AppResult<Account> {
        self.repository
            .find_account(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account '{account_id}' does not exist")))
    }
}
