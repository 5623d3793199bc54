//! Booked account transactions.


use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    ChangeTracked, Permission, RowVersion, Transaction, TransactionDraft, TransactionStatus,
    TransactionType,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    AccountRepository, AuthorizationService, EntityChange, InstrumentRepository, ListQuery,
    Mutation, OperationRecorder, OrderRepository, Paged, SortFields, SortOrder,
};

/// Sortable transaction fields.
pub const TRANSACTION_SORT_FIELDS: SortFields = SortFields {
    allowed: &["tradeDate", "settlementDate", "amount", "createdAt"],
    default: SortOrder::desc("tradeDate"),
};

/// Transaction listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Transactions of one account.
    pub account_id: Option<Uuid>,
    /// Movement kind filter.
    pub transaction_type: Option<TransactionType>,
    /// Settlement status filter.
    pub status: Option<TransactionStatus>,
    /// Earliest trade date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest trade date, inclusive.
    pub to: Option<NaiveDate>,
}

/// Repository port for transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Lists transactions.
    async fn list_transactions(
        &self,
        query: &ListQuery<TransactionFilter>,
    ) -> AppResult<Paged<Transaction>>;

    /// Finds a transaction.
    async fn find_transaction(&self, transaction_id: Uuid) -> AppResult<Option<Transaction>>;

    /// Inserts a transaction.
    async fn insert_transaction(
        &self,
        transaction: &Transaction,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Updates a transaction when the stored row version equals `expected`.
    async fn update_transaction(
        &self,
        transaction: &Transaction,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes a transaction when the stored row version equals `expected`.
    async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Application service for transaction bookings.
#[derive(Clone)]
pub struct TransactionService {
    repository: Arc<dyn TransactionRepository>,
    account_repository: Arc<dyn AccountRepository>,
    instrument_repository: Arc<dyn InstrumentRepository>,
    order_repository: Arc<dyn OrderRepository>,
    authorization_service: AuthorizationService,
}

/// Collaborators a [`TransactionService`] checks references against.
#[derive(Clone)]
pub struct TransactionReferences {
    /// Account lookups.
    pub accounts: Arc<dyn AccountRepository>,
    /// Instrument lookups.
    pub instruments: Arc<dyn InstrumentRepository>,
    /// Order lookups.
    pub orders: Arc<dyn OrderRepository>,
}

impl TransactionService {
    /// Creates a new transaction service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        references: TransactionReferences,
            authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            account_repository: references.accounts,
            instrument_repository: references.instruments,
            order_repository: references.orders,
            authorization_service,
        }
    }

    /// Lists transactions.
    pub async fn list_transactions(
        &self,
        actor: &UserIdentity,
        query: ListQuery<TransactionFilter>,
    ) -> AppResult<Paged<Transaction>> {
        self.authorization_service
            .require_permission(actor, Permission::TransactionsRead)
            .await?;

        if let (Some(from), Some(to)) = (query.filter.from, query.filter.to)
            && from > to
        {
            return Err(AppError::Validation(
                "from must not be later than to".to_owned(),
            ));
        }

        self.repository.list_transactions(&query).await
    }

    /// Returns one transaction.
    pub async fn get_transaction(
        &self,
        actor: &UserIdentity,
        transaction_id: Uuid,
    ) -> AppResult<Transaction> {
        self.authorization_service
            .require_permission(actor, Permission::TransactionsRead)
            .await?;

        self.load(transaction_id).await
    }

    /// Books a transaction.
    pub async fn create_transaction(
        &self,
        actor: &UserIdentity,
        draft: TransactionDraft,
    ) -> AppResult<Mutation<Transaction>> {
        self.authorization_service
            .require_permission(actor, Permission::TransactionsCreate)
            .await?;

        let now = Utc::now();
        let transaction = Transaction::create(draft, now, actor.username())?;
        self.ensure_references(&transaction).await?;
        let mut recorder = OperationRecorder::begin(actor, &transaction, now);
        recorder.record(None, Some(&transaction));
        self.repository
            .insert_transaction(&transaction, &recorder.finish())
            .await?;

        Ok(Mutation::created(transaction))
    }

    /// Corrects a pending transaction.
    pub async fn update_transaction(
        &self,
        actor: &UserIdentity,
        transaction_id: Uuid,
        row_version: RowVersion,
        draft: TransactionDraft,
    ) -> AppResult<Mutation<Transaction>> {
        self.authorization_service
            .require_permission(actor, Permission::TransactionsUpdate)
            .await?;

        let existing = self.load(transaction_id).await?;
        existing.row_version.ensure_matches(
            row_version,
            Transaction::ENTITY_TYPE,
            &existing.tracked_id(),
        )?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        self.ensure_references(&updated).await?;
        updated.row_version = existing.row_version.next();
        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_transaction(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes a pending transaction.
    pub async fn delete_transaction(
        &self,
        actor: &UserIdentity,
        transaction_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::TransactionsDelete)
            .await?;

        let existing = self.load(transaction_id).await?;
        if let Some(row_version) = row_version {
            existing.row_version.ensure_matches(
                row_version,
                Transaction::ENTITY_TYPE,
                &existing.tracked_id(),
            )?;
        }
        existing.ensure_mutable()?;

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        self.repository
            .delete_transaction(transaction_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn ensure_references(&self, transaction: &Transaction) -> AppResult<()> {
        if self
            .account_repository
            .find_account(transaction.account_id)
            .await?
            .is_none()
        {
            return Err(AppError::Validation(format!(
                "account '{}' does not exist",
                transaction.account_id
            )));
        }

        if let Some(instrument_id) = transaction.instrument_id
            && self
                .instrument_repository
                .find_instrument(instrument_id)
                .await?
                .is_none()
        {
            return Err(AppError::Validation(format!(
                "instrument '{instrument_id}' does not exist"
            )));
        }

        if let Some(order_id) = transaction.order_id {
            let order = self
                .order_repository
                .find_order(order_id)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!("order '{order_id}' does not exist"))
                })?;
            if order.account_id != transaction.account_id
                || Some(order.instrument_id) != transaction.instrument_id
            {
                return Err(AppError::Validation(format!(
                    "order '{order_id}' belongs to a different account or instrument"
                )));
            }
        }

        Ok(())
    }

    async fn load(&self, transaction_id: Uuid) -> AppResult<Transaction> {
        self.repository
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("transaction '{transaction_id}' does not exist"))
            })
    }
}
