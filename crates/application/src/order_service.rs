//! Client orders.
//!
//! New and changed orders must reference an open account and an active
//! instrument. Filled, cancelled and rejected orders are frozen.


use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    AccountStatus, ChangeTracked, Order, OrderDraft, OrderSide, OrderStatus, Permission,
    RowVersion,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AccountRepository, AuthorizationService, EntityChange, InstrumentRepository, ListQuery,
    Mutation, OperationRecorder, Paged, SortFields, SortOrder,
};

/// Sortable order fields.
pub const ORDER_SORT_FIELDS: SortFields = SortFields {
    allowed: &["createdAt", "status", "side", "quantity"],
    default: SortOrder::desc("createdAt"),
};

/// Order listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Orders of one account.
    pub account_id: Option<Uuid>,
    /// Orders on one instrument.
    pub instrument_id: Option<Uuid>,
    /// Status filter.
    pub status: Option<OrderStatus>,
    /// Side filter.
    pub side: Option<OrderSide>,
}

/// Repository port for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Lists orders.
    async fn list_orders(&self, query: &ListQuery<OrderFilter>) -> AppResult<Paged<Order>>;

    /// Finds an order.
    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>>;

    /// Inserts an order.
    async fn insert_order(&self, order: &Order, changes: &[EntityChange]) -> AppResult<()>;

    /// Updates an order when the stored row version equals `expected`.
    async fn update_order(
        &self,
        order: &Order,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes an order when the stored row version equals `expected`.
    async fn delete_order(
        &self,
        order_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Application service for order administration.
#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    account_repository: Arc<dyn AccountRepository>,
    instrument_repository: Arc<dyn InstrumentRepository>,
    authorization_service: AuthorizationService,
}

impl OrderService {
    /// Creates a new order service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        account_repository: Arc<dyn AccountRepository>,
        instrument_repository: Arc<dyn InstrumentRepository>,
            authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            account_repository,
            instrument_repository,
            authorization_service,
        }
    }

    /// Lists orders.
    pub async fn list_orders(
        &self,
        actor: &UserIdentity,
        query: ListQuery<OrderFilter>,
    ) -> AppResult<Paged<Order>> {
        self.authorization_service
            .require_permission(actor, Permission::OrdersRead)
            .await?;

        self.repository.list_orders(&query).await
    }

    /// Returns one order.
    pub async fn get_order(&self, actor: &UserIdentity, order_id: Uuid) -> AppResult<Order> {
        self.authorization_service
            .require_permission(actor, Permission::OrdersRead)
            .await?;

        self.load(order_id).await
    }

    /// Places an order.
    pub async fn create_order(
        &self,
        actor: &UserIdentity,
        draft: OrderDraft,
    ) -> AppResult<Mutation<Order>> {
        self.authorization_service
            .require_permission(actor, Permission::OrdersCreate)
            .await?;

        let now = Utc::now();
        let order = Order::create(draft, now, actor.username())?;
        self.ensure_tradable(&order).await?;
        let mut recorder = OperationRecorder::begin(actor, &order, now);
        recorder.record(None, Some(&order));
        self.repository
            .insert_order(&order, &recorder.finish())
            .await?;

        Ok(Mutation::created(order))
    }

    /// Amends a working order.
    pub async fn update_order(
        &self,
        actor: &UserIdentity,
        order_id: Uuid,
        row_version: RowVersion,
        draft: OrderDraft,
    ) -> AppResult<Mutation<Order>> {
        self.authorization_service
            .require_permission(actor, Permission::OrdersUpdate)
            .await?;

        let existing = self.load(order_id).await?;
        existing
            .row_version
            .ensure_matches(row_version, Order::ENTITY_TYPE, &existing.tracked_id())?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        if updated.account_id != existing.account_id
            || updated.instrument_id != existing.instrument_id
        {
            self.ensure_tradable(&updated).await?;
        }
        updated.row_version = existing.row_version.next();
        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_order(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes a working order.
    pub async fn delete_order(
        &self,
        actor: &UserIdentity,
        order_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::OrdersDelete)
            .await?;

        let existing = self.load(order_id).await?;
        if let Some(row_version) = row_version {
            existing
                .row_version
                .ensure_matches(row_version, Order::ENTITY_TYPE, &existing.tracked_id())?;
        }
        existing.ensure_mutable()?;

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        self.repository
            .delete_order(order_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn ensure_tradable(&self, order: &Order) -> AppResult<()> {
        let account = self
            .account_repository
            .find_account(order.account_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("account '{}' does not exist", order.account_id))
            })?;
        if account.status != AccountStatus::Active {
            return Err(AppError::Validation(format!(
                "account '{}' is {} and cannot trade",
                account.account_number, account.status
            )));
        }

        let instrument = self
            .instrument_repository
            .find_instrument(order.instrument_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "instrument '{}' does not exist",
                    order.instrument_id
                ))
            })?;
        if !instrument.is_active {
            return Err(AppError::Validation(format!(
                "instrument '{}' is not active",
                instrument.symbol
            )));
        }

        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> AppResult<Order> {
        self.repository
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order '{order_id}' does not exist")))
    }
}
