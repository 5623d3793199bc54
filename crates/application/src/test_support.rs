use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    Account, AccountDraft, AccountHolder, AccountStatus, AccountType, Instrument,
    InstrumentDraft, InstrumentType, Order, Permission, RowVersion, User, UserDraft,
    stale_version,
};
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    AccountFilter, AccountRepository, AuthorizationRepository, AuthorizationService,
    EntityChange, InstrumentFilter, InstrumentRepository, ListQuery, OrderFilter,
    OrderRepository, PageRequest, Paged, PasswordHasher, UserCredentials, UserFilter,
    UserRepository,
};

pub(crate) struct FakeAuthorizationRepository {
    permissions: Vec<Permission>,
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_permissions_for_user(&self, _user_id: Uuid) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.clone())
    }
}

pub(crate) fn authorization(permissions: &[Permission]) -> AuthorizationService {
    AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
        permissions: permissions.to_vec(),
    }))
}

pub(crate) fn authorization_all() -> AuthorizationService {
    authorization(Permission::all())
}

pub(crate) fn actor() -> UserIdentity {
    UserIdentity::new(Uuid::new_v4(), "desk.admin", "Desk Admin")
}

/// Change rows a fake repository accepted together with its writes.
#[derive(Default)]
pub(crate) struct ChangeJournal {
    changes: Mutex<Vec<EntityChange>>,
}

impl ChangeJournal {
    pub(crate) async fn append(&self, changes: &[EntityChange]) {
        self.changes.lock().await.extend_from_slice(changes);
    }

    pub(crate) async fn recorded(&self) -> Vec<EntityChange> {
        self.changes.lock().await.clone()
    }

    pub(crate) async fn clear(&self) {
        self.changes.lock().await.clear();
    }
}

/// Accounts, instruments and orders kept in memory for reference checks.
#[derive(Default)]
pub(crate) struct TradingBook {
    pub(crate) accounts: Mutex<HashMap<Uuid, Account>>,
    pub(crate) instruments: Mutex<HashMap<Uuid, Instrument>>,
    pub(crate) orders: Mutex<HashMap<Uuid, Order>>,
    pub(crate) changes: ChangeJournal,
}

impl TradingBook {
    pub(crate) async fn seed_account(&self, status: AccountStatus) -> Account {
        let draft = AccountDraft {
            account_number: format!("CH-{}", &Uuid::new_v4().simple().to_string()[..8]),
            account_type: AccountType::Individual,
            status,
            currency: "CHF".to_owned(),
            opened_at: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            closed_at: (status == AccountStatus::Closed)
                .then(|| NaiveDate::from_ymd_opt(2025, 1, 15).unwrap_or_default()),
            comment: None,
        };
        let account = Account::create(draft, Utc::now(), "seed")
            .unwrap_or_else(|error| panic!("seed account should be valid: {error}"));
        self.accounts
            .lock()
            .await
            .insert(account.id, account.clone());
        account
    }

    pub(crate) async fn seed_instrument(&self, is_active: bool) -> Instrument {
        let draft = InstrumentDraft {
            symbol: "NESN".to_owned(),
            name: "Nestle SA".to_owned(),
            isin: None,
            instrument_type: InstrumentType::Stock,
            currency: "CHF".to_owned(),
            exchange: Some("XSWX".to_owned()),
            lot_size: 1,
            is_active,
        };
        let instrument = Instrument::create(draft, Utc::now(), "seed")
            .unwrap_or_else(|error| panic!("seed instrument should be valid: {error}"));
        self.instruments
            .lock()
            .await
            .insert(instrument.id, instrument.clone());
        instrument
    }
}

fn page_of<T: Clone>(values: impl Iterator<Item = T>, page: PageRequest) -> Paged<T> {
    let items: Vec<T> = values.collect();
    let total = items.len() as u64;
    Paged::new(items, total, page)
}

#[async_trait]
impl AccountRepository for TradingBook {
    async fn list_accounts(&self, query: &ListQuery<AccountFilter>) -> AppResult<Paged<Account>> {
        Ok(page_of(
            self.accounts.lock().await.values().cloned(),
            query.page,
        ))
    }

    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.accounts.lock().await.get(&account_id).cloned())
    }

    async fn insert_account(&self, account: &Account, changes: &[EntityChange]) -> AppResult<()> {
        self.accounts
            .lock()
            .await
            .insert(account.id, account.clone());
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_account(
        &self,
        account: &Account,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.insert_account(account, changes).await
    }

    async fn delete_account(
        &self,
        account_id: Uuid,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.accounts.lock().await.remove(&account_id);
        self.changes.append(changes).await;
        Ok(())
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

#[async_trait]
impl InstrumentRepository for TradingBook {
    async fn list_instruments(
        &self,
        query: &ListQuery<InstrumentFilter>,
    ) -> AppResult<Paged<Instrument>> {
        Ok(page_of(
            self.instruments.lock().await.values().cloned(),
            query.page,
        ))
    }

    async fn find_instrument(&self, instrument_id: Uuid) -> AppResult<Option<Instrument>> {
        Ok(self.instruments.lock().await.get(&instrument_id).cloned())
    }

    async fn insert_instrument(
        &self,
        instrument: &Instrument,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.instruments
            .lock()
            .await
            .insert(instrument.id, instrument.clone());
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_instrument(
        &self,
        instrument: &Instrument,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.insert_instrument(instrument, changes).await
    }

    async fn delete_instrument(
        &self,
        instrument_id: Uuid,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.instruments.lock().await.remove(&instrument_id);
        self.changes.append(changes).await;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for TradingBook {
    async fn list_orders(&self, query: &ListQuery<OrderFilter>) -> AppResult<Paged<Order>> {
        Ok(page_of(
            self.orders
                .lock()
                .await
                .values()
                .filter(|order| {
                    query
                        .filter
                        .account_id
                        .is_none_or(|account_id| order.account_id == account_id)
                })
                .cloned(),
            query.page,
        ))
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.orders.lock().await.get(&order_id).cloned())
    }

    async fn insert_order(&self, order: &Order, changes: &[EntityChange]) -> AppResult<()> {
        self.orders.lock().await.insert(order.id, order.clone());
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut orders = self.orders.lock().await;
        match orders.get(&order.id) {
            Some(stored) if stored.row_version == expected => {
                orders.insert(order.id, order.clone());
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("Order", &order.id.to_string())),
        }
    }

    async fn delete_order(
        &self,
        order_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut orders = self.orders.lock().await;
        match orders.get(&order_id) {
            Some(stored) if stored.row_version == expected => {
                orders.remove(&order_id);
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("Order", &order_id.to_string())),
        }
    }
}

/// Reversible stand-in for Argon2id.
pub(crate) struct PlainPasswordHasher;

impl PasswordHasher for PlainPasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

#[derive(Default)]
pub(crate) struct FakeUserRepository {
    pub(crate) users: Mutex<HashMap<Uuid, UserCredentials>>,
    pub(crate) changes: ChangeJournal,
}

impl FakeUserRepository {
    pub(crate) async fn seed_user(&self, username: &str, password: &str, is_active: bool) -> User {
        let draft = UserDraft {
            username: username.to_owned(),
            email: format!("{username}@brokerdesk.test"),
            full_name: format!("{username} Tester"),
            is_active,
            role_ids: Vec::new(),
        };
        let user = User::create(draft, Utc::now(), "seed")
            .unwrap_or_else(|error| panic!("seed user should be valid: {error}"));
        self.users.lock().await.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: format!("plain:{password}"),
            },
        );
        user
    }
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn list_users(&self, query: &ListQuery<UserFilter>) -> AppResult<Paged<User>> {
        Ok(page_of(
            self.users
                .lock()
                .await
                .values()
                .map(|credentials| credentials.user.clone()),
            query.page,
        ))
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .get(&user_id)
            .map(|credentials| credentials.user.clone()))
    }

    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|credentials| credentials.user.username == username)
            .cloned())
    }

    async fn insert_user(
        &self,
        user: &User,
        password_hash: &str,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut users = self.users.lock().await;
        if users.values().any(|credentials| {
            credentials.user.username == user.username || credentials.user.email == user.email
        }) {
            return Err(AppError::Conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        self.changes.append(changes).await;
        Ok(())
    }

    async fn update_user(
        &self,
        user: &User,
        expected: RowVersion,
        password_hash: Option<&str>,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut users = self.users.lock().await;
        match users.get_mut(&user.id) {
            Some(stored) if stored.user.row_version == expected => {
                stored.user = user.clone();
                if let Some(password_hash) = password_hash {
                    password_hash.clone_into(&mut stored.password_hash);
                }
                self.changes.append(changes).await;
                Ok(())
            }
            _ => Err(stale_version("User", &user.id.to_string())),
        }
    }

    async fn delete_user(
        &self,
        user_id: Uuid,
        _expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.users.lock().await.remove(&user_id);
        self.changes.append(changes).await;
        Ok(())
    }
}
