use std::sync::Arc;

use brokerdesk_application::{
    AccountRepository, AuditLogRepository, AuthTokenRepository, AuthorizationRepository,
    ClientRepository, EntityChangeRepository, InstrumentRepository, OrderRepository,
    PasswordHasher, RoleRepository, TransactionRepository, UserRepository,
};
use brokerdesk_infrastructure::{
    Argon2PasswordHasher, PostgresAccountRepository, PostgresAuditLogRepository,
    PostgresAuthTokenRepository, PostgresAuthorizationRepository, PostgresClientRepository,
    PostgresEntityChangeRepository, PostgresInstrumentRepository, PostgresOrderRepository,
    PostgresRoleRepository, PostgresTransactionRepository, PostgresUserRepository,
};
use sqlx::PgPool;

pub(super) struct RepositorySet {
    pub(super) authorization_repository: Arc<dyn AuthorizationRepository>,
    pub(super) user_repository: Arc<dyn UserRepository>,
    pub(super) role_repository: Arc<dyn RoleRepository>,
    pub(super) auth_token_repository: Arc<dyn AuthTokenRepository>,
    pub(super) password_hasher: Arc<dyn PasswordHasher>,
    pub(super) client_repository: Arc<dyn ClientRepository>,
    pub(super) account_repository: Arc<dyn AccountRepository>,
    pub(super) instrument_repository: Arc<dyn InstrumentRepository>,
    pub(super) order_repository: Arc<dyn OrderRepository>,
    pub(super) transaction_repository: Arc<dyn TransactionRepository>,
    pub(super) audit_log_repository: Arc<dyn AuditLogRepository>,
    pub(super) entity_change_repository: Arc<dyn EntityChangeRepository>,
}

pub(super) fn build_repository_set(pool: &PgPool) -> RepositorySet {
    RepositorySet {
        authorization_repository: Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
        user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
        role_repository: Arc::new(PostgresRoleRepository::new(pool.clone())),
        auth_token_repository: Arc::new(PostgresAuthTokenRepository::new(pool.clone())),
        password_hasher: Arc::new(Argon2PasswordHasher::new()),
        client_repository: Arc::new(PostgresClientRepository::new(pool.clone())),
        account_repository: Arc::new(PostgresAccountRepository::new(pool.clone())),
        instrument_repository: Arc::new(PostgresInstrumentRepository::new(pool.clone())),
        order_repository: Arc::new(PostgresOrderRepository::new(pool.clone())),
        transaction_repository: Arc::new(PostgresTransactionRepository::new(pool.clone())),
        audit_log_repository: Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        entity_change_repository: Arc::new(PostgresEntityChangeRepository::new(pool.clone())),
    }
}
