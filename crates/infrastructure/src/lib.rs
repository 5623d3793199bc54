//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_entity_change_repository;
mod postgres_account_repository;
mod postgres_audit_log_repository;
mod postgres_auth_token_repository;
mod postgres_authorization_repository;
mod postgres_client_repository;
mod postgres_entity_change_repository;
mod postgres_instrument_repository;
mod postgres_order_repository;
mod postgres_role_repository;
mod postgres_support;
#[cfg(test)]
mod postgres_test_support;
mod postgres_transaction_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_entity_change_repository::InMemoryEntityChangeRepository;
pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_auth_token_repository::PostgresAuthTokenRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_client_repository::PostgresClientRepository;
pub use postgres_entity_change_repository::PostgresEntityChangeRepository;
pub use postgres_instrument_repository::PostgresInstrumentRepository;
pub use postgres_order_repository::PostgresOrderRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
pub use postgres_user_repository::PostgresUserRepository;
