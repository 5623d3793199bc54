//! Application services and ports.

#![forbid(unsafe_code)]

mod account_service;
mod audit_log_service;
mod auth_service;
mod authorization_service;
mod client_service;
mod entity_change_ports;
mod entity_change_service;
mod instrument_service;
mod mutation;
mod order_service;
mod paging;
mod role_service;
#[cfg(test)]
mod test_support;
mod transaction_service;
mod user_service;

pub use account_service::{
    ACCOUNT_SORT_FIELDS, AccountFilter, AccountRepository, AccountService,
};
pub use audit_log_service::{
    AUDIT_LOG_SORT_FIELDS, AuditLogEntry, AuditLogFilter, AuditLogRecord, AuditLogRepository,
    AuditLogService,
};
pub use auth_service::{
    AuthService, AuthSession, AuthSettings, AuthTokenRecord, AuthTokenRepository, BootstrapAdmin,
    CurrentUser, TokenKind, TokenPair,
};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use client_service::{CLIENT_SORT_FIELDS, ClientFilter, ClientRepository, ClientService};
pub use entity_change_ports::{
    ChangeGroup, ENTITY_CHANGE_SORT_FIELDS, EntityChange, EntityChangeFilter,
    EntityChangeRepository, FieldChange, OperationHistory, OperationPage, OperationSummary,
};
pub use entity_change_service::{EntityChangeService, OperationRecorder, group_operations};
pub use instrument_service::{
    INSTRUMENT_SORT_FIELDS, InstrumentFilter, InstrumentRepository, InstrumentService,
};
pub use mutation::{AuditSnapshot, Mutation};
pub use order_service::{ORDER_SORT_FIELDS, OrderFilter, OrderRepository, OrderService};
pub use paging::{
    DEFAULT_PAGE_SIZE, ListQuery, MAX_PAGE_SIZE, PageRequest, Paged, SortFields, SortOrder,
};
pub use role_service::{ROLE_SORT_FIELDS, RoleFilter, RoleRepository, RoleService};
pub use transaction_service::{
    TRANSACTION_SORT_FIELDS, TransactionFilter, TransactionReferences, TransactionRepository,
    TransactionService,
};
pub use user_service::{
    PasswordHasher, USER_SORT_FIELDS, UserCredentials, UserFilter, UserRepository, UserService,
};
