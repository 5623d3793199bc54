use brokerdesk_application::{
    AccountService, AuditLogService, AuthService, ClientService, EntityChangeService,
    InstrumentService, OrderService, RoleService, TransactionService, UserService,
};
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub postgres_pool: PgPool,
    pub auth_service: AuthService,
    pub client_service: ClientService,
    pub account_service: AccountService,
    pub instrument_service: InstrumentService,
    pub order_service: OrderService,
    pub transaction_service: TransactionService,
    pub user_service: UserService,
    pub role_service: RoleService,
    pub audit_log_service: AuditLogService,
    pub entity_change_service: EntityChangeService,
}
