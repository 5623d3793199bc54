use brokerdesk_application::{
    AccountService, AuditLogService, AuthService, AuthSettings, AuthorizationService,
    ClientService, EntityChangeService, InstrumentService, OrderService, RoleService,
    TransactionReferences, TransactionService, UserService,
};
use sqlx::PgPool;

use crate::state::AppState;

mod repositories;

pub fn build_app_state(pool: PgPool, auth_settings: AuthSettings) -> AppState {
    let repositories = repositories::build_repository_set(&pool);
    let authorization_service =
        AuthorizationService::new(repositories.authorization_repository.clone());

    AppState {
        auth_service: AuthService::new(
            repositories.user_repository.clone(),
            repositories.role_repository.clone(),
            repositories.auth_token_repository.clone(),
            repositories.password_hasher.clone(),
            authorization_service.clone(),
            auth_settings,
        ),
        client_service: ClientService::new(
            repositories.client_repository.clone(),
            authorization_service.clone(),
        ),
        account_service: AccountService::new(
            repositories.account_repository.clone(),
            authorization_service.clone(),
        ),
        instrument_service: InstrumentService::new(
            repositories.instrument_repository.clone(),
            authorization_service.clone(),
        ),
        order_service: OrderService::new(
            repositories.order_repository.clone(),
            repositories.account_repository.clone(),
            repositories.instrument_repository.clone(),
            authorization_service.clone(),
        ),
        transaction_service: TransactionService::new(
            repositories.transaction_repository.clone(),
            TransactionReferences {
                accounts: repositories.account_repository.clone(),
                instruments: repositories.instrument_repository.clone(),
                orders: repositories.order_repository.clone(),
            },
            authorization_service.clone(),
        ),
        user_service: UserService::new(
            repositories.user_repository.clone(),
            repositories.password_hasher.clone(),
            authorization_service.clone(),
        ),
        role_service: RoleService::new(
            repositories.role_repository.clone(),
            authorization_service.clone(),
        ),
        audit_log_service: AuditLogService::new(
            repositories.audit_log_repository.clone(),
            authorization_service.clone(),
        ),
        entity_change_service: EntityChangeService::new(
            repositories.entity_change_repository.clone(),
            authorization_service,
        ),
        postgres_pool: pool,
    }
}
