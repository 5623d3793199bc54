use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use brokerdesk_core::AppError;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let public_auth_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login_handler))
        .route("/auth/refresh", post(handlers::auth::refresh_handler))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::audit_mutations,
        ));

    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout_handler))
        .route("/auth/me", get(handlers::auth::me_handler))
        .route(
            "/clients",
            get(handlers::clients::list_clients_handler)
                .post(handlers::clients::create_client_handler),
        )
        .route(
            "/clients/{client_id}",
            get(handlers::clients::get_client_handler)
                .put(handlers::clients::update_client_handler)
                .delete(handlers::clients::delete_client_handler),
        )
        .route(
            "/accounts",
            get(handlers::accounts::list_accounts_handler)
                .post(handlers::accounts::create_account_handler),
        )
        .route(
            "/accounts/{account_id}",
            get(handlers::accounts::get_account_handler)
                .put(handlers::accounts::update_account_handler)
                .delete(handlers::accounts::delete_account_handler),
        )
        .route(
            "/accounts/{account_id}/holders",
            get(handlers::accounts::list_account_holders_handler)
                .post(handlers::accounts::add_account_holder_handler),
        )
        .route(
            "/accounts/{account_id}/holders/{client_id}",
            delete(handlers::accounts::remove_account_holder_handler),
        )
        .route(
            "/instruments",
            get(handlers::instruments::list_instruments_handler)
                .post(handlers::instruments::create_instrument_handler),
        )
        .route(
            "/instruments/{instrument_id}",
            get(handlers::instruments::get_instrument_handler)
                .put(handlers::instruments::update_instrument_handler)
                .delete(handlers::instruments::delete_instrument_handler),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders_handler).post(handlers::orders::create_order_handler),
        )
        .route(
            "/orders/{order_id}",
            get(handlers::orders::get_order_handler)
                .put(handlers::orders::update_order_handler)
                .delete(handlers::orders::delete_order_handler),
        )
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions_handler)
                .post(handlers::transactions::create_transaction_handler),
        )
        .route(
            "/transactions/{transaction_id}",
            get(handlers::transactions::get_transaction_handler)
                .put(handlers::transactions::update_transaction_handler)
                .delete(handlers::transactions::delete_transaction_handler),
        )
        .route(
            "/users",
            get(handlers::users::list_users_handler).post(handlers::users::create_user_handler),
        )
        .route(
            "/users/{user_id}",
            get(handlers::users::get_user_handler)
                .put(handlers::users::update_user_handler)
                .delete(handlers::users::delete_user_handler),
        )
        .route(
            "/roles",
            get(handlers::roles::list_roles_handler).post(handlers::roles::create_role_handler),
        )
        .route(
            "/roles/{role_id}",
            get(handlers::roles::get_role_handler)
                .put(handlers::roles::update_role_handler)
                .delete(handlers::roles::delete_role_handler),
        )
        .route(
            "/permissions",
            get(handlers::roles::list_permissions_handler),
        )
        .route(
            "/audit-logs",
            get(handlers::audit_logs::list_audit_logs_handler),
        )
        .route(
            "/entity-changes",
            get(handlers::entity_changes::entity_history_handler),
        )
        .route(
            "/entity-changes/all",
            get(handlers::entity_changes::change_feed_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::audit_mutations,
        ))
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let api_routes = Router::new()
        .merge(public_auth_routes)
        .merge(protected_routes);

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .nest("/api/v1", api_routes)
        .layer(from_fn(middleware::assign_correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
