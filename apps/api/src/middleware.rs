use axum::extract::{OriginalUri, Request, State};
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use brokerdesk_application::{AuditLogRecord, AuditSnapshot};
use brokerdesk_core::{AppError, UserIdentity};
use brokerdesk_domain::AuditAction;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;


pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers().get(header::AUTHORIZATION))?;
    let identity = state.auth_service.authenticate(token).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Reuses a UUID `x-correlation-id` header or assigns a new one, and echoes it
/// on the response.
pub async fn assign_correlation_id(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4);

    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }
    response
}

/// Writes one audit log row per state-changing request once the handler has
/// produced its response. Failures to write are logged and never surface.
pub async fn audit_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let Some(method_action) = AuditAction::for_method(method.as_str()) else {
        return next.run(request).await;
    };

    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|correlation_id| correlation_id.0)
        .unwrap_or_else(Uuid::new_v4);
    let caller = request.extensions().get::<UserIdentity>().cloned();

    let response = next.run(request).await;

    let actor = caller.or_else(|| response.extensions().get::<UserIdentity>().cloned());
    let snapshot = response.extensions().get::<AuditSnapshot>().cloned();
    let record = audit_record(
        audit_action(method_action, &path),
        &method,
        path,
        response.status().as_u16(),
        correlation_id,
        actor.as_ref(),
        snapshot,
    );

    if let Err(error) = state.audit_log_service.record(record).await {
        warn!(%error, %correlation_id, "failed to write audit log entry");
    }

    response
}

fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AppError> {
    let value = header
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_owned()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_owned()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(
            "authorization scheme must be Bearer".to_owned(),
        ));
    }

    Ok(token)
}

fn audit_action(method_action: AuditAction, path: &str) -> AuditAction {
    let path = path.trim_end_matches('/');
    if path.ends_with("/auth/login") {
        AuditAction::Login
    } else if path.ends_with("/auth/refresh") {
        AuditAction::TokenRefresh
    } else if path.ends_with("/auth/logout") {
        AuditAction::Logout
    } else {
        method_action
    }
}

fn audit_record(
    action: AuditAction,
    method: &Method,
    path: String,
    status_code: u16,
    correlation_id: Uuid,
    actor: Option<&UserIdentity>,
    snapshot: Option<AuditSnapshot>,
) -> AuditLogRecord {
    let (entity_type, entity_id, old_values, new_values) = match snapshot {
        Some(snapshot) => (
            Some(snapshot.entity_type),
            Some(snapshot.entity_id),
            snapshot.old_values,
            snapshot.new_values,
        ),
        None => (None, None, None, None),
    };

    AuditLogRecord {
        user_id: actor.map(UserIdentity::user_id),
        user_name: actor.map(|actor| actor.display_name().to_owned()),
        action,
        entity_type,
        entity_id,
        old_values,
        new_values,
        correlation_id,
        request_path: path,
        request_method: method.as_str().to_owned(),
        status_code,
    }
}
