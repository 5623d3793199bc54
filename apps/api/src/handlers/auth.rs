use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use brokerdesk_core::UserIdentity;

use crate::dto::{LoginRequest, MeResponse, RefreshTokenRequest, TokenResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Exchanges credentials for a token pair. The identity extension lets the
/// audit interceptor attribute the login.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(Extension<UserIdentity>, Json<TokenResponse>)> {
    let session = state
        .auth_service
        .login(payload.username.as_str(), payload.password.as_str())
        .await?;

    Ok((
        Extension(session.identity),
        Json(TokenResponse::from(session.tokens)),
    ))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<(Extension<UserIdentity>, Json<TokenResponse>)> {
    let session = state
        .auth_service
        .refresh(payload.refresh_token.as_str())
        .await?;

    Ok((
        Extension(session.identity),
        Json(TokenResponse::from(session.tokens)),
    ))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RefreshTokenRequest>,
) -> ApiResult<StatusCode> {
    state
        .auth_service
        .logout(&user, payload.refresh_token.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<MeResponse>> {
    let current_user = state.auth_service.current_user(&user).await?;

    Ok(Json(MeResponse::from(current_user)))
}
