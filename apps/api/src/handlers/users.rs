use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, USER_SORT_FIELDS, UserFilter};
use brokerdesk_core::{AppError, UserIdentity};
use uuid::Uuid;

use crate::dto::{
    DeleteParams, PagedResponse, UserListParams, UserRequest, UserResponse, required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<PagedResponse<UserResponse>>> {
    let query = list_query(
        USER_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        UserFilter {
            search: params.search,
            is_active: params.is_active,
            role_id: params.role_id,
        },
    )?;

    let users = state.user_service.list_users(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(users)))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let found = state.user_service.get_user(&user, user_id).await?;

    Ok(Json(UserResponse::from(found)))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<UserRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<UserResponse>)> {
    let parts = payload.into_parts();
    let password = parts
        .password
        .ok_or_else(|| AppError::Validation("password is required".to_owned()))?;

    let mutation = state
        .user_service
        .create_user(&user, parts.draft, password.as_str())
        .await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(UserResponse::from(mutation.value)),
    ))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<UserResponse>)> {
    let parts = payload.into_parts();
    let mutation = state
        .user_service
        .update_user(
            &user,
            user_id,
            required_row_version(parts.row_version)?,
            parts.draft,
            parts.password.as_deref(),
        )
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(UserResponse::from(mutation.value)),
    ))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .user_service
        .delete_user(&user, user_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
