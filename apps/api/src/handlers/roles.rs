use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, ROLE_SORT_FIELDS, RoleFilter};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    DeleteParams, PagedResponse, PermissionResponse, RoleListParams, RoleRequest, RoleResponse,
    required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<PermissionResponse>>> {
    let permissions = state
        .role_service
        .list_permissions(&user)
        .await?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<RoleListParams>,
) -> ApiResult<Json<PagedResponse<RoleResponse>>> {
    let query = list_query(
        ROLE_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        RoleFilter {
            search: params.search,
        },
    )?;

    let roles = state.role_service.list_roles(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(roles)))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state.role_service.get_role(&user, role_id).await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<RoleResponse>)> {
    let (draft, _) = payload.into_draft()?;
    let mutation = state.role_service.create_role(&user, draft).await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(RoleResponse::from(mutation.value)),
    ))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<RoleResponse>)> {
    let (draft, row_version) = payload.into_draft()?;
    let mutation = state
        .role_service
        .update_role(&user, role_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(RoleResponse::from(mutation.value)),
    ))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .role_service
        .delete_role(&user, role_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
