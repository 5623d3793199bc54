use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, CLIENT_SORT_FIELDS, ClientFilter};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    ClientListParams, ClientRequest, ClientResponse, DeleteParams, PagedResponse,
    required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_clients_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<ClientListParams>,
) -> ApiResult<Json<PagedResponse<ClientResponse>>> {
    let query = list_query(
        CLIENT_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        ClientFilter {
            search: params.search,
            status: params.status,
            client_type: params.client_type,
        },
    )?;

    let clients = state.client_service.list_clients(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(clients)))
}

pub async fn get_client_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(client_id): Path<Uuid>,
) -> ApiResult<Json<ClientResponse>> {
    let client = state.client_service.get_client(&user, client_id).await?;

    Ok(Json(ClientResponse::from(client)))
}

pub async fn create_client_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<ClientRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<ClientResponse>)> {
    let (draft, _) = payload.into_draft();
    let mutation = state.client_service.create_client(&user, draft).await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(ClientResponse::from(mutation.value)),
    ))
}

pub async fn update_client_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<ClientRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<ClientResponse>)> {
    let (draft, row_version) = payload.into_draft();
    let mutation = state
        .client_service
        .update_client(&user, client_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(ClientResponse::from(mutation.value)),
    ))
}

pub async fn delete_client_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(client_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .client_service
        .delete_client(&user, client_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
