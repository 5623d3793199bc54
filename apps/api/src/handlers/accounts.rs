use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{ACCOUNT_SORT_FIELDS, AccountFilter, AuditSnapshot};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    AccountHolderRequest, AccountHolderResponse, AccountListParams, AccountRequest,
    AccountResponse, DeleteParams, PagedResponse, required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_accounts_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<AccountListParams>,
) -> ApiResult<Json<PagedResponse<AccountResponse>>> {
    let query = list_query(
        ACCOUNT_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        AccountFilter {
            search: params.search,
            status: params.status,
            account_type: params.account_type,
            client_id: params.client_id,
        },
    )?;

    let accounts = state.account_service.list_accounts(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(accounts)))
}

pub async fn get_account_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<AccountResponse>> {
    let account = state.account_service.get_account(&user, account_id).await?;

    Ok(Json(AccountResponse::from(account)))
}

pub async fn create_account_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<AccountRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<AccountResponse>)> {
    let (draft, _) = payload.into_draft();
    let mutation = state.account_service.create_account(&user, draft).await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(AccountResponse::from(mutation.value)),
    ))
}

pub async fn update_account_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<AccountRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<AccountResponse>)> {
    let (draft, row_version) = payload.into_draft();
    let mutation = state
        .account_service
        .update_account(&user, account_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(AccountResponse::from(mutation.value)),
    ))
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(account_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .account_service
        .delete_account(&user, account_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}

pub async fn list_account_holders_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AccountHolderResponse>>> {
    let holders = state
        .account_service
        .list_holders(&user, account_id)
        .await?
        .into_iter()
        .map(AccountHolderResponse::from)
        .collect();

    Ok(Json(holders))
}

pub async fn add_account_holder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<AccountHolderRequest>,
) -> ApiResult<(
    StatusCode,
    Extension<AuditSnapshot>,
    Json<AccountHolderResponse>,
)> {
    let mutation = state
        .account_service
        .add_holder(&user, account_id, payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(AccountHolderResponse::from(mutation.value)),
    ))
}

pub async fn remove_account_holder_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((account_id, client_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .account_service
        .remove_holder(&user, account_id, client_id)
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
