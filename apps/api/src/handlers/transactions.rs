use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, TRANSACTION_SORT_FIELDS, TransactionFilter};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    DeleteParams, PagedResponse, TransactionListParams, TransactionRequest, TransactionResponse,
    required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_transactions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<TransactionListParams>,
) -> ApiResult<Json<PagedResponse<TransactionResponse>>> {
    let query = list_query(
        TRANSACTION_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        TransactionFilter {
            account_id: params.account_id,
            transaction_type: params.transaction_type,
            status: params.status,
            from: params.from,
            to: params.to,
        },
    )?;

    let transactions = state
        .transaction_service
        .list_transactions(&user, query)
        .await?;
    Ok(Json(PagedResponse::from_paged(transactions)))
}

pub async fn get_transaction_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(transaction_id): Path<Uuid>,
) -> ApiResult<Json<TransactionResponse>> {
    let transaction = state
        .transaction_service
        .get_transaction(&user, transaction_id)
        .await?;

    Ok(Json(TransactionResponse::from(transaction)))
}

pub async fn create_transaction_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<TransactionRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<TransactionResponse>)> {
    let (draft, _) = payload.into_draft();
    let mutation = state
        .transaction_service
        .create_transaction(&user, draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(TransactionResponse::from(mutation.value)),
    ))
}

pub async fn update_transaction_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<TransactionRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<TransactionResponse>)> {
    let (draft, row_version) = payload.into_draft();
    let mutation = state
        .transaction_service
        .update_transaction(&user, transaction_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(TransactionResponse::from(mutation.value)),
    ))
}

pub async fn delete_transaction_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(transaction_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .transaction_service
        .delete_transaction(&user, transaction_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
