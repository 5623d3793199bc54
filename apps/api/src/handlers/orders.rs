use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, ORDER_SORT_FIELDS, OrderFilter};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    DeleteParams, PagedResponse, OrderListParams, OrderRequest, OrderResponse, required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_orders_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Json<PagedResponse<OrderResponse>>> {
    let query = list_query(
        ORDER_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        OrderFilter {
            account_id: params.account_id,
            instrument_id: params.instrument_id,
            status: params.status,
            side: params.side,
        },
    )?;

    let orders = state.order_service.list_orders(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(orders)))
}

pub async fn get_order_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    let order = state.order_service.get_order(&user, order_id).await?;

    Ok(Json(OrderResponse::from(order)))
}

pub async fn create_order_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<OrderRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<OrderResponse>)> {
    let (draft, _) = payload.into_draft();
    let mutation = state.order_service.create_order(&user, draft).await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(OrderResponse::from(mutation.value)),
    ))
}

pub async fn update_order_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<OrderRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<OrderResponse>)> {
    let (draft, row_version) = payload.into_draft();
    let mutation = state
        .order_service
        .update_order(&user, order_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(OrderResponse::from(mutation.value)),
    ))
}

pub async fn delete_order_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(order_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .order_service
        .delete_order(&user, order_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
