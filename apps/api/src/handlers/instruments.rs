use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use brokerdesk_application::{AuditSnapshot, INSTRUMENT_SORT_FIELDS, InstrumentFilter};
use brokerdesk_core::UserIdentity;
use uuid::Uuid;

use crate::dto::{
    DeleteParams, PagedResponse, InstrumentListParams, InstrumentRequest, InstrumentResponse,
    required_row_version,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_instruments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<InstrumentListParams>,
) -> ApiResult<Json<PagedResponse<InstrumentResponse>>> {
    let query = list_query(
        INSTRUMENT_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        InstrumentFilter {
            search: params.search,
            instrument_type: params.instrument_type,
            is_active: params.is_active,
        },
    )?;

    let instruments = state
        .instrument_service
        .list_instruments(&user, query)
        .await?;
    Ok(Json(PagedResponse::from_paged(instruments)))
}

pub async fn get_instrument_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(instrument_id): Path<Uuid>,
) -> ApiResult<Json<InstrumentResponse>> {
    let instrument = state
        .instrument_service
        .get_instrument(&user, instrument_id)
        .await?;

    Ok(Json(InstrumentResponse::from(instrument)))
}

pub async fn create_instrument_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<InstrumentRequest>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>, Json<InstrumentResponse>)> {
    let (draft, _) = payload.into_draft();
    let mutation = state
        .instrument_service
        .create_instrument(&user, draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Extension(mutation.audit),
        Json(InstrumentResponse::from(mutation.value)),
    ))
}

pub async fn update_instrument_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(instrument_id): Path<Uuid>,
    Json(payload): Json<InstrumentRequest>,
) -> ApiResult<(Extension<AuditSnapshot>, Json<InstrumentResponse>)> {
    let (draft, row_version) = payload.into_draft();
    let mutation = state
        .instrument_service
        .update_instrument(&user, instrument_id, required_row_version(row_version)?, draft)
        .await?;

    Ok((
        Extension(mutation.audit),
        Json(InstrumentResponse::from(mutation.value)),
    ))
}

pub async fn delete_instrument_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(instrument_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<(StatusCode, Extension<AuditSnapshot>)> {
    let mutation = state
        .instrument_service
        .delete_instrument(&user, instrument_id, params.row_version())
        .await?;

    Ok((StatusCode::NO_CONTENT, Extension(mutation.audit)))
}
