use axum::Json;
use axum::extract::{Extension, Query, State};
use brokerdesk_application::{ENTITY_CHANGE_SORT_FIELDS, EntityChangeFilter, PageRequest};
use brokerdesk_core::UserIdentity;

use crate::dto::{ChangeFeedParams, EntityHistoryParams, OperationHistoryResponse, PagedResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

#[cfg(test)]
mod tests;

/// History of one root entity, newest operation first.
pub async fn entity_history_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<EntityHistoryParams>,
) -> ApiResult<Json<PagedResponse<OperationHistoryResponse>>> {
    let history = state
        .entity_change_service
        .entity_history(
            &user,
            params.entity_type.as_str(),
            params.entity_id.as_str(),
            PageRequest::new(params.page, params.page_size),
        )
        .await?;

    Ok(Json(PagedResponse::from_paged(history)))
}

/// Global change feed across all entities, filtered and sorted per query string.
pub async fn change_feed_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<ChangeFeedParams>,
) -> ApiResult<Json<PagedResponse<OperationHistoryResponse>>> {
    let query = list_query(
        ENTITY_CHANGE_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        EntityChangeFilter {
            entity_type: params.entity_type,
            entity_id: params.entity_id,
            user_id: params.user_id,
            change_type: params.change_type,
            from: params.from,
            to: params.to,
        },
    )?;

    let changes = state
        .entity_change_service
        .all_changes(&user, query)
        .await?;
    Ok(Json(PagedResponse::from_paged(changes)))
}
