use axum::Json;
use axum::extract::{Extension, Query, State};
use brokerdesk_application::{AUDIT_LOG_SORT_FIELDS, AuditLogFilter};
use brokerdesk_core::UserIdentity;

use crate::dto::{AuditLogEntryResponse, AuditLogListParams, PagedResponse};
use crate::error::ApiResult;
use crate::state::AppState;

use super::list_query;

pub async fn list_audit_logs_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(params): Query<AuditLogListParams>,
) -> ApiResult<Json<PagedResponse<AuditLogEntryResponse>>> {
    let query = list_query(
        AUDIT_LOG_SORT_FIELDS,
        params.sort.as_deref(),
        params.page,
        params.page_size,
        AuditLogFilter {
            user_id: params.user_id,
            entity_type: params.entity_type,
            entity_id: params.entity_id,
            action: params.action,
            from: params.from,
            to: params.to,
        },
    )?;

    let entries = state.audit_log_service.list_entries(&user, query).await?;
    Ok(Json(PagedResponse::from_paged(entries)))
}
