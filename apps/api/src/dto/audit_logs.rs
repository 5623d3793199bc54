use brokerdesk_application::AuditLogEntry;
use brokerdesk_domain::AuditAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use uuid::Uuid;

/// One request-level audit row.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "string | null")]
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    #[ts(
        type = "\"Create\" | \"Update\" | \"Delete\" | \"Login\" | \"TokenRefresh\" | \"Logout\""
    )]
    pub action: AuditAction,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    #[ts(type = "Record<string, unknown> | null")]
    pub old_values: Option<Value>,
    #[ts(type = "Record<string, unknown> | null")]
    pub new_values: Option<Value>,
    #[ts(type = "string")]
    pub correlation_id: Uuid,
    pub request_path: String,
    pub request_method: String,
    pub status_code: u16,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Query string of the audit log listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub user_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        let record = value.record;
        Self {
            id: value.id,
            user_id: record.user_id,
            user_name: record.user_name,
            action: record.action,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            old_values: record.old_values,
            new_values: record.new_values,
            correlation_id: record.correlation_id,
            request_path: record.request_path,
            request_method: record.request_method,
            status_code: record.status_code,
            created_at: value.created_at,
        }
    }
}
