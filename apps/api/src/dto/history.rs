use brokerdesk_application::{ChangeGroup, FieldChange, OperationHistory};
use brokerdesk_domain::ChangeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// One logical write with its grouped field changes.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/operation-history-response.ts"
)]
pub struct OperationHistoryResponse {
    #[ts(type = "string")]
    pub operation_id: Uuid,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub entity_type: String,
    pub entity_id: String,
    #[ts(type = "\"Created\" | \"Modified\" | \"Deleted\"")]
    pub change_type: ChangeType,
    pub groups: Vec<ChangeGroupResponse>,
}

/// Field changes of the root entity or of one nested record.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-group-response.ts"
)]
pub struct ChangeGroupResponse {
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    #[ts(type = "\"Created\" | \"Modified\" | \"Deleted\"")]
    pub change_type: ChangeType,
    pub fields: Vec<FieldChangeResponse>,
}

/// Before and after text of one field.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/field-change-response.ts"
)]
pub struct FieldChangeResponse {
    pub field_name: String,
    #[ts(type = "\"Created\" | \"Modified\" | \"Deleted\"")]
    pub change_type: ChangeType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Query string of one entity's history.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHistoryParams {
    pub entity_type: String,
    pub entity_id: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Query string of the global change feed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub change_type: Option<ChangeType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<OperationHistory> for OperationHistoryResponse {
    fn from(value: OperationHistory) -> Self {
        Self {
            operation_id: value.operation_id,
            timestamp: value.timestamp,
            user_id: value.user_id,
            user_name: value.user_name,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            change_type: value.change_type,
            groups: value
                .groups
                .into_iter()
                .map(ChangeGroupResponse::from)
                .collect(),
        }
    }
}

impl From<ChangeGroup> for ChangeGroupResponse {
    fn from(value: ChangeGroup) -> Self {
        Self {
            related_entity_type: value.related_entity_type,
            related_entity_id: value.related_entity_id,
            change_type: value.change_type,
            fields: value
                .fields
                .into_iter()
                .map(FieldChangeResponse::from)
                .collect(),
        }
    }
}

impl From<FieldChange> for FieldChangeResponse {
    fn from(value: FieldChange) -> Self {
        Self {
            field_name: value.field_name,
            change_type: value.change_type,
            old_value: value.old_value,
            new_value: value.new_value,
        }
    }
}
