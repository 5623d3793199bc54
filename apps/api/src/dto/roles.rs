use brokerdesk_core::AppError;
use brokerdesk_domain::{Permission, Role, RoleDraft};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for role create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-request.ts"
)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_system: bool,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Permission catalog entry.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-response.ts"
)]
pub struct PermissionResponse {
    pub code: String,
    pub group: String,
}

/// Query string of the role listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

impl RoleRequest {
    pub fn into_draft(self) -> Result<(RoleDraft, Option<i64>), AppError> {
        let permissions = self
            .permissions
            .iter()
            .map(|code| Permission::from_transport(code))
            .collect::<Result<Vec<_>, _>>()?;

        let draft = RoleDraft {
            name: self.name,
            description: self.description,
            permissions,
        };

        Ok((draft, self.row_version))
    }
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            permissions: value
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
            is_system: value.is_system,
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            code: value.as_str().to_owned(),
            group: value.group().to_owned(),
        }
    }
}
