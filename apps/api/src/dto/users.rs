use brokerdesk_domain::{User, UserDraft};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for user create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-request.ts"
)]
pub struct UserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    #[ts(type = "string[]")]
    pub role_ids: Vec<Uuid>,
    /// Required on create; resets the password on update.
    pub password: Option<String>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// API representation of a back-office user. Never carries credentials.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/user-response.ts"
)]
pub struct UserResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    #[ts(type = "string[]")]
    pub role_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Query string of the user listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub role_id: Option<Uuid>,
}

fn active_by_default() -> bool {
    true
}

/// Validated parts of a [`UserRequest`].
pub struct UserRequestParts {
    pub draft: UserDraft,
    pub password: Option<String>,
    pub row_version: Option<i64>,
}

impl UserRequest {
    pub fn into_parts(self) -> UserRequestParts {
        UserRequestParts {
            draft: UserDraft {
                username: self.username,
                email: self.email,
                full_name: self.full_name,
                is_active: self.is_active,
                role_ids: self.role_ids,
            },
            password: self.password,
            row_version: self.row_version,
        }
    }
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            username: value.username,
            email: value.email,
            full_name: value.full_name,
            is_active: value.is_active,
            role_ids: value.role_ids,
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
