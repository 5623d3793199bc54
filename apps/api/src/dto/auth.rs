use brokerdesk_application::{CurrentUser, TokenPair};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Username and password login payload.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/login-request.ts"
)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Payload carrying a refresh token for rotation or revocation.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/refresh-token-request.ts"
)]
pub struct RefreshTokenRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

/// Issued bearer token pair.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/token-response.ts"
)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[ts(type = "number")]
    pub expires_in: i64,
}

/// Profile of the calling user.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/me-response.ts"
)]
pub struct MeResponse {
    #[ts(type = "string")]
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub permissions: Vec<String>,
}

impl From<TokenPair> for TokenResponse {
    fn from(value: TokenPair) -> Self {
        Self {
            access_token: value.access_token,
            refresh_token: value.refresh_token,
            token_type: value.token_type.to_owned(),
            expires_in: value.expires_in,
        }
    }
}

impl From<CurrentUser> for MeResponse {
    fn from(value: CurrentUser) -> Self {
        Self {
            user_id: value.identity.user_id(),
            username: value.identity.username().to_owned(),
            display_name: value.identity.display_name().to_owned(),
            email: value.email,
            permissions: value
                .permissions
                .iter()
                .map(|permission| permission.as_str().to_owned())
                .collect(),
        }
    }
}
