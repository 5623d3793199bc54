use brokerdesk_domain::{
    Account, AccountDraft, AccountHolder, AccountStatus, AccountType, HolderRole,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for account create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/account-request.ts"
)]
pub struct AccountRequest {
    pub account_number: String,
    #[ts(type = "\"individual\" | \"joint\" | \"corporate\" | \"retirement\"")]
    pub account_type: AccountType,
    #[ts(type = "\"active\" | \"blocked\" | \"closed\"")]
    pub status: AccountStatus,
    pub currency: String,
    #[ts(type = "string")]
    pub opened_at: NaiveDate,
    #[ts(type = "string | null")]
    pub closed_at: Option<NaiveDate>,
    pub comment: Option<String>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// Incoming payload attaching a client to an account.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/account-holder-request.ts"
)]
pub struct AccountHolderRequest {
    #[ts(type = "string")]
    pub client_id: Uuid,
    #[ts(
        type = "\"owner\" | \"co_owner\" | \"beneficiary\" | \"trustee\" | \"power_of_attorney\""
    )]
    pub role: HolderRole,
    #[serde(default)]
    pub is_primary: bool,
}

/// API representation of an account holder.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/account-holder-response.ts"
)]
pub struct AccountHolderResponse {
    #[ts(type = "string")]
    pub client_id: Uuid,
    #[ts(
        type = "\"owner\" | \"co_owner\" | \"beneficiary\" | \"trustee\" | \"power_of_attorney\""
    )]
    pub role: HolderRole,
    pub is_primary: bool,
}

/// API representation of an account.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/account-response.ts"
)]
pub struct AccountResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    pub account_number: String,
    #[ts(type = "\"individual\" | \"joint\" | \"corporate\" | \"retirement\"")]
    pub account_type: AccountType,
    #[ts(type = "\"active\" | \"blocked\" | \"closed\"")]
    pub status: AccountStatus,
    pub currency: String,
    #[ts(type = "string")]
    pub opened_at: NaiveDate,
    #[ts(type = "string | null")]
    pub closed_at: Option<NaiveDate>,
    pub comment: Option<String>,
    pub holders: Vec<AccountHolderResponse>,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Query string of the account listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
    pub client_id: Option<Uuid>,
}

impl AccountRequest {
    pub fn into_draft(self) -> (AccountDraft, Option<i64>) {
        let draft = AccountDraft {
            account_number: self.account_number,
            account_type: self.account_type,
            status: self.status,
            currency: self.currency,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            comment: self.comment,
        };

        (draft, self.row_version)
    }
}

impl From<AccountHolderRequest> for AccountHolder {
    fn from(value: AccountHolderRequest) -> Self {
        Self {
            client_id: value.client_id,
            role: value.role,
            is_primary: value.is_primary,
        }
    }
}

impl From<AccountHolder> for AccountHolderResponse {
    fn from(value: AccountHolder) -> Self {
        Self {
            client_id: value.client_id,
            role: value.role,
            is_primary: value.is_primary,
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(value: Account) -> Self {
        Self {
            id: value.id,
            account_number: value.account_number,
            account_type: value.account_type,
            status: value.status,
            currency: value.currency,
            opened_at: value.opened_at,
            closed_at: value.closed_at,
            comment: value.comment,
            holders: value
                .holders
                .into_iter()
                .map(AccountHolderResponse::from)
                .collect(),
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
