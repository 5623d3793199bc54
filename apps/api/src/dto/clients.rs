use brokerdesk_domain::{
    AddressType, Client, ClientAddress, ClientAddressDraft, ClientDraft, ClientStatus, ClientType,
    InvestmentObjective, InvestmentProfile, InvestmentProfileDraft, RiskTolerance,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for client create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-request.ts"
)]
pub struct ClientRequest {
    #[ts(type = "\"individual\" | \"corporate\"")]
    pub client_type: ClientType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    #[ts(type = "\"pending_kyc\" | \"active\" | \"blocked\" | \"closed\"")]
    pub status: ClientStatus,
    pub residence_country: String,
    #[serde(default)]
    pub addresses: Vec<ClientAddressRequest>,
    pub investment_profile: Option<InvestmentProfileRequest>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// Nested address payload. Addresses sent without an id are added.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-address-request.ts"
)]
pub struct ClientAddressRequest {
    #[ts(type = "string | null")]
    pub id: Option<Uuid>,
    #[ts(type = "\"legal\" | \"mailing\" | \"residential\"")]
    pub address_type: AddressType,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
}

/// Nested investment profile payload.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/investment-profile-request.ts"
)]
pub struct InvestmentProfileRequest {
    #[ts(type = "\"low\" | \"medium\" | \"high\"")]
    pub risk_tolerance: RiskTolerance,
    #[ts(type = "\"preservation\" | \"income\" | \"growth\" | \"speculation\"")]
    pub objective: InvestmentObjective,
    #[ts(type = "string | null")]
    pub annual_income: Option<Decimal>,
    #[ts(type = "string | null")]
    pub net_worth: Option<Decimal>,
    pub experience_years: i32,
}

/// API representation of a client with its nested records.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-response.ts"
)]
pub struct ClientResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "\"individual\" | \"corporate\"")]
    pub client_type: ClientType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    #[ts(type = "\"pending_kyc\" | \"active\" | \"blocked\" | \"closed\"")]
    pub status: ClientStatus,
    pub residence_country: String,
    pub addresses: Vec<ClientAddressResponse>,
    pub investment_profile: Option<InvestmentProfileResponse>,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// API representation of a client address.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/client-address-response.ts"
)]
pub struct ClientAddressResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "\"legal\" | \"mailing\" | \"residential\"")]
    pub address_type: AddressType,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
}

/// API representation of an investment profile.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/investment-profile-response.ts"
)]
pub struct InvestmentProfileResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "\"low\" | \"medium\" | \"high\"")]
    pub risk_tolerance: RiskTolerance,
    #[ts(type = "\"preservation\" | \"income\" | \"growth\" | \"speculation\"")]
    pub objective: InvestmentObjective,
    #[ts(type = "string | null")]
    pub annual_income: Option<Decimal>,
    #[ts(type = "string | null")]
    pub net_worth: Option<Decimal>,
    pub experience_years: i32,
}

/// Query string of the client listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub status: Option<ClientStatus>,
    pub client_type: Option<ClientType>,
}

impl ClientRequest {
    pub fn into_draft(self) -> (ClientDraft, Option<i64>) {
        let draft = ClientDraft {
            client_type: self.client_type,
            first_name: self.first_name,
            last_name: self.last_name,
            company_name: self.company_name,
            email: self.email,
            phone: self.phone,
            status: self.status,
            residence_country: self.residence_country,
            addresses: self
                .addresses
                .into_iter()
                .map(|address| ClientAddressDraft {
                    id: address.id,
                    address_type: address.address_type,
                    line1: address.line1,
                    line2: address.line2,
                    city: address.city,
                    postal_code: address.postal_code,
                    country: address.country,
                })
                .collect(),
            investment_profile: self.investment_profile.map(|profile| InvestmentProfileDraft {
                risk_tolerance: profile.risk_tolerance,
                objective: profile.objective,
                annual_income: profile.annual_income,
                net_worth: profile.net_worth,
                experience_years: profile.experience_years,
            }),
        };

        (draft, self.row_version)
    }
}

impl From<ClientAddress> for ClientAddressResponse {
    fn from(value: ClientAddress) -> Self {
        Self {
            id: value.id,
            address_type: value.address_type,
            line1: value.line1,
            line2: value.line2,
            city: value.city,
            postal_code: value.postal_code,
            country: value.country,
        }
    }
}

impl From<InvestmentProfile> for InvestmentProfileResponse {
    fn from(value: InvestmentProfile) -> Self {
        Self {
            id: value.id,
            risk_tolerance: value.risk_tolerance,
            objective: value.objective,
            annual_income: value.annual_income,
            net_worth: value.net_worth,
            experience_years: value.experience_years,
        }
    }
}

impl From<Client> for ClientResponse {
    fn from(value: Client) -> Self {
        Self {
            id: value.id,
            client_type: value.client_type,
            first_name: value.first_name,
            last_name: value.last_name,
            company_name: value.company_name,
            email: value.email,
            phone: value.phone,
            status: value.status,
            residence_country: value.residence_country,
            addresses: value
                .addresses
                .into_iter()
                .map(ClientAddressResponse::from)
                .collect(),
            investment_profile: value
                .investment_profile
                .map(InvestmentProfileResponse::from),
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
