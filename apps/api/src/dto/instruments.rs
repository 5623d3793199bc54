use brokerdesk_domain::{Instrument, InstrumentDraft, InstrumentType};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for instrument create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/instrument-request.ts"
)]
pub struct InstrumentRequest {
    pub symbol: String,
    pub name: String,
    pub isin: Option<String>,
    #[ts(type = "\"stock\" | \"bond\" | \"etf\" | \"option\" | \"future\" | \"fund\"")]
    pub instrument_type: InstrumentType,
    pub currency: String,
    pub exchange: Option<String>,
    pub lot_size: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// API representation of an instrument.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/instrument-response.ts"
)]
pub struct InstrumentResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    pub symbol: String,
    pub name: String,
    pub isin: Option<String>,
    #[ts(type = "\"stock\" | \"bond\" | \"etf\" | \"option\" | \"future\" | \"fund\"")]
    pub instrument_type: InstrumentType,
    pub currency: String,
    pub exchange: Option<String>,
    pub lot_size: i32,
    pub is_active: bool,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Query string of the instrument listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub instrument_type: Option<InstrumentType>,
    pub is_active: Option<bool>,
}

fn active_by_default() -> bool {
    true
}

impl InstrumentRequest {
    pub fn into_draft(self) -> (InstrumentDraft, Option<i64>) {
        let draft = InstrumentDraft {
            symbol: self.symbol,
            name: self.name,
            isin: self.isin,
            instrument_type: self.instrument_type,
            currency: self.currency,
            exchange: self.exchange,
            lot_size: self.lot_size,
            is_active: self.is_active,
        };

        (draft, self.row_version)
    }
}

impl From<Instrument> for InstrumentResponse {
    fn from(value: Instrument) -> Self {
        Self {
            id: value.id,
            symbol: value.symbol,
            name: value.name,
            isin: value.isin,
            instrument_type: value.instrument_type,
            currency: value.currency,
            exchange: value.exchange,
            lot_size: value.lot_size,
            is_active: value.is_active,
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
