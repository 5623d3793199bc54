use brokerdesk_domain::{Transaction, TransactionDraft, TransactionStatus, TransactionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for transaction create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transaction-request.ts"
)]
pub struct TransactionRequest {
    #[ts(type = "string")]
    pub account_id: Uuid,
    #[ts(type = "string | null")]
    pub instrument_id: Option<Uuid>,
    #[ts(type = "string | null")]
    pub order_id: Option<Uuid>,
    #[ts(
        type = "\"buy\" | \"sell\" | \"deposit\" | \"withdrawal\" | \"dividend\" | \"fee\""
    )]
    pub transaction_type: TransactionType,
    #[ts(type = "\"pending\" | \"settled\" | \"cancelled\"")]
    pub status: TransactionStatus,
    #[ts(type = "string | null")]
    pub quantity: Option<Decimal>,
    #[ts(type = "string | null")]
    pub price: Option<Decimal>,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub currency: String,
    #[ts(type = "string")]
    pub trade_date: NaiveDate,
    #[ts(type = "string | null")]
    pub settlement_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// API representation of a transaction.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transaction-response.ts"
)]
pub struct TransactionResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "string")]
    pub account_id: Uuid,
    #[ts(type = "string | null")]
    pub instrument_id: Option<Uuid>,
    #[ts(type = "string | null")]
    pub order_id: Option<Uuid>,
    #[ts(
        type = "\"buy\" | \"sell\" | \"deposit\" | \"withdrawal\" | \"dividend\" | \"fee\""
    )]
    pub transaction_type: TransactionType,
    #[ts(type = "\"pending\" | \"settled\" | \"cancelled\"")]
    pub status: TransactionStatus,
    #[ts(type = "string | null")]
    pub quantity: Option<Decimal>,
    #[ts(type = "string | null")]
    pub price: Option<Decimal>,
    #[ts(type = "string")]
    pub amount: Decimal,
    pub currency: String,
    #[ts(type = "string")]
    pub trade_date: NaiveDate,
    #[ts(type = "string | null")]
    pub settlement_date: Option<NaiveDate>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Query string of the transaction listing. `from` and `to` bound the trade date.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub account_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionRequest {
    pub fn into_draft(self) -> (TransactionDraft, Option<i64>) {
        let draft = TransactionDraft {
            account_id: self.account_id,
            instrument_id: self.instrument_id,
            order_id: self.order_id,
            transaction_type: self.transaction_type,
            status: self.status,
            quantity: self.quantity,
            price: self.price,
            amount: self.amount,
            currency: self.currency,
            trade_date: self.trade_date,
            settlement_date: self.settlement_date,
            description: self.description,
        };

        (draft, self.row_version)
    }
}

impl From<Transaction> for TransactionResponse {
    fn from(value: Transaction) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            instrument_id: value.instrument_id,
            order_id: value.order_id,
            transaction_type: value.transaction_type,
            status: value.status,
            quantity: value.quantity,
            price: value.price,
            amount: value.amount,
            currency: value.currency,
            trade_date: value.trade_date,
            settlement_date: value.settlement_date,
            description: value.description,
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
