use brokerdesk_domain::{Order, OrderDraft, OrderSide, OrderStatus, OrderType, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::common::RecordStampsResponse;

/// Incoming payload for order create and update.
#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/order-request.ts"
)]
pub struct OrderRequest {
    #[ts(type = "string")]
    pub account_id: Uuid,
    #[ts(type = "string")]
    pub instrument_id: Uuid,
    #[ts(type = "\"buy\" | \"sell\"")]
    pub side: OrderSide,
    #[ts(type = "\"market\" | \"limit\" | \"stop\" | \"stop_limit\"")]
    pub order_type: OrderType,
    #[ts(type = "\"day\" | \"gtc\" | \"ioc\" | \"fok\"")]
    pub time_in_force: TimeInForce,
    #[serde(default = "new_order_status")]
    #[ts(
        type = "\"new\" | \"partially_filled\" | \"filled\" | \"cancelled\" | \"rejected\""
    )]
    pub status: OrderStatus,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[ts(type = "string | null")]
    pub price: Option<Decimal>,
    #[ts(type = "string | null")]
    pub stop_price: Option<Decimal>,
    pub comment: Option<String>,
    /// Required on update.
    #[ts(type = "number | null")]
    pub row_version: Option<i64>,
}

/// API representation of an order.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/order-response.ts"
)]
pub struct OrderResponse {
    #[ts(type = "string")]
    pub id: Uuid,
    #[ts(type = "string")]
    pub account_id: Uuid,
    #[ts(type = "string")]
    pub instrument_id: Uuid,
    #[ts(type = "\"buy\" | \"sell\"")]
    pub side: OrderSide,
    #[ts(type = "\"market\" | \"limit\" | \"stop\" | \"stop_limit\"")]
    pub order_type: OrderType,
    #[ts(type = "\"day\" | \"gtc\" | \"ioc\" | \"fok\"")]
    pub time_in_force: TimeInForce,
    #[ts(
        type = "\"new\" | \"partially_filled\" | \"filled\" | \"cancelled\" | \"rejected\""
    )]
    pub status: OrderStatus,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[ts(type = "string | null")]
    pub price: Option<Decimal>,
    #[ts(type = "string | null")]
    pub stop_price: Option<Decimal>,
    pub comment: Option<String>,
    #[serde(flatten)]
    pub stamps: RecordStampsResponse,
}

/// Query string of the order listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub account_id: Option<Uuid>,
    pub instrument_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub side: Option<OrderSide>,
}

fn new_order_status() -> OrderStatus {
    OrderStatus::New
}

impl OrderRequest {
    pub fn into_draft(self) -> (OrderDraft, Option<i64>) {
        let draft = OrderDraft {
            account_id: self.account_id,
            instrument_id: self.instrument_id,
            side: self.side,
            order_type: self.order_type,
            time_in_force: self.time_in_force,
            status: self.status,
            quantity: self.quantity,
            price: self.price,
            stop_price: self.stop_price,
            comment: self.comment,
        };

        (draft, self.row_version)
    }
}

impl From<Order> for OrderResponse {
    fn from(value: Order) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            instrument_id: value.instrument_id,
            side: value.side,
            order_type: value.order_type,
            time_in_force: value.time_in_force,
            status: value.status,
            quantity: value.quantity,
            price: value.price,
            stop_price: value.stop_price,
            comment: value.comment,
            stamps: RecordStampsResponse::new(value.row_version, value.provenance),
        }
    }
}
