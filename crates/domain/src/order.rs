use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{optional_text, positive_decimal};
use crate::versioning::{Provenance, RowVersion};

storage_enum! {
    /// Order direction.
    pub enum OrderSide {
        /// Buy order.
        Buy => "buy",
        /// Sell order.
        Sell => "sell",
    }
}

storage_enum! {
    /// Execution style.
    pub enum OrderType {
        /// Executes at the best available price.
        Market => "market",
        /// Executes at the limit price or better.
        Limit => "limit",
        /// Becomes a market order once the stop price trades.
        Stop => "stop",
        /// Becomes a limit order once the stop price trades.
        StopLimit => "stop_limit",
    }
}

storage_enum! {
    /// How long an order stays working.
    pub enum TimeInForce {
        /// Expires at the end of the trading day.
        Day => "day",
        /// Good till cancelled.
        Gtc => "gtc",
        /// Immediate or cancel.
        Ioc => "ioc",
        /// Fill or kill.
        Fok => "fok",
    }
}

storage_enum! {
    /// Order lifecycle status.
    pub enum OrderStatus {
        /// Accepted and working.
        New => "new",
        /// Partially executed.
        PartiallyFilled => "partially_filled",
        /// Fully executed.
        Filled => "filled",
        /// Cancelled before full execution.
        Cancelled => "cancelled",
        /// Rejected by the desk.
        Rejected => "rejected",
    }
}

impl OrderStatus {
    /// Returns whether no further changes are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

/// Client order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Stable order id.
    pub id: Uuid,
    /// Account the order is placed for.
    pub account_id: Uuid,
    /// Traded instrument.
    pub instrument_id: Uuid,
    /// Direction.
    pub side: OrderSide,
    /// Execution style.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Stop trigger price.
    pub stop_price: Option<Decimal>,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Order {
    /// Builds a new order.
    pub fn create(draft: OrderDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            account_id: draft.account_id,
            instrument_id: draft.instrument_id,
            side: draft.side,
            order_type: draft.order_type,
            time_in_force: draft.time_in_force,
            status: draft.status,
            quantity: draft.quantity,
            price: draft.price,
            stop_price: draft.stop_price,
            comment: draft.comment,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the order with a draft applied. Terminal orders are frozen.
    pub fn apply(&self, draft: OrderDraft, at: DateTime<Utc>, updated_by: &str) -> AppResult<Self> {
        self.ensure_mutable()?;
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            account_id: draft.account_id,
            instrument_id: draft.instrument_id,
            side: draft.side,
            order_type: draft.order_type,
            time_in_force: draft.time_in_force,
            status: draft.status,
            quantity: draft.quantity,
            price: draft.price,
            stop_price: draft.stop_price,
            comment: draft.comment,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }

    /// Fails with a conflict when the order reached a terminal status.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "order '{}' is {} and can no longer be changed",
                self.id, self.status
            )));
        }

        Ok(())
    }
}

impl ChangeTracked for Order {
    const ENTITY_TYPE: &'static str = "Order";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("AccountId", self.account_id)
            .with("InstrumentId", self.instrument_id)
            .with("Side", self.side)
            .with("OrderType", self.order_type)
            .with("TimeInForce", self.time_in_force)
            .with("Status", self.status)
            .with("Quantity", self.quantity.normalize())
            .with_optional("Price", self.price.map(|value| value.normalize()))
            .with_optional("StopPrice", self.stop_price.map(|value| value.normalize()))
            .with_optional("Comment", self.comment.as_ref())
    }
}

/// Order attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Account the order is placed for.
    pub account_id: Uuid,
    /// Traded instrument.
    pub instrument_id: Uuid,
    /// Direction.
    pub side: OrderSide,
    /// Execution style.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Option<Decimal>,
    /// Stop trigger price.
    pub stop_price: Option<Decimal>,
    /// Free-text comment.
    pub comment: Option<String>,
}

impl OrderDraft {
    /// Validates price fields against the order type.
    pub fn normalize(self) -> AppResult<Self> {
        let quantity = positive_decimal("quantity", self.quantity)?;

        let needs_price = matches!(self.order_type, OrderType::Limit | OrderType::StopLimit);
        let needs_stop = matches!(self.order_type, OrderType::Stop | OrderType::StopLimit);

        let price = match (needs_price, self.price) {
            (true, Some(price)) => Some(positive_decimal("price", price)?),
            (true, None) => {
                return Err(AppError::Validation(format!(
                    "price is required for {} orders",
                    self.order_type
                )));
            }
            (false, Some(_)) => {
                return Err(AppError::Validation(format!(
                    "price is not allowed for {} orders",
                    self.order_type
                )));
            }
            (false, None) => None,
        };

        let stop_price = match (needs_stop, self.stop_price) {
            (true, Some(stop_price)) => Some(positive_decimal("stop_price", stop_price)?),
            (true, None) => {
                return Err(AppError::Validation(format!(
                    "stop_price is required for {} orders",
                    self.order_type
                )));
            }
            (false, Some(_)) => {
                return Err(AppError::Validation(format!(
                    "stop_price is not allowed for {} orders",
                    self.order_type
                )));
            }
            (false, None) => None,
        };

        Ok(Self {
            account_id: self.account_id,
            instrument_id: self.instrument_id,
            side: self.side,
            order_type: self.order_type,
            time_in_force: self.time_in_force,
            status: self.status,
            quantity,
            price,
            stop_price,
            comment: optional_text(self.comment),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use brokerdesk_core::AppError;

    use super::{Order, OrderDraft, OrderSide, OrderStatus, OrderType, TimeInForce};

    fn draft(order_type: OrderType) -> OrderDraft {
        OrderDraft {
            account_id: Uuid::new_v4(),
            instrument_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            order_type,
            time_in_force: TimeInForce::Day,
            status: OrderStatus::New,
            quantity: Decimal::new(1000, 2),
            price: None,
            stop_price: None,
            comment: None,
        }
    }

    #[test]
    fn market_order_needs_no_prices() {
        let normalized = draft(OrderType::Market)
            .normalize()
            .unwrap_or_else(|_| panic!("market order should be valid"));
        assert_eq!(normalized.quantity.to_string(), "10");
    }

    #[test]
    fn limit_order_requires_price() {
        assert!(draft(OrderType::Limit).normalize().is_err());

        let mut value = draft(OrderType::Limit);
        value.price = Some(Decimal::new(15025, 2));
        assert!(value.normalize().is_ok());
    }

    #[test]
    fn stop_limit_requires_both_prices() {
        let mut value = draft(OrderType::StopLimit);
        value.price = Some(Decimal::new(100, 0));
        assert!(value.clone().normalize().is_err());

        value.stop_price = Some(Decimal::new(99, 0));
        assert!(value.normalize().is_ok());
    }

    #[test]
    fn market_order_rejects_price() {
        let mut value = draft(OrderType::Market);
        value.price = Some(Decimal::new(1, 0));
        assert!(value.normalize().is_err());
    }

    #[test]
    fn filled_order_cannot_be_changed() {
        let mut order = Order::create(draft(OrderType::Market), Utc::now(), "admin")
            .unwrap_or_else(|_| panic!("order should be valid"));
        order.status = OrderStatus::Filled;

        let result = order.apply(draft(OrderType::Market), Utc::now(), "admin");
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
