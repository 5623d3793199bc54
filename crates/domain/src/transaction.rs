use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{currency_code, optional_text, positive_decimal};
use crate::versioning::{Provenance, RowVersion};

storage_enum! {
    /// Cash or security movement kind.
    pub enum TransactionType {
        /// Security purchase.
        Buy => "buy",
        /// Security sale.
        Sell => "sell",
        /// Cash deposit.
        Deposit => "deposit",
        /// Cash withdrawal.
        Withdrawal => "withdrawal",
        /// Dividend payment.
        Dividend => "dividend",
        /// Fee charge.
        Fee => "fee",
    }
}

impl TransactionType {
    /// Returns whether the transaction moves securities.
    #[must_use]
    pub fn is_trade(self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }
}

storage_enum! {
    /// Settlement status.
    pub enum TransactionStatus {
        /// Booked, not yet settled.
        Pending => "pending",
        /// Settled.
        Settled => "settled",
        /// Cancelled.
        Cancelled => "cancelled",
    }
}

impl TransactionStatus {
    /// Returns whether no further changes are allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

/// Booked account transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Stable transaction id.
    pub id: Uuid,
    /// Booked account.
    pub account_id: Uuid,
    /// Traded instrument for trade transactions.
    pub instrument_id: Option<Uuid>,
    /// Originating order.
    pub order_id: Option<Uuid>,
    /// Movement kind.
    pub transaction_type: TransactionType,
    /// Settlement status.
    pub status: TransactionStatus,
    /// Traded quantity.
    pub quantity: Option<Decimal>,
    /// Execution price.
    pub price: Option<Decimal>,
    /// Gross amount in `currency`.
    pub amount: Decimal,
    /// Amount currency.
    pub currency: String,
    /// Trade date.
    pub trade_date: NaiveDate,
    /// Settlement date.
    pub settlement_date: Option<NaiveDate>,
    /// Free-text description.
    pub description: Option<String>,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Transaction {
    /// Books a new transaction.
    pub fn create(draft: TransactionDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            account_id: draft.account_id,
            instrument_id: draft.instrument_id,
            order_id: draft.order_id,
            transaction_type: draft.transaction_type,
            status: draft.status,
            quantity: draft.quantity,
            price: draft.price,
            amount: draft.amount,
            currency: draft.currency,
            trade_date: draft.trade_date,
            settlement_date: draft.settlement_date,
            description: draft.description,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the transaction with a draft applied. Settled and cancelled
    /// transactions are frozen.
    pub fn apply(
        &self,
        draft: TransactionDraft,
        at: DateTime<Utc>,
        updated_by: &str,
    ) -> AppResult<Self> {
        self.ensure_mutable()?;
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            account_id: draft.account_id,
            instrument_id: draft.instrument_id,
            order_id: draft.order_id,
            transaction_type: draft.transaction_type,
            status: draft.status,
            quantity: draft.quantity,
            price: draft.price,
            amount: draft.amount,
            currency: draft.currency,
            trade_date: draft.trade_date,
            settlement_date: draft.settlement_date,
            description: draft.description,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }

    /// Fails with a conflict when the transaction is settled or cancelled.
    pub fn ensure_mutable(&self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "transaction '{}' is {} and can no longer be changed",
                self.id, self.status
            )));
        }

        Ok(())
    }
}

impl ChangeTracked for Transaction {
    const ENTITY_TYPE: &'static str = "Transaction";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("AccountId", self.account_id)
            .with_optional("InstrumentId", self.instrument_id)
            .with_optional("OrderId", self.order_id)
            .with("TransactionType", self.transaction_type)
            .with("Status", self.status)
            .with_optional("Quantity", self.quantity.map(|value| value.normalize()))
            .with_optional("Price", self.price.map(|value| value.normalize()))
            .with("Amount", self.amount.normalize())
            .with("Currency", &self.currency)
            .with("TradeDate", self.trade_date)
            .with_optional("SettlementDate", self.settlement_date)
            .with_optional("Description", self.description.as_ref())
    }
}

/// Transaction attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    /// Booked account.
    pub account_id: Uuid,
    /// Traded instrument.
    pub instrument_id: Option<Uuid>,
    /// Originating order.
    pub order_id: Option<Uuid>,
    /// Movement kind.
    pub transaction_type: TransactionType,
    /// Settlement status.
    pub status: TransactionStatus,
    /// Traded quantity.
    pub quantity: Option<Decimal>,
    /// Execution price.
    pub price: Option<Decimal>,
    /// Gross amount.
    pub amount: Decimal,
    /// Amount currency.
    pub currency: String,
    /// Trade date.
    pub trade_date: NaiveDate,
    /// Settlement date.
    pub settlement_date: Option<NaiveDate>,
    /// Free-text description.
    pub description: Option<String>,
}

impl TransactionDraft {
    /// Validates trade legs and dates.
    pub fn normalize(self) -> AppResult<Self> {
        let amount = positive_decimal("amount", self.amount)?;

        let (quantity, price) = if self.transaction_type.is_trade() {
            if self.instrument_id.is_none() {
                return Err(AppError::Validation(format!(
                    "instrument_id is required for {} transactions",
                    self.transaction_type
                )));
            }

            let quantity = self.quantity.ok_or_else(|| {
                AppError::Validation(format!(
                    "quantity is required for {} transactions",
                    self.transaction_type
                ))
            })?;
            let price = self.price.ok_or_else(|| {
                AppError::Validation(format!(
                    "price is required for {} transactions",
                    self.transaction_type
                ))
            })?;

            (
                Some(positive_decimal("quantity", quantity)?),
                Some(positive_decimal("price", price)?),
            )
        } else {
            if self.quantity.is_some() || self.price.is_some() || self.order_id.is_some() {
                return Err(AppError::Validation(format!(
                    "{} transactions carry no quantity, price or order",
                    self.transaction_type
                )));
            }

            (None, None)
        };

        if let Some(settlement_date) = self.settlement_date
            && settlement_date < self.trade_date
        {
            return Err(AppError::Validation(
                "settlement_date must not precede trade_date".to_owned(),
            ));
        }

        if self.status == TransactionStatus::Settled && self.settlement_date.is_none() {
            return Err(AppError::Validation(
                "settled transactions require settlement_date".to_owned(),
            ));
        }

        Ok(Self {
            account_id: self.account_id,
            instrument_id: self.instrument_id,
            order_id: self.order_id,
            transaction_type: self.transaction_type,
            status: self.status,
            quantity,
            price,
            amount,
            currency: currency_code("currency", &self.currency)?,
            trade_date: self.trade_date,
            settlement_date: self.settlement_date,
            description: optional_text(self.description),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::{TransactionDraft, TransactionStatus, TransactionType};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap_or_default()
    }

    fn deposit() -> TransactionDraft {
        TransactionDraft {
            account_id: Uuid::new_v4(),
            instrument_id: None,
            order_id: None,
            transaction_type: TransactionType::Deposit,
            status: TransactionStatus::Pending,
            quantity: None,
            price: None,
            amount: Decimal::new(500_000, 2),
            currency: "eur".to_owned(),
            trade_date: date(10),
            settlement_date: None,
            description: None,
        }
    }

    #[test]
    fn deposit_is_valid_without_trade_legs() {
        let normalized = deposit()
            .normalize()
            .unwrap_or_else(|_| panic!("deposit should be valid"));
        assert_eq!(normalized.amount.to_string(), "5000");
        assert_eq!(normalized.currency, "EUR");
    }

    #[test]
    fn buy_requires_instrument_quantity_and_price() {
        let mut value = deposit();
        value.transaction_type = TransactionType::Buy;
        assert!(value.clone().normalize().is_err());

        value.instrument_id = Some(Uuid::new_v4());
        value.quantity = Some(Decimal::new(10, 0));
        assert!(value.clone().normalize().is_err());

        value.price = Some(Decimal::new(500, 0));
        assert!(value.normalize().is_ok());
    }

    #[test]
    fn settlement_before_trade_date_is_rejected() {
        let mut value = deposit();
        value.settlement_date = Some(date(9));
        assert!(value.normalize().is_err());
    }

    #[test]
    fn settled_transaction_requires_settlement_date() {
        let mut value = deposit();
        value.status = TransactionStatus::Settled;
        assert!(value.clone().normalize().is_err());

        value.settlement_date = Some(date(12));
        assert!(value.normalize().is_ok());
    }
}
