use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{bounded_text, currency_code, isin, optional_text};
use crate::versioning::{Provenance, RowVersion};

storage_enum! {
    /// Asset class of a tradable instrument.
    pub enum InstrumentType {
        /// Common or preferred stock.
        Stock => "stock",
        /// Fixed-income security.
        Bond => "bond",
        /// Exchange-traded fund.
        Etf => "etf",
        /// Listed option.
        Option => "option",
        /// Listed future.
        Future => "future",
        /// Mutual fund.
        Fund => "fund",
    }
}

/// Tradable instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// Stable instrument id.
    pub id: Uuid,
    /// Unique ticker symbol.
    pub symbol: String,
    /// Instrument name.
    pub name: String,
    /// Optional ISIN.
    pub isin: Option<String>,
    /// Asset class.
    pub instrument_type: InstrumentType,
    /// Trading currency.
    pub currency: String,
    /// Listing exchange MIC or name.
    pub exchange: Option<String>,
    /// Minimum tradable quantity step.
    pub lot_size: i32,
    /// Whether new orders may reference the instrument.
    pub is_active: bool,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Instrument {
    /// Builds a new instrument.
    pub fn create(draft: InstrumentDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            symbol: draft.symbol,
            name: draft.name,
            isin: draft.isin,
            instrument_type: draft.instrument_type,
            currency: draft.currency,
            exchange: draft.exchange,
            lot_size: draft.lot_size,
            is_active: draft.is_active,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the instrument with a draft applied.
    pub fn apply(
        &self,
        draft: InstrumentDraft,
        at: DateTime<Utc>,
        updated_by: &str,
    ) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            symbol: draft.symbol,
            name: draft.name,
            isin: draft.isin,
            instrument_type: draft.instrument_type,
            currency: draft.currency,
            exchange: draft.exchange,
            lot_size: draft.lot_size,
            is_active: draft.is_active,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }
}

impl ChangeTracked for Instrument {
    const ENTITY_TYPE: &'static str = "Instrument";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("Symbol", &self.symbol)
            .with("Name", &self.name)
            .with_optional("Isin", self.isin.as_ref())
            .with("InstrumentType", self.instrument_type)
            .with("Currency", &self.currency)
            .with_optional("Exchange", self.exchange.as_ref())
            .with("LotSize", self.lot_size)
            .with("IsActive", self.is_active)
    }
}

/// Instrument attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDraft {
    /// Ticker symbol.
    pub symbol: String,
    /// Instrument name.
    pub name: String,
    /// Optional ISIN.
    pub isin: Option<String>,
    /// Asset class.
    pub instrument_type: InstrumentType,
    /// Trading currency.
    pub currency: String,
    /// Listing exchange.
    pub exchange: Option<String>,
    /// Minimum tradable quantity step.
    pub lot_size: i32,
    /// Whether new orders may reference the instrument.
    pub is_active: bool,
}

impl InstrumentDraft {
    /// Validates and normalizes the draft.
    pub fn normalize(self) -> AppResult<Self> {
        let symbol = self.symbol.trim().to_ascii_uppercase();
        let symbol_is_valid = (1..=20).contains(&symbol.len())
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/'));
        if !symbol_is_valid {
            return Err(AppError::Validation(format!(
                "symbol '{}' must be 1-20 letters, digits, '.', '-' or '/'",
                self.symbol
            )));
        }

        if self.lot_size <= 0 {
            return Err(AppError::Validation(
                "lot_size must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            symbol,
            name: bounded_text("name", self.name, 200)?,
            isin: optional_text(self.isin)
                .map(|value| isin(&value))
                .transpose()?,
            instrument_type: self.instrument_type,
            currency: currency_code("currency", &self.currency)?,
            exchange: optional_text(self.exchange).map(|value| value.to_ascii_uppercase()),
            lot_size: self.lot_size,
            is_active: self.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{InstrumentDraft, InstrumentType};

    fn draft() -> InstrumentDraft {
        InstrumentDraft {
            symbol: " aapl ".to_owned(),
            name: "Apple Inc.".to_owned(),
            isin: Some("us0378331005".to_owned()),
            instrument_type: InstrumentType::Stock,
            currency: "usd".to_owned(),
            exchange: Some("xnas".to_owned()),
            lot_size: 1,
            is_active: true,
        }
    }

    #[test]
    fn draft_is_normalized() {
        let normalized = draft().normalize().unwrap_or_else(|_| panic!("draft should be valid"));
        assert_eq!(normalized.symbol, "AAPL");
        assert_eq!(normalized.isin.as_deref(), Some("US0378331005"));
        assert_eq!(normalized.exchange.as_deref(), Some("XNAS"));
    }

    #[test]
    fn zero_lot_size_is_rejected() {
        let mut value = draft();
        value.lot_size = 0;
        assert!(value.normalize().is_err());
    }

    #[test]
    fn symbol_with_spaces_is_rejected() {
        let mut value = draft();
        value.symbol = "BRK B".to_owned();
        assert!(value.normalize().is_err());
    }
}
