use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{currency_code, optional_text};
use crate::versioning::{Provenance, RowVersion};

storage_enum! {
    /// Account product type.
    pub enum AccountType {
        /// Single-owner account.
        Individual => "individual",
        /// Account with several co-owners.
        Joint => "joint",
        /// Account held by a legal entity.
        Corporate => "corporate",
        /// Tax-advantaged retirement account.
        Retirement => "retirement",
    }
}

storage_enum! {
    /// Account lifecycle status.
    pub enum AccountStatus {
        /// Open for trading.
        Active => "active",
        /// Trading blocked.
        Blocked => "blocked",
        /// Closed.
        Closed => "closed",
    }
}

storage_enum! {
    /// Relationship between a client and an account.
    pub enum HolderRole {
        /// Owner.
        Owner => "owner",
        /// Co-owner of a joint account.
        CoOwner => "co_owner",
        /// Beneficiary.
        Beneficiary => "beneficiary",
        /// Trustee.
        Trustee => "trustee",
        /// Holder of a power of attorney.
        PowerOfAttorney => "power_of_attorney",
    }
}

/// Client attached to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHolder {
    /// Holding client.
    pub client_id: Uuid,
    /// Holder role.
    pub role: HolderRole,
    /// Marks the primary holder.
    pub is_primary: bool,
}

impl ChangeTracked for AccountHolder {
    const ENTITY_TYPE: &'static str = "AccountHolder";

    fn tracked_id(&self) -> String {
        self.client_id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("ClientId", self.client_id)
            .with("Role", self.role)
            .with("IsPrimary", self.is_primary)
    }
}

/// Brokerage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable account id.
    pub id: Uuid,
    /// Unique account number.
    pub account_number: String,
    /// Product type.
    pub account_type: AccountType,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Base currency.
    pub currency: String,
    /// Opening date.
    pub opened_at: NaiveDate,
    /// Closing date, set for closed accounts.
    pub closed_at: Option<NaiveDate>,
    /// Free-text comment.
    pub comment: Option<String>,
    /// Attached clients.
    pub holders: Vec<AccountHolder>,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Account {
    /// Builds a new account without holders.
    pub fn create(draft: AccountDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            account_number: draft.account_number,
            account_type: draft.account_type,
            status: draft.status,
            currency: draft.currency,
            opened_at: draft.opened_at,
            closed_at: draft.closed_at,
            comment: draft.comment,
            holders: Vec::new(),
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the account with a draft applied. Holders are kept.
    pub fn apply(
        &self,
        draft: AccountDraft,
        at: DateTime<Utc>,
        updated_by: &str,
    ) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            account_number: draft.account_number,
            account_type: draft.account_type,
            status: draft.status,
            currency: draft.currency,
            opened_at: draft.opened_at,
            closed_at: draft.closed_at,
            comment: draft.comment,
            holders: self.holders.clone(),
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }

    /// Validates that a holder can be attached to this account.
    pub fn ensure_can_add_holder(&self, holder: &AccountHolder) -> AppResult<()> {
        if self.status == AccountStatus::Closed {
            return Err(AppError::Conflict(format!(
                "account '{}' is closed",
                self.account_number
            )));
        }

        if self
            .holders
            .iter()
            .any(|existing| existing.client_id == holder.client_id)
        {
            return Err(AppError::Conflict(format!(
                "client '{}' already holds account '{}'",
                holder.client_id, self.account_number
            )));
        }

        if holder.is_primary && self.holders.iter().any(|existing| existing.is_primary) {
            return Err(AppError::Conflict(format!(
                "account '{}' already has a primary holder",
                self.account_number
            )));
        }

        Ok(())
    }

    /// Returns the holder record for a client.
    pub fn holder(&self, client_id: Uuid) -> AppResult<&AccountHolder> {
        self.holders
            .iter()
            .find(|holder| holder.client_id == client_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "client '{client_id}' does not hold account '{}'",
                    self.account_number
                ))
            })
    }
}

impl ChangeTracked for Account {
    const ENTITY_TYPE: &'static str = "Account";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("AccountNumber", &self.account_number)
            .with("AccountType", self.account_type)
            .with("Status", self.status)
            .with("Currency", &self.currency)
            .with("OpenedAt", self.opened_at)
            .with_optional("ClosedAt", self.closed_at)
            .with_optional("Comment", self.comment.as_ref())
    }
}

/// Account attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDraft {
    /// Unique account number.
    pub account_number: String,
    /// Product type.
    pub account_type: AccountType,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Base currency.
    pub currency: String,
    /// Opening date.
    pub opened_at: NaiveDate,
    /// Closing date.
    pub closed_at: Option<NaiveDate>,
    /// Free-text comment.
    pub comment: Option<String>,
}

impl AccountDraft {
    /// Validates and normalizes the draft.
    pub fn normalize(self) -> AppResult<Self> {
        let account_number = self.account_number.trim().to_ascii_uppercase();
        let number_is_valid = (4..=34).contains(&account_number.len())
            && account_number
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !number_is_valid {
            return Err(AppError::Validation(format!(
                "account_number '{}' must be 4-34 letters, digits or dashes",
                self.account_number
            )));
        }

        match (self.status, self.closed_at) {
            (AccountStatus::Closed, None) => {
                return Err(AppError::Validation(
                    "closed accounts require closed_at".to_owned(),
                ));
            }
            (AccountStatus::Active | AccountStatus::Blocked, Some(_)) => {
                return Err(AppError::Validation(
                    "closed_at is only allowed for closed accounts".to_owned(),
                ));
            }
            (_, Some(closed_at)) if closed_at < self.opened_at => {
                return Err(AppError::Validation(
                    "closed_at must not precede opened_at".to_owned(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            account_number,
            account_type: self.account_type,
            status: self.status,
            currency: currency_code("currency", &self.currency)?,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            comment: optional_text(self.comment),
        })
    }
}
