//! Domain entities and invariants.

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod account;
mod change;
mod client;
mod codes;
mod instrument;
mod order;
mod role;
mod security;
mod transaction;
mod user;
mod versioning;

pub use account::{Account, AccountDraft, AccountHolder, AccountStatus, AccountType, HolderRole};
pub use change::{
    ChangeTracked, ChangeType, FieldDiff, FieldSnapshot, collapse_change_types, diff_snapshots,
};
pub use client::{
    AddressType, Client, ClientAddress, ClientAddressDraft, ClientDraft, ClientStatus, ClientType,
    InvestmentObjective, InvestmentProfile, InvestmentProfileDraft, RiskTolerance,
};
pub use codes::{
    bounded_text, country_code, currency_code, isin, non_negative_decimal, optional_text,
    positive_decimal,
};
pub use instrument::{Instrument, InstrumentDraft, InstrumentType};
pub use order::{Order, OrderDraft, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use role::{ADMINISTRATOR_ROLE, Role, RoleDraft};
pub use security::{AuditAction, Permission};
pub use transaction::{Transaction, TransactionDraft, TransactionStatus, TransactionType};
pub use user::{
    EmailAddress, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, User, UserDraft, normalize_username,
    validate_password,
};
pub use versioning::{Provenance, RowVersion, stale_version};
