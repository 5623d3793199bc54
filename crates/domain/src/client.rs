use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{bounded_text, country_code, non_negative_decimal, optional_text};
use crate::user::EmailAddress;
use crate::versioning::{Provenance, RowVersion};

storage_enum! {
    /// Legal form of a client.
    pub enum ClientType {
        /// Natural person.
        Individual => "individual",
        /// Company or other legal entity.
        Corporate => "corporate",
    }
}

storage_enum! {
    /// Lifecycle status of a client relationship.
    pub enum ClientStatus {
        /// Onboarded, KYC checks outstanding.
        PendingKyc => "pending_kyc",
        /// Fully onboarded.
        Active => "active",
        /// Temporarily blocked from trading.
        Blocked => "blocked",
        /// Relationship terminated.
        Closed => "closed",
    }
}

storage_enum! {
    /// Purpose of a client address.
    pub enum AddressType {
        /// Registered or legal address.
        Legal => "legal",
        /// Correspondence address.
        Mailing => "mailing",
        /// Home address of an individual.
        Residential => "residential",
    }
}

storage_enum! {
    /// Declared tolerance for investment risk.
    pub enum RiskTolerance {
        /// Capital preservation first.
        Low => "low",
        /// Balanced.
        Medium => "medium",
        /// Accepts significant drawdowns.
        High => "high",
    }
}

storage_enum! {
    /// Primary investment objective.
    pub enum InvestmentObjective {
        /// Preserve capital.
        Preservation => "preservation",
        /// Generate income.
        Income => "income",
        /// Grow capital.
        Growth => "growth",
        /// Short-term speculative gains.
        Speculation => "speculation",
    }
}

/// Address nested under a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress {
    /// Stable address id.
    pub id: Uuid,
    /// Address purpose.
    pub address_type: AddressType,
    /// First address line.
    pub line1: String,
    /// Optional second address line.
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// Optional postal code.
    pub postal_code: Option<String>,
    /// ISO country code.
    pub country: String,
}

impl ChangeTracked for ClientAddress {
    const ENTITY_TYPE: &'static str = "Address";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("AddressType", self.address_type)
            .with("Line1", &self.line1)
            .with_optional("Line2", self.line2.as_ref())
            .with("City", &self.city)
            .with_optional("PostalCode", self.postal_code.as_ref())
            .with("Country", &self.country)
    }
}

/// Investment profile nested under a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentProfile {
    /// Stable profile id.
    pub id: Uuid,
    /// Risk tolerance.
    pub risk_tolerance: RiskTolerance,
    /// Investment objective.
    pub objective: InvestmentObjective,
    /// Declared annual income.
    pub annual_income: Option<Decimal>,
    /// Declared net worth.
    pub net_worth: Option<Decimal>,
    /// Years of trading experience.
    pub experience_years: i32,
}

impl ChangeTracked for InvestmentProfile {
    const ENTITY_TYPE: &'static str = "InvestmentProfile";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("RiskTolerance", self.risk_tolerance)
            .with("Objective", self.objective)
            .with_optional("AnnualIncome", self.annual_income.map(|value| value.normalize()))
            .with_optional("NetWorth", self.net_worth.map(|value| value.normalize()))
            .with("ExperienceYears", self.experience_years)
    }
}

/// Brokerage client with nested addresses and investment profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Stable client id.
    pub id: Uuid,
    /// Legal form.
    pub client_type: ClientType,
    /// First name of an individual.
    pub first_name: Option<String>,
    /// Last name of an individual.
    pub last_name: Option<String>,
    /// Company name of a corporate client.
    pub company_name: Option<String>,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Relationship status.
    pub status: ClientStatus,
    /// ISO country of residence or incorporation.
    pub residence_country: String,
    /// Nested addresses.
    pub addresses: Vec<ClientAddress>,
    /// Nested investment profile.
    pub investment_profile: Option<InvestmentProfile>,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Client {
    /// Builds a new client from a normalized draft.
    pub fn create(draft: ClientDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        let addresses = draft
            .addresses
            .into_iter()
            .map(|address| address.into_address(Uuid::new_v4()))
            .collect();
        let investment_profile = draft
            .investment_profile
            .map(|profile| profile.into_profile(Uuid::new_v4()));

        Ok(Self {
            id: Uuid::new_v4(),
            client_type: draft.client_type,
            first_name: draft.first_name,
            last_name: draft.last_name,
            company_name: draft.company_name,
            email: draft.email,
            phone: draft.phone,
            status: draft.status,
            residence_country: draft.residence_country,
            addresses,
            investment_profile,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the client with a draft applied, keeping ids of retained nested records.
    ///
    /// Addresses whose draft carries an id must already belong to this client;
    /// addresses missing from the draft are removed.
    pub fn apply(
        &self,
        draft: ClientDraft,
        at: DateTime<Utc>,
        updated_by: &str,
    ) -> AppResult<Self> {
        let draft = draft.normalize()?;

        let mut addresses = Vec::with_capacity(draft.addresses.len());
        for address in draft.addresses {
            let id = match address.id {
                Some(id) if self.addresses.iter().any(|existing| existing.id == id) => id,
                Some(id) => {
                    return Err(AppError::Validation(format!(
                        "address '{id}' does not belong to client '{}'",
                        self.id
                    )));
                }
                None => Uuid::new_v4(),
            };
            addresses.push(address.into_address(id));
        }

        let investment_profile = draft.investment_profile.map(|profile| {
            let id = self
                .investment_profile
                .as_ref()
                .map(|existing| existing.id)
                .unwrap_or_else(Uuid::new_v4);
            profile.into_profile(id)
        });

        Ok(Self {
            id: self.id,
            client_type: draft.client_type,
            first_name: draft.first_name,
            last_name: draft.last_name,
            company_name: draft.company_name,
            email: draft.email,
            phone: draft.phone,
            status: draft.status,
            residence_country: draft.residence_country,
            addresses,
            investment_profile,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }

    /// Human-readable name: company name for corporates, full name for individuals.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.client_type {
            ClientType::Corporate => self.company_name.clone().unwrap_or_default(),
            ClientType::Individual => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl ChangeTracked for Client {
    const ENTITY_TYPE: &'static str = "Client";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("ClientType", self.client_type)
            .with_optional("FirstName", self.first_name.as_ref())
            .with_optional("LastName", self.last_name.as_ref())
            .with_optional("CompanyName", self.company_name.as_ref())
            .with("Email", &self.email)
            .with_optional("Phone", self.phone.as_ref())
            .with("Status", self.status)
            .with("ResidenceCountry", &self.residence_country)
    }
}

/// Address attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddressDraft {
    /// Existing address id when updating in place.
    pub id: Option<Uuid>,
    /// Address purpose.
    pub address_type: AddressType,
    /// First address line.
    pub line1: String,
    /// Optional second address line.
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// Optional postal code.
    pub postal_code: Option<String>,
    /// ISO country code.
    pub country: String,
}

impl ClientAddressDraft {
    fn normalize(self) -> AppResult<Self> {
        Ok(Self {
            id: self.id,
            address_type: self.address_type,
            line1: bounded_text("line1", self.line1, 200)?,
            line2: optional_text(self.line2),
            city: bounded_text("city", self.city, 100)?,
            postal_code: optional_text(self.postal_code),
            country: country_code("country", &self.country)?,
        })
    }

    fn into_address(self, id: Uuid) -> ClientAddress {
        ClientAddress {
            id,
            address_type: self.address_type,
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            postal_code: self.postal_code,
            country: self.country,
        }
    }
}

/// Investment profile attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentProfileDraft {
    /// Risk tolerance.
    pub risk_tolerance: RiskTolerance,
    /// Investment objective.
    pub objective: InvestmentObjective,
    /// Declared annual income.
    pub annual_income: Option<Decimal>,
    /// Declared net worth.
    pub net_worth: Option<Decimal>,
    /// Years of trading experience.
    pub experience_years: i32,
}

impl InvestmentProfileDraft {
    fn normalize(self) -> AppResult<Self> {
        if !(0..=80).contains(&self.experience_years) {
            return Err(AppError::Validation(
                "experience_years must be between 0 and 80".to_owned(),
            ));
        }

        Ok(Self {
            risk_tolerance: self.risk_tolerance,
            objective: self.objective,
            annual_income: non_negative_decimal("annual_income", self.annual_income)?,
            net_worth: non_negative_decimal("net_worth", self.net_worth)?,
            experience_years: self.experience_years,
        })
    }

    fn into_profile(self, id: Uuid) -> InvestmentProfile {
        InvestmentProfile {
            id,
            risk_tolerance: self.risk_tolerance,
            objective: self.objective,
            annual_income: self.annual_income,
            net_worth: self.net_worth,
            experience_years: self.experience_years,
        }
    }
}

/// Client attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDraft {
    /// Legal form.
    pub client_type: ClientType,
    /// First name of an individual.
    pub first_name: Option<String>,
    /// Last name of an individual.
    pub last_name: Option<String>,
    /// Company name of a corporate client.
    pub company_name: Option<String>,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Relationship status.
    pub status: ClientStatus,
    /// ISO country of residence or incorporation.
    pub residence_country: String,
    /// Addresses to keep or add.
    pub addresses: Vec<ClientAddressDraft>,
    /// Investment profile, if any.
    pub investment_profile: Option<InvestmentProfileDraft>,
}

impl ClientDraft {
    /// Validates and normalizes the draft.
    pub fn normalize(self) -> AppResult<Self> {
        let first_name = optional_text(self.first_name);
        let last_name = optional_text(self.last_name);
        let company_name = optional_text(self.company_name);

        match self.client_type {
            ClientType::Individual if first_name.is_none() || last_name.is_none() => {
                return Err(AppError::Validation(
                    "individual clients require first_name and last_name".to_owned(),
                ));
            }
            ClientType::Corporate if company_name.is_none() => {
                return Err(AppError::Validation(
                    "corporate clients require company_name".to_owned(),
                ));
            }
            _ => {}
        }

        let addresses = self
            .addresses
            .into_iter()
            .map(ClientAddressDraft::normalize)
            .collect::<AppResult<Vec<_>>>()?;

        let mut seen_ids = std::collections::HashSet::new();
        if addresses
            .iter()
            .filter_map(|address| address.id)
            .any(|id| !seen_ids.insert(id))
        {
            return Err(AppError::Validation(
                "address ids must be unique within a client".to_owned(),
            ));
        }

        Ok(Self {
            client_type: self.client_type,
            first_name,
            last_name,
            company_name,
            email: EmailAddress::new(self.email)?.into(),
            phone: optional_text(self.phone),
            status: self.status,
            residence_country: country_code("residence_country", &self.residence_country)?,
            addresses,
            investment_profile: self
                .investment_profile
                .map(InvestmentProfileDraft::normalize)
                .transpose()?,
        })
    }
}
