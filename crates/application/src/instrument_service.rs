//! Instrument catalog.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    ChangeTracked, Instrument, InstrumentDraft, InstrumentType, Permission, RowVersion,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthorizationService, EntityChange, ListQuery, Mutation, OperationRecorder, Paged, SortFields,
    SortOrder,
};

/// Sortable instrument fields.
pub const INSTRUMENT_SORT_FIELDS: SortFields = SortFields {
    allowed: &["symbol", "name", "instrumentType", "createdAt"],
    default: SortOrder::asc("symbol"),
};

/// Instrument listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentFilter {
    /// Case-insensitive match on symbol, name and ISIN.
    pub search: Option<String>,
    /// Asset class filter.
    pub instrument_type: Option<InstrumentType>,
    /// Active flag filter.
    pub is_active: Option<bool>,
}

/// Repository port for instruments.
#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    /// Lists instruments.
    async fn list_instruments(
        &self,
        query: &ListQuery<InstrumentFilter>,
    ) -> AppResult<Paged<Instrument>>;

    /// Finds an instrument.
    async fn find_instrument(&self, instrument_id: Uuid) -> AppResult<Option<Instrument>>;

    /// Inserts an instrument. Fails with a conflict on a duplicate symbol.
    async fn insert_instrument(
        &self,
        instrument: &Instrument,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Updates an instrument when the stored row version equals `expected`.
    async fn update_instrument(
        &self,
        instrument: &Instrument,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes an instrument when the stored row version equals `expected`.
    async fn delete_instrument(
        &self,
        instrument_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Application service for the instrument catalog.
#[derive(Clone)]
pub struct InstrumentService {
    repository: Arc<dyn InstrumentRepository>,
    authorization_service: AuthorizationService,
}

impl InstrumentService {
    /// Creates a new instrument service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn InstrumentRepository>,
            authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Lists instruments.
    pub async fn list_instruments(
        &self,
        actor: &UserIdentity,
        query: ListQuery<InstrumentFilter>,
    ) -> AppResult<Paged<Instrument>> {
        self.authorization_service
            .require_permission(actor, Permission::InstrumentsRead)
            .await?;

        self.repository.list_instruments(&query).await
    }

    /// Returns one instrument.
    pub async fn get_instrument(
        &self,
        actor: &UserIdentity,
        instrument_id: Uuid,
    ) -> AppResult<Instrument> {
        self.authorization_service
            .require_permission(actor, Permission::InstrumentsRead)
            .await?;

        self.load(instrument_id).await
    }

    /// Adds an instrument to the catalog.
    pub async fn create_instrument(
        &self,
        actor: &UserIdentity,
        draft: InstrumentDraft,
    ) -> AppResult<Mutation<Instrument>> {
        self.authorization_service
            .require_permission(actor, Permission::InstrumentsCreate)
            .await?;

        let now = Utc::now();
        let instrument = Instrument::create(draft, now, actor.username())?;
        let mut recorder = OperationRecorder::begin(actor, &instrument, now);
        recorder.record(None, Some(&instrument));
        self.repository
            .insert_instrument(&instrument, &recorder.finish())
            .await?;

        Ok(Mutation::created(instrument))
    }

    /// Updates an instrument.
    pub async fn update_instrument(
        &self,
        actor: &UserIdentity,
        instrument_id: Uuid,
        row_version: RowVersion,
        draft: InstrumentDraft,
    ) -> AppResult<Mutation<Instrument>> {
        self.authorization_service
            .require_permission(actor, Permission::InstrumentsUpdate)
            .await?;

        let existing = self.load(instrument_id).await?;
        existing.row_version.ensure_matches(
            row_version,
            Instrument::ENTITY_TYPE,
            &existing.tracked_id(),
        )?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        updated.row_version = existing.row_version.next();
        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_instrument(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes an instrument that no order or transaction references.
    pub async fn delete_instrument(
        &self,
        actor: &UserIdentity,
        instrument_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::InstrumentsDelete)
            .await?;

        let existing = self.load(instrument_id).await?;
        if let Some(row_version) = row_version {
            existing.row_version.ensure_matches(
                row_version,
                Instrument::ENTITY_TYPE,
                &existing.tracked_id(),
            )?;
        }

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        self.repository
            .delete_instrument(instrument_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn load(&self, instrument_id: Uuid) -> AppResult<Instrument> {
        self.repository
            .find_instrument(instrument_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("instrument '{instrument_id}' does not exist"))
            })
    }
}
