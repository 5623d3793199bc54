//! Client master data with nested addresses and investment profile.


use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{
    ChangeTracked, Client, ClientDraft, ClientStatus, ClientType, Permission, RowVersion,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthorizationService, EntityChange, ListQuery, Mutation, OperationRecorder, Paged, SortFields,
    SortOrder,
};

/// Sortable client fields.
pub const CLIENT_SORT_FIELDS: SortFields = SortFields {
    allowed: &["createdAt", "lastName", "companyName", "email", "status"],
    default: SortOrder::desc("createdAt"),
};

/// Client listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    /// Case-insensitive match on names and email.
    pub search: Option<String>,
    /// Status filter.
    pub status: Option<ClientStatus>,
    /// Legal form filter.
    pub client_type: Option<ClientType>,
}

/// Repository port for clients and their nested records.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Lists clients with nested records.
    async fn list_clients(&self, query: &ListQuery<ClientFilter>) -> AppResult<Paged<Client>>;

    /// Finds a client with nested records.
    async fn find_client(&self, client_id: Uuid) -> AppResult<Option<Client>>;

    /// Inserts a client with nested records and the operation's changes in one
    /// transaction.
    async fn insert_client(&self, client: &Client, changes: &[EntityChange]) -> AppResult<()>;

    /// Replaces a client and its nested records when the stored row version
    /// equals `expected`. Fails with a conflict otherwise. `changes` commit
    /// with the write or not at all.
    async fn update_client(
        &self,
        client: &Client,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes a client when the stored row version equals `expected`.
    async fn delete_client(
        &self,
        client_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Application service for client administration.
#[derive(Clone)]
pub struct ClientService {
    repository: Arc<dyn ClientRepository>,
    authorization_service: AuthorizationService,
}

impl ClientService {
    /// Creates a new client service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            authorization_service,
        }
    }

    /// Lists clients.
    pub async fn list_clients(
        &self,
        actor: &UserIdentity,
        query: ListQuery<ClientFilter>,
    ) -> AppResult<Paged<Client>> {
        self.authorization_service
            .require_permission(actor, Permission::ClientsRead)
            .await?;

        self.repository.list_clients(&query).await
    }

    /// Returns one client.
    pub async fn get_client(&self, actor: &UserIdentity, client_id: Uuid) -> AppResult<Client> {
        self.authorization_service
            .require_permission(actor, Permission::ClientsRead)
            .await?;

        self.load(client_id).await
    }

    /// Creates a client and records every populated field as created.
    pub async fn create_client(
        &self,
        actor: &UserIdentity,
        draft: ClientDraft,
    ) -> AppResult<Mutation<Client>> {
        self.authorization_service
            .require_permission(actor, Permission::ClientsCreate)
            .await?;

        let now = Utc::now();
        let client = Client::create(draft, now, actor.username())?;

        let mut recorder = OperationRecorder::begin(actor, &client, now);
        recorder.record(None, Some(&client));
        recorder.record_related_set(&[], &client.addresses);
        recorder.record_related(None, client.investment_profile.as_ref());
        self.repository
            .insert_client(&client, &recorder.finish())
            .await?;

        Ok(Mutation::created(client))
    }

    /// Updates a client, its addresses and investment profile in one operation.
    pub async fn update_client(
        &self,
        actor: &UserIdentity,
        client_id: Uuid,
        row_version: RowVersion,
        draft: ClientDraft,
    ) -> AppResult<Mutation<Client>> {
        self.authorization_service
            .require_permission(actor, Permission::ClientsUpdate)
            .await?;

        let existing = self.load(client_id).await?;
        existing
            .row_version
            .ensure_matches(row_version, Client::ENTITY_TYPE, &existing.tracked_id())?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        updated.row_version = existing.row_version.next();

        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        recorder.record_related_set(&existing.addresses, &updated.addresses);
        recorder.record_related(
            existing.investment_profile.as_ref(),
            updated.investment_profile.as_ref(),
        );
        self.repository
            .update_client(&updated, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes a client. `row_version`, when given, must match the stored one.
    pub async fn delete_client(
        &self,
        actor: &UserIdentity,
        client_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::ClientsDelete)
            .await?;

        let existing = self.load(client_id).await?;
        if let Some(row_version) = row_version {
            existing
                .row_version
                .ensure_matches(row_version, Client::ENTITY_TYPE, &existing.tracked_id())?;
        }

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        recorder.record_related_set(&existing.addresses, &[]);
        recorder.record_related(existing.investment_profile.as_ref(), None);
        self.repository
            .delete_client(client_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn load(&self, client_id: Uuid) -> AppResult<Client> {
        self.repository
            .find_client(client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client '{client_id}' does not exist")))
    }
}
