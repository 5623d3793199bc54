use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{ChangeTracked, ChangeType, FieldSnapshot, Permission};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    AuthorizationRepository, AuthorizationService, ENTITY_CHANGE_SORT_FIELDS, EntityChange,
    EntityChangeFilter, EntityChangeRepository, ListQuery, OperationPage, OperationSummary,
    PageRequest, SortOrder,
};

use super::{EntityChangeService, OperationRecorder, group_operations};

struct FakeAuthorizationRepository {
    permissions: Vec<Permission>,
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn list_permissions_for_user(&self, _user_id: Uuid) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.clone())
    }
}

#[derive(Default)]
struct FakeEntityChangeRepository {
    page: OperationPage,
    rows: Vec<EntityChange>,
    requested_filters: Mutex<Vec<EntityChangeFilter>>,
    requested_operation_ids: Mutex<Vec<Vec<Uuid>>>,
}

#[async_trait]
impl EntityChangeRepository for FakeEntityChangeRepository {
    async fn page_operations(
        &self,
        filter: &EntityChangeFilter,
        _sort: SortOrder,
        _page: PageRequest,
    ) -> AppResult<OperationPage> {
        self.requested_filters.lock().await.push(filter.clone());
        Ok(self.page.clone())
    }

    async fn list_changes_for_operations(
        &self,
        operation_ids: &[Uuid],
    ) -> AppResult<Vec<EntityChange>> {
        self.requested_operation_ids
            .lock()
            .await
            .push(operation_ids.to_vec());
        Ok(self
            .rows
            .iter()
            .filter(|row| operation_ids.contains(&row.operation_id))
            .cloned()
            .collect())
    }
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, minute, 0)
        .single()
        .unwrap_or_default()
}

fn summary(operation_id: Uuid, minute: u32) -> OperationSummary {
    OperationSummary {
        operation_id,
        timestamp: at(minute),
        user_id: None,
        user_name: Some("Back Office".to_owned()),
        entity_type: "Client".to_owned(),
        entity_id: "client-1".to_owned(),
    }
}

fn row(
    operation_id: Uuid,
    related: Option<(&str, &str)>,
    field_name: &str,
    change_type: ChangeType,
) -> EntityChange {
    EntityChange {
        id: Uuid::new_v4(),
        operation_id,
        entity_type: "Client".to_owned(),
        entity_id: "client-1".to_owned(),
        related_entity_type: related.map(|(entity_type, _)| entity_type.to_owned()),
        related_entity_id: related.map(|(_, entity_id)| entity_id.to_owned()),
        change_type,
        field_name: field_name.to_owned(),
        old_value: None,
        new_value: Some("value".to_owned()),
        user_id: None,
        user_name: Some("Back Office".to_owned()),
        timestamp: at(0),
    }
}

fn actor() -> UserIdentity {
    UserIdentity::new(Uuid::new_v4(), "auditor", "Audit Desk")
}

fn service(
    repository: Arc<FakeEntityChangeRepository>,
    permissions: Vec<Permission>,
) -> EntityChangeService {
    EntityChangeService::new(
        repository,
        AuthorizationService::new(Arc::new(FakeAuthorizationRepository { permissions })),
    )
}

#[test]
fn root_group_comes_first_and_nested_groups_keep_first_seen_order() {
    let operation_id = Uuid::new_v4();
    let rows = vec![
        row(operation_id, Some(("Address", "a-2")), "City", ChangeType::Created),
        row(operation_id, None, "LastName", ChangeType::Modified),
        row(operation_id, Some(("InvestmentProfile", "p-1")), "Objective", ChangeType::Modified),
        row(operation_id, Some(("Address", "a-2")), "Country", ChangeType::Created),
        row(operation_id, None, "Email", ChangeType::Modified),
    ];

    let histories = group_operations(vec![summary(operation_id, 0)], rows);
    assert_eq!(histories.len(), 1);

    let groups = &histories[0].groups;
    let keys: Vec<_> = groups
        .iter()
        .map(|group| group.related_entity_id.as_deref())
        .collect();
    assert_eq!(keys, vec![None, Some("a-2"), Some("p-1")]);

    let root_fields: Vec<_> = groups[0]
        .fields
        .iter()
        .map(|field| field.field_name.as_str())
        .collect();
    assert_eq!(root_fields, vec!["Email", "LastName"]);

    assert_eq!(groups[1].change_type, ChangeType::Created);
    assert_eq!(histories[0].change_type, ChangeType::Modified);
}

#[test]
fn uniform_operation_keeps_its_change_type() {
    let operation_id = Uuid::new_v4();
    let rows = vec![
        row(operation_id, None, "Symbol", ChangeType::Deleted),
        row(operation_id, None, "Name", ChangeType::Deleted),
    ];

    let histories = group_operations(vec![summary(operation_id, 0)], rows);
    assert_eq!(histories[0].change_type, ChangeType::Deleted);
}

#[test]
fn operations_without_rows_are_dropped_and_order_is_kept() {
    let newest = Uuid::new_v4();
    let orphan = Uuid::new_v4();
    let oldest = Uuid::new_v4();
    let rows = vec![
        row(oldest, None, "Email", ChangeType::Modified),
        row(newest, None, "Email", ChangeType::Modified),
    ];

    let histories = group_operations(
        vec![summary(newest, 30), summary(orphan, 20), summary(oldest, 10)],
        rows,
    );

    let ids: Vec<_> = histories
        .iter()
        .map(|history| history.operation_id)
        .collect();
    assert_eq!(ids, vec![newest, oldest]);
}

struct TrackedAddress {
    id: &'static str,
    city: &'static str,
}

impl ChangeTracked for TrackedAddress {
    const ENTITY_TYPE: &'static str = "Address";

    fn tracked_id(&self) -> String {
        self.id.to_owned()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new().with("City", self.city)
    }
}

struct TrackedClient {
    email: &'static str,
}

impl ChangeTracked for TrackedClient {
    const ENTITY_TYPE: &'static str = "Client";

    fn tracked_id(&self) -> String {
        "client-1".to_owned()
    }

    fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot::new().with("Email", self.email)
    }
}

#[test]
fn recorder_tags_nested_changes_with_related_entity() {
    let before = TrackedClient {
        email: "old@example.com",
    };
    let after = TrackedClient {
        email: "new@example.com",
    };
    let mut recorder = OperationRecorder::begin(&actor(), &after, at(5));
    recorder.record(Some(&before), Some(&after));
    recorder.record_related_set(
        &[
            TrackedAddress { id: "a-1", city: "Zurich" },
            TrackedAddress { id: "a-2", city: "Basel" },
        ],
        &[
            TrackedAddress { id: "a-1", city: "Geneva" },
            TrackedAddress { id: "a-3", city: "Bern" },
        ],
    );

    let operation_id = recorder.operation_id();
    let changes = recorder.finish();

    assert_eq!(changes.len(), 4);
    assert!(changes.iter().all(|change| change.operation_id == operation_id));
    assert!(changes.iter().all(|change| change.entity_id == "client-1"));
    assert!(changes.iter().all(|change| change.timestamp == at(5)));
    assert_eq!(changes[0].related_entity_type, None);

    let types: Vec<_> = changes[1..]
        .iter()
        .map(|change| (change.related_entity_id.as_deref(), change.change_type))
        .collect();
    assert_eq!(
        types,
        vec![
            (Some("a-1"), ChangeType::Modified),
            (Some("a-2"), ChangeType::Deleted),
            (Some("a-3"), ChangeType::Created),
        ]
    );
}

#[test]
fn unchanged_record_produces_no_rows() {
    let value = TrackedClient {
        email: "same@example.com",
    };
    let mut recorder = OperationRecorder::begin(&actor(), &value, at(0));
    recorder.record(Some(&value), Some(&value));
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn entity_history_requeries_only_page_operations() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let other_page = Uuid::new_v4();
    let repository = Arc::new(FakeEntityChangeRepository {
        page: OperationPage {
            operations: vec![summary(first, 2), summary(second, 1)],
            total_count: 3,
        },
        rows: vec![
            row(first, None, "Email", ChangeType::Modified),
            row(second, None, "Email", ChangeType::Created),
            row(other_page, None, "Email", ChangeType::Created),
        ],
        ..FakeEntityChangeRepository::default()
    });
    let service = service(repository.clone(), vec![Permission::AuditChangesRead]);

    let page = service
        .entity_history(&actor(), "Client", "client-1", PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap_or_else(|error| panic!("history should load: {error}"));

    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(
        repository.requested_operation_ids.lock().await.as_slice(),
        &[vec![first, second]]
    );

    let filters = repository.requested_filters.lock().await;
    assert_eq!(filters[0].entity_type.as_deref(), Some("Client"));
    assert_eq!(filters[0].entity_id.as_deref(), Some("client-1"));
}

#[tokio::test]
async fn empty_page_skips_second_query() {
    let repository = Arc::new(FakeEntityChangeRepository::default());
    let service = service(repository.clone(), vec![Permission::AuditChangesRead]);

    let page = service
        .all_changes(
            &actor(),
            ListQuery {
                filter: EntityChangeFilter::default(),
                sort: ENTITY_CHANGE_SORT_FIELDS.default,
                page: PageRequest::default(),
            },
        )
        .await
        .unwrap_or_else(|error| panic!("feed should load: {error}"));

    assert!(page.items.is_empty());
    assert!(repository.requested_operation_ids.lock().await.is_empty());
}

#[tokio::test]
async fn history_requires_change_read_permission() {
    let repository = Arc::new(FakeEntityChangeRepository::default());
    let service = service(repository, vec![Permission::AuditRead]);

    let result = service
        .entity_history(&actor(), "Client", "client-1", PageRequest::default())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let repository = Arc::new(FakeEntityChangeRepository::default());
    let service = service(repository, vec![Permission::AuditChangesRead]);

    let result = service
        .all_changes(
            &actor(),
            ListQuery {
                filter: EntityChangeFilter {
                    from: Some(at(30)),
                    to: Some(at(10)),
                    ..EntityChangeFilter::default()
                },
                sort: ENTITY_CHANGE_SORT_FIELDS.default,
                page: PageRequest::default(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn blank_entity_key_is_rejected() {
    let repository = Arc::new(FakeEntityChangeRepository::default());
    let service = service(repository, vec![Permission::AuditChangesRead]);

    let result = service
        .entity_history(&actor(), "Client", "  ", PageRequest::default())
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}
