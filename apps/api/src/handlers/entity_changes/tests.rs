use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::Extension;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use brokerdesk_application::{
    AuthSettings, AuthorizationRepository, AuthorizationService, EntityChange,
    EntityChangeService,
};
use brokerdesk_core::{AppResult, UserIdentity};
use brokerdesk_domain::{ChangeType, Permission};
use brokerdesk_infrastructure::InMemoryEntityChangeRepository;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use crate::api_services::build_app_state;

use super::{change_feed_handler, entity_history_handler};

struct FixedPermissions(Vec<Permission>);

#[async_trait]
impl AuthorizationRepository for FixedPermissions {
    async fn list_permissions_for_user(&self, _user_id: Uuid) -> AppResult<Vec<Permission>> {
        Ok(self.0.clone())
    }
}

struct SeededHistory {
    address_removal: Uuid,
    onboarding: Uuid,
    account_update: Uuid,
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("timestamp should be valid"))
}

fn row(
    operation_id: Uuid,
    entity: (&str, &str),
    related_entity_id: Option<&str>,
    change_type: ChangeType,
    field_name: &str,
    user_name: &str,
    timestamp: DateTime<Utc>,
) -> EntityChange {
    EntityChange {
        id: Uuid::new_v4(),
        operation_id,
        entity_type: entity.0.to_owned(),
        entity_id: entity.1.to_owned(),
        related_entity_type: related_entity_id.map(|_| "ClientAddress".to_owned()),
        related_entity_id: related_entity_id.map(str::to_owned),
        change_type,
        field_name: field_name.to_owned(),
        old_value: (change_type != ChangeType::Created).then(|| "before".to_owned()),
        new_value: (change_type != ChangeType::Deleted).then(|| "after".to_owned()),
        user_id: None,
        user_name: Some(user_name.to_owned()),
        timestamp,
    }
}

async fn seed(repository: &InMemoryEntityChangeRepository) -> SeededHistory {
    let seeded = SeededHistory {
        address_removal: Uuid::new_v4(),
        onboarding: Uuid::new_v4(),
        account_update: Uuid::new_v4(),
    };
    let client = ("Client", "c-1");

    repository
        .append(&[
            row(
                seeded.address_removal,
                client,
                None,
                ChangeType::Modified,
                "Email",
                "Ada Brun",
                at(1, 9),
            ),
            row(
                seeded.address_removal,
                client,
                Some("addr-2"),
                ChangeType::Deleted,
                "City",
                "Ada Brun",
                at(1, 9),
            ),
            row(
                seeded.onboarding,
                client,
                None,
                ChangeType::Created,
                "Email",
                "Zoe Frei",
                at(2, 10),
            ),
            row(
                seeded.account_update,
                ("Account", "a-1"),
                None,
                ChangeType::Modified,
                "Status",
                "Ben Keller",
                at(3, 11),
            ),
        ])
        .await;

    seeded
}

fn history_router(
    repository: InMemoryEntityChangeRepository,
    permissions: Vec<Permission>,
) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://brokerdesk@localhost/brokerdesk")
        .unwrap_or_else(|error| panic!("lazy pool should build: {error}"));
    let mut state = build_app_state(pool, AuthSettings::default());
    state.entity_change_service = EntityChangeService::new(
        Arc::new(repository),
        AuthorizationService::new(Arc::new(FixedPermissions(permissions))),
    );

    let actor = UserIdentity::new(Uuid::new_v4(), "auditor", "Desk Auditor");

    Router::new()
        .route("/entity-changes", get(entity_history_handler))
        .route("/entity-changes/all", get(change_feed_handler))
        .layer(Extension(actor))
        .with_state(state)
}

async fn seeded_router() -> (Router, SeededHistory) {
    let repository = InMemoryEntityChangeRepository::new();
    let seeded = seed(&repository).await;
    (
        history_router(repository, vec![Permission::AuditChangesRead]),
        seeded,
    )
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_else(|error| panic!("request should build: {error}"));
    let response = router
        .oneshot(request)
        .await
        .unwrap_or_else(|error| panic!("router should respond: {error}"));

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|error| panic!("body should read: {error}"));
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn operation_ids(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap_or_else(|| panic!("items should be an array: {body}"))
        .iter()
        .map(|item| item["operationId"].as_str().unwrap_or_default().to_owned())
        .collect()
}

#[tokio::test]
async fn entity_history_returns_paged_envelope_newest_first() {
    let (router, seeded) = seeded_router().await;

    let (status, body) = get_json(
        router,
        "/entity-changes?entityType=Client&entityId=c-1&page=1&pageSize=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let mut keys: Vec<_> = body
        .as_object()
        .unwrap_or_else(|| panic!("envelope should be an object: {body}"))
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, ["items", "page", "pageSize", "totalCount", "totalPages"]);
    assert_eq!(body["totalCount"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageSize"], 1);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(operation_ids(&body), [seeded.onboarding.to_string()]);
    assert_eq!(body["items"][0]["changeType"], "Created");
}

#[tokio::test]
async fn entity_history_second_page_holds_the_older_operation() {
    let (router, seeded) = seeded_router().await;

    let (status, body) = get_json(
        router,
        "/entity-changes?entityType=Client&entityId=c-1&page=2&pageSize=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(operation_ids(&body), [seeded.address_removal.to_string()]);
    let groups = body["items"][0]["groups"]
        .as_array()
        .unwrap_or_else(|| panic!("groups should be an array: {body}"));
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["relatedEntityId"], Value::Null);
    assert_eq!(groups[1]["relatedEntityId"], "addr-2");
    assert_eq!(groups[1]["changeType"], "Deleted");
    assert_eq!(body["items"][0]["changeType"], "Modified");
}

#[tokio::test]
async fn change_feed_filters_whole_operations_by_change_type() {
    let (router, seeded) = seeded_router().await;

    let (status, body) = get_json(router, "/entity-changes/all?changeType=Deleted").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(operation_ids(&body), [seeded.address_removal.to_string()]);
    assert_eq!(body["items"][0]["groups"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn change_feed_filters_by_time_window() {
    let (router, seeded) = seeded_router().await;

    let (status, body) = get_json(
        router,
        "/entity-changes/all?from=2026-03-02T00:00:00Z&to=2026-03-03T10:59:59Z",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(operation_ids(&body), [seeded.onboarding.to_string()]);
}

#[tokio::test]
async fn change_feed_sorts_by_requested_field() {
    let (router, seeded) = seeded_router().await;

    let (status, body) = get_json(router.clone(), "/entity-changes/all?sort=userName").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        operation_ids(&body),
        [
            seeded.address_removal.to_string(),
            seeded.account_update.to_string(),
            seeded.onboarding.to_string(),
        ]
    );

    let (status, body) = get_json(router.clone(), "/entity-changes/all?sort=-userName").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        operation_ids(&body),
        [
            seeded.onboarding.to_string(),
            seeded.account_update.to_string(),
            seeded.address_removal.to_string(),
        ]
    );

    let (status, body) = get_json(router, "/entity-changes/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        operation_ids(&body),
        [
            seeded.account_update.to_string(),
            seeded.onboarding.to_string(),
            seeded.address_removal.to_string(),
        ]
    );
}

#[tokio::test]
async fn change_feed_rejects_invalid_queries() {
    let (router, _) = seeded_router().await;

    for uri in [
        "/entity-changes/all?sort=fieldName",
        "/entity-changes/all?changeType=Renamed",
        "/entity-changes/all?from=2026-03-03T00:00:00Z&to=2026-03-01T00:00:00Z",
    ] {
        let (status, _) = get_json(router.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn history_requires_change_read_permission() {
    let repository = InMemoryEntityChangeRepository::new();
    seed(&repository).await;
    let router = history_router(repository, vec![Permission::ClientsRead]);

    let (status, _) = get_json(router.clone(), "/entity-changes/all").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get_json(router, "/entity-changes?entityType=Client&entityId=c-1").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
