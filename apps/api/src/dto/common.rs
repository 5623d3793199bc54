use brokerdesk_application::Paged;
use brokerdesk_core::AppError;
use brokerdesk_domain::{Provenance, RowVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Paginated list envelope.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/paged-response.ts"
)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    #[ts(type = "number")]
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    #[ts(type = "number")]
    pub total_pages: u64,
}

impl<T> PagedResponse<T> {
    pub fn from_paged<S>(paged: Paged<S>) -> Self
    where
        T: From<S>,
    {
        let paged = paged.map(T::from);
        Self {
            items: paged.items,
            total_count: paged.total_count,
            page: paged.page,
            page_size: paged.page_size,
            total_pages: paged.total_pages,
        }
    }
}

/// Concurrency token and provenance stamps shared by every record response.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/record-stamps-response.ts"
)]
pub struct RecordStampsResponse {
    #[ts(type = "number")]
    pub row_version: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl RecordStampsResponse {
    pub fn new(row_version: RowVersion, provenance: Provenance) -> Self {
        Self {
            row_version: row_version.value(),
            created_at: provenance.created_at,
            created_by: provenance.created_by,
            updated_at: provenance.updated_at,
            updated_by: provenance.updated_by,
        }
    }
}

/// Optional row-version token sent with deletes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub row_version: Option<i64>,
}

impl DeleteParams {
    pub fn row_version(&self) -> Option<RowVersion> {
        self.row_version.map(RowVersion::new)
    }
}

/// Reads the row-version token an update must carry.
pub fn required_row_version(row_version: Option<i64>) -> Result<RowVersion, AppError> {
    row_version
        .map(RowVersion::new)
        .ok_or_else(|| AppError::Validation("rowVersion is required for updates".to_owned()))
}
