mod accounts;
mod audit_logs;
mod auth;
mod clients;
mod common;
mod history;
mod instruments;
mod orders;
mod roles;
mod transactions;
mod users;

pub use accounts::{
    AccountHolderRequest, AccountHolderResponse, AccountListParams, AccountRequest,
    AccountResponse,
};
pub use audit_logs::{AuditLogEntryResponse, AuditLogListParams};
pub use auth::{LoginRequest, MeResponse, RefreshTokenRequest, TokenResponse};
pub use clients::{ClientListParams, ClientRequest, ClientResponse};
pub use common::{DeleteParams, HealthResponse, PagedResponse, required_row_version};
pub use history::{ChangeFeedParams, EntityHistoryParams, OperationHistoryResponse};
pub use instruments::{InstrumentListParams, InstrumentRequest, InstrumentResponse};
pub use orders::{OrderListParams, OrderRequest, OrderResponse};
pub use roles::{PermissionResponse, RoleListParams, RoleRequest, RoleResponse};
pub use transactions::{TransactionListParams, TransactionRequest, TransactionResponse};
pub use users::{UserListParams, UserRequest, UserResponse};
