use brokerdesk_application::{AuthService, BootstrapAdmin};
use brokerdesk_core::AppError;
use tracing::info;

/// Ensures the configured administrator exists and holds the seeded role.
pub async fn ensure_bootstrap_admin(
    auth_service: &AuthService,
    admin: Option<&BootstrapAdmin>,
) -> Result<(), AppError> {
    let Some(admin) = admin else {
        return Ok(());
    };

    if auth_service.ensure_bootstrap_admin(admin).await? {
        info!(username = %admin.username, "bootstrap administrator ensured");
    }

    Ok(())
}
