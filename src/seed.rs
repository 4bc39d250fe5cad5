use tracing::info;

use crate::auth::password::hash_password;
use crate::state::AppState;
use crate::users::repo::{self, Role};

/// Creates the bootstrap admin account from ADMIN_EMAIL / ADMIN_PASSWORD.
/// Skipped when no password is configured or the account already exists.
pub async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let Some(password) = state.config.admin_password.as_deref() else {
        return Ok(());
    };

    let email = state.config.admin_email.to_lowercase();
    if repo::find_by_email(&state.db, &email).await?.is_some() {
        return Ok(());
    }

    let hash = hash_password(password)?;
    let admin = repo::create(&state.db, "Administrator", &email, "", &hash, Role::Admin).await?;
    info!(admin_id = %admin.id, %email, "bootstrap admin created");
    Ok(())
}
