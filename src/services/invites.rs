use thiserror::Error;

use crate::platform::{Platform, PlatformError};

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Email is required")]
    EmptyEmail,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Admin-only invitation flow: creates a pending auth user on the
/// platform and mails the invitation link. The admin gate runs before
/// this is reached.
pub struct InviteFlow;

impl InviteFlow {
    /// On success returns the confirmation message shown to the admin.
    /// Platform failures keep the platform's own message so the admin
    /// sees it verbatim.
    pub async fn invite(platform: &dyn Platform, email: &str) -> Result<String, InviteError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(InviteError::EmptyEmail);
        }

        platform.invite_by_email(email).await?;
        tracing::info!(email = %email, "invitation sent");
        Ok(format!("Invite sent to {}", email))
    }
}
