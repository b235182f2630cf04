use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::platform::Platform;
use crate::types::{Profile, Role};

/// Claims carried by platform-issued access tokens (HS256, signed with the
/// project JWT secret).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Platform-level role claim ("authenticated"); not the portal role,
    /// which lives in the profiles table.
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// The authenticated identity performing an action.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// A principal that passed the admin gate, together with the profile row
/// that proved the role.
#[derive(Clone, Debug)]
pub struct AdminPrincipal {
    pub principal: Principal,
    pub profile: Profile,
}

/// Verify a bearer token locally against the platform JWT secret.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    // Platform tokens carry an `aud` claim the portal does not care about
    validation.validate_aud = false;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid access token: {}", e))?;

    Ok(token_data.claims)
}

/// Role gate for every privileged operation. Evaluated server-side at the
/// trust boundary; a client-supplied role flag is never consulted.
pub struct AuthGate;

impl AuthGate {
    /// Admit the principal only if its profile row exists and carries the
    /// admin role.
    pub async fn check_admin(
        platform: &dyn Platform,
        principal: &Principal,
    ) -> Result<AdminPrincipal, ApiError> {
        let profile = platform
            .fetch_profile(principal.id)
            .await?
            .ok_or_else(|| ApiError::forbidden("No profile for the current session"))?;

        if profile.role != Role::Admin {
            return Err(ApiError::forbidden("Admin role required"));
        }

        Ok(AdminPrincipal {
            principal: principal.clone(),
            profile,
        })
    }
}
