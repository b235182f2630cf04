/// Shared domain types used across the codebase
///
/// These mirror the rows the external platform stores for us. Referential
/// integrity between them (note -> document -> profile) is enforced by the
/// platform, never locally.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to a profile by platform policy. The portal never writes
/// this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

/// Row in the `profiles` table. Created by the platform when an invited
/// user accepts the invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub company_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Row in the `documents` table. Uploaded by customers out of band; the
/// portal only lists, signs download URLs for, and deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Storage key in the `documents` bucket.
    pub file_path: String,
    pub month: i32,
    pub year: i32,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Row in the `notes` table. Append-only; there is no update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Ordering key for the note list: `created_at` ascending, note id as
    /// the tie-breaker so concurrent authors still produce a total order.
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
    }

    #[test]
    fn profile_round_trips_from_platform_json() {
        let json = serde_json::json!({
            "id": "9a8f2c1e-0000-4000-8000-000000000001",
            "email": "cliente@acme.it",
            "company_name": "Acme Srl",
            "role": "customer",
            "created_at": "2025-03-01T10:00:00Z",
            "email_confirmed_at": null
        });
        let profile: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.role, Role::Customer);
        assert_eq!(profile.company_name.as_deref(), Some("Acme Srl"));
    }
}
