use thiserror::Error;
use uuid::Uuid;

use crate::platform::{Platform, PlatformError};
use crate::types::{Document, Profile};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("customer not found")]
    NotFound,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Customer directory for admins: lists customer profiles (admins are
/// excluded by the query) with an optional substring filter.
pub struct AdminDirectory;

impl AdminDirectory {
    /// All customers, newest first, optionally filtered by a
    /// case-insensitive substring over company name and email.
    pub async fn list(
        platform: &dyn Platform,
        search: Option<&str>,
    ) -> Result<Vec<Profile>, DirectoryError> {
        let profiles = platform.list_customers().await?;

        let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(profiles);
        };
        let term = term.to_lowercase();

        Ok(profiles
            .into_iter()
            .filter(|profile| {
                profile
                    .company_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&term))
                    || profile.email.to_lowercase().contains(&term)
            })
            .collect())
    }

    /// One customer's profile with their documents, newest first.
    pub async fn detail(
        platform: &dyn Platform,
        id: Uuid,
    ) -> Result<(Profile, Vec<Document>), DirectoryError> {
        let profile = platform
            .fetch_profile(id)
            .await?
            .ok_or(DirectoryError::NotFound)?;
        let documents = platform.list_documents(id).await?;
        Ok((profile, documents))
    }
}
