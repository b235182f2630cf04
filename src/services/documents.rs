use thiserror::Error;
use uuid::Uuid;

use crate::platform::{Platform, PlatformError};
use crate::types::Document;

/// Signed download URLs expire after one minute unless the caller says
/// otherwise.
pub const DEFAULT_URL_TTL_SECS: u32 = 60;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Admin-side document operations. The storage path always comes from the
/// document row, never from the client.
pub struct DocumentLifecycle;

impl DocumentLifecycle {
    /// Delete a document: storage object first, then the row.
    ///
    /// The order is fixed. If storage removal fails the row is left
    /// intact and the document stays listed, which is a consistent state.
    /// If the row delete fails after the object is gone, the store is
    /// inconsistent (dangling row, deleted file); that case is logged
    /// loudly and surfaced, with no rollback available.
    pub async fn delete(platform: &dyn Platform, document_id: Uuid) -> Result<(), DocumentError> {
        let document = platform
            .fetch_document(document_id)
            .await?
            .ok_or(DocumentError::NotFound)?;

        platform.remove_object(&document.file_path).await?;

        if let Err(e) = platform.delete_document_row(document_id).await {
            tracing::error!(
                document_id = %document_id,
                file_path = %document.file_path,
                "row delete failed after storage removal; row now dangles: {}", e
            );
            return Err(e.into());
        }

        tracing::info!(document_id = %document_id, "document deleted");
        Ok(())
    }

    /// Time-limited signed URL for a document's stored object.
    pub async fn issue_download_url(
        platform: &dyn Platform,
        document_id: Uuid,
        ttl_secs: u32,
    ) -> Result<String, DocumentError> {
        let document = platform
            .fetch_document(document_id)
            .await?
            .ok_or(DocumentError::NotFound)?;

        let url = platform
            .create_signed_url(&document.file_path, ttl_secs)
            .await?;
        Ok(url)
    }

    /// A customer's documents, newest first.
    pub async fn list_for_customer(
        platform: &dyn Platform,
        user_id: Uuid,
    ) -> Result<Vec<Document>, DocumentError> {
        Ok(platform.list_documents(user_id).await?)
    }
}
