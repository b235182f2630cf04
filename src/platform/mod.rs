// Typed client surface for the hosted backend platform.
//
// Everything durable lives behind this seam: auth users (GoTrue), rows
// (PostgREST), file objects (storage), and the row-insert change-feed
// (realtime websocket). Handlers and services only ever see the `Platform`
// trait, constructed once in `main` and passed through application state;
// tests substitute an in-memory implementation.

pub mod error;
pub mod query;
pub mod realtime;
pub mod supabase;

pub use error::PlatformError;
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::types::{Document, Note, Profile};

/// Liveness of an open change-feed subscription, published alongside the
/// event stream so callers can expose a degraded state instead of letting
/// the feed die silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Connection or (re)join in progress; nothing confirmed yet.
    Connecting,
    /// The platform confirmed the subscription; events are flowing.
    Live,
    /// The feed dropped; a reconnect with backoff is underway.
    Disconnected,
}

/// Handle owning the background task behind a subscription. Dropping the
/// guard tears the feed down; no event is delivered afterwards.
pub struct SubscriptionGuard {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionGuard {
    pub fn new(shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    /// Guard with no backing task (used by in-process feeds in tests).
    pub fn detached() -> Self {
        Self {
            shutdown: None,
            task: None,
        }
    }

    fn shutdown_now(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            // Receiver may already be gone if the task exited on its own
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.shutdown_now();
    }
}

/// One live change-feed subscription, scoped to a single document's note
/// inserts. Owned exclusively by the session that opened it.
pub struct Subscription {
    events: mpsc::Receiver<Note>,
    status: watch::Receiver<FeedStatus>,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(
        events: mpsc::Receiver<Note>,
        status: watch::Receiver<FeedStatus>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self {
            events,
            status,
            guard,
        }
    }

    /// Current feed status without waiting.
    pub fn status(&self) -> FeedStatus {
        *self.status.borrow()
    }

    /// Wait until the platform confirms the subscription. Returns `false`
    /// if the feed closed before ever confirming.
    pub async fn confirmed(&mut self) -> bool {
        loop {
            let current = *self.status.borrow_and_update();
            match current {
                FeedStatus::Live => return true,
                _ => {
                    if self.status.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    /// Split into the raw parts the merge loop selects over. The guard
    /// must be kept alive for as long as events are wanted.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<Note>,
        watch::Receiver<FeedStatus>,
        SubscriptionGuard,
    ) {
        (self.events, self.status, self.guard)
    }

    /// Tear the subscription down synchronously with session end.
    pub fn close(mut self) {
        self.guard.shutdown_now();
    }
}

/// The full collaborator surface this portal consumes from the hosted
/// platform. One implementation speaks the real wire protocols
/// (`SupabaseClient`); tests use `testing::FakePlatform`.
#[async_trait]
pub trait Platform: Send + Sync {
    // --- identity / session store ---

    /// Create a pending auth user and send the invitation mail.
    async fn invite_by_email(&self, email: &str) -> Result<(), PlatformError>;

    /// Change the password of the user owning `access_token`.
    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), PlatformError>;

    /// Trigger the password-recovery mail.
    async fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), PlatformError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), PlatformError>;

    // --- relational store ---

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, PlatformError>;

    /// All non-admin profiles, newest first.
    async fn list_customers(&self) -> Result<Vec<Profile>, PlatformError>;

    /// A customer's documents, newest first.
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, PlatformError>;

    async fn fetch_document(&self, id: Uuid) -> Result<Option<Document>, PlatformError>;

    /// Remove the document row only; the storage object is handled
    /// separately by `DocumentLifecycle`.
    async fn delete_document_row(&self, id: Uuid) -> Result<(), PlatformError>;

    /// Snapshot fetch of a document's notes, `created_at` ascending.
    async fn list_notes(&self, document_id: Uuid) -> Result<Vec<Note>, PlatformError>;

    async fn insert_note(
        &self,
        document_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<(), PlatformError>;

    /// Whether a heartbeat row exists with `created_at` in `[from, to)`.
    async fn pinged_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, PlatformError>;

    async fn insert_ping(&self, source: &str) -> Result<(), PlatformError>;

    // --- object storage ---

    async fn remove_object(&self, path: &str) -> Result<(), PlatformError>;

    /// Time-limited signed URL granting read access to a stored object.
    async fn create_signed_url(&self, path: &str, ttl_secs: u32) -> Result<String, PlatformError>;

    // --- change-feed ---

    /// Subscribe to row-inserted events for one document's notes.
    async fn subscribe_notes(&self, document_id: Uuid) -> Result<Subscription, PlatformError>;

    // --- diagnostics ---

    /// Cheap reachability probe for the /health endpoint.
    async fn health_check(&self) -> Result<(), PlatformError>;
}
