//! In-memory platform implementation and helpers shared by the unit and
//! integration test suites. Not wired into the production binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::auth::Claims;
use crate::platform::{FeedStatus, Platform, PlatformError, Subscription, SubscriptionGuard};
use crate::state::AppState;
use crate::types::{Document, Note, Profile, Role};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// Mint a platform-style access token for tests.
pub fn mint_token(user_id: Uuid, email: &str) -> String {
    let claims = Claims {
        sub: user_id,
        email: Some(email.to_string()),
        role: Some("authenticated".to_string()),
        exp: (Utc::now() + ChronoDuration::hours(1)).timestamp(),
        iat: Some(Utc::now().timestamp()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("mint test token")
}

/// Application state wired to a fake platform.
pub fn test_state(platform: Arc<FakePlatform>) -> AppState {
    AppState {
        platform,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        reset_redirect_url: "http://localhost:3000/reset-password".to_string(),
        subscribe_timeout: Duration::from_secs(2),
    }
}

struct FeedHandle {
    document_id: Uuid,
    events: mpsc::Sender<Note>,
    status: watch::Sender<FeedStatus>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<Uuid, Profile>,
    documents: HashMap<Uuid, Document>,
    notes: Vec<Note>,
    pings: Vec<DateTime<Utc>>,
    objects: Vec<String>,
    invited: Vec<String>,
    reset_mails: Vec<String>,
    feeds: Vec<FeedHandle>,
    note_counter: i64,

    // Failure / behavior toggles
    feed_down: bool,
    fail_storage_remove: bool,
    fail_row_delete: bool,
    fail_note_list: bool,
    reject_note_insert: bool,
    fail_ping_store: bool,
    fail_invite: Option<String>,
}

/// In-memory `Platform`: rows, objects, auth calls and a drivable
/// change-feed, with per-operation failure switches.
#[derive(Default)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake platform poisoned")
    }

    // --- seeding ---

    pub fn seed_profile(&self, email: &str, company: Option<&str>, role: Role) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            company_name: company.map(str::to_string),
            role,
            created_at: Utc::now(),
            email_confirmed_at: Some(Utc::now()),
        };
        self.lock().profiles.insert(profile.id, profile.clone());
        profile
    }

    pub fn seed_admin(&self, email: &str) -> Profile {
        self.seed_profile(email, Some("Maury"), Role::Admin)
    }

    pub fn seed_customer(&self, email: &str, company: &str) -> Profile {
        self.seed_profile(email, Some(company), Role::Customer)
    }

    pub fn seed_document(&self, owner: &Profile, name: &str) -> Document {
        let id = Uuid::new_v4();
        let document = Document {
            id,
            user_id: owner.id,
            name: name.to_string(),
            file_path: format!("{}/{}", owner.id, name),
            month: 3,
            year: 2025,
            size: 1024,
            created_at: Utc::now(),
        };
        let mut inner = self.lock();
        inner.objects.push(document.file_path.clone());
        inner.documents.insert(id, document.clone());
        document
    }

    // --- inspection ---

    pub fn has_object(&self, path: &str) -> bool {
        self.lock().objects.iter().any(|p| p == path)
    }

    pub fn has_document_row(&self, id: Uuid) -> bool {
        self.lock().documents.contains_key(&id)
    }

    pub fn invited_emails(&self) -> Vec<String> {
        self.lock().invited.clone()
    }

    pub fn reset_mails(&self) -> Vec<String> {
        self.lock().reset_mails.clone()
    }

    // --- failure toggles ---

    pub fn set_fail_storage_remove(&self, fail: bool) {
        self.lock().fail_storage_remove = fail;
    }

    pub fn set_fail_row_delete(&self, fail: bool) {
        self.lock().fail_row_delete = fail;
    }

    pub fn set_fail_note_list(&self, fail: bool) {
        self.lock().fail_note_list = fail;
    }

    pub fn set_reject_note_insert(&self, reject: bool) {
        self.lock().reject_note_insert = reject;
    }

    pub fn set_fail_ping_store(&self, fail: bool) {
        self.lock().fail_ping_store = fail;
    }

    pub fn set_fail_invite(&self, message: Option<&str>) {
        self.lock().fail_invite = message.map(str::to_string);
    }

    // --- feed control ---

    /// Simulate a server-initiated feed drop: subscriptions go
    /// `Disconnected` and inserts stop being pushed.
    pub fn sever_feeds(&self) {
        let mut inner = self.lock();
        inner.feed_down = true;
        for feed in &inner.feeds {
            let _ = feed.status.send(FeedStatus::Disconnected);
        }
    }

    /// Bring the feed back; subscriptions go `Live` again.
    pub fn restore_feeds(&self) {
        let mut inner = self.lock();
        inner.feed_down = false;
        for feed in &inner.feeds {
            let _ = feed.status.send(FeedStatus::Live);
        }
    }

    /// Push a feed event without touching the row store (for exercising
    /// dedupe against the snapshot).
    pub async fn push_feed_event(&self, note: Note) {
        let targets: Vec<mpsc::Sender<Note>> = {
            let inner = self.lock();
            inner
                .feeds
                .iter()
                .filter(|f| f.document_id == note.document_id)
                .map(|f| f.events.clone())
                .collect()
        };
        for sender in targets {
            let _ = sender.send(note.clone()).await;
        }
    }

    fn next_note_time(inner: &mut Inner) -> DateTime<Utc> {
        inner.note_counter += 1;
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(inner.note_counter)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn invite_by_email(&self, email: &str) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if let Some(message) = inner.fail_invite.clone() {
            return Err(PlatformError::Status {
                status: 422,
                message,
            });
        }
        inner.invited.push(email.to_string());
        Ok(())
    }

    async fn update_password(
        &self,
        _access_token: &str,
        _new_password: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn send_password_reset(
        &self,
        email: &str,
        _redirect_to: &str,
    ) -> Result<(), PlatformError> {
        self.lock().reset_mails.push(email.to_string());
        Ok(())
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, PlatformError> {
        Ok(self.lock().profiles.get(&id).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Profile>, PlatformError> {
        let mut customers: Vec<Profile> = self
            .lock()
            .profiles
            .values()
            .filter(|p| p.role != Role::Admin)
            .cloned()
            .collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(customers)
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>, PlatformError> {
        let mut documents: Vec<Document> = self
            .lock()
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn fetch_document(&self, id: Uuid) -> Result<Option<Document>, PlatformError> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn delete_document_row(&self, id: Uuid) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_row_delete {
            return Err(PlatformError::Status {
                status: 500,
                message: "row delete failed".to_string(),
            });
        }
        inner.documents.remove(&id);
        Ok(())
    }

    async fn list_notes(&self, document_id: Uuid) -> Result<Vec<Note>, PlatformError> {
        let inner = self.lock();
        if inner.fail_note_list {
            return Err(PlatformError::Status {
                status: 500,
                message: "note list failed".to_string(),
            });
        }
        let mut notes: Vec<Note> = inner
            .notes
            .iter()
            .filter(|n| n.document_id == document_id)
            .cloned()
            .collect();
        notes.sort_by_key(Note::sort_key);
        Ok(notes)
    }

    async fn insert_note(
        &self,
        document_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> Result<(), PlatformError> {
        let (note, targets) = {
            let mut inner = self.lock();
            if inner.reject_note_insert {
                return Err(PlatformError::PolicyRejected(
                    "note insert refused".to_string(),
                ));
            }
            let note = Note {
                id: Uuid::new_v4(),
                document_id,
                content: content.to_string(),
                author_id,
                created_at: Self::next_note_time(&mut inner),
            };
            inner.notes.push(note.clone());
            let targets: Vec<mpsc::Sender<Note>> = if inner.feed_down {
                Vec::new()
            } else {
                inner
                    .feeds
                    .iter()
                    .filter(|f| f.document_id == document_id)
                    .map(|f| f.events.clone())
                    .collect()
            };
            (note, targets)
        };

        for sender in targets {
            let _ = sender.send(note.clone()).await;
        }
        Ok(())
    }

    async fn pinged_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, PlatformError> {
        let inner = self.lock();
        if inner.fail_ping_store {
            return Err(PlatformError::Status {
                status: 500,
                message: "ping store unavailable".to_string(),
            });
        }
        Ok(inner.pings.iter().any(|t| *t >= from && *t < to))
    }

    async fn insert_ping(&self, _source: &str) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_ping_store {
            return Err(PlatformError::Status {
                status: 500,
                message: "ping store unavailable".to_string(),
            });
        }
        inner.pings.push(Utc::now());
        Ok(())
    }

    async fn remove_object(&self, path: &str) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_storage_remove {
            return Err(PlatformError::Status {
                status: 500,
                message: "storage remove failed".to_string(),
            });
        }
        inner.objects.retain(|p| p != path);
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u32) -> Result<String, PlatformError> {
        if !self.has_object(path) {
            return Err(PlatformError::NotFound(format!("object {}", path)));
        }
        Ok(format!(
            "https://storage.test/sign/{}?expires={}",
            path, ttl_secs
        ))
    }

    async fn subscribe_notes(&self, document_id: Uuid) -> Result<Subscription, PlatformError> {
        let (event_tx, event_rx) = mpsc::channel(64);
        let initial = if self.lock().feed_down {
            FeedStatus::Connecting
        } else {
            FeedStatus::Live
        };
        let (status_tx, status_rx) = watch::channel(initial);

        self.lock().feeds.push(FeedHandle {
            document_id,
            events: event_tx,
            status: status_tx,
        });

        Ok(Subscription::new(
            event_rx,
            status_rx,
            SubscriptionGuard::detached(),
        ))
    }

    async fn health_check(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}
