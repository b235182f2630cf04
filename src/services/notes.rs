// NoteChannel: a live, chronologically-ordered view of one document's
// notes, merging a point-in-time snapshot with the platform change-feed.
//
// Ordering contract: the published list is always sorted by
// (created_at, id), never shrinks, and never contains a duplicate id.
// The subscription is confirmed *before* the snapshot is read, so an
// insert landing in between is delivered by the feed and absorbed by the
// id-keyed merge instead of being lost.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::Principal;
use crate::platform::{FeedStatus, Platform, PlatformError, SubscriptionGuard};
use crate::types::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Feed is down; the list may be stale while the reconnect runs.
    Disconnected,
    /// Feed is back but the catch-up snapshot is still in flight.
    Syncing,
    /// Subscription confirmed and snapshot applied.
    Live,
}

/// State published to session observers after every accepted change.
#[derive(Debug, Clone, Serialize)]
pub struct NoteListState {
    pub notes: Vec<Note>,
    pub status: ChannelStatus,
}

#[derive(Debug, Error)]
pub enum NoteChannelError {
    #[error("no authenticated principal")]
    Unauthenticated,
    #[error("note content is empty")]
    EmptyContent,
    #[error("insert refused by policy: {0}")]
    Rejected(String),
    #[error("subscription was not confirmed in time")]
    SubscribeTimeout,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub struct NoteChannel;

impl NoteChannel {
    /// Begin a session scoped to one document.
    ///
    /// Order matters: subscribe, wait for confirmation, then snapshot.
    /// A failed open tears its own subscription down before returning, so
    /// re-invoking open after a transient failure leaks nothing.
    pub async fn open(
        platform: Arc<dyn Platform>,
        document_id: Uuid,
        subscribe_timeout: Duration,
    ) -> Result<NoteSession, NoteChannelError> {
        let mut subscription = platform.subscribe_notes(document_id).await?;

        match tokio::time::timeout(subscribe_timeout, subscription.confirmed()).await {
            Ok(true) => {}
            Ok(false) => {
                subscription.close();
                return Err(NoteChannelError::Platform(PlatformError::Realtime(
                    "feed closed before confirming".to_string(),
                )));
            }
            Err(_) => {
                subscription.close();
                return Err(NoteChannelError::SubscribeTimeout);
            }
        }

        let snapshot = match platform.list_notes(document_id).await {
            Ok(notes) => notes,
            Err(e) => {
                subscription.close();
                return Err(e.into());
            }
        };

        let mut merge = MergeState::default();
        merge.merge_all(snapshot);
        let (state_tx, state_rx) = watch::channel(merge.render(ChannelStatus::Live));

        let (events, status, guard) = subscription.into_parts();
        let task = tokio::spawn(merge_loop(
            platform.clone(),
            document_id,
            events,
            status,
            state_tx,
            merge,
        ));

        Ok(NoteSession {
            platform,
            document_id,
            state: state_rx,
            guard: Some(guard),
            task: Some(task),
        })
    }
}

/// One open NoteChannel session. Owns the subscription exclusively; no
/// other component touches the feed.
pub struct NoteSession {
    platform: Arc<dyn Platform>,
    document_id: Uuid,
    state: watch::Receiver<NoteListState>,
    guard: Option<SubscriptionGuard>,
    task: Option<JoinHandle<()>>,
}

impl NoteSession {
    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    /// Observer handle. Yields the current state immediately and then a
    /// new value after every accepted change or status transition.
    pub fn state(&self) -> watch::Receiver<NoteListState> {
        self.state.clone()
    }

    /// Insert a note authored by the current principal. Success does not
    /// mutate local state; the new note arrives through the feed. No
    /// automatic retry on failure.
    pub async fn append(
        &self,
        principal: Option<&Principal>,
        content: &str,
    ) -> Result<(), NoteChannelError> {
        append_note(self.platform.as_ref(), self.document_id, principal, content).await
    }

    /// Release the subscription. No event is delivered after this
    /// returns; observers see the watch channel close.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Stop publication first, then tear the feed down
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.guard.take();
    }
}

impl Drop for NoteSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Append one note authored by `principal`. Shared by the session API and
/// the plain POST handler; both go through the same validation and error
/// mapping.
pub async fn append_note(
    platform: &dyn Platform,
    document_id: Uuid,
    principal: Option<&Principal>,
    content: &str,
) -> Result<(), NoteChannelError> {
    let principal = principal.ok_or(NoteChannelError::Unauthenticated)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(NoteChannelError::EmptyContent);
    }

    platform
        .insert_note(document_id, principal.id, content)
        .await
        .map_err(|e| match e {
            PlatformError::PolicyRejected(msg) => NoteChannelError::Rejected(msg),
            other => NoteChannelError::Platform(other),
        })
}

async fn merge_loop(
    platform: Arc<dyn Platform>,
    document_id: Uuid,
    mut events: tokio::sync::mpsc::Receiver<Note>,
    mut feed_status: watch::Receiver<FeedStatus>,
    state_tx: watch::Sender<NoteListState>,
    mut merge: MergeState,
) {
    let mut status = ChannelStatus::Live;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(note) => {
                    if merge.insert(note) {
                        let _ = state_tx.send(merge.render(status));
                    }
                }
                None => {
                    let _ = state_tx.send(merge.render(ChannelStatus::Disconnected));
                    break;
                }
            },
            changed = feed_status.changed() => {
                if changed.is_err() {
                    let _ = state_tx.send(merge.render(ChannelStatus::Disconnected));
                    break;
                }
                let current = *feed_status.borrow_and_update();
                match current {
                    FeedStatus::Connecting | FeedStatus::Disconnected => {
                        status = ChannelStatus::Disconnected;
                        let _ = state_tx.send(merge.render(status));
                    }
                    FeedStatus::Live => {
                        // Resubscribed after a drop: re-issue the snapshot
                        // to cover inserts made while the feed was down.
                        // The keyed merge absorbs the overlap.
                        status = ChannelStatus::Syncing;
                        let _ = state_tx.send(merge.render(status));
                        match platform.list_notes(document_id).await {
                            Ok(snapshot) => {
                                merge.merge_all(snapshot);
                                status = ChannelStatus::Live;
                                let _ = state_tx.send(merge.render(status));
                            }
                            Err(e) => {
                                tracing::warn!(
                                    document_id = %document_id,
                                    "gap snapshot after resubscribe failed: {}", e
                                );
                                // Feed is live again but the gap is not
                                // proven closed; stay degraded until the
                                // next successful snapshot.
                                status = ChannelStatus::Disconnected;
                                let _ = state_tx.send(merge.render(status));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Ordered, duplicate-free accumulation of notes. Merge is keyed by note
/// id with position chosen by (created_at, id), never append-at-end.
#[derive(Default)]
struct MergeState {
    notes: Vec<Note>,
    seen: HashSet<Uuid>,
}

impl MergeState {
    /// Insert one note; returns false on a duplicate id.
    fn insert(&mut self, note: Note) -> bool {
        if !self.seen.insert(note.id) {
            return false;
        }
        let position = self
            .notes
            .binary_search_by_key(&note.sort_key(), Note::sort_key)
            .unwrap_or_else(|pos| pos);
        self.notes.insert(position, note);
        true
    }

    /// Merge a whole snapshot; returns true if anything new appeared.
    fn merge_all(&mut self, notes: Vec<Note>) -> bool {
        let mut changed = false;
        for note in notes {
            changed |= self.insert(note);
        }
        changed
    }

    fn render(&self, status: ChannelStatus) -> NoteListState {
        NoteListState {
            notes: self.notes.clone(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn note_at(seconds: i64) -> Note {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Note {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            content: format!("note at +{}s", seconds),
            author_id: Uuid::new_v4(),
            created_at: base + ChronoDuration::seconds(seconds),
        }
    }

    fn is_sorted(notes: &[Note]) -> bool {
        notes.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key())
    }

    #[test]
    fn merge_keeps_sorted_order_for_out_of_order_events() {
        let mut merge = MergeState::default();
        merge.insert(note_at(10));
        merge.insert(note_at(30));
        // Late event with an earlier timestamp must not land at the end
        merge.insert(note_at(20));

        let state = merge.render(ChannelStatus::Live);
        assert_eq!(state.notes.len(), 3);
        assert!(is_sorted(&state.notes));
        assert_eq!(state.notes[1].content, "note at +20s");
    }

    #[test]
    fn duplicate_ids_are_dropped() {
        let mut merge = MergeState::default();
        let note = note_at(5);
        assert!(merge.insert(note.clone()));
        assert!(!merge.insert(note));
        assert_eq!(merge.render(ChannelStatus::Live).notes.len(), 1);
    }

    #[test]
    fn snapshot_overlap_is_idempotent() {
        let mut merge = MergeState::default();
        let a = note_at(1);
        let b = note_at(2);
        merge.merge_all(vec![a.clone(), b.clone()]);
        // Re-snapshot after reconnect repeats both and adds one
        let c = note_at(3);
        let changed = merge.merge_all(vec![a, b, c]);
        assert!(changed);

        let state = merge.render(ChannelStatus::Live);
        assert_eq!(state.notes.len(), 3);
        assert!(is_sorted(&state.notes));
    }

    #[test]
    fn length_is_non_decreasing_under_any_interleaving() {
        let mut merge = MergeState::default();
        let mut last_len = 0;
        for seconds in [7, 3, 9, 3, 1, 9] {
            let mut note = note_at(seconds);
            // Force some duplicate ids deterministically
            note.id = Uuid::from_u128(seconds as u128);
            merge.insert(note);
            let len = merge.render(ChannelStatus::Live).notes.len();
            assert!(len >= last_len);
            last_len = len;
        }
        assert_eq!(last_len, 4);
    }
}
