use std::convert::Infallible;

use axum::extract::{Extension, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::notes::{append_note, NoteChannel, NoteListState, NoteSession};
use crate::state::AppState;

/// GET /api/documents/:id/notes - point-in-time snapshot, ascending
/// created_at. Clients wanting liveness use the stream endpoint.
pub async fn list(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let notes = state.platform.list_notes(id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::success(json!({ "notes": notes })))
}

#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    #[serde(default)]
    pub content: String,
}

/// POST /api/documents/:id/notes - append a note authored by the caller.
/// The caller learns about the stored note through the live feed, not
/// from this response.
pub async fn append(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(principal): Extension<Principal>,
    axum::Json(payload): axum::Json<AppendRequest>,
) -> ApiResult<Value> {
    append_note(
        state.platform.as_ref(),
        id,
        Some(&principal),
        &payload.content,
    )
    .await?;
    Ok(ApiResponse::created(json!({ "appended": true })))
}

/// GET /api/documents/:id/notes/stream - server-sent events carrying the
/// full `NoteListState` after every change. Opening the stream opens a
/// NoteChannel session; dropping the connection closes it, which tears
/// the platform subscription down with it.
pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = NoteChannel::open(state.platform.clone(), id, state.subscribe_timeout).await?;
    let updates = session.state();

    Ok(Sse::new(note_event_stream(session, updates)).keep_alive(KeepAlive::default()))
}

struct StreamCursor {
    // Held only so the session closes when the SSE connection drops
    _session: NoteSession,
    updates: watch::Receiver<NoteListState>,
    primed: bool,
}

fn note_event_stream(
    session: NoteSession,
    updates: watch::Receiver<NoteListState>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let cursor = StreamCursor {
        _session: session,
        updates,
        primed: false,
    };

    futures::stream::unfold(cursor, |mut cursor| async move {
        if !cursor.primed {
            cursor.primed = true;
            let state = cursor.updates.borrow().clone();
            return Some((Ok(to_event(&state)), cursor));
        }

        match cursor.updates.changed().await {
            Ok(()) => {
                let state = cursor.updates.borrow_and_update().clone();
                Some((Ok(to_event(&state)), cursor))
            }
            // Session closed; end the stream
            Err(_) => None,
        }
    })
}

fn to_event(state: &NoteListState) -> Event {
    match Event::default().event("notes").json_data(state) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("failed to serialize note state: {}", e);
            Event::default().comment("serialization failure")
        }
    }
}
