use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{customers, documents, notes, ping, profile};
use crate::middleware::{require_admin, require_session};
use crate::state::AppState;

/// Assemble the full router. The platform handle travels in `AppState`;
/// nothing reaches for a global client.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/ping", get(ping::ping).post(ping::ping))
        .route("/api/auth/password-reset", post(profile::password_reset))
        // Authenticated (any role)
        .merge(session_routes(state.clone()))
        // Admin-gated
        .merge(admin_routes(state.clone()))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(profile::whoami))
        .route("/api/auth/session", delete(profile::sign_out))
        .route("/api/profile/password", put(profile::update_password))
        .layer(middleware::from_fn_with_state(state, require_session))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(customers::list))
        .route("/api/customers/invite", post(customers::invite))
        .route("/api/customers/:id", get(customers::detail))
        .route(
            "/api/documents/:id/download-url",
            post(documents::download_url),
        )
        .route("/api/documents/:id", delete(documents::delete))
        .route(
            "/api/documents/:id/notes",
            get(notes::list).post(notes::append),
        )
        .route("/api/documents/:id/notes/stream", get(notes::stream))
        .layer(middleware::from_fn_with_state(state, require_admin))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Maury Portal API",
            "version": version,
            "description": "Admin portal API for the Maury document-management platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "ping": "/api/ping (public - daily heartbeat)",
                "password_reset": "/api/auth/password-reset (public)",
                "session": "/api/auth/* (authenticated)",
                "profile": "/api/profile/password (authenticated)",
                "customers": "/api/customers[/:id] (admin)",
                "invite": "/api/customers/invite (admin)",
                "documents": "/api/documents/:id[/download-url] (admin)",
                "notes": "/api/documents/:id/notes[/stream] (admin)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.platform.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "platform": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "platform unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "platform_error": e.to_string()
                }
            })),
        ),
    }
}
