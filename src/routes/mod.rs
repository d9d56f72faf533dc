//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the RPC procedures, the streaming relay, the transcript page and a
//! health probe under one Axum router. CORS is open because credentials
//! travel as bearer tokens; request spans come from `TraceLayer`.

pub mod auth;
pub mod relay;
pub mod rpc;
pub mod transcript;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/rpc/getSessions", get(rpc::get_sessions))
        .route("/api/rpc/createSession", post(rpc::create_session))
        .route("/api/rpc/deleteSession", post(rpc::delete_session))
        .route("/api/rpc/deleteAllSessions", post(rpc::delete_all_sessions))
        .route("/api/rpc/getSessionMessages", post(rpc::get_session_messages))
        .route("/api/rpc/addMessage", post(rpc::add_message))
        .route("/relay", get(relay::relay))
        .route("/sessions/{id}", get(transcript::transcript_page))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
