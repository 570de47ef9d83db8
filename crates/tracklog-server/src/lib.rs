//! tracklog server.
//!
//! A multi-user activity log. Accounts are created and logged into over a
//! JSON API that issues signed bearer tokens; every other route, and the
//! `/ws` real-time channel, is gated on those tokens. Logged activities are
//! fanned out to WebSocket subscribers of `/topic/activities`.

pub mod activity;
pub mod auth;
pub mod config;
pub mod error;
pub mod pubsub;
pub mod registry;
pub mod routes;
pub mod state;
pub mod users;
pub mod ws;

pub use auth::{
    authenticate_request, ChannelSession, ConnectionAuthenticator, CurrentUser,
    RequestAuthenticator, SessionState,
};
pub use config::{Args, ServerConfig};
pub use error::{ApiError, ApiErrorKind, Error};
pub use state::AppState;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // The handshake has its own gate; `/ws` stays outside the request gate.
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::auth::routes())
        .merge(routes::activities::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .merge(ws::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
