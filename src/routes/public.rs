use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are unauthenticated and accessible to any client.
/// These cover the read-only feed surfaces plus the view counters, which are
/// deliberately anonymous so article and event pages load without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health, GET /
        // Liveness probes. Both return immediately; the root variant is
        // tagged so bare-prefix traffic is easy to tell apart in logs.
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root_health))
        // GET /posts
        // The approved-post feed with resolved media and author projections.
        .route("/posts", get(handlers::list_posts))
        // GET /posts/{id}/comments
        // Comments for a single post, oldest first.
        .route("/posts/{id}/comments", get(handlers::list_comments))
        // POST /posts/{id}/view
        // Best-effort view counter. Always returns success.
        .route("/posts/{id}/view", post(handlers::record_post_view))
        // GET /events
        // Event listing in schedule order.
        .route("/events", get(handlers::list_events))
        // GET /events/{id}/attendees
        // RSVP roster for an event. Degrades to an empty list on lookup failure.
        .route("/events/{id}/attendees", get(handlers::list_attendees))
        // POST /events/{id}/view
        // Best-effort view log with optional user/session attribution.
        .route("/events/{id}/view", post(handlers::record_event_view))
}
