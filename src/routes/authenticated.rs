use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Authenticated Router Module
///
/// Defines the routes available to any signed-in user: posting, commenting,
/// the like/save/RSVP toggles, media upload, and checkout initiation.
///
/// Access Control Strategy:
/// Every route here sits behind the `auth_middleware` layer applied in
/// `create_router`, so handlers always receive a validated `AuthUser`.
/// Owner-only rules (post deletion) are enforced inside the handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /posts
        // Creates a post, preferring the database procedure when present.
        .route("/posts", post(handlers::create_post))
        // DELETE /posts/{id}
        // Deletes a post. Owner-or-moderator check inside the handler.
        .route("/posts/{id}", delete(handlers::delete_post))
        // POST /posts/{id}/like, POST /posts/{id}/save
        // Per-user toggles; each response carries the state after the flip.
        .route("/posts/{id}/like", post(handlers::toggle_post_like))
        .route("/posts/{id}/save", post(handlers::toggle_post_save))
        // POST /posts/{id}/comments
        // Adds a comment, optionally threaded under a parent.
        .route("/posts/{id}/comments", post(handlers::add_comment))
        // POST /comments/{id}/like
        .route("/comments/{id}/like", post(handlers::toggle_comment_like))
        // POST /events/{id}/like, POST /events/{id}/rsvp
        // Event toggles. RSVP clears when the current status is resubmitted.
        .route("/events/{id}/like", post(handlers::toggle_event_like))
        .route("/events/{id}/rsvp", post(handlers::rsvp_event))
        // POST /storage/signed-upload
        // Issues a signed upload token so the client uploads directly to
        // storage, bypassing this server.
        .route("/storage/signed-upload", post(handlers::signed_upload))
        // POST /stripe/create-checkout, POST /stripe/create-offer-checkout
        // Hosted checkout initiation. All validation runs before the
        // provider is called.
        .route("/stripe/create-checkout", post(handlers::create_checkout))
        .route(
            "/stripe/create-offer-checkout",
            post(handlers::create_offer_checkout),
        )
}
