use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post, put},
};

/// Admin Router Module
///
/// Moderation endpoints. These live at their natural resource paths rather
/// than under an `/admin` prefix because the client calls them from the same
/// pages as the user-facing actions; the moderator role check happens inside
/// each handler after the authentication layer has run.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // PUT /posts/{id}
        // Partial edit of a post's moderatable fields.
        .route("/posts/{id}", put(handlers::update_post))
        // POST /posts/{id}/moderate
        // Sets the moderation status (approved / rejected / pending).
        .route("/posts/{id}/moderate", post(handlers::moderate_post))
        // POST /posts/{id}/pin
        .route("/posts/{id}/pin", post(handlers::pin_post))
        // POST /marketplace/{id}/approve
        // Approves a pending marketplace listing.
        .route("/marketplace/{id}/approve", post(handlers::approve_listing))
        // DELETE /marketplace/{id}
        .route("/marketplace/{id}", delete(handlers::delete_listing))
}
