mod common;

use axum::http::StatusCode;
use common::{InMemoryRepository, app, body_json, post_empty, post_json, token_for};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

async fn toggle(app: &axum::Router, uri: &str, token: &str) -> Value {
    let response = app
        .clone()
        .oneshot(post_empty(uri, token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn post_like_flips_on_then_off() {
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());
    let uri = format!("/posts/{post_id}/like");

    let body = toggle(&app, &uri, &token).await;
    assert_eq!(body, json!({ "liked": true }));

    let body = toggle(&app, &uri, &token).await;
    assert_eq!(body, json!({ "liked": false }));
}

#[tokio::test]
async fn post_save_uses_its_own_key() {
    let user_id = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());

    let body = toggle(&app, &format!("/posts/{post_id}/save"), &token).await;
    assert_eq!(body, json!({ "saved": true }));

    // The like state is independent of the save state.
    let body = toggle(&app, &format!("/posts/{post_id}/like"), &token).await;
    assert_eq!(body, json!({ "liked": true }));
}

#[tokio::test]
async fn likes_are_scoped_per_user() {
    let post_id = Uuid::new_v4();
    let app = app(InMemoryRepository::new());
    let uri = format!("/posts/{post_id}/like");

    let body = toggle(&app, &uri, &token_for(Uuid::new_v4())).await;
    assert_eq!(body["liked"], true);

    // A different user toggling the same post starts from scratch.
    let body = toggle(&app, &uri, &token_for(Uuid::new_v4())).await;
    assert_eq!(body["liked"], true);
}

#[tokio::test]
async fn comment_and_event_likes_toggle() {
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());

    let body = toggle(&app, &format!("/comments/{}/like", Uuid::new_v4()), &token).await;
    assert_eq!(body, json!({ "liked": true }));

    let event_uri = format!("/events/{}/like", Uuid::new_v4());
    let body = toggle(&app, &event_uri, &token).await;
    assert_eq!(body, json!({ "liked": true }));
    let body = toggle(&app, &event_uri, &token).await;
    assert_eq!(body, json!({ "liked": false }));
}

#[tokio::test]
async fn toggles_require_authentication() {
    let app = app(InMemoryRepository::new());

    let response = app
        .oneshot(post_empty(
            &format!("/posts/{}/like", Uuid::new_v4()),
            "not.a.jwt",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// --- RSVP ---

async fn rsvp(app: &axum::Router, uri: &str, token: &str, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(uri, token, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn rsvp_sets_then_clears_on_resubmit() {
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());
    let uri = format!("/events/{}/rsvp", Uuid::new_v4());

    let body = rsvp(&app, &uri, &token, json!({ "status": "going" })).await;
    assert_eq!(body, json!({ "rsvp": "going" }));

    // Resubmitting the current status clears the RSVP.
    let body = rsvp(&app, &uri, &token, json!({ "status": "going" })).await;
    assert_eq!(body, json!({ "rsvp": null }));
}

#[tokio::test]
async fn rsvp_switches_between_statuses() {
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());
    let uri = format!("/events/{}/rsvp", Uuid::new_v4());

    let body = rsvp(&app, &uri, &token, json!({ "status": "interested" })).await;
    assert_eq!(body, json!({ "rsvp": "interested" }));

    let body = rsvp(&app, &uri, &token, json!({ "status": "not_going" })).await;
    assert_eq!(body, json!({ "rsvp": "not_going" }));
}

#[tokio::test]
async fn rsvp_unknown_status_coerces_to_going() {
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());
    let uri = format!("/events/{}/rsvp", Uuid::new_v4());

    let body = rsvp(&app, &uri, &token, json!({ "status": "maybe" })).await;
    assert_eq!(body, json!({ "rsvp": "going" }));
}

#[tokio::test]
async fn rsvp_without_body_defaults_to_going() {
    let user_id = Uuid::new_v4();
    let token = token_for(user_id);
    let app = app(InMemoryRepository::new());

    let body = toggle(
        &app,
        &format!("/events/{}/rsvp", Uuid::new_v4()),
        &token,
    )
    .await;
    assert_eq!(body, json!({ "rsvp": "going" }));
}
