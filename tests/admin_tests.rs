mod common;

use axum::http::StatusCode;
use common::{
    InMemoryRepository, app, body_json, delete, post_json, post_record, request_json, token_for,
};
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn moderate_requires_the_moderator_role() {
    let subscriber = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(subscriber, "subscriber"));

    let response = app
        .oneshot(post_json(
            &format!("/posts/{}/moderate", Uuid::new_v4()),
            &token_for(subscriber),
            &json!({ "status": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn editor_and_admin_can_moderate() {
    for role in ["editor", "admin"] {
        let moderator = Uuid::new_v4();
        let app = app(InMemoryRepository::new().with_profile(moderator, role));

        let response = app
            .oneshot(post_json(
                &format!("/posts/{}/moderate", Uuid::new_v4()),
                &token_for(moderator),
                &json!({ "status": "rejected" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "role: {role}");

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn moderate_validates_the_status_value() {
    let admin = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(admin, "admin"));

    let response = app
        .oneshot(post_json(
            &format!("/posts/{}/moderate", Uuid::new_v4()),
            &token_for(admin),
            &json!({ "status": "published" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid status");
}

#[tokio::test]
async fn pin_defaults_to_false_when_omitted() {
    let admin = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(admin, "admin"));

    let response = app
        .oneshot(post_json(
            &format!("/posts/{}/pin", Uuid::new_v4()),
            &token_for(admin),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn update_post_is_moderator_only() {
    let subscriber = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(subscriber, "subscriber"));

    let response = app
        .oneshot(request_json(
            "PUT",
            &format!("/posts/{}", Uuid::new_v4()),
            &token_for(subscriber),
            &json!({ "title": "edited" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_post_rejects_an_empty_payload() {
    let editor = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(editor, "editor"));

    // Unknown fields are ignored, so this payload carries nothing updatable.
    let response = app
        .oneshot(request_json(
            "PUT",
            &format!("/posts/{}", Uuid::new_v4()),
            &token_for(editor),
            &json!({ "view_count": 99 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "No updatable fields provided");
}

#[tokio::test]
async fn update_post_applies_allowed_fields() {
    let editor = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(editor, "editor"));

    let response = app
        .oneshot(request_json(
            "PUT",
            &format!("/posts/{}", Uuid::new_v4()),
            &token_for(editor),
            &json!({ "title": "edited", "urgency": "high" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Post deletion (owner-or-moderator) ---

#[tokio::test]
async fn owner_can_delete_their_post() {
    let owner = Uuid::new_v4();
    let record = post_record(owner);
    let post_id = record.id;
    let app = app(InMemoryRepository::new().with_post(record));

    let response = app
        .oneshot(delete(&format!("/posts/{post_id}"), &token_for(owner)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_owner_cannot_delete_a_post() {
    let record = post_record(Uuid::new_v4());
    let post_id = record.id;
    let app = app(InMemoryRepository::new().with_post(record));

    let response = app
        .oneshot(delete(
            &format!("/posts/{post_id}"),
            &token_for(Uuid::new_v4()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn moderator_can_delete_any_post() {
    let admin = Uuid::new_v4();
    let record = post_record(Uuid::new_v4());
    let post_id = record.id;
    let app = app(
        InMemoryRepository::new()
            .with_profile(admin, "admin")
            .with_post(record),
    );

    let response = app
        .oneshot(delete(&format!("/posts/{post_id}"), &token_for(admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_missing_post_is_forbidden_for_non_moderators() {
    // No owner row to match against, so the ownership check fails closed.
    let app = app(InMemoryRepository::new());

    let response = app
        .oneshot(delete(
            &format!("/posts/{}", Uuid::new_v4()),
            &token_for(Uuid::new_v4()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// --- Marketplace moderation ---

#[tokio::test]
async fn marketplace_moderation_is_gated() {
    let subscriber = Uuid::new_v4();
    let listing = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(subscriber, "subscriber"));
    let token = token_for(subscriber);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/marketplace/{listing}/approve"),
            &token,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(delete(&format!("/marketplace/{listing}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn moderators_approve_and_remove_listings() {
    let editor = Uuid::new_v4();
    let listing = Uuid::new_v4();
    let app = app(InMemoryRepository::new().with_profile(editor, "editor"));
    let token = token_for(editor);

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/marketplace/{listing}/approve"),
            &token,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(delete(&format!("/marketplace/{listing}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
