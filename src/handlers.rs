use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        AttendeeListResponse, CheckoutRequest, CheckoutResponse, CommentListResponse,
        CreateCommentRequest, CreatePostRequest, CreatedCommentResponse, CreatedPostResponse,
        EventListResponse, ModerateRequest, OfferCheckoutRequest, PinRequest, PostListResponse,
        RsvpRequest, RsvpResponse, RsvpStatus, SaveToggleResponse, SignedUploadRequest,
        SignedUploadResponse, SuccessResponse, ToggleResponse, UpdatePostRequest, ViewRequest,
    },
    payments::CheckoutSession,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

const DEFAULT_ORIGIN: &str = "http://localhost:5173";
const MINIMUM_AMOUNT: f64 = 10.0;

/// Resolves the origin the success/cancel redirects go back to.
fn request_origin(headers: &HeaderMap) -> &str {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_ORIGIN)
}

// --- Health ---

/// health
///
/// [Public Route] Liveness probe for monitoring and load balancer checks.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

/// root_health
///
/// [Public Route] Root probe, kept distinct so misrouted prefix traffic is visible.
pub async fn root_health() -> Json<Value> {
    Json(json!({ "status": "ok", "root": true, "timestamp": Utc::now() }))
}

// --- Posts ---

/// list_posts
///
/// [Public Route] Lists approved posts with resolved media URLs and the
/// author projection. Degrades through simpler query shapes when the media
/// join or the profiles join is unavailable.
#[utoipa::path(
    get,
    path = "/posts",
    responses((status = 200, description = "Approved posts", body = PostListResponse))
)]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<PostListResponse>, ApiError> {
    let rows = state.repo.fetch_posts().await?;
    let posts = rows
        .into_iter()
        .map(|row| row.into_api(&state.config.supabase_url))
        .collect();
    Ok(Json(PostListResponse { posts }))
}

/// create_post
///
/// [Authenticated Route] Creates a post. The insert goes through the database
/// procedure when available; the response hint names the path actually taken.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses((status = 200, description = "Created", body = CreatedPostResponse))
)]
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<CreatedPostResponse>, ApiError> {
    let (row, hint) = state.repo.create_post(auth.id, payload).await?;
    Ok(Json(CreatedPostResponse {
        post: row.into_api(&state.config.supabase_url),
        hint: hint.to_string(),
    }))
}

/// update_post
///
/// [Admin Route] Partial update of the allowed fields only. Anything else in
/// the payload is ignored; a payload with no recognized field is a 400.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = SuccessResponse),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    if payload.is_empty() {
        return Err(ApiError::Validation(
            "No updatable fields provided".to_string(),
        ));
    }
    state.repo.update_post(post_id, payload).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post. Moderators may delete any post; a
/// regular user only their own.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 403, description = "Not owner or moderator")
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        match state.repo.post_owner(post_id).await? {
            Some(owner) if owner == auth.id => {}
            _ => return Err(ApiError::Forbidden),
        }
    }
    state.repo.delete_post(post_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// toggle_post_like
///
/// [Authenticated Route] Flips the caller's like on a post and reports the
/// new state.
#[utoipa::path(
    post,
    path = "/posts/{id}/like",
    responses((status = 200, description = "New like state", body = ToggleResponse))
)]
pub async fn toggle_post_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let liked = state.repo.toggle_post_like(post_id, auth.id).await?;
    Ok(Json(ToggleResponse { liked }))
}

/// toggle_post_save
///
/// [Authenticated Route] Flips the caller's save on a post.
#[utoipa::path(
    post,
    path = "/posts/{id}/save",
    responses((status = 200, description = "New save state", body = SaveToggleResponse))
)]
pub async fn toggle_post_save(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<SaveToggleResponse>, ApiError> {
    let saved = state.repo.toggle_post_save(post_id, auth.id).await?;
    Ok(Json(SaveToggleResponse { saved }))
}

/// record_post_view
///
/// [Public Route] Best-effort view counter. Counter errors are logged and
/// swallowed so the user-facing action is never blocked on analytics.
#[utoipa::path(
    post,
    path = "/posts/{id}/view",
    responses((status = 200, description = "Always succeeds", body = SuccessResponse))
)]
pub async fn record_post_view(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Json<SuccessResponse> {
    if let Err(err) = state.repo.record_post_view(post_id).await {
        tracing::debug!(post_id = %post_id, error = %err, "view increment skipped");
    }
    Json(SuccessResponse::ok())
}

/// moderate_post
///
/// [Admin Route] Sets a post's moderation status.
#[utoipa::path(
    post,
    path = "/posts/{id}/moderate",
    request_body = ModerateRequest,
    responses(
        (status = 200, description = "Status updated", body = SuccessResponse),
        (status = 400, description = "Invalid status"),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn moderate_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<ModerateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    if !matches!(payload.status.as_str(), "approved" | "rejected" | "pending") {
        return Err(ApiError::Validation("Invalid status".to_string()));
    }
    state.repo.set_post_status(post_id, &payload.status).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// pin_post
///
/// [Admin Route] Pins or unpins a post.
#[utoipa::path(
    post,
    path = "/posts/{id}/pin",
    request_body = PinRequest,
    responses(
        (status = 200, description = "Pin state updated", body = SuccessResponse),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn pin_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<PinRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    state.repo.set_post_pinned(post_id, payload.pinned).await?;
    Ok(Json(SuccessResponse::ok()))
}

// --- Comments ---

/// list_comments
///
/// [Public Route] Lists a post's comments, oldest first, probing the three
/// comment-table generations in order.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    responses((status = 200, description = "Comments", body = CommentListResponse))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let comments = state.repo.fetch_comments(post_id).await?;
    Ok(Json(CommentListResponse { comments }))
}

/// add_comment
///
/// [Authenticated Route] Adds a comment, optionally threaded under a parent.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Created", body = CreatedCommentResponse),
        (status = 400, description = "Empty body")
    )
)]
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<CreatedCommentResponse>, ApiError> {
    let body = payload
        .body
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::Validation("Comment body required".to_string()))?;
    let media = Value::Array(payload.media.clone().unwrap_or_default());

    let (comment, hint) = state
        .repo
        .insert_comment(post_id, auth.id, body, payload.parent_id, &media)
        .await?;
    Ok(Json(CreatedCommentResponse {
        comment,
        hint: hint.map(str::to_string),
    }))
}

/// toggle_comment_like
///
/// [Authenticated Route] Flips the caller's like on a comment.
#[utoipa::path(
    post,
    path = "/comments/{id}/like",
    responses((status = 200, description = "New like state", body = ToggleResponse))
)]
pub async fn toggle_comment_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let liked = state.repo.toggle_comment_like(comment_id, auth.id).await?;
    Ok(Json(ToggleResponse { liked }))
}

// --- Events ---

/// list_events
///
/// [Public Route] Lists events in schedule order, falling back to creation
/// order for schemas without a schedule window.
#[utoipa::path(
    get,
    path = "/events",
    responses((status = 200, description = "Events", body = EventListResponse))
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<EventListResponse>, ApiError> {
    let events = state.repo.fetch_events().await?;
    Ok(Json(EventListResponse { events }))
}

/// toggle_event_like
///
/// [Authenticated Route] Flips the caller's like on an event.
#[utoipa::path(
    post,
    path = "/events/{id}/like",
    responses((status = 200, description = "New like state", body = ToggleResponse))
)]
pub async fn toggle_event_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let liked = state.repo.toggle_event_like(event_id, auth.id).await?;
    Ok(Json(ToggleResponse { liked }))
}

/// rsvp_event
///
/// [Authenticated Route] Sets, updates, or clears the caller's RSVP.
/// Resubmitting the current status clears it; the response always carries
/// the state after the call.
#[utoipa::path(
    post,
    path = "/events/{id}/rsvp",
    request_body = RsvpRequest,
    responses((status = 200, description = "RSVP state after the call", body = RsvpResponse))
)]
pub async fn rsvp_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    payload: Option<Json<RsvpRequest>>,
) -> Result<Json<RsvpResponse>, ApiError> {
    let requested = payload.and_then(|Json(req)| req.status);
    let status = RsvpStatus::parse_or_default(requested.as_deref());
    let rsvp = state.repo.set_rsvp(event_id, auth.id, status).await?;
    Ok(Json(RsvpResponse { rsvp }))
}

/// record_event_view
///
/// [Public Route] Best-effort view log entry with optional attribution.
#[utoipa::path(
    post,
    path = "/events/{id}/view",
    request_body = ViewRequest,
    responses((status = 200, description = "Always succeeds", body = SuccessResponse))
)]
pub async fn record_event_view(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    payload: Option<Json<ViewRequest>>,
) -> Json<SuccessResponse> {
    let ViewRequest {
        user_id,
        session_id,
    } = payload.map(|Json(req)| req).unwrap_or_default();
    if let Err(err) = state
        .repo
        .record_event_view(event_id, user_id, session_id.as_deref())
        .await
    {
        tracing::debug!(event_id = %event_id, error = %err, "event view log skipped");
    }
    Json(SuccessResponse::ok())
}

/// list_attendees
///
/// [Public Route] Lists an event's RSVPs, oldest first. A lookup failure
/// degrades to an empty list rather than failing the page.
#[utoipa::path(
    get,
    path = "/events/{id}/attendees",
    responses((status = 200, description = "Attendees", body = AttendeeListResponse))
)]
pub async fn list_attendees(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Json<AttendeeListResponse> {
    let attendees = match state.repo.fetch_attendees(event_id).await {
        Ok(attendees) => attendees,
        Err(err) => {
            tracing::warn!(event_id = %event_id, error = %err, "attendee lookup failed");
            Vec::new()
        }
    };
    Json(AttendeeListResponse { attendees })
}

// --- Storage ---

/// signed_upload
///
/// [Authenticated Route] Issues a signed upload token for a named bucket
/// after verifying the bucket exists. The client uploads directly to storage
/// with the token, bypassing this server.
#[utoipa::path(
    post,
    path = "/storage/signed-upload",
    request_body = SignedUploadRequest,
    responses(
        (status = 200, description = "Upload token", body = SignedUploadResponse),
        (status = 400, description = "Missing field or unknown bucket")
    )
)]
pub async fn signed_upload(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SignedUploadRequest>,
) -> Result<Json<SignedUploadResponse>, ApiError> {
    let (Some(bucket), Some(file_name)) = (payload.bucket, payload.file_name) else {
        return Err(ApiError::Validation(
            "bucket and file_name required".to_string(),
        ));
    };
    if !state.storage.bucket_exists(&bucket).await? {
        return Err(ApiError::Validation(format!("Bucket '{bucket}' not found")));
    }
    let signed = state.storage.create_signed_upload(&bucket, &file_name).await?;
    Ok(Json(signed))
}

// --- Marketplace moderation ---

/// approve_listing
///
/// [Admin Route] Approves a pending marketplace listing.
#[utoipa::path(
    post,
    path = "/marketplace/{id}/approve",
    responses(
        (status = 200, description = "Approved", body = SuccessResponse),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn approve_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    state.repo.approve_listing(listing_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// delete_listing
///
/// [Admin Route] Removes a marketplace listing.
#[utoipa::path(
    delete,
    path = "/marketplace/{id}",
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn delete_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if !auth.is_moderator() {
        return Err(ApiError::Forbidden);
    }
    state.repo.delete_listing(listing_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// --- Payments ---

/// create_checkout
///
/// [Authenticated Route] Opens a hosted checkout session for a wallet top-up.
/// The minimum amount is enforced before any provider call; a missing Stripe
/// key degrades to 503 rather than crashing.
#[utoipa::path(
    post,
    path = "/stripe/create-checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Session created", body = CheckoutResponse),
        (status = 400, description = "Amount below minimum"),
        (status = 503, description = "Stripe not configured")
    )
)]
pub async fn create_checkout(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let payments = state
        .payments
        .clone()
        .ok_or(ApiError::Unconfigured("Stripe"))?;

    let amount = payload.amount.unwrap_or(0.0);
    if amount < MINIMUM_AMOUNT {
        return Err(ApiError::Validation(
            "Invalid amount (minimum AED 10)".to_string(),
        ));
    }

    let origin = request_origin(&headers);
    let description = payload
        .description
        .unwrap_or_else(|| "Wallet Top-Up".to_string());

    let session_id = payments
        .create_checkout_session(CheckoutSession {
            currency: "aed".to_string(),
            product_name: description.clone(),
            product_description: format!("Add AED {amount} to your wallet"),
            product_image: None,
            unit_amount: (amount * 100.0).round() as i64,
            success_url: format!("{origin}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/wallet"),
            metadata: vec![
                ("user_id".to_string(), auth.id.to_string()),
                ("amount".to_string(), amount.to_string()),
                ("description".to_string(), description),
            ],
        })
        .await?;

    Ok(Json(CheckoutResponse { session_id }))
}

/// create_offer_checkout
///
/// [Authenticated Route] Opens a hosted checkout session for an offer
/// purchase. The offer must exist and be active, and a user can buy each
/// offer once; both checks run before the provider is called.
#[utoipa::path(
    post,
    path = "/stripe/create-offer-checkout",
    request_body = OfferCheckoutRequest,
    responses(
        (status = 200, description = "Session created", body = CheckoutResponse),
        (status = 400, description = "Invalid offer data or already purchased"),
        (status = 404, description = "Offer not found or inactive"),
        (status = 503, description = "Stripe not configured")
    )
)]
pub async fn create_offer_checkout(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OfferCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let payments = state
        .payments
        .clone()
        .ok_or(ApiError::Unconfigured("Stripe"))?;

    let amount = payload.amount.unwrap_or(0.0);
    let Some(offer_id) = payload.offer_id else {
        return Err(ApiError::Validation("Invalid offer data".to_string()));
    };
    if amount < MINIMUM_AMOUNT {
        return Err(ApiError::Validation("Invalid offer data".to_string()));
    }

    let offer = state
        .repo
        .get_offer(offer_id)
        .await?
        .filter(|offer| offer.is_active)
        .ok_or_else(|| ApiError::NotFound("Offer not found or inactive".to_string()))?;

    if state.repo.has_redemption(offer_id, auth.id).await? {
        return Err(ApiError::Validation(
            "You have already purchased this offer".to_string(),
        ));
    }

    let origin = request_origin(&headers);
    let title = payload.offer_title.unwrap_or_else(|| offer.title.clone());
    let product_image = offer
        .image_urls
        .as_ref()
        .and_then(|urls| urls.first())
        .cloned();

    let session_id = payments
        .create_checkout_session(CheckoutSession {
            currency: payload.currency.unwrap_or_else(|| "aed".to_string()),
            product_name: title.clone(),
            product_description: offer
                .description
                .unwrap_or_else(|| "Offer purchase".to_string()),
            product_image,
            unit_amount: (amount * 100.0).round() as i64,
            success_url: format!(
                "{origin}/offers?payment=success&session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{origin}/offers?payment=cancelled"),
            metadata: vec![
                ("user_id".to_string(), auth.id.to_string()),
                ("offer_id".to_string(), offer_id.to_string()),
                ("offer_title".to_string(), title),
                ("amount".to_string(), amount.to_string()),
                ("type".to_string(), "offer_purchase".to_string()),
            ],
        })
        .await?;

    Ok(Json(CheckoutResponse { session_id }))
}
