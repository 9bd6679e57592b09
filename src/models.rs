use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Profile
///
/// The user's stored profile row (`public.profiles`), as far as this layer cares:
/// the id and the role used for moderation gates.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Profile {
    pub id: Uuid,
    pub role: String,
}

// --- Posts ---

/// PostRecord
///
/// The canonical post row every fallback probe decodes into. Columns a probe
/// does not provide are selected as NULL so all probes share this one shape;
/// the alias mapping lives in the SQL, not in per-probe structs.
#[derive(Debug, Clone, FromRow)]
pub struct PostRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    // The text body has lived under both names across schema versions.
    pub content: Option<String>,
    pub body: Option<String>,
    // JSONB media references, in order of reliability: dedicated media table
    // aggregate, then the `images` column, then the `media` column.
    pub post_media: Option<Value>,
    pub images: Option<Value>,
    pub media: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub car_brand: Option<String>,
    pub car_model: Option<String>,
    pub urgency: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    // Author projection from the profiles join (absent in the bare probe).
    pub author_display_name: Option<String>,
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
    pub author_role: Option<String>,
}

/// PostAuthor
///
/// Author projection attached to each listed post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostAuthor {
    pub id: Uuid,
    pub display_name: String,
    pub username: String,
    pub avatar_url: String,
    pub role: String,
    pub verified: bool,
}

/// PostResponse
///
/// The UI-ready post shape: text collapsed to one field, media references
/// resolved to public URLs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub car_brand: Option<String>,
    pub car_model: Option<String>,
    pub urgency: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub views_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PostAuthor>,
}

impl PostRecord {
    /// Flattens the raw row into the API shape, resolving media references to
    /// public storage URLs against `storage_base` (the Supabase project URL).
    ///
    /// Image sources in priority order: the media-table aggregate (bucket+path
    /// pairs), then the `images` column, then the `media` column. Entries may
    /// be plain URL strings or objects carrying a `url` field.
    pub fn into_api(self, storage_base: &str) -> PostResponse {
        let mut images: Vec<String> = Vec::new();

        if let Some(Value::Array(rows)) = &self.post_media {
            for row in rows {
                let bucket = row
                    .get("bucket")
                    .and_then(Value::as_str)
                    .unwrap_or("community-media");
                if let Some(path) = row.get("path").and_then(Value::as_str) {
                    images.push(public_object_url(storage_base, bucket, path));
                }
            }
        }
        if images.is_empty() {
            if let Some(col) = &self.images {
                images = urls_from_media_column(col);
            }
        }
        if images.is_empty() {
            if let Some(col) = &self.media {
                images = urls_from_media_column(col);
            }
        }

        let user = self.author_username.is_some().then(|| PostAuthor {
            id: self.user_id,
            display_name: self.author_display_name.unwrap_or_default(),
            username: self.author_username.unwrap_or_default(),
            avatar_url: self.author_avatar_url.unwrap_or_default(),
            role: self.author_role.unwrap_or_else(|| "browser".to_string()),
            verified: false,
        });

        PostResponse {
            id: self.id,
            user_id: self.user_id,
            title: self.title.unwrap_or_else(|| "Untitled Post".to_string()),
            content: self.content.or(self.body).unwrap_or_default(),
            images,
            tags: self.tags.unwrap_or_default(),
            location: self.location,
            car_brand: self.car_brand,
            car_model: self.car_model,
            urgency: self.urgency,
            created_at: self.created_at,
            // View counts live in post_stats and are reconciled out-of-band.
            views_count: 0,
            user,
        }
    }
}

/// Builds the public URL for an object in a public storage bucket.
pub fn public_object_url(storage_base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        storage_base.trim_end_matches('/'),
        bucket,
        path
    )
}

/// Extracts URL strings from a JSONB media column. Entries are either plain
/// strings or objects with a `url` field; anything else is dropped.
fn urls_from_media_column(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(url) => Some(url.clone()),
                Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Maps the free-form urgency strings clients send onto the stored vocabulary.
/// Unknown values map to None rather than erroring.
pub fn normalize_urgency(raw: &str) -> Option<&'static str> {
    match raw.to_lowercase().as_str() {
        "urgent" => Some("urgent"),
        "important" | "high" => Some("high"),
        "medium" => Some("medium"),
        "normal" | "low" => Some("low"),
        _ => None,
    }
}

/// CreatePostRequest
///
/// Input payload for POST /posts. Clients disagree on field names, so the
/// text body and media list each accept both historical spellings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    #[serde(alias = "body")]
    pub content: Option<String>,
    #[ts(type = "unknown[] | null")]
    pub images: Option<Vec<Value>>,
    #[ts(type = "unknown[] | null")]
    pub media: Option<Vec<Value>>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub car_brand: Option<String>,
    pub car_model: Option<String>,
    #[serde(alias = "urgency_level")]
    pub urgency: Option<String>,
    pub is_anonymous: Option<bool>,
}

/// UpdatePostRequest
///
/// Partial update payload for PUT /posts/{id}. Only these fields may be
/// touched; everything else a client sends is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(alias = "body", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
}

impl UpdatePostRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.location.is_none()
            && self.car_brand.is_none()
            && self.car_model.is_none()
            && self.urgency.is_none()
    }
}

// --- Comments ---

/// Comment
///
/// The canonical comment shape. All three comment-table generations decode
/// into this via SQL aliases (item_comments renames content/item_id,
/// community_comments has no threading or media).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub parent_comment_id: Option<Uuid>,
    #[ts(type = "unknown[]")]
    pub media: Value,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CreateCommentRequest
///
/// Input payload for POST /posts/{id}/comments. Threading is optional via
/// the parent comment id (both historical spellings accepted).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(alias = "content")]
    pub body: Option<String>,
    #[serde(alias = "parent_comment_id")]
    pub parent_id: Option<Uuid>,
    #[ts(type = "unknown[] | null")]
    pub media: Option<Vec<Value>>,
}

// --- Events ---

/// Event
///
/// An event row as listed by GET /events. The schedule columns are optional
/// because older schemas predate them (the listing falls back accordingly).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[ts(type = "string | null")]
    pub start_time: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Attendee
///
/// One RSVP row for an event.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Attendee {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// RsvpStatus
///
/// The three RSVP states. Resubmitting the current state clears the RSVP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RsvpStatus {
    Going,
    Interested,
    NotGoing,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Going => "going",
            RsvpStatus::Interested => "interested",
            RsvpStatus::NotGoing => "not_going",
        }
    }

    /// Unknown or missing status coerces to `going`, matching what clients
    /// have always been sent back.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("interested") => RsvpStatus::Interested,
            Some("not_going") => RsvpStatus::NotGoing,
            _ => RsvpStatus::Going,
        }
    }
}

/// RsvpRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RsvpRequest {
    pub status: Option<String>,
}

/// ViewRequest
///
/// Optional attribution for a best-effort view log entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ViewRequest {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
}

// --- Moderation payloads ---

/// ModerateRequest
///
/// Status is validated by hand (approved/rejected/pending) so a bad value
/// yields the 400 the dashboard expects, not a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModerateRequest {
    pub status: String,
}

/// PinRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PinRequest {
    #[serde(default)]
    pub pinned: bool,
}

// --- Storage ---

/// SignedUploadRequest
///
/// Both fields are required; they are Options only so the handler can answer
/// with the canonical 400 message instead of a body-rejection error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignedUploadRequest {
    pub bucket: Option<String>,
    pub file_name: Option<String>,
}

/// SignedUploadResponse
///
/// The token the client feeds to uploadToSignedUrl, plus the object path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SignedUploadResponse {
    pub path: String,
    pub token: String,
}

// --- Payments ---

/// CheckoutRequest
///
/// Wallet top-up payload. The minimum amount is enforced before any call to
/// the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CheckoutRequest {
    pub amount: Option<f64>,
    pub description: Option<String>,
}

/// OfferCheckoutRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OfferCheckoutRequest {
    pub offer_id: Option<Uuid>,
    pub offer_title: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

/// CheckoutResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CheckoutResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Offer
///
/// A purchasable offer row, checked before a checkout session is created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub is_active: bool,
}

// --- Response envelopes ---

/// PostListResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
}

/// CreatedPostResponse
///
/// Carries a hint naming which insert path produced the row, which the
/// dashboards surface when diagnosing schema drift.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatedPostResponse {
    pub post: PostResponse,
    pub hint: String,
}

/// CommentListResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
}

/// CreatedCommentResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatedCommentResponse {
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// EventListResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EventListResponse {
    pub events: Vec<Event>,
}

/// AttendeeListResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AttendeeListResponse {
    pub attendees: Vec<Attendee>,
}

/// ToggleResponse — new state of a like toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ToggleResponse {
    pub liked: bool,
}

/// SaveToggleResponse — new state of a save toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SaveToggleResponse {
    pub saved: bool,
}

/// RsvpResponse — the RSVP state after the request; null means cleared.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RsvpResponse {
    pub rsvp: Option<RsvpStatus>,
}

/// SuccessResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
