#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use carhub_api::{
    AppConfig, AppState, MockStorageService, create_router,
    auth::Claims,
    error::ApiError,
    models::{
        Attendee, Comment, CreatePostRequest, Event, Offer, PostRecord, Profile, RsvpStatus,
        UpdatePostRequest, normalize_urgency,
    },
    payments::PaymentState,
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use uuid::Uuid;

/// In-memory Repository used by the integration tests. State mutations are
/// tracked so tests can assert on what the handlers asked the data layer to do.
#[derive(Default)]
pub struct InMemoryRepository {
    pub profiles: HashMap<Uuid, Profile>,
    pub posts: Mutex<Vec<PostRecord>>,
    pub comments: Mutex<Vec<Comment>>,
    pub events: Vec<Event>,
    pub attendees: Vec<Attendee>,
    pub attendees_fail: bool,
    pub offers: HashMap<Uuid, Offer>,
    pub redemptions: HashSet<(Uuid, Uuid)>,

    pub post_likes: Mutex<HashSet<(Uuid, Uuid)>>,
    pub post_saves: Mutex<HashSet<(Uuid, Uuid)>>,
    pub comment_likes: Mutex<HashSet<(Uuid, Uuid)>>,
    pub event_likes: Mutex<HashSet<(Uuid, Uuid)>>,
    pub rsvps: Mutex<HashMap<(Uuid, Uuid), RsvpStatus>>,

    pub post_views: Mutex<HashMap<Uuid, i64>>,
    pub event_views: Mutex<Vec<(Uuid, Option<Uuid>, Option<String>)>>,
    pub statuses: Mutex<HashMap<Uuid, String>>,
    pub pinned: Mutex<HashMap<Uuid, bool>>,
    pub updated_posts: Mutex<Vec<Uuid>>,
    pub deleted_posts: Mutex<Vec<Uuid>>,
    pub approved_listings: Mutex<Vec<Uuid>>,
    pub deleted_listings: Mutex<Vec<Uuid>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, id: Uuid, role: &str) -> Self {
        self.profiles.insert(
            id,
            Profile {
                id,
                role: role.to_string(),
            },
        );
        self
    }

    pub fn with_post(self, post: PostRecord) -> Self {
        self.posts.lock().unwrap().push(post);
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_offer(mut self, offer: Offer) -> Self {
        self.offers.insert(offer.id, offer);
        self
    }

    pub fn with_redemption(mut self, offer_id: Uuid, user_id: Uuid) -> Self {
        self.redemptions.insert((offer_id, user_id));
        self
    }

    pub fn with_failing_attendees(mut self) -> Self {
        self.attendees_fail = true;
        self
    }

    fn flip(set: &Mutex<HashSet<(Uuid, Uuid)>>, key: (Uuid, Uuid)) -> bool {
        let mut set = set.lock().unwrap();
        if set.remove(&key) {
            false
        } else {
            set.insert(key);
            true
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, ApiError> {
        Ok(self.profiles.get(&id).cloned())
    }

    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, ApiError> {
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn create_post(
        &self,
        user_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<(PostRecord, &'static str), ApiError> {
        let record = PostRecord {
            id: Uuid::new_v4(),
            user_id,
            title: req.title,
            content: req.content.clone(),
            body: req.content,
            post_media: None,
            images: req.images.map(Value::Array),
            media: None,
            tags: req.tags,
            location: req.location,
            car_brand: req.car_brand,
            car_model: req.car_model,
            urgency: req
                .urgency
                .as_deref()
                .and_then(normalize_urgency)
                .map(str::to_string),
            status: Some("approved".to_string()),
            created_at: Utc::now(),
            author_display_name: None,
            author_username: None,
            author_avatar_url: None,
            author_role: None,
        };
        self.posts.lock().unwrap().push(record.clone());
        Ok((record, "rpc_used"))
    }

    async fn update_post(&self, id: Uuid, _req: UpdatePostRequest) -> Result<(), ApiError> {
        self.updated_posts.lock().unwrap().push(id);
        Ok(())
    }

    async fn post_owner(&self, id: Uuid) -> Result<Option<Uuid>, ApiError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.user_id))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), ApiError> {
        self.posts.lock().unwrap().retain(|post| post.id != id);
        self.deleted_posts.lock().unwrap().push(id);
        Ok(())
    }

    async fn set_post_status(&self, id: Uuid, status: &str) -> Result<(), ApiError> {
        self.statuses.lock().unwrap().insert(id, status.to_string());
        Ok(())
    }

    async fn set_post_pinned(&self, id: Uuid, pinned: bool) -> Result<(), ApiError> {
        self.pinned.lock().unwrap().insert(id, pinned);
        Ok(())
    }

    async fn record_post_view(&self, id: Uuid) -> Result<(), ApiError> {
        *self.post_views.lock().unwrap().entry(id).or_insert(0) += 1;
        Ok(())
    }

    async fn toggle_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(Self::flip(&self.post_likes, (post_id, user_id)))
    }

    async fn toggle_post_save(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(Self::flip(&self.post_saves, (post_id, user_id)))
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ApiError> {
        Ok(Self::flip(&self.comment_likes, (comment_id, user_id)))
    }

    async fn toggle_event_like(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(Self::flip(&self.event_likes, (event_id, user_id)))
    }

    async fn set_rsvp(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: RsvpStatus,
    ) -> Result<Option<RsvpStatus>, ApiError> {
        let mut rsvps = self.rsvps.lock().unwrap();
        match rsvps.get(&(event_id, user_id)) {
            Some(current) if *current == status => {
                rsvps.remove(&(event_id, user_id));
                Ok(None)
            }
            _ => {
                rsvps.insert((event_id, user_id), status);
                Ok(Some(status))
            }
        }
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: &str,
        parent_id: Option<Uuid>,
        media: &Value,
    ) -> Result<(Comment, Option<&'static str>), ApiError> {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            body: body.to_string(),
            parent_comment_id: parent_id,
            media: media.clone(),
            created_at: Utc::now(),
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok((comment, None))
    }

    async fn fetch_events(&self) -> Result<Vec<Event>, ApiError> {
        Ok(self.events.clone())
    }

    async fn fetch_attendees(&self, _event_id: Uuid) -> Result<Vec<Attendee>, ApiError> {
        if self.attendees_fail {
            return Err(ApiError::Upstream("attendee table missing".to_string()));
        }
        Ok(self.attendees.clone())
    }

    async fn record_event_view(
        &self,
        event_id: Uuid,
        user_id: Option<Uuid>,
        session_id: Option<&str>,
    ) -> Result<(), ApiError> {
        self.event_views
            .lock()
            .unwrap()
            .push((event_id, user_id, session_id.map(str::to_string)));
        Ok(())
    }

    async fn approve_listing(&self, id: Uuid) -> Result<(), ApiError> {
        self.approved_listings.lock().unwrap().push(id);
        Ok(())
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), ApiError> {
        self.deleted_listings.lock().unwrap().push(id);
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, ApiError> {
        Ok(self.offers.get(&id).cloned())
    }

    async fn has_redemption(&self, offer_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        Ok(self.redemptions.contains(&(offer_id, user_id)))
    }
}

/// Bare post row the way the simplest listing probe would produce it.
pub fn post_record(owner: Uuid) -> PostRecord {
    PostRecord {
        id: Uuid::new_v4(),
        user_id: owner,
        title: Some("Test post".to_string()),
        content: Some("Hello".to_string()),
        body: None,
        post_media: None,
        images: None,
        media: None,
        tags: None,
        location: None,
        car_brand: None,
        car_model: None,
        urgency: None,
        status: Some("approved".to_string()),
        created_at: Utc::now(),
        author_display_name: None,
        author_username: None,
        author_avatar_url: None,
        author_role: None,
    }
}

pub fn offer(active: bool) -> Offer {
    Offer {
        id: Uuid::new_v4(),
        title: "Free car wash".to_string(),
        description: Some("One wash".to_string()),
        image_urls: Some(vec!["https://cdn.test/wash.png".to_string()]),
        is_active: active,
    }
}

// --- Router assembly ---

pub fn app(repo: InMemoryRepository) -> Router {
    app_with(repo, MockStorageService::default(), None)
}

pub fn app_with(
    repo: InMemoryRepository,
    storage: MockStorageService,
    payments: Option<PaymentState>,
) -> Router {
    let state = AppState {
        repo: Arc::new(repo) as RepositoryState,
        storage: Arc::new(storage) as StorageState,
        payments,
        config: AppConfig::default(),
    };
    create_router(state)
}

// --- Tokens ---

fn signed_token(user_id: Uuid, exp: usize, iat: usize) -> String {
    let claims = Claims {
        sub: user_id,
        exp,
        iat,
    };
    let key = EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

/// A token the auth guard accepts, signed with the test secret.
pub fn token_for(user_id: Uuid) -> String {
    let now = Utc::now().timestamp() as usize;
    signed_token(user_id, now + 3600, now)
}

/// A token whose exp is well in the past.
pub fn expired_token_for(user_id: Uuid) -> String {
    let now = Utc::now().timestamp() as usize;
    signed_token(user_id, now - 3600, now - 7200)
}

// --- Request helpers ---

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    request_json("POST", uri, token, body)
}

pub fn request_json(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
