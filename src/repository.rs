use crate::error::ApiError;
use crate::models::{
    Attendee, Comment, CreatePostRequest, Event, Offer, PostRecord, Profile, RsvpStatus,
    UpdatePostRequest, normalize_urgency,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers interact
/// with the data layer through this trait only, so tests can substitute an
/// in-memory implementation for the Supabase-managed Postgres one.
///
/// Send + Sync + async_trait make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    /// Fetches the stored profile of a user. The role in it gates moderation.
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, ApiError>;

    // --- Posts ---
    /// Lists approved (or status-less) posts, newest first, probing simpler
    /// query shapes when the primary join is unavailable.
    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, ApiError>;
    /// Creates a post via the database procedure, falling back to a direct
    /// insert and then a minimal insert. Returns the row and the path taken.
    async fn create_post(
        &self,
        user_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<(PostRecord, &'static str), ApiError>;
    /// Partial update of the allowed fields only.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Result<(), ApiError>;
    /// Owner lookup for the owner-or-moderator delete gate.
    async fn post_owner(&self, id: Uuid) -> Result<Option<Uuid>, ApiError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), ApiError>;
    async fn set_post_status(&self, id: Uuid, status: &str) -> Result<(), ApiError>;
    async fn set_post_pinned(&self, id: Uuid, pinned: bool) -> Result<(), ApiError>;
    /// Best-effort view counter. Callers swallow the error.
    async fn record_post_view(&self, id: Uuid) -> Result<(), ApiError>;

    // --- Toggles (binary state per resource+user) ---
    /// Returns the new state: true means the like now exists.
    async fn toggle_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;
    async fn toggle_post_save(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;
    async fn toggle_comment_like(&self, comment_id: Uuid, user_id: Uuid)
    -> Result<bool, ApiError>;
    async fn toggle_event_like(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;
    /// Three-state RSVP: resubmitting the current status clears it (None),
    /// a different status updates it, no prior RSVP inserts one.
    async fn set_rsvp(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: RsvpStatus,
    ) -> Result<Option<RsvpStatus>, ApiError>;

    // --- Comments ---
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, ApiError>;
    /// Inserts a comment, probing the three comment-table generations in
    /// order. The hint names the fallback shape used, when one was.
    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: &str,
        parent_id: Option<Uuid>,
        media: &Value,
    ) -> Result<(Comment, Option<&'static str>), ApiError>;

    // --- Events ---
    async fn fetch_events(&self) -> Result<Vec<Event>, ApiError>;
    async fn fetch_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>, ApiError>;
    /// Best-effort view log entry. Callers swallow the error.
    async fn record_event_view(
        &self,
        event_id: Uuid,
        user_id: Option<Uuid>,
        session_id: Option<&str>,
    ) -> Result<(), ApiError>;

    // --- Marketplace moderation ---
    async fn approve_listing(&self, id: Uuid) -> Result<(), ApiError>;
    async fn delete_listing(&self, id: Uuid) -> Result<(), ApiError>;

    // --- Offers ---
    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, ApiError>;
    async fn has_redemption(&self, offer_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// Supabase-managed PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs an ordered list of query-shape probes and returns the first that
    /// succeeds. A probe failing is schema drift, not an incident, so it logs
    /// at debug; when every shape fails the primary error is surfaced.
    async fn probe_rows<T>(&self, what: &str, probes: &[&str], id: Option<Uuid>)
    -> Result<Vec<T>, ApiError>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let mut primary_err: Option<sqlx::Error> = None;
        for (idx, sql) in probes.iter().enumerate() {
            let mut query = sqlx::query_as::<_, T>(sql);
            if let Some(id) = id {
                query = query.bind(id);
            }
            match query.fetch_all(&self.pool).await {
                Ok(rows) => {
                    if idx > 0 {
                        tracing::debug!(what, probe = idx, "fallback query shape used");
                    }
                    return Ok(rows);
                }
                Err(err) => {
                    tracing::debug!(what, probe = idx, error = %err, "query shape failed");
                    primary_err.get_or_insert(err);
                }
            }
        }
        // probes is never empty, so the primary error is always recorded.
        Err(primary_err
            .map(ApiError::from)
            .unwrap_or_else(|| ApiError::Upstream("no query shape available".to_string())))
    }

    /// One atomic statement per toggle: delete the row if present, insert it
    /// if not, and report whether it now exists. The data-modifying CTE shares
    /// one snapshot, so concurrent identical requests cannot leave duplicates;
    /// `ON CONFLICT DO NOTHING` absorbs the losing insert of a race.
    ///
    /// `table` and `ref_col` are compile-time constants, never caller input.
    async fn toggle(
        &self,
        table: &str,
        ref_col: &str,
        ref_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ApiError> {
        let sql = format!(
            "WITH deleted AS ( \
                 DELETE FROM {table} WHERE {ref_col} = $1 AND user_id = $2 RETURNING 1 \
             ), inserted AS ( \
                 INSERT INTO {table} ({ref_col}, user_id, created_at) \
                 SELECT $1, $2, NOW() \
                 WHERE NOT EXISTS (SELECT 1 FROM deleted) \
                 ON CONFLICT DO NOTHING \
                 RETURNING 1 \
             ) \
             SELECT EXISTS (SELECT 1 FROM inserted)"
        );
        let on = sqlx::query_scalar::<_, bool>(&sql)
            .bind(ref_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(on)
    }
}

// Post listing probes, in priority order: full media join, profiles only,
// bare table. Columns a shape cannot provide are selected as NULL so all
// three decode into PostRecord.
const POSTS_WITH_MEDIA: &str = "\
    SELECT p.id, p.user_id, p.title, p.content, p.body, \
           (SELECT COALESCE(jsonb_agg(jsonb_build_object('bucket', m.bucket, 'path', m.path)), '[]'::jsonb) \
              FROM community_post_media m WHERE m.post_id = p.id) AS post_media, \
           p.images, p.media, p.tags, p.location, p.car_brand, p.car_model, p.urgency, p.status, p.created_at, \
           pr.display_name AS author_display_name, pr.username AS author_username, \
           pr.avatar_url AS author_avatar_url, pr.role AS author_role \
      FROM posts p LEFT JOIN profiles pr ON pr.id = p.user_id \
     WHERE p.status = 'approved' OR p.status IS NULL \
     ORDER BY p.created_at DESC";

const POSTS_WITH_PROFILES: &str = "\
    SELECT p.id, p.user_id, p.title, p.content, p.body, \
           NULL::jsonb AS post_media, \
           p.images, p.media, p.tags, p.location, p.car_brand, p.car_model, p.urgency, p.status, p.created_at, \
           pr.display_name AS author_display_name, pr.username AS author_username, \
           pr.avatar_url AS author_avatar_url, pr.role AS author_role \
      FROM posts p LEFT JOIN profiles pr ON pr.id = p.user_id \
     WHERE p.status = 'approved' OR p.status IS NULL \
     ORDER BY p.created_at DESC";

const POSTS_BARE: &str = "\
    SELECT p.id, p.user_id, p.title, p.content, p.body, \
           NULL::jsonb AS post_media, \
           p.images, p.media, p.tags, p.location, p.car_brand, p.car_model, p.urgency, p.status, p.created_at, \
           NULL::text AS author_display_name, NULL::text AS author_username, \
           NULL::text AS author_avatar_url, NULL::text AS author_role \
      FROM posts p \
     WHERE p.status = 'approved' OR p.status IS NULL \
     ORDER BY p.created_at DESC";

// The bare post shape again, for fetching a single row after the procedure
// path created it.
const POST_BY_ID: &str = "\
    SELECT p.id, p.user_id, p.title, p.content, p.body, \
           NULL::jsonb AS post_media, \
           p.images, p.media, p.tags, p.location, p.car_brand, p.car_model, p.urgency, p.status, p.created_at, \
           NULL::text AS author_display_name, NULL::text AS author_username, \
           NULL::text AS author_avatar_url, NULL::text AS author_role \
      FROM posts p WHERE p.id = $1";

// Comment probes across the three table generations. The mapping to the
// canonical shape is done with column aliases.
const COMMENTS_PRIMARY: &str = "\
    SELECT id, post_id, user_id, body, parent_comment_id, \
           COALESCE(media, '[]'::jsonb) AS media, created_at \
      FROM comments WHERE post_id = $1 ORDER BY created_at ASC";

const COMMENTS_ITEM: &str = "\
    SELECT id, item_id AS post_id, user_id, content AS body, parent_comment_id, \
           COALESCE(media, '[]'::jsonb) AS media, created_at \
      FROM item_comments WHERE item_type = 'post' AND item_id = $1 ORDER BY created_at ASC";

const COMMENTS_COMMUNITY: &str = "\
    SELECT id, post_id, author_id AS user_id, body, NULL::uuid AS parent_comment_id, \
           '[]'::jsonb AS media, created_at \
      FROM community_comments WHERE post_id = $1 ORDER BY created_at ASC";

// Event probes: schedule order first, creation order for schemas without a
// schedule window.
const EVENTS_BY_SCHEDULE: &str = "\
    SELECT id, user_id, title, description, location, start_time, end_time, created_at \
      FROM events ORDER BY start_time ASC";

const EVENTS_BY_CREATION: &str = "\
    SELECT id, user_id, title, description, location, \
           NULL::timestamptz AS start_time, NULL::timestamptz AS end_time, created_at \
      FROM events ORDER BY created_at DESC";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, ApiError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn fetch_posts(&self) -> Result<Vec<PostRecord>, ApiError> {
        self.probe_rows(
            "posts",
            &[POSTS_WITH_MEDIA, POSTS_WITH_PROFILES, POSTS_BARE],
            None,
        )
        .await
    }

    /// Procedure first (it keeps post_stats and side tables consistent), then
    /// a direct insert, then the minimal column set old environments accept.
    async fn create_post(
        &self,
        user_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<(PostRecord, &'static str), ApiError> {
        let text = req
            .content
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("[Image Post]")
            .to_string();
        let title = req
            .title
            .clone()
            .unwrap_or_else(|| "Untitled Post".to_string());
        let media = Value::Array(req.images.clone().or(req.media.clone()).unwrap_or_default());
        let tags = req.tags.clone().unwrap_or_default();
        let urgency = req
            .urgency
            .as_deref()
            .and_then(normalize_urgency)
            .map(str::to_string);

        // Probe 1: the database procedure.
        let rpc = sqlx::query_scalar::<_, Uuid>(
            "SELECT fn_create_post($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL)",
        )
        .bind(user_id)
        .bind(&title)
        .bind(&text)
        .bind(&media)
        .bind(&tags)
        .bind(&req.location)
        .bind(&req.car_brand)
        .bind(&req.car_model)
        .bind(&urgency)
        .fetch_one(&self.pool)
        .await;

        match rpc {
            Ok(post_id) => {
                let row = sqlx::query_as::<_, PostRecord>(POST_BY_ID)
                    .bind(post_id)
                    .fetch_one(&self.pool)
                    .await?;
                return Ok((row, "rpc_used"));
            }
            Err(err) => {
                tracing::debug!(error = %err, "fn_create_post unavailable, trying direct insert");
            }
        }

        // Probe 2: direct insert with the full column set.
        let direct = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts \
               (user_id, title, content, body, media, tags, location, car_brand, car_model, urgency, status, is_anonymous, created_at) \
             VALUES ($1, $2, $3, $3, $4, $5, $6, $7, $8, $9, 'approved', $10, NOW()) \
             RETURNING id, user_id, title, content, body, \
                       NULL::jsonb AS post_media, NULL::jsonb AS images, media, tags, \
                       location, car_brand, car_model, urgency, status, created_at, \
                       NULL::text AS author_display_name, NULL::text AS author_username, \
                       NULL::text AS author_avatar_url, NULL::text AS author_role",
        )
        .bind(user_id)
        .bind(&title)
        .bind(&text)
        .bind(&media)
        .bind(&tags)
        .bind(&req.location)
        .bind(&req.car_brand)
        .bind(&req.car_model)
        .bind(&urgency)
        .bind(req.is_anonymous.unwrap_or(false))
        .fetch_one(&self.pool)
        .await;

        match direct {
            Ok(row) => return Ok((row, "direct_insert_used")),
            Err(err) => {
                tracing::debug!(error = %err, "direct insert failed, trying minimal insert");
            }
        }

        // Probe 3: minimal payload. If this fails too, the error surfaces.
        let row = sqlx::query_as::<_, PostRecord>(
            "INSERT INTO posts (user_id, title, content, body, status) \
             VALUES ($1, $2, $3, $3, 'approved') \
             RETURNING id, user_id, title, content, body, \
                       NULL::jsonb AS post_media, NULL::jsonb AS images, NULL::jsonb AS media, \
                       NULL::text[] AS tags, NULL::text AS location, NULL::text AS car_brand, \
                       NULL::text AS car_model, NULL::text AS urgency, status, created_at, \
                       NULL::text AS author_display_name, NULL::text AS author_username, \
                       NULL::text AS author_avatar_url, NULL::text AS author_role",
        )
        .bind(user_id)
        .bind(&title)
        .bind(&text)
        .fetch_one(&self.pool)
        .await?;
        Ok((row, "fallback_insert_used"))
    }

    /// COALESCE keeps unspecified fields untouched; content and body always
    /// move together so both schema generations stay in sync.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Result<(), ApiError> {
        let text = req.content.as_deref().map(str::trim).map(str::to_string);
        sqlx::query(
            "UPDATE posts SET \
                 title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 body = COALESCE($3, body), \
                 tags = COALESCE($4, tags), \
                 location = COALESCE($5, location), \
                 car_brand = COALESCE($6, car_brand), \
                 car_model = COALESCE($7, car_model), \
                 urgency = COALESCE($8, urgency) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&text)
        .bind(&req.tags)
        .bind(&req.location)
        .bind(&req.car_brand)
        .bind(&req.car_model)
        .bind(&req.urgency)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn post_owner(&self, id: Uuid) -> Result<Option<Uuid>, ApiError> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_status(&self, id: Uuid, status: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE posts SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_post_pinned(&self, id: Uuid, pinned: bool) -> Result<(), ApiError> {
        sqlx::query("UPDATE posts SET is_pinned = $2 WHERE id = $1")
            .bind(id)
            .bind(pinned)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Single upsert instead of read-then-write, so concurrent views cannot
    /// lose increments. Fails where post_stats is a view; callers treat that
    /// as best-effort.
    async fn record_post_view(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO post_stats (post_id, view_count) VALUES ($1, 1) \
             ON CONFLICT (post_id) DO UPDATE SET view_count = post_stats.view_count + 1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn toggle_post_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        self.toggle("post_likes", "post_id", post_id, user_id).await
    }

    async fn toggle_post_save(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        self.toggle("post_saves", "post_id", post_id, user_id).await
    }

    async fn toggle_comment_like(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ApiError> {
        self.toggle("community_comment_likes", "comment_id", comment_id, user_id)
            .await
    }

    async fn toggle_event_like(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        self.toggle("event_likes", "event_id", event_id, user_id)
            .await
    }

    /// The three-state variant cannot collapse into one statement, so it runs
    /// in a transaction: read the current RSVP, then delete (same status),
    /// update (different status), or insert (none).
    async fn set_rsvp(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: RsvpStatus,
    ) -> Result<Option<RsvpStatus>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, status FROM event_attendees WHERE event_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some((row_id, current)) if current == status.as_str() => {
                sqlx::query("DELETE FROM event_attendees WHERE id = $1")
                    .bind(row_id)
                    .execute(&mut *tx)
                    .await?;
                None
            }
            Some((row_id, _)) => {
                sqlx::query(
                    "UPDATE event_attendees SET status = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(row_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
                Some(status)
            }
            None => {
                sqlx::query(
                    "INSERT INTO event_attendees (event_id, user_id, status, created_at) \
                     VALUES ($1, $2, $3, NOW())",
                )
                .bind(event_id)
                .bind(user_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
                Some(status)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        self.probe_rows(
            "comments",
            &[COMMENTS_PRIMARY, COMMENTS_ITEM, COMMENTS_COMMUNITY],
            Some(post_id),
        )
        .await
    }

    async fn insert_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        body: &str,
        parent_id: Option<Uuid>,
        media: &Value,
    ) -> Result<(Comment, Option<&'static str>), ApiError> {
        // Probe 1: the current comments table.
        let primary = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, user_id, body, parent_comment_id, media) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, post_id, user_id, body, parent_comment_id, \
                       COALESCE(media, '[]'::jsonb) AS media, created_at",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .bind(parent_id)
        .bind(media)
        .fetch_one(&self.pool)
        .await;

        match primary {
            Ok(comment) => return Ok((comment, None)),
            Err(err) => {
                tracing::debug!(error = %err, "comments insert failed, trying item_comments");
            }
        }

        // Probe 2: the polymorphic item_comments table.
        let item = sqlx::query_as::<_, Comment>(
            "INSERT INTO item_comments (item_type, item_id, user_id, content, parent_comment_id, media) \
             VALUES ('post', $1, $2, $3, $4, $5) \
             RETURNING id, item_id AS post_id, user_id, content AS body, parent_comment_id, \
                       COALESCE(media, '[]'::jsonb) AS media, created_at",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .bind(parent_id)
        .bind(media)
        .fetch_one(&self.pool)
        .await;

        match item {
            Ok(comment) => return Ok((comment, Some("fallback_item_comments"))),
            Err(err) => {
                tracing::debug!(error = %err, "item_comments insert failed, trying community_comments");
            }
        }

        // Probe 3: the legacy table. No threading, no media linkage.
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO community_comments (post_id, author_id, body) VALUES ($1, $2, $3) \
             RETURNING id, post_id, author_id AS user_id, body, NULL::uuid AS parent_comment_id, \
                       '[]'::jsonb AS media, created_at",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok((comment, Some("fallback_community_comments")))
    }

    async fn fetch_events(&self) -> Result<Vec<Event>, ApiError> {
        self.probe_rows("events", &[EVENTS_BY_SCHEDULE, EVENTS_BY_CREATION], None)
            .await
    }

    async fn fetch_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>, ApiError> {
        let attendees = sqlx::query_as::<_, Attendee>(
            "SELECT id, user_id, status, created_at FROM event_attendees \
             WHERE event_id = $1 ORDER BY created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attendees)
    }

    async fn record_event_view(
        &self,
        event_id: Uuid,
        user_id: Option<Uuid>,
        session_id: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO event_views (event_id, user_id, session_id, viewed_at) \
             VALUES ($1, $2, $3, NOW())",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn approve_listing(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE market_listings SET status = 'approved' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM market_listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, ApiError> {
        let offer = sqlx::query_as::<_, Offer>(
            "SELECT id, title, description, image_urls, is_active FROM offers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(offer)
    }

    async fn has_redemption(&self, offer_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM offer_redemptions WHERE offer_id = $1 AND user_id = $2)",
        )
        .bind(offer_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
