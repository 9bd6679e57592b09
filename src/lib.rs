use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::ApiError;
pub use payments::{MockPaymentService, PaymentState, StripeClient};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, StorageState, SupabaseStorageClient};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application
/// from the `#[utoipa::path]` handler annotations and the `ToSchema` models.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::list_posts, handlers::create_post,
        handlers::update_post, handlers::delete_post, handlers::toggle_post_like,
        handlers::toggle_post_save, handlers::record_post_view, handlers::moderate_post,
        handlers::pin_post, handlers::list_comments, handlers::add_comment,
        handlers::toggle_comment_like, handlers::list_events, handlers::toggle_event_like,
        handlers::rsvp_event, handlers::record_event_view, handlers::list_attendees,
        handlers::signed_upload, handlers::approve_listing, handlers::delete_listing,
        handlers::create_checkout, handlers::create_offer_checkout
    ),
    components(
        schemas(
            models::PostResponse, models::PostAuthor, models::CreatePostRequest,
            models::UpdatePostRequest, models::Comment, models::CreateCommentRequest,
            models::Event, models::Attendee, models::RsvpStatus, models::RsvpRequest,
            models::ViewRequest, models::ModerateRequest, models::PinRequest,
            models::SignedUploadRequest, models::SignedUploadResponse,
            models::CheckoutRequest, models::OfferCheckoutRequest, models::CheckoutResponse,
            models::PostListResponse, models::CreatedPostResponse,
            models::CommentListResponse, models::CreatedCommentResponse,
            models::EventListResponse, models::AttendeeListResponse,
            models::ToggleResponse, models::SaveToggleResponse, models::RsvpResponse,
            models::SuccessResponse,
        )
    ),
    tags(
        (name = "carhub-api", description = "CarHub community and marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all application services and
/// configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage Layer: Abstracts the storage API and signed upload issuance.
    pub storage: StorageState,
    /// Payments Layer: Present only when a Stripe key is configured. Handlers
    /// answer 503 when it is absent.
    pub payments: Option<PaymentState>,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow extractors and middleware to pull individual components out of
// the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the protected route tiers. `AuthUser`
/// implements `FromRequestParts`, so a failed token validation rejects the
/// request with 401 before any handler runs; on success the request proceeds
/// and the handler re-extracts the same identity.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration. The upstream gateway already terminates TLS and
    // the browser client runs on arbitrary preview origins, so this mirrors
    // the permissive policy the clients were built against.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Path shims for clients built against the hosted deployment, which
    // address the service as `/functions/v1/<slug>/...` or `/<slug>/...`.
    // Nesting the same route table under both prefixes makes all three
    // addressing styles equivalent.
    let slug_prefix = format!("/{}", state.config.function_slug);
    let platform_prefix = format!("/functions/v1/{}", state.config.function_slug);

    // 2. Base Router Assembly
    let api = Router::new()
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the auth_middleware.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Moderation routes: same authentication layer; the role check runs
        // inside the handlers after authentication succeeds.
        .merge(admin::admin_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        )));

    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(&platform_prefix, api.clone())
        .nest(&slug_prefix, api.clone())
        .merge(api)
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: pulls the `x-request-id` header
/// into the span so every log line for a request is correlated by one ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
