use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError, repository::RepositoryState};

/// Claims
///
/// The payload structure expected inside a Supabase access token (JWT). Tokens
/// are signed with the project JWT secret and validated on every authenticated
/// request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, keyed against public.profiles.
    pub sub: Uuid,
    /// Expiration time (exp): timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued at (iat): timestamp when the token was issued.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the core output of the
/// auth guard. Handlers use it for ownership checks and moderation gates.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The unique identifier of the user, mapped to auth.users.id and public.profiles.id.
    pub id: Uuid,
    /// The user's stored role: 'subscriber', 'editor', or 'admin'.
    pub role: String,
}

impl AuthUser {
    /// The role check gating destructive and moderation endpoints. Only admin
    /// and editor qualify; an unresolved role fails closed as 'subscriber'.
    pub fn is_moderator(&self) -> bool {
        self.role == "admin" || self.role == "editor"
    }
}

/// Pulls the bearer credential off the request. Clients that cannot set
/// `Authorization` (it gets overwritten by the platform's own gateway key)
/// use `x-client-authorization` instead; a raw token without the `Bearer `
/// prefix is also accepted.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts
        .headers
        .get(header::AUTHORIZATION)
        .or_else(|| parts.headers.get("x-client-authorization"))
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())?;
    Some(raw.strip_prefix("Bearer ").unwrap_or(raw))
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler, and keeping authentication
/// out of the business logic.
///
/// The full sequence:
/// 1. Bearer extraction (Authorization, falling back to x-client-authorization).
/// 2. Anon-key misuse rejection: the public anon key is never a user token.
/// 3. JWT validation against the project secret (exp enforced).
/// 4. Role lookup from public.profiles; any failure degrades to 'subscriber'
///    so moderation gates fail closed without blocking the request.
///
/// Rejection: ApiError::AuthMissing / ApiError::AuthInvalid (both 401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(parts).ok_or(ApiError::AuthMissing)?;

        if token == config.anon_key {
            return Err(ApiError::AuthInvalid(
                "Authorization requires user token, received anon key".to_string(),
            ));
        }

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| ApiError::AuthInvalid("Unauthorized".to_string()))?;

        let user_id = token_data.claims.sub;

        // Role resolution fails closed: a missing profile or a lookup error
        // leaves the caller a 'subscriber', never a moderator.
        let role = match repo.get_profile(user_id).await {
            Ok(Some(profile)) => profile.role,
            Ok(None) => "subscriber".to_string(),
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "role lookup failed");
                "subscriber".to_string()
            }
        };

        Ok(AuthUser { id: user_id, role })
    }
}
