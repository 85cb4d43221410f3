use axum::{extract::FromRequestParts, http::request::Parts};
use perfhub_core::models::Actor;
use uuid::Uuid;

use super::ApiError;

/// Header set by the authenticating proxy with the caller's user id.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The authenticated caller, taken from [`ACTOR_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", ACTOR_HEADER)))?;

        let user_id = value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("malformed {} header", ACTOR_HEADER)))?;

        Ok(Self(Actor::new(user_id)))
    }
}
