//! Actor extractor
//!
//! Authentication happens upstream; the engine only needs to know who acted,
//! for audit entries, mirror payloads and admin checks.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::{Actor, AppError, ErrorCode};

use crate::core::EngineState;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";

/// Actor taken from the `X-Actor-*` headers
///
/// `X-Actor-Id` is required; the display name falls back to the id.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl FromRequestParts<EngineState> for RequestActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &EngineState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<RequestActor>() {
            return Ok(actor.clone());
        }

        let id = header(parts, ACTOR_ID_HEADER).ok_or_else(|| {
            AppError::with_message(ErrorCode::RequiredField, "X-Actor-Id header is required")
        })?;
        let name = header(parts, ACTOR_NAME_HEADER).unwrap_or(id);
        let email = header(parts, ACTOR_EMAIL_HEADER).unwrap_or_default();

        let actor = RequestActor(Actor::new(id, name, email));
        parts.extensions.insert(actor.clone());
        Ok(actor)
    }
}
