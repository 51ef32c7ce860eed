//! Identity-claim extraction from request headers.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

/// The caller's bearer token, if any.
///
/// Read from `Authorization: Bearer <token>`, or from the
/// `X-Participant-Token` header for clients that reserve `Authorization`.
/// Absence is not a rejection here; each handler decides whether an
/// identity is required and how its lack maps onto the error taxonomy.
pub struct IdentityToken(pub Option<Uuid>);

impl<S> FromRequestParts<S> for IdentityToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim);

        let raw = bearer.or_else(|| {
            parts
                .headers
                .get("X-Participant-Token")
                .and_then(|h| h.to_str().ok())
        });

        Ok(Self(raw.and_then(|s| Uuid::parse_str(s).ok())))
    }
}
