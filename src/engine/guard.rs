//! Host authority: the uniform capability check for reveal and commit.

use std::sync::Arc;

use uuid::Uuid;

use super::error::EngineError;
use super::registry::SessionRegistry;
use super::session::Session;

/// Authorize a host-only operation.
///
/// A caller passes iff the token resolves to a claim, the named session
/// exists, the claim belongs to that session, and the claimed identity is
/// the session's host. Every failure collapses into
/// [`EngineError::HostOnly`]; callers learn nothing about which condition
/// fell through. A reveal against a session that was never created is
/// indistinguishable from a guest trying it on a live one.
pub fn authorize_host(
    registry: &SessionRegistry,
    token: Option<Uuid>,
    session_id: &str,
) -> Result<Arc<Session>, EngineError> {
    let claim = token
        .and_then(|token| registry.claim(token))
        .ok_or(EngineError::HostOnly)?;
    let session = registry.lookup(session_id).ok_or(EngineError::HostOnly)?;
    if claim.session_id != session.id || !session.is_host(&claim.name) {
        return Err(EngineError::HostOnly);
    }
    Ok(session)
}
