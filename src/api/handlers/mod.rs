use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::engine::{authorize_host, EngineError};
use crate::models::*;

use super::identity::IdentityToken;
use super::AppState;

// ============================================================
// Error Handling
// ============================================================

/// Each engine error maps to one HTTP status, a stable machine-readable
/// code, and a short human message. Unexpected store failures are logged
/// server-side and reach the client only in sanitized form.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotJoined => StatusCode::UNAUTHORIZED,
            EngineError::SessionNotFound | EngineError::FeatureNotFound => StatusCode::NOT_FOUND,
            EngineError::InvalidField | EngineError::InvalidValue | EngineError::NameRequired => {
                StatusCode::BAD_REQUEST
            }
            EngineError::HostOnly => StatusCode::FORBIDDEN,
            EngineError::StoreConflict => StatusCode::CONFLICT,
            EngineError::Store(e) => {
                tracing::error!("Feature store error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Features
// ============================================================

pub async fn list_features(
    State(state): State<AppState>,
) -> Result<Json<Vec<Feature>>, EngineError> {
    state
        .store
        .get_all_features()
        .map(Json)
        .map_err(EngineError::Store)
}

// ============================================================
// Sessions
// ============================================================

/// Create-or-resume the estimation session for a feature.
///
/// Idempotent: reopening a feature's session returns the existing one with
/// its participants and votes intact, never a duplicate.
pub async fn open_session(
    State(state): State<AppState>,
    Path(feature_id): Path<String>,
) -> Result<Json<SessionSummary>, EngineError> {
    let feature = state
        .store
        .get_feature(&feature_id)
        .map_err(EngineError::Store)?
        .ok_or(EngineError::FeatureNotFound)?;

    let session = state.registry.get_or_create(&feature.id, &feature.name);
    Ok(Json(session.summary()))
}

/// Lobby view; no identity required.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, EngineError> {
    let session = state
        .registry
        .lookup(&id)
        .ok_or(EngineError::SessionNotFound)?;
    Ok(Json(session.summary()))
}

/// Join a session's lobby, establishing the caller's identity claim.
/// The first joiner becomes host.
pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<JoinInput>,
) -> Result<Json<JoinResponse>, EngineError> {
    let session = state
        .registry
        .lookup(&id)
        .ok_or(EngineError::SessionNotFound)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(EngineError::NameRequired);
    }

    let joined = session.join(name);
    let token = state.registry.register_claim(&session.id, name);

    Ok(Json(JoinResponse {
        token,
        session_id: session.id.clone(),
        name: name.to_string(),
        is_host: joined.is_host,
        host_name: joined.host_name,
    }))
}

/// Poll the room state. Requires an identity claim for this session; the
/// snapshot applies the blind-voting visibility rules for that viewer.
pub async fn session_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: IdentityToken,
) -> Result<Json<StateSnapshot>, EngineError> {
    let session = state
        .registry
        .lookup(&id)
        .ok_or(EngineError::SessionNotFound)?;

    let claim = token
        .0
        .and_then(|token| state.registry.claim(token))
        .filter(|claim| claim.session_id == session.id)
        .ok_or(EngineError::NotJoined)?;

    Ok(Json(session.snapshot(&claim.name)))
}

pub async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: IdentityToken,
    Json(input): Json<VoteInput>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let claim = token
        .0
        .and_then(|token| state.registry.claim(token))
        .ok_or(EngineError::NotJoined)?;

    let session = state
        .registry
        .lookup(&id)
        .ok_or(EngineError::SessionNotFound)?;
    if claim.session_id != session.id {
        return Err(EngineError::NotJoined);
    }

    let field = EstimationField::from_str(&input.field).ok_or(EngineError::InvalidField)?;
    let value = coerce_vote(&input.value).ok_or(EngineError::InvalidValue)?;

    session.vote(&claim.name, field, value);
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Reveal the snapped consensus for every field. Host only.
pub async fn reveal_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: IdentityToken,
) -> Result<Json<BTreeMap<EstimationField, Option<i64>>>, EngineError> {
    let session = authorize_host(&state.registry, token.0, &id)?;
    Ok(Json(session.reveal()))
}

/// Commit the revealed consensus into the feature store. Host only.
/// Session state is not rolled back on a store conflict; the host may
/// retry once the store is writable again.
pub async fn commit_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: IdentityToken,
) -> Result<Json<serde_json::Value>, EngineError> {
    let session = authorize_host(&state.registry, token.0, &id)?;
    let written = session.commit(&state.store)?;

    tracing::debug!(
        "Committed {} field(s) for feature {}",
        written,
        session.feature_id
    );
    Ok(Json(serde_json::json!({
        "status": "saved",
        "fields_written": written,
    })))
}

/// Interpret a vote payload as an integer.
///
/// Accepts JSON integers, floats with the fraction discarded, and numeric
/// strings. Out-of-deck integers pass through; the consensus snap brings
/// them back onto the deck.
fn coerce_vote(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_vote_accepts_integers() {
        assert_eq!(coerce_vote(&json!(8)), Some(8));
        assert_eq!(coerce_vote(&json!(-3)), Some(-3));
    }

    #[test]
    fn coerce_vote_truncates_floats() {
        assert_eq!(coerce_vote(&json!(8.7)), Some(8));
        assert_eq!(coerce_vote(&json!(-2.9)), Some(-2));
    }

    #[test]
    fn coerce_vote_parses_numeric_strings() {
        assert_eq!(coerce_vote(&json!("13")), Some(13));
        assert_eq!(coerce_vote(&json!("  5 ")), Some(5));
    }

    #[test]
    fn coerce_vote_rejects_everything_else() {
        assert_eq!(coerce_vote(&json!("8.5")), None);
        assert_eq!(coerce_vote(&json!("eight")), None);
        assert_eq!(coerce_vote(&json!(null)), None);
        assert_eq!(coerce_vote(&json!(true)), None);
        assert_eq!(coerce_vote(&json!([8])), None);
    }
}
