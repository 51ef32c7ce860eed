use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::EstimationField;

/// Lobby view of an estimation session. Contains nothing vote-related, so
/// it is served without an identity claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub feature_id: String,
    pub feature_name: String,
    /// First participant to join; `None` until someone has.
    pub host_name: Option<String>,
    pub participants: Vec<String>,
    pub revealed: bool,
}

/// Input for joining a session's lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinInput {
    pub name: String,
}

/// Response to a successful join. The `token` is the caller's identity
/// claim for all subsequent requests against this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub token: Uuid,
    pub session_id: String,
    pub name: String,
    pub is_host: bool,
    pub host_name: String,
}

/// Input for submitting a vote.
///
/// `field` and `value` are deliberately loose here: unrecognized field names
/// and non-integer values must map to the engine's own error codes, not to a
/// serde rejection, so validation happens in the handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteInput {
    pub field: String,
    pub value: serde_json::Value,
}

/// Per-field slice of a state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldState {
    /// Who has voted on this field. Always visible, values are not.
    pub voted_users: Vec<String>,
    /// The viewer's own vote, always visible to the viewer.
    pub your_value: Option<i64>,
    /// Everyone's votes; populated only while the session is revealed.
    pub values: Option<BTreeMap<String, i64>>,
}

/// Read-only snapshot of a session, as seen by one joined participant.
///
/// Blind voting: before reveal a participant sees who voted and their own
/// values, never another participant's value. After reveal, `values` and
/// `consensus` are filled in until the next vote hides them again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub session_id: String,
    pub feature_id: String,
    pub users: Vec<String>,
    pub host_name: Option<String>,
    pub revealed: bool,
    /// Snapped value per field, or `null` for fields nobody voted on.
    /// Empty while the session is hidden.
    pub consensus: BTreeMap<EstimationField, Option<i64>>,
    pub fields: BTreeMap<EstimationField, FieldState>,
}
