use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::{EstimationField, FieldState, SessionSummary, StateSnapshot};

use super::consensus;
use super::error::SinkError;

/// Write-back half of the feature-store contract, consumed by commit.
///
/// The engine never talks to the store directly; it pushes committed values
/// through this seam. The SQLite store implements it, and tests substitute
/// recording or conflicting doubles.
pub trait EstimateSink {
    fn write_field(
        &self,
        feature_id: &str,
        field: EstimationField,
        value: i64,
    ) -> Result<(), SinkError>;
}

/// One estimation round for one feature.
///
/// The session cycles between hidden and revealed indefinitely; there is no
/// terminal state. All mutable state sits behind a single mutex held for
/// the full duration of each operation, which makes the
/// vote-invalidates-reveal rule linearizable per session: a vote and a
/// reveal on the same session cannot interleave.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub feature_id: String,
    pub feature_name: String,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    participants: BTreeSet<String>,
    /// First participant to join. Assigned exactly once, under the session
    /// lock, and never reassigned.
    host: Option<String>,
    revealed: bool,
    votes: BTreeMap<EstimationField, BTreeMap<String, i64>>,
    /// Valid only while `revealed` is true; cleared by every vote.
    consensus: BTreeMap<EstimationField, Option<i64>>,
    last_activity: Instant,
}

impl State {
    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Outcome of a join.
#[derive(Debug, Clone)]
pub struct Joined {
    pub is_host: bool,
    pub host_name: String,
}

impl Session {
    /// Session ids derive deterministically from the feature, one session
    /// per feature.
    pub fn id_for(feature_id: &str) -> String {
        format!("POKER-{feature_id}")
    }

    pub(crate) fn new(feature_id: &str, feature_name: &str) -> Self {
        Self {
            id: Self::id_for(feature_id),
            feature_id: feature_id.to_string(),
            feature_name: feature_name.to_string(),
            state: Mutex::new(State {
                participants: BTreeSet::new(),
                host: None,
                revealed: false,
                votes: EstimationField::ALL
                    .iter()
                    .map(|&field| (field, BTreeMap::new()))
                    .collect(),
                consensus: BTreeMap::new(),
                last_activity: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("session lock poisoned")
    }

    /// Add a participant. Idempotent for repeat joins; the first distinct
    /// joiner becomes host, atomically with the insert.
    pub fn join(&self, name: &str) -> Joined {
        let mut state = self.lock();
        state.touch();
        state.participants.insert(name.to_string());
        let host_name = state.host.get_or_insert_with(|| name.to_string()).clone();
        Joined {
            is_host: host_name == name,
            host_name,
        }
    }

    /// Record a vote, overwriting the participant's prior vote for that
    /// field. A vote on any field hides a standing reveal: the reveal
    /// covered all fields together, so any change stales it.
    pub fn vote(&self, name: &str, field: EstimationField, value: i64) {
        let mut state = self.lock();
        state.touch();
        state.revealed = false;
        state.consensus.clear();
        state
            .votes
            .entry(field)
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Compute consensus for every field from the current ledger and expose
    /// it. Stable until the next vote.
    pub fn reveal(&self) -> BTreeMap<EstimationField, Option<i64>> {
        let mut state = self.lock();
        state.touch();
        let consensus = consensus::derive(&state.votes);
        state.consensus = consensus.clone();
        state.revealed = true;
        consensus
    }

    /// Push every non-null consensus value into the sink.
    ///
    /// The consensus is snapshotted under the session lock, then written
    /// with the lock released. A sink failure leaves session state
    /// untouched, so the operator can simply retry. Returns how many fields
    /// were written; a hidden session has an empty consensus and writes
    /// nothing.
    pub fn commit(&self, sink: &dyn EstimateSink) -> Result<usize, SinkError> {
        let consensus = {
            let mut state = self.lock();
            state.touch();
            state.consensus.clone()
        };

        let mut written = 0;
        for (field, value) in consensus {
            if let Some(value) = value {
                sink.write_field(&self.feature_id, field, value)?;
                written += 1;
            }
        }
        Ok(written)
    }

    pub(crate) fn is_host(&self, name: &str) -> bool {
        self.lock().host.as_deref() == Some(name)
    }

    /// Lobby view: participants and host, nothing vote-related.
    pub fn summary(&self) -> SessionSummary {
        let mut state = self.lock();
        state.touch();
        SessionSummary {
            session_id: self.id.clone(),
            feature_id: self.feature_id.clone(),
            feature_name: self.feature_name.clone(),
            host_name: state.host.clone(),
            participants: state.participants.iter().cloned().collect(),
            revealed: state.revealed,
        }
    }

    /// Room view for one joined participant.
    ///
    /// Who voted is always visible, as is the viewer's own value. Raw
    /// values and consensus appear only while revealed.
    pub fn snapshot(&self, viewer: &str) -> StateSnapshot {
        let mut state = self.lock();
        state.touch();

        let fields = EstimationField::ALL
            .iter()
            .map(|&field| {
                let ballots = state.votes.get(&field).cloned().unwrap_or_default();
                let voted_users: Vec<String> = ballots.keys().cloned().collect();
                let your_value = ballots.get(viewer).copied();
                let values = state.revealed.then_some(ballots);
                (
                    field,
                    FieldState {
                        voted_users,
                        your_value,
                        values,
                    },
                )
            })
            .collect();

        StateSnapshot {
            session_id: self.id.clone(),
            feature_id: self.feature_id.clone(),
            users: state.participants.iter().cloned().collect(),
            host_name: state.host.clone(),
            revealed: state.revealed,
            consensus: state.consensus.clone(),
            fields,
        }
    }

    pub(crate) fn idle_for(&self) -> Duration {
        self.lock().last_activity.elapsed()
    }
}
