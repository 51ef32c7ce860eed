use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use super::session::Session;

/// Identity claim established by a join: which participant a bearer token
/// speaks for, and in which session. This is the whole of the identity
/// story: no passwords, no cross-process validity.
#[derive(Debug, Clone)]
pub struct IdentityClaim {
    pub session_id: String,
    pub name: String,
}

/// Creates and looks up sessions, one per feature, and owns the identity
/// claims issued by joins.
///
/// The registry's own locks guard only map insertion and lookup; session
/// state has its per-session lock. Requests against different sessions
/// contend here only for the brief map access.
///
/// Constructed once at process start and handed to request handlers by
/// reference; there is no hidden global.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    claims: Mutex<HashMap<Uuid, IdentityClaim>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            claims: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the session for a feature, creating it on first request.
    ///
    /// Idempotent by identity: repeated calls return the same `Arc`, and
    /// simultaneous first lookups for one feature end up sharing a single
    /// session because the insertion happens under the map lock.
    pub fn get_or_create(&self, feature_id: &str, feature_name: &str) -> Arc<Session> {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        sessions
            .entry(Session::id_for(feature_id))
            .or_insert_with(|| Arc::new(Session::new(feature_id, feature_name)))
            .clone()
    }

    pub fn lookup(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .get(session_id)
            .cloned()
    }

    /// Issue a bearer token for a joined participant.
    pub fn register_claim(&self, session_id: &str, name: &str) -> Uuid {
        let token = Uuid::new_v4();
        self.claims.lock().expect("registry lock poisoned").insert(
            token,
            IdentityClaim {
                session_id: session_id.to_string(),
                name: name.to_string(),
            },
        );
        token
    }

    pub fn claim(&self, token: Uuid) -> Option<IdentityClaim> {
        self.claims
            .lock()
            .expect("registry lock poisoned")
            .get(&token)
            .cloned()
    }

    /// Drop sessions idle for at least `ttl`, along with the claims that
    /// pointed at them. Returns how many sessions were evicted.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<String> = {
            let mut sessions = self.sessions.lock().expect("registry lock poisoned");
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.idle_for() >= ttl)
                .map(|(id, _)| id.clone())
                .collect();
            for id in &expired {
                sessions.remove(id);
            }
            expired
        };

        if !evicted.is_empty() {
            let mut claims = self.claims.lock().expect("registry lock poisoned");
            claims.retain(|_, claim| !evicted.contains(&claim.session_id));
        }
        evicted.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
