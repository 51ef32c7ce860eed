//! The estimation-consensus session engine.
//!
//! A [`Session`] is one blind-voting round for one feature: participants
//! join, vote per [`crate::models::EstimationField`], and the host reveals
//! the snapped consensus and commits it to the feature store. Sessions are
//! in-memory only; they are keyed by the feature they estimate and live
//! until the process exits or the idle sweeper evicts them.
//!
//! Correctness under parallel mutation comes from one mutex per session,
//! held for the full duration of each state-machine operation. The
//! [`SessionRegistry`] map has its own short-lived lock so that
//! simultaneous first lookups for a feature cannot create duplicate
//! sessions; traffic on different sessions otherwise never contends.

mod consensus;
mod error;
mod guard;
mod registry;
mod session;

pub use consensus::snap;
pub use error::{EngineError, SinkError};
pub use guard::authorize_host;
pub use registry::{IdentityClaim, SessionRegistry};
pub use session::{EstimateSink, Joined, Session};
