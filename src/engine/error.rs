use thiserror::Error;

/// Everything that can go wrong inside the session engine.
///
/// All variants are recoverable by retrying the corresponding action; none
/// is fatal to the process. Contention never surfaces here; the locking
/// discipline absorbs it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not joined")]
    NotJoined,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Feature not found")]
    FeatureNotFound,

    #[error("Invalid field")]
    InvalidField,

    #[error("Invalid value")]
    InvalidValue,

    #[error("Name is required.")]
    NameRequired,

    #[error("Host only")]
    HostOnly,

    #[error("Feature store is locked by another process; try again.")]
    StoreConflict,

    /// Unexpected store failure. The display form is sanitized; the source
    /// error is logged server-side when the response is built.
    #[error("Internal server error")]
    Store(#[source] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotJoined => "not_joined",
            Self::SessionNotFound => "session_not_found",
            Self::FeatureNotFound => "feature_not_found",
            Self::InvalidField => "invalid_field",
            Self::InvalidValue => "invalid_value",
            Self::NameRequired => "name_required",
            Self::HostOnly => "host_only",
            Self::StoreConflict => "store_conflict",
            Self::Store(_) => "internal",
        }
    }
}

/// Failure modes of the commit write-back sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The store is transiently unwritable, e.g. held open by another
    /// process. The operator may retry the commit.
    #[error("feature store is busy")]
    Conflict,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SinkError> for EngineError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Conflict => Self::StoreConflict,
            SinkError::Other(e) => Self::Store(e),
        }
    }
}
