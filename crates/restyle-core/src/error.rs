use thiserror::Error;

/// Configuration errors surfaced when atoms are registered.
///
/// Runtime lookups never fail: unknown class tokens, missing child atoms and
/// unavailable storage are absorbed (see the crate docs).
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("unknown unit `{0}`")]
    UnknownUnit(String),

    #[error("child class cycle: {}", path.join(" -> "))]
    ChildCycle { path: Vec<String> },

    #[error("invalid at-rule: {0}")]
    InvalidAtRule(String),

    #[error("invalid atom json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a host key-value storage surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage io: {0}")]
    Io(String),
}
