use thiserror::Error;

/// Catalog entity kinds, used in `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Permission,
    Role,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Permission => f.write_str("permission"),
            EntityKind::Role => f.write_str("role"),
        }
    }
}

/// Top-level error type for the Warden subsystem.
///
/// Resolution never raises: unknown role references and corrupt cache
/// payloads degrade to the empty permission set. These variants cover
/// the administrative paths, where failures must reach the operator.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("{kind} not found: {code}")]
    NotFound { kind: EntityKind, code: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WardenError {
    pub fn not_found(kind: EntityKind, code: impl Into<String>) -> Self {
        WardenError::NotFound { kind, code: code.into() }
    }
}
