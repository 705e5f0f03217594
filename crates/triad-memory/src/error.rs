//! Error types for shared-memory operations.

use thiserror::Error;
use triad_persistence::PersistenceError;

/// Errors that can occur during shared-memory operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// A solution referenced a bug index that does not exist.
    #[error("state corruption: solution references bug #{bug_index} but only {bug_count} bugs are recorded")]
    DanglingSolution {
        /// Referenced index.
        bug_index: usize,
        /// Number of recorded bugs.
        bug_count: usize,
    },

    /// A role without context ownership tried to write user context.
    #[error("state corruption: role {role} may not write user context")]
    ContextWriteDenied {
        /// Offending role label.
        role: String,
    },

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Persistence error.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl MemoryError {
    /// Returns `true` for errors that indicate corrupted or forbidden state
    /// changes. These are never retried.
    pub fn is_state_corruption(&self) -> bool {
        matches!(
            self,
            Self::DanglingSolution { .. } | Self::ContextWriteDenied { .. }
        )
    }
}

/// Result type alias for shared-memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::DanglingSolution {
            bug_index: 4,
            bug_count: 1,
        };
        assert_eq!(
            err.to_string(),
            "state corruption: solution references bug #4 but only 1 bugs are recorded"
        );
        assert!(err.is_state_corruption());
        assert!(!MemoryError::LockPoisoned("x".into()).is_state_corruption());
    }
}
