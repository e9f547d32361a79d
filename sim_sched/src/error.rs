//! Engine error types

use thiserror::Error;

/// Errors surfaced to the driving harness
///
/// These cover recoverable driver mistakes only. Internal-consistency
/// violations (releasing a resource the caller does not own, waking a
/// process that is not blocked, naming a resource outside the table)
/// abort the simulation instead of returning a value; they indicate a
/// bug, not a runtime condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedError {
    /// A process must require at least one tick of CPU time
    #[error("process lifespan must be non-zero")]
    ZeroLifespan,

    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SchedError::ZeroLifespan.to_string(),
            "process lifespan must be non-zero"
        );
        assert_eq!(
            SchedError::InvalidConfig("no ceilings".into()).to_string(),
            "invalid configuration: no ceilings"
        );
    }
}
