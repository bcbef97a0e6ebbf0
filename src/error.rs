//! Physics Error Types
//!
//! Host-facing operations that can be refused (stale handle, wrong timestep,
//! mismatched snapshot) return `Result<T, PhysicsError>`. None of these are
//! fatal: the world is left exactly as it was before the call.

use core::fmt;

#[cfg(all(feature = "serde", not(feature = "std")))]
use alloc::string::String;

/// Unified error type for simulation operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// Body handle is stale (destroyed) or was never issued by this world.
    InvalidHandle {
        /// Slot index carried by the handle
        index: u32,
        /// Generation carried by the handle
        generation: u32,
    },
    /// `step` was called with a timestep other than the configured one.
    VariableTimestep {
        /// Configured timestep (raw Q32.32 bits)
        expected_raw: i64,
        /// Timestep that was passed (raw Q32.32 bits)
        got_raw: i64,
    },
    /// A capacity limit was exceeded (too many bodies).
    CapacityExceeded {
        /// What resource was exhausted
        resource: &'static str,
        /// The limit that was exceeded
        limit: usize,
    },
    /// Invalid configuration parameter.
    InvalidConfiguration {
        /// Description of the invalid configuration
        reason: &'static str,
    },
    /// A snapshot does not describe this world's body set.
    SnapshotMismatch {
        /// What did not line up
        reason: &'static str,
    },
    /// Snapshot bytes are truncated, corrupted or from another format version.
    DeserializationFailed {
        /// What failed to decode
        reason: &'static str,
    },
    /// Configuration text could not be parsed.
    #[cfg(feature = "serde")]
    ConfigParse {
        /// Parser message
        message: String,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { index, generation } => {
                write!(f, "invalid body handle (index={index}, generation={generation})")
            }
            Self::VariableTimestep {
                expected_raw,
                got_raw,
            } => {
                write!(
                    f,
                    "variable timestep rejected (expected raw {expected_raw}, got raw {got_raw})"
                )
            }
            Self::CapacityExceeded { resource, limit } => {
                write!(f, "{resource} capacity exceeded (limit={limit})")
            }
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::SnapshotMismatch { reason } => write!(f, "snapshot mismatch: {reason}"),
            Self::DeserializationFailed { reason } => {
                write!(f, "snapshot deserialization failed: {reason}")
            }
            #[cfg(feature = "serde")]
            Self::ConfigParse { message } => write!(f, "config parse error: {message}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PhysicsError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PhysicsError::InvalidHandle {
            index: 5,
            generation: 3,
        };
        let s = format!("{}", e);
        assert!(s.contains("index=5"), "Should contain index");
        assert!(s.contains("generation=3"), "Should contain generation");
    }

    #[test]
    fn test_variable_timestep() {
        let e = PhysicsError::VariableTimestep {
            expected_raw: 71_582_788,
            got_raw: 1,
        };
        let s = format!("{}", e);
        assert!(s.contains("71582788"));
        assert!(s.contains("timestep"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let e = PhysicsError::CapacityExceeded {
            resource: "bodies",
            limit: 256,
        };
        let s = format!("{}", e);
        assert!(s.contains("bodies"));
        assert!(s.contains("256"));
    }

    #[test]
    fn test_error_variants() {
        let e1 = PhysicsError::SnapshotMismatch {
            reason: "body count",
        };
        let e2 = PhysicsError::DeserializationFailed {
            reason: "truncated",
        };
        assert_ne!(e1, e2);
        assert!(format!("{e2}").contains("truncated"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_parse_display() {
        let e = PhysicsError::ConfigParse {
            message: "expected a table".into(),
        };
        assert_eq!(format!("{e}"), "config parse error: expected a table");
    }

    #[test]
    fn test_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&PhysicsError::InvalidConfiguration {
            reason: "fixed_dt must be > 0",
        });
    }
}
