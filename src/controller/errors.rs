//! # Error Classes
//!
//! Every controller error maps to one of four classes. The class decides how the
//! error policy requeues and which condition reason is persisted.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Permanent until the resource changes: invalid or contradictory spec
    Configuration,
    /// A referenced object does not exist yet; retried with backoff
    MissingDependency,
    /// Cluster API timeouts, conflicts and similar
    Transient,
    /// Apply or delete of a rendered object failed
    Apply,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::MissingDependency => "missing-dependency",
            ErrorClass::Transient => "transient",
            ErrorClass::Apply => "apply",
        }
    }

    /// Condition reason recorded on the overall `Ready` condition
    pub fn reason(&self) -> &'static str {
        use crate::constants::*;
        match self {
            ErrorClass::Configuration => REASON_CONFIGURATION_ERROR,
            ErrorClass::MissingDependency => REASON_MISSING_DEPENDENCY,
            ErrorClass::Transient | ErrorClass::Apply => REASON_RECONCILE_FAILED,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
