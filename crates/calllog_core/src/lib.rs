//! Caller / phone-call persistence core.
//!
//! Maps `Caller` (one-to-many to `PhoneCall`) and `PhoneCall` (with a set of
//! topic labels) onto SQLite, behind a pooled unit-of-work context.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use context::{
    CallContext, CancellationToken, ContextError, ContextFactory, ContextOptions, ContextResult,
    ContextTransaction, SavedChanges,
};
pub use db::{DbError, DbResult, ScratchDatabase};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::caller::{Caller, CallerId};
pub use model::phone_call::{now_epoch_ms, PhoneCall, PhoneCallId};
pub use model::ModelValidationError;
pub use repo::caller_repo::{CallerRepository, SqliteCallerRepository};
pub use repo::phone_call_repo::{PhoneCallListQuery, PhoneCallRepository, SqlitePhoneCallRepository};
pub use repo::{RecordKind, RepoError, RepoResult};

/// Minimal health-check API for smoke probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
