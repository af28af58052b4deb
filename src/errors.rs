use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Error type that captures the engine's recoverable bad-input failures.
///
/// Every variant is synchronous and caller-recoverable; the engine performs
/// no I/O and never retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid interval: {from} is after {to}")]
    InvalidInterval { from: NaiveDate, to: NaiveDate },
    #[error("rule {0} is open-ended and the query has no upper bound")]
    UnboundedQuery(Uuid),
    #[error("rule invariant violated: {0}")]
    RuleInvariantViolated(String),
    #[error("truncation policy requires a reference date and none was provided")]
    ClockNotProvided,
    #[error("invalid calendar date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
