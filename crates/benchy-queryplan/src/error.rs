//! Error types for plan normalization

use thiserror::Error;

use crate::operator::DbmsType;

/// Fatal errors that abort the parse of a single plan.
///
/// Unrecognized operator names and optional fields that fail to coerce are
/// not errors: they degrade to `CustomOperator` / `None` and are logged.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Plan exceeds the maximum supported depth of {0}")]
    DepthLimitExceeded(usize),

    #[error("No plan parser available for {0}")]
    UnsupportedEngine(DbmsType),

    #[error("{dbms} plans cannot be parsed from {shape} payloads")]
    UnsupportedPayload {
        dbms: DbmsType,
        shape: &'static str,
    },
}

/// Result type for plan normalization
pub type Result<T> = std::result::Result<T, PlanError>;
