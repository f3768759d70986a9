//! Error types for the planner
//!
//! Provides error handling for:
//! - Schema misconfiguration (fail fast at construction)
//! - Planner input validation
//! - Configuration loading
//! - In-memory store application
//!
//! Repository failures are never wrapped: the planner hands back the
//! repository's own error type untouched.

use crate::schema::StreamType;
use crate::types::{EdgeRowId, EditionId, NodeId};

/// Invalid edge table schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A table or column name is empty
    #[error("empty identifier for {0}")]
    EmptyIdentifier(&'static str),

    /// A table or column name contains characters outside `[A-Za-z0-9_]`
    #[error("invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    /// Item and next-item columns are the same
    #[error("item and next item columns are both {0:?}")]
    IdenticalColumns(String),

    /// Edge and owner tables are the same
    #[error("edge and owner tables are both {0:?}")]
    IdenticalTables(String),

    /// Unknown stream namespace name
    #[error("unknown stream type: {0}")]
    UnknownStream(String),
}

/// Planner construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// Schema failed validation
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The item path lists a node twice
    #[error("item {0} appears more than once in the path")]
    DuplicateItem(NodeId),

    /// A path item is also listed as an anchor
    #[error("item {0} is also used as an anchor")]
    AnchorIsItem(NodeId),

    /// A node is listed both before and after the path
    #[error("anchor {0} is on both sides of the path")]
    AnchorOnBothSides(NodeId),

    /// An explicit schema describes a different stream than the session
    #[error("schema describes the {found} stream, planner targets {expected}")]
    StreamMismatch {
        expected: StreamType,
        found: StreamType,
    },
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML was malformed
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Schema overrides are invalid
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// In-memory store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store was switched to unavailable
    #[error("stream storage unavailable")]
    Unavailable,

    /// Delete addressed a row that does not exist
    #[error("unknown edge row {0}")]
    UnknownRow(EdgeRowId),

    /// Delete addressed a row owned by another edition
    #[error("edge row {row} is owned by edition {owner}, not {requested}")]
    WrongEdition {
        row: EdgeRowId,
        owner: EditionId,
        requested: EditionId,
    },

    /// Create would duplicate an existing edge
    #[error("edge {item} -> {next_item} already exists in edition {edition}")]
    DuplicateEdge {
        edition: EditionId,
        item: NodeId,
        next_item: NodeId,
    },

    /// Create would link a node to itself
    #[error("self loop on node {0}")]
    SelfLoop(NodeId),

    /// Request targets a table this schema does not describe
    #[error("request targets table {found:?}, expected {expected:?}")]
    WrongTable { expected: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_error_display() {
        let err = PlannerError::DuplicateItem(NodeId(4));
        assert!(err.to_string().contains("more than once"));

        let err: PlannerError = SchemaError::EmptyIdentifier("table").into();
        assert!(err.to_string().contains("schema error"));
    }
}
