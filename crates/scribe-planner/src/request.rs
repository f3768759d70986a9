//! Mutation requests
//!
//! The planner's output. An external executor applies a batch of these as
//! one transaction and records editor provenance; the planner only decides
//! what they are.

use crate::schema::EdgeTableSchema;
use crate::types::{EdgeRowId, NodeId};
use serde::{Deserialize, Serialize};

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Create,
    Delete,
}

/// What a request writes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationParameters {
    /// Column values of a new edge
    Link {
        item_column: String,
        item: NodeId,
        next_item_column: String,
        next_item: NodeId,
    },
    /// Row identity of an owned edge
    Owned { row_id: EdgeRowId },
}

/// One atomic edge-level write
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationRequest {
    pub action: MutationAction,
    pub table: String,
    pub parameters: MutationParameters,
}

impl MutationRequest {
    /// Request a new `item -> next_item` edge
    #[must_use]
    pub fn create(schema: &EdgeTableSchema, item: NodeId, next_item: NodeId) -> Self {
        Self {
            action: MutationAction::Create,
            table: schema.table.clone(),
            parameters: MutationParameters::Link {
                item_column: schema.item_column.clone(),
                item,
                next_item_column: schema.next_item_column.clone(),
                next_item,
            },
        }
    }

    /// Request removal of an owned edge row
    #[must_use]
    pub fn delete(schema: &EdgeTableSchema, row_id: EdgeRowId) -> Self {
        Self {
            action: MutationAction::Delete,
            table: schema.table.clone(),
            parameters: MutationParameters::Owned { row_id },
        }
    }

    /// `(item, next_item)` of a create request
    #[must_use]
    pub fn link(&self) -> Option<(NodeId, NodeId)> {
        match self.parameters {
            MutationParameters::Link {
                item, next_item, ..
            } => Some((item, next_item)),
            MutationParameters::Owned { .. } => None,
        }
    }

    /// Row addressed by a delete request
    #[must_use]
    pub fn row_id(&self) -> Option<EdgeRowId> {
        match self.parameters {
            MutationParameters::Owned { row_id } => Some(row_id),
            MutationParameters::Link { .. } => None,
        }
    }

    #[must_use]
    pub fn is_create(&self) -> bool {
        self.action == MutationAction::Create
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.action == MutationAction::Delete
    }
}

impl std::fmt::Display for MutationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parameters {
            MutationParameters::Link {
                item, next_item, ..
            } => write!(f, "create {}: {item} -> {next_item}", self.table),
            MutationParameters::Owned { row_id } => {
                write!(f, "delete {}: row {row_id}", self.table)
            }
        }
    }
}
