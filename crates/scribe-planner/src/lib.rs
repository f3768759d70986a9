//! Scribe Planner - position mutation planning
//!
//! Translates editorial intents over an edition's sign stream into the
//! minimal set of edge creates and deletes:
//! - Insert items between anchors
//! - Remove items and close the gap they leave
//! - Move items to a new place in the stream
//! - Connect or disconnect neighbouring anchors
//!
//! Reads go through the [`StreamRepository`] seam; the planner never writes.
//! Emitted [`MutationRequest`]s are applied by an external executor as one
//! transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use scribe_planner::prelude::*;
//!
//! # async fn example(repo: &InMemoryStreamStore) -> Result<(), Box<dyn std::error::Error>> {
//! let planner = PositionMutationPlanner::builder(StreamType::SignInterpretationStream, EditionId(1))
//!     .with_items([NodeId(7), NodeId(8)])
//!     .with_anchors_before([NodeId(3)])
//!     .with_anchors_after([NodeId(4)])
//!     .with_operation(EditOperation::Insert)
//!     .build()?;
//!
//! let plan = planner.create_requests(repo).await?;
//! println!("{} request(s)", plan.requests.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod planner;
pub mod repository;
pub mod request;
pub mod schema;
pub mod types;

pub use config::PlannerConfig;
pub use error::{ConfigError, PlannerError, SchemaError, StoreError};
pub use hierarchy::{unit_bounds, TerminatorConfig, Terminators, TextUnit, UnitBounds};
pub use planner::{
    EditOperation, MutationPlan, PlannerBuilder, PositionAction, PositionMutationPlanner,
};
pub use repository::{
    memory::ApplyReport, HierarchyRepository, InMemoryStreamStore, StreamRepository,
};
pub use request::{MutationAction, MutationParameters, MutationRequest};
pub use schema::{EdgeTableSchema, SchemaOverrides, StreamType, TableOverride};
pub use types::{EdgeRowId, EditionId, NodeId, PositionDataPair};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for planning sessions
    pub use crate::{
        EditOperation, EditionId, InMemoryStreamStore, MutationPlan, MutationRequest, NodeId,
        PlannerConfig, PositionAction, PositionMutationPlanner, StreamRepository, StreamType,
    };
}
