//! Scene module
//!
//! The instance table, the query executor and the `Scene` context that ties
//! geometry, acceleration index and results together.

mod instance_table;
mod query;
mod scene;
mod stats;

pub use instance_table::{InstanceFlags, InstanceTable};
pub use query::{BatchHits, QueryExecutor};
pub use scene::{FireResult, Scene, MISS_POSITION};
pub use stats::TraceStats;
