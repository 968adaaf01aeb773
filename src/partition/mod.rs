//! # Partition/Sort-Key Backend
//!
//! Plans queries for wide-column stores that can only look rows up by
//! partition key, optionally narrowed and ordered by a sort key.
//!
//! Output contract:
//! - exactly one index per plan
//! - partition keys accept equality only
//! - ordering is only possible along the chosen index's sort key
//! - predicates the key condition cannot absorb are returned unmodified

mod explain;
mod expression;
mod planner;

pub use explain::ExplainPlan;
pub use expression::{FilterExpression, KeyCondition, SortKeyCondition, SORT_KEY_OPERATORS};
pub use planner::{Access, KeyConditionPlan, PartitionPlanner};
