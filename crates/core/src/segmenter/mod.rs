//! Segment range math and the on-disk plan that records per-range progress.

mod plan;
mod range;

pub use plan::{Plan, PlanError, PlanStatus};
pub use range::{build_ranges, Segment};
