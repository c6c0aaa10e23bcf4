//! Query plan execution.
//!
//! A plan is built from [`QueryPlanProperty`] leaves sharing one
//! [`PlanContext`], and evaluated lazily into [`VertexStream`]s.
//!
//! ```text
//! And
//!   GreaterOrEqual 1.age >= 21 [index range]
//!   Not
//!     Equals 1.city = "Berlin" [full scan]
//! ```

mod context;
pub mod operators;
mod property;
mod stream;

pub use context::{PendingIndexUpdates, PlanContext};
pub use operators::{
    AccessCost, AndOperator, ComparativeOperator, CompareOp, NotOperator, OrOperator, QueryPlan,
};
pub use property::{Extent, QueryPlanProperty};
pub use stream::{StreamState, VertexStream};
