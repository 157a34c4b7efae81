//! docsearch core domain types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! It holds the task records the service reports and the compiler that turns
//! structural filter descriptions into the service's filter grammar.

pub mod error;
pub mod filter;
pub mod ids;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::{CoreError, ErrorPayload};
pub use filter::{FilterError, LogicalOperator, Operator};
pub use ids::{IndexUid, TaskUid};
pub use status::TaskStatus;
pub use task::TaskRecord;
