//! Core abstractions for the migration engine.
//!
//! - [`value`]: source row and target value representations
//! - [`traits`]: reader, writer and connector traits implemented by drivers
//!
//! The engine (`session`, `transfer`, `orchestrator`) is written against these
//! traits only, so it can be exercised with in-memory implementations.

pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use traits::{Connector, DriverResult, RowCursor, SourceReader, TargetTransaction, TargetWriter};
pub use value::{SourceRow, TargetValue};
