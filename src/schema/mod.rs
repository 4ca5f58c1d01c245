//! Schema registry and table materializer
//!
//! Tables are created on first write and only ever widened: a field seen for
//! the first time becomes a new nullable text column. The store is the source
//! of truth; the registry only caches what it last saw.

mod registry;
mod types;

pub use registry::{SchemaRegistry, MAX_DDL_ATTEMPTS};
pub use types::{EnsureReport, TableDescriptor, TableSpec};
