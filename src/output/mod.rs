//! Record writer
//!
//! Writes sanitized batches into tables the schema registry has prepared.
//!
//! # Modes
//!
//! - **Append**: every record becomes a new row
//! - **Upsert**: insert, or overwrite the non-key columns of the row with
//!   the same key values

mod types;
mod writer;

pub use types::{RecordRejection, WriteOutcome};
pub use writer::RecordWriter;
