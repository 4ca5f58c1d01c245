//! Column and table name sanitization
//!
//! Every identifier that reaches SQL goes through [`Ident`], which can only be
//! built by [`sanitize_identifier`] or validated by [`Ident::parse`].
//!
//! - Arbitrary source names map to `[a-z0-9_]+`, never starting with a digit
//! - Reserved words and system columns are prefixed with `col_`
//! - Sanitizing twice is the same as sanitizing once

mod ident;
mod record;

pub use ident::{sanitize_identifier, Ident, CREATED_AT_COLUMN, ID_COLUMN};
pub use record::{
    is_null_sentinel, normalize_value, sanitize_batch, sanitize_record, SanitizedBatch,
    SanitizedRecord,
};
