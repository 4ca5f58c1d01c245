//! Response decoder module
//!
//! Supports: JSON, CSV, HTML tables, zip archives
//!
//! # Overview
//!
//! Decoders turn raw response bodies into [`Record`](crate::types::Record)s.
//! Structured bodies go through a [`RecordDecoder`]; HTML pages and zip
//! archives expose their own extractors since one body holds many tables.

mod archive;
mod decoders;
mod html;
mod types;

pub use archive::{csv_entries, ArchiveEntry};
pub use decoders::{CsvDecoder, JsonDecoder};
pub use html::{extract_ratios, extract_tables, HtmlTable};
pub use types::{decode_text, RecordDecoder};

#[cfg(test)]
mod tests;
