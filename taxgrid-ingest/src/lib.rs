//! taxgrid-ingest: reference tables (geocodes, tax categories, tax types, product codes)
//! and research sheet exports.

pub mod error;
pub mod reference;
pub mod sheet;
pub mod states;
pub mod tables;

pub use error::IngestError;
pub use reference::{ReferenceData, ReferenceSources, ReferenceStats, TableSource};
pub use sheet::{ColumnNames, HeaderMap, SegmentColumns, SourceSheet, cell, sheet_name};
pub use states::state_code;
