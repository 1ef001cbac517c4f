//! taxgrid-core: record and catalog types, hierarchical ids, geocodes, error reports.

pub mod error;
pub mod geocode;
pub mod hierarchy;
pub mod product;
pub mod record;
pub mod report;
pub mod time;

pub use error::CoreError;
pub use geocode::{is_state_geocode, parent_geocode};
pub use hierarchy::{normalize, parent_ids};
pub use product::{ProductItem, dedup_product_items, pad_item_code};
pub use record::{CustomerType, Record, RecordTemplate, Taxable, scale_percent};
pub use report::{ErrorReport, ErrorType, ProcessingError};

pub use rust_decimal::Decimal;
