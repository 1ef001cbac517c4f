//! taxgrid-rules: row resolution, tax-type expansion, product code conversion,
//! breadcrumb descriptions and city replication.

pub mod description;
pub mod issues;
pub mod normalizer;
pub mod processor;
pub mod replication;
pub mod resolver;
pub mod treatment;

pub use description::DescriptionComposer;
pub use issues::summarize_missing_tax_types;
pub use normalizer::{NormalizerStats, ProductCodeNormalizer};
pub use processor::{FileOutcome, ProcessorSettings, SheetProcessor};
pub use replication::{ReplicationOutcome, replicate_state_treatments};
pub use resolver::{
    MissingTaxType, RecordResolver, ResolverSettings, RowContext, RowResolution, SegmentTreatment,
    dedup_segments,
};
pub use treatment::{TaxableStatus, classify_taxable, parse_percent};
