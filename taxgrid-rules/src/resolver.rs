//! Row → record resolution.
//!
//! A row carries two customer segments (business and personal). Each segment
//! is read on its own, the two are deduplicated, and every surviving
//! treatment becomes one template per geocode of the source file. Templates
//! then expand into one record per tax type of (geocode, tax_cat), falling
//! back to the parent state geocode.
//!
//! The resolver has no mutable state: everything a row produces, errors
//! included, comes back in the [`RowResolution`].

use std::sync::Arc;

use rust_decimal::Decimal;
use taxgrid_core::record::DEFAULT_GROUP;
use taxgrid_core::{CustomerType, ProcessingError, Record, RecordTemplate, Taxable};
use taxgrid_ingest::sheet::SegmentColumns;
use taxgrid_ingest::{HeaderMap, ReferenceData, cell};
use tracing::debug;

use crate::treatment::{TaxableStatus, classify_taxable, parse_percent};

pub const DEFAULT_EFFECTIVE_DATE: &str = "1999-01-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub effective_date: String,
    pub group: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            effective_date: DEFAULT_EFFECTIVE_DATE.to_string(),
            group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// A parsed, valid customer segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTreatment {
    pub customer: CustomerType,
    pub taxable: Taxable,
    pub tax_cat: String,
    pub percent: Decimal,
}

impl SegmentTreatment {
    fn treatment(&self) -> (Taxable, &str, Decimal) {
        (self.taxable, self.tax_cat.as_str(), self.percent)
    }
}

/// Business and personal segments that agree on (taxable, tax_cat, percent)
/// collapse into the personal one. Otherwise every valid segment is kept,
/// business first.
pub fn dedup_segments(
    business: Option<SegmentTreatment>,
    personal: Option<SegmentTreatment>,
) -> Vec<SegmentTreatment> {
    match (business, personal) {
        (Some(b), Some(p)) if b.treatment() == p.treatment() => vec![p],
        (b, p) => b.into_iter().chain(p).collect(),
    }
}

/// A template dropped because (geocode, tax_cat) has no tax types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTaxType {
    pub geocode: String,
    pub tax_cat: String,
    pub item: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowResolution {
    pub records: Vec<Record>,
    pub errors: Vec<ProcessingError>,
    pub missing_tax_types: Vec<MissingTaxType>,
}

/// Where a row came from, for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub file_name: &'a str,
    pub row_number: usize,
}

#[derive(Debug, Clone)]
pub struct RecordResolver {
    reference: Arc<ReferenceData>,
    settings: ResolverSettings,
}

impl RecordResolver {
    pub fn new(reference: Arc<ReferenceData>, settings: ResolverSettings) -> Self {
        Self { reference, settings }
    }

    /// Resolve one row against every geocode of its source file. Output is
    /// geocode-major: all records of the first geocode, then the next.
    pub fn resolve_row(
        &self,
        ctx: RowContext<'_>,
        row: &[String],
        header: &HeaderMap,
        geocodes: &[String],
    ) -> RowResolution {
        let mut resolution = RowResolution::default();

        let item = cell(row, header.current_id);
        if item.is_empty() {
            debug!(file = ctx.file_name, row = ctx.row_number, "row has no current id, skipping");
            return resolution;
        }

        let business = self.read_segment(
            ctx,
            item,
            CustomerType::Business,
            &header.business,
            row,
            &mut resolution.errors,
        );
        let personal = self.read_segment(
            ctx,
            item,
            CustomerType::Personal,
            &header.personal,
            row,
            &mut resolution.errors,
        );
        let treatments = dedup_segments(business, personal);

        for geocode in geocodes {
            for treatment in &treatments {
                let template = self.template(geocode, item, treatment);
                match self.expand_template(&template) {
                    Some(records) => resolution.records.extend(records),
                    None => resolution.missing_tax_types.push(MissingTaxType {
                        geocode: template.geocode.clone(),
                        tax_cat: template.tax_cat.clone(),
                        item: template.item.clone(),
                    }),
                }
            }
        }

        resolution
    }

    pub fn template(&self, geocode: &str, item: &str, treatment: &SegmentTreatment) -> RecordTemplate {
        RecordTemplate::new(
            geocode,
            item,
            treatment.customer,
            treatment.taxable,
            treatment.tax_cat.clone(),
            treatment.percent,
            self.settings.effective_date.clone(),
        )
        .with_group(self.settings.group.clone())
    }

    /// One record per tax type, or `None` when neither the geocode nor its
    /// parent has tax types for the template's category.
    pub fn expand_template(&self, template: &RecordTemplate) -> Option<Vec<Record>> {
        let tax_types = self
            .reference
            .tax_type_with_fallback(&template.geocode, &template.tax_cat)?;
        Some(tax_types.iter().map(|t| template.to_record(t)).collect())
    }

    /// Parse one segment. Empty usage or percent means the segment is absent;
    /// uncertain usage is skipped quietly; unreadable values are recorded.
    fn read_segment(
        &self,
        ctx: RowContext<'_>,
        item: &str,
        customer: CustomerType,
        columns: &SegmentColumns,
        row: &[String],
        errors: &mut Vec<ProcessingError>,
    ) -> Option<SegmentTreatment> {
        let usage = cell(row, columns.usage);
        if usage.is_empty() {
            return None;
        }

        let taxable = match classify_taxable(usage) {
            TaxableStatus::Known(taxable) => taxable,
            TaxableStatus::Uncertain => {
                debug!(item, segment = customer.label(), usage, "uncertain usage, segment skipped");
                return None;
            }
            TaxableStatus::Unknown(raw) => {
                errors.push(
                    ProcessingError::data_quality(
                        ctx.file_name,
                        ctx.row_number,
                        item,
                        format!("Unrecognized {} use value '{}'", customer.label(), raw),
                    )
                    .with_detail("segment", customer.label())
                    .with_detail("value", raw),
                );
                return None;
            }
        };

        let percent_text = cell(row, columns.percent);
        if percent_text.is_empty() {
            debug!(item, segment = customer.label(), "no percent taxable, segment skipped");
            return None;
        }
        let percent = match parse_percent(percent_text) {
            Ok(percent) => percent,
            Err(e) => {
                errors.push(
                    ProcessingError::data_quality(
                        ctx.file_name,
                        ctx.row_number,
                        item,
                        format!("{} segment: {}", customer.label(), e),
                    )
                    .with_detail("segment", customer.label())
                    .with_detail("value", percent_text),
                );
                return None;
            }
        };

        let tax_cat = self.reference.tax_cat_code(cell(row, columns.tax_cat));

        Some(SegmentTreatment {
            customer,
            taxable,
            tax_cat,
            percent,
        })
    }
}
