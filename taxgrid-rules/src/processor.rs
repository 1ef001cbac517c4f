//! One research sheet in, records, catalog entries and errors out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taxgrid_core::{ProcessingError, ProductItem, Record};
use taxgrid_ingest::{ColumnNames, HeaderMap, ReferenceData, SourceSheet, cell};
use tracing::{info, warn};

use crate::description::DescriptionComposer;
use crate::issues::{DEFAULT_SAMPLE_LIMIT, summarize_missing_tax_types};
use crate::resolver::{RecordResolver, ResolverSettings, RowContext};

pub const DEFAULT_ADMIN_FILTER: &str = "Tag Level";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    /// Only rows whose admin cell equals this (trimmed, case-insensitive)
    /// are resolved.
    pub admin_filter: String,
    /// Item ids kept as samples in each missing tax type entry.
    pub sample_limit: usize,
    pub columns: ColumnNames,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            admin_filter: DEFAULT_ADMIN_FILTER.to_string(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            columns: ColumnNames::default(),
        }
    }
}

/// Everything one sheet contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileOutcome {
    pub file_name: String,
    pub success: bool,
    /// Why the file contributed nothing, when `success` is false.
    pub error: Option<String>,
    pub records: Vec<Record>,
    pub product_items: Vec<ProductItem>,
    pub errors: Vec<ProcessingError>,
    pub rows_processed: usize,
}

impl FileOutcome {
    pub fn failed(file_name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            file_name: file_name.to_string(),
            success: false,
            errors: vec![ProcessingError::file_failure(file_name, message.clone())],
            error: Some(message),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetProcessor {
    reference: Arc<ReferenceData>,
    resolver: RecordResolver,
    settings: ProcessorSettings,
}

impl SheetProcessor {
    pub fn new(
        reference: Arc<ReferenceData>,
        resolver_settings: ResolverSettings,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            resolver: RecordResolver::new(Arc::clone(&reference), resolver_settings),
            reference,
            settings,
        }
    }

    pub fn process(&self, sheet: &SourceSheet) -> FileOutcome {
        let name = sheet.name.as_str();

        let geocodes = self.reference.geocodes_for_source(name);
        if geocodes.is_empty() {
            warn!(sheet = name, "no geocode for sheet");
            return FileOutcome::failed(name, format!("Could not determine geocode(s) for {name}"));
        }

        let header = HeaderMap::from_header(&sheet.header, &self.settings.columns);
        if header.admin.is_none() {
            return FileOutcome::failed(
                name,
                format!("Admin column '{}' not found in headers", self.settings.columns.admin),
            );
        }
        let Some(id_index) = header.current_id else {
            return FileOutcome::failed(
                name,
                format!("Current ID column '{}' not found in headers", self.settings.columns.current_id),
            );
        };

        let composer = match &header.description {
            Some(span) => DescriptionComposer::from_rows(&sheet.rows, id_index, span.clone()),
            None => DescriptionComposer::default(),
        };

        let filter = self.settings.admin_filter.trim();
        let mut outcome = FileOutcome {
            file_name: name.to_string(),
            success: true,
            ..FileOutcome::default()
        };
        let mut missing = Vec::new();

        for (index, row) in sheet.rows.iter().enumerate() {
            if !cell(row, header.admin).eq_ignore_ascii_case(filter) {
                continue;
            }
            outcome.rows_processed += 1;

            let ctx = RowContext {
                file_name: name,
                row_number: sheet.row_number(index),
            };
            let resolution = self.resolver.resolve_row(ctx, row, &header, &geocodes);
            outcome.records.extend(resolution.records);
            outcome.errors.extend(resolution.errors);
            missing.extend(resolution.missing_tax_types);

            let id = cell(row, header.current_id);
            if !id.is_empty() {
                let item = ProductItem::new(id, composer.compose(id));
                if item.is_valid() {
                    outcome.product_items.push(item);
                }
            }
        }

        outcome
            .errors
            .extend(summarize_missing_tax_types(name, &missing, self.settings.sample_limit));

        info!(
            sheet = name,
            geocodes = geocodes.len(),
            rows = outcome.rows_processed,
            records = outcome.records.len(),
            errors = outcome.errors.len(),
            "processed sheet"
        );
        outcome
    }
}
