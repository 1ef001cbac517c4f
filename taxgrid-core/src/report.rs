//! Error report entries and the `errors.json` document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::CoreError;
use crate::time::to_report_tz;

/// File name used for entries that summarize the whole run.
pub const ALL_FILES: &str = "all_files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The file contributed no records (no geocode, missing columns, I/O).
    FileProcessing,
    /// A row segment was dropped because its values could not be read.
    DataQuality,
    /// Templates dropped for lack of a tax type, one entry per (geocode, tax_cat).
    MissingTaxType,
    /// A city geocode found nothing to inherit from its parent state.
    CityReplication,
    /// Research ids without a product code, one entry per run.
    UnmappedProductIds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub error_type: ErrorType,
    pub message: String,
    pub file_name: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ProcessingError {
    pub fn new(error_type: ErrorType, file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            file_name: file_name.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn file_failure(file_name: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorType::FileProcessing, file_name, message)
    }

    pub fn data_quality(file_name: &str, row: usize, item: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorType::DataQuality, file_name, message)
            .with_detail("row", row)
            .with_detail("item", item)
    }

    /// One summarized entry for every template dropped under (geocode, tax_cat).
    pub fn missing_tax_type(
        file_name: &str,
        geocode: &str,
        tax_cat: &str,
        items: &[String],
        sample_limit: usize,
    ) -> Self {
        let sample: Vec<&String> = items.iter().take(sample_limit).collect();
        let message = format!(
            "No tax types found for geocode {geocode} and tax_cat {tax_cat}; {} record template(s) excluded",
            items.len()
        );
        Self::new(ErrorType::MissingTaxType, file_name, message)
            .with_detail("geocode", geocode)
            .with_detail("tax_cat", tax_cat)
            .with_detail("sample_items", json!(sample))
            .with_detail("total_items", items.len())
    }

    pub fn city_replication(city_geocode: &str, parent_geocode: &str, city_records: usize) -> Self {
        let message = format!(
            "City geocode {city_geocode} has no matching state-level tax treatments in parent geocode {parent_geocode} ({city_records} city records)"
        );
        Self::new(ErrorType::CityReplication, ALL_FILES, message)
            .with_detail("geocode", city_geocode)
            .with_detail("parent_geocode", parent_geocode)
    }

    /// `unmapped_ids` must already be sorted and deduplicated.
    pub fn unmapped_product_ids(unmapped_ids: &[String]) -> Self {
        let message = format!(
            "{} research id(s) have no product code mapping",
            unmapped_ids.len()
        );
        let impact = format!(
            "Records and product items for these {} research id(s) were excluded from records.csv and product_items.csv",
            unmapped_ids.len()
        );
        Self::new(ErrorType::UnmappedProductIds, ALL_FILES, message)
            .with_detail("unmapped_ids", json!(unmapped_ids))
            .with_detail("total_unmapped", unmapped_ids.len())
            .with_detail("impact", impact)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: String,
    pub total_errors: usize,
    pub errors: Vec<ProcessingError>,
}

impl ErrorReport {
    pub fn new(errors: Vec<ProcessingError>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: to_report_tz(now).to_rfc3339(),
            total_errors: errors.len(),
            errors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count_of(&self, error_type: ErrorType) -> usize {
        self.errors.iter().filter(|e| e.error_type == error_type).count()
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
