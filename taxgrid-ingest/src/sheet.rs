//! Research sheet exports: one CSV per sheet, header on a configurable row.

use std::ops::Range;
use std::path::Path;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::IngestError;

/// Header names of the columns the rules read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub admin: String,
    pub current_id: String,
    pub business_use: String,
    pub business_tax_cat: String,
    pub business_percent: String,
    pub personal_use: String,
    pub personal_tax_cat: String,
    pub personal_percent: String,
    /// First and last (inclusive) of the descriptive columns composed into
    /// catalog descriptions.
    pub description_first: String,
    pub description_last: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            admin: "Admin".to_string(),
            current_id: "Current ID".to_string(),
            business_use: "Business Use".to_string(),
            business_tax_cat: "Business tax_cat".to_string(),
            business_percent: "Business percent_taxable".to_string(),
            personal_use: "Personal Use".to_string(),
            personal_tax_cat: "Personal tax_cat".to_string(),
            personal_percent: "Personal percent_taxable".to_string(),
            description_first: "Level 1".to_string(),
            description_last: "Level 8".to_string(),
        }
    }
}

/// Column indices for one customer segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentColumns {
    pub usage: Option<usize>,
    pub tax_cat: Option<usize>,
    pub percent: Option<usize>,
}

/// Configured column roles resolved against one sheet's header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    pub admin: Option<usize>,
    pub current_id: Option<usize>,
    pub business: SegmentColumns,
    pub personal: SegmentColumns,
    /// Half-open index range of the descriptive columns.
    pub description: Option<Range<usize>>,
}

impl HeaderMap {
    pub fn from_header(header: &[String], names: &ColumnNames) -> Self {
        let find = |name: &str| {
            let index = header.iter().position(|h| h.trim() == name.trim());
            if index.is_none() {
                warn!(column = name, "column not found in header");
            }
            index
        };

        let description = match (find(&names.description_first), find(&names.description_last)) {
            (Some(first), Some(last)) if first <= last => Some(first..last + 1),
            (Some(_), Some(_)) => {
                warn!(
                    first = %names.description_first,
                    last = %names.description_last,
                    "description columns are out of order"
                );
                None
            }
            _ => None,
        };

        let map = Self {
            admin: find(&names.admin),
            current_id: find(&names.current_id),
            business: SegmentColumns {
                usage: find(&names.business_use),
                tax_cat: find(&names.business_tax_cat),
                percent: find(&names.business_percent),
            },
            personal: SegmentColumns {
                usage: find(&names.personal_use),
                tax_cat: find(&names.personal_tax_cat),
                percent: find(&names.personal_percent),
            },
            description,
        };
        debug!(mapped = map.mapped_count(), "built header map");
        map
    }

    /// Number of single-column roles that resolved.
    pub fn mapped_count(&self) -> usize {
        [
            self.admin,
            self.current_id,
            self.business.usage,
            self.business.tax_cat,
            self.business.percent,
            self.personal.usage,
            self.personal.tax_cat,
            self.personal.percent,
        ]
        .iter()
        .filter(|c| c.is_some())
        .count()
    }
}

/// Trimmed cell text; absent columns and short rows read as empty.
pub fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// One exported research sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSheet {
    /// Sheet name; jurisdictions are read from it.
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based row of the header within the export.
    pub header_row: usize,
}

impl SourceSheet {
    /// Parse an export whose header sits on 1-based `header_row`. Rows above
    /// the header are ignored. Blank lines are skipped by the CSV reader and
    /// do not count as rows.
    pub fn from_csv_str(name: &str, text: &str, header_row: usize) -> Result<Self, IngestError> {
        let header_row = header_row.max(1);
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut header = None;
        let mut rows = Vec::new();
        let mut seen = 0;
        for result in rdr.records() {
            let record = result.map_err(|source| IngestError::Csv {
                name: name.to_string(),
                source,
            })?;
            seen += 1;
            if seen < header_row {
                continue;
            }
            let values: Vec<String> = record.iter().map(str::to_string).collect();
            if seen == header_row {
                header = Some(values);
            } else {
                rows.push(values);
            }
        }

        let header = header.ok_or_else(|| IngestError::MissingHeader {
            name: name.to_string(),
            header_row,
            rows: seen,
        })?;

        info!(sheet = name, rows = rows.len(), "loaded source sheet");
        Ok(Self {
            name: name.to_string(),
            header,
            rows,
            header_row,
        })
    }

    /// Read an export from disk; the file stem is the sheet name.
    pub fn from_path(path: impl AsRef<Path>, header_row: usize) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_str(&sheet_name(path), &text, header_row)
    }

    /// 1-based sheet row of `rows[index]`.
    pub fn row_number(&self, index: usize) -> usize {
        self.header_row + 1 + index
    }
}

/// File stem of a sheet export.
pub fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
