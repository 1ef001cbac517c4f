//! Writers for records.csv, product_items.csv and errors.json.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

use taxgrid_core::time::output_folder_name;
use taxgrid_core::{ErrorReport, ProductItem, Record};

pub const RECORDS_FILE: &str = "records.csv";
pub const PRODUCT_ITEMS_FILE: &str = "product_items.csv";
pub const ERRORS_FILE: &str = "errors.json";

/// `<output_dir>/output-YYYYMMDD-HHMM`, created if needed.
pub fn create_run_folder(output_dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let folder = output_dir.join(output_folder_name(now));
    fs::create_dir_all(&folder).with_context(|| format!("create {}", folder.display()))?;
    Ok(folder)
}

fn quoted_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))
}

pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let mut w = quoted_writer(path)?;
    w.write_record(Record::CSV_HEADERS)?;
    for record in records {
        w.write_record(record.csv_fields())
            .with_context(|| format!("write {}", path.display()))?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

pub fn write_product_items(path: &Path, items: &[ProductItem]) -> Result<()> {
    let mut w = quoted_writer(path)?;
    w.write_record(ProductItem::CSV_HEADERS)?;
    for item in items {
        w.write_record(item.csv_fields())
            .with_context(|| format!("write {}", path.display()))?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

pub fn write_error_report(path: &Path, report: &ErrorReport) -> Result<()> {
    let json = report.to_json_pretty().context("serialize error report")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use taxgrid_core::{CustomerType, Decimal, RecordTemplate, Taxable};
    use tempfile::TempDir;

    #[test]
    fn test_every_field_is_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(RECORDS_FILE);
        let record = RecordTemplate::new(
            "US1700000000",
            "005",
            CustomerType::Business,
            Taxable::NotTaxable,
            "05",
            Decimal::ONE,
            "1999-01-01",
        )
        .to_record("01");
        write_records(&path, &[record]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""geocode","tax_auth_id","group","item","customer","provider","transaction","taxable","tax_type","tax_cat","effective","per_taxable_type","percent_taxable""#
        );
        assert_eq!(
            lines.next().unwrap(),
            r#""US1700000000","","ZZZZ","005","BB","99","01","0","01","05","1999-01-01","01","1.000000""#
        );
    }

    #[test]
    fn test_internal_quotes_are_doubled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PRODUCT_ITEMS_FILE);
        write_product_items(&path, &[ProductItem::new("005", r#"12" pipe | fittings"#)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            r#""ZZZZ","005","12"" pipe | fittings""#
        );
    }

    #[test]
    fn test_run_folder_is_named_in_pacific_time() {
        let dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 3, 30, 0).unwrap();
        let folder = create_run_folder(dir.path(), now).unwrap();
        assert!(folder.ends_with("output-20260114-1930"));
        assert!(folder.is_dir());
    }
}
