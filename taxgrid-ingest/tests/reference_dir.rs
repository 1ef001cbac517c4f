use std::fs;

use taxgrid_ingest::{ReferenceData, SourceSheet};
use tempfile::TempDir;

fn write_reference_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("geo_state.csv"),
        "geocode,state,county,city\n\"US1700000000\",\"IL\",,\nUS17031A0003,IL,COOK,CHICAGO\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("tax_cat.csv"),
        "tax_cat,tax_cat_desc\n05,Tangible Personal Property\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("unique_tax_type.csv"),
        "geocode,tax_cat,tax_type\nUS1700000000,05,01\nUS1700000000,05,02\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("product_code_mapping.csv"),
        "research_id,taxonomy_id,product_id,group,item,description\n1.1.0.0,T,P,ZZZZ,7,Widgets\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_loads_every_table_from_a_directory() {
    let dir = write_reference_dir();
    let data = ReferenceData::from_dir(dir.path());

    let stats = data.stats();
    assert_eq!(stats.states, 1);
    assert_eq!(stats.cities, 1);
    assert_eq!(stats.tax_categories, 1);
    assert_eq!(stats.tax_type_keys, 1);
    assert_eq!(stats.product_codes, 1);

    assert_eq!(data.geocodes_for_source("Illinois Sales Tax Research"), vec!["US1700000000"]);
    assert_eq!(data.tax_cat_code("tangible personal property"), "05");
    assert_eq!(data.product_code("1.1"), Some("007"));
    assert_eq!(
        data.tax_type_with_fallback("US17031A0003", "05").unwrap(),
        ["01", "02"]
    );
}

#[test]
fn test_missing_directory_yields_empty_tables() {
    let dir = TempDir::new().unwrap();
    let data = ReferenceData::from_dir(dir.path().join("absent"));
    assert!(data.is_geocode_table_empty());
    assert_eq!(data.tax_cat_code("anything"), "00");
}

#[test]
fn test_sheet_name_comes_from_the_file_stem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Ohio Sales Tax Research.csv");
    fs::write(&path, "title\n\n\nAdmin,Current ID\nTag Level,1.1.0.0\n").unwrap();

    let sheet = SourceSheet::from_path(&path, 2).unwrap();
    assert_eq!(sheet.name, "Ohio Sales Tax Research");
    assert_eq!(sheet.header, vec!["Admin", "Current ID"]);
    assert_eq!(sheet.rows.len(), 1);
}
