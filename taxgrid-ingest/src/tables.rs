//! CSV loaders for the reference tables.
//!
//! Every loader takes the raw CSV text (header row first, values may be quoted)
//! and returns the parsed table. Unusable rows are skipped with a warning; only
//! an unreadable document or a missing required column is an error.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use taxgrid_core::{is_state_geocode, normalize, pad_item_code};
use tracing::{debug, warn};

use crate::error::IngestError;

/// Column holding the raw product code in the product-code table.
const PRODUCT_CODE_ITEM_COLUMN: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodeTable {
    /// 2-letter state code -> state geocode.
    pub states: HashMap<String, String>,
    /// Uppercased city name -> every geocode the city covers, in file order.
    pub cities: HashMap<String, Vec<String>>,
}

impl GeocodeTable {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.cities.is_empty()
    }
}

/// Uppercased description -> tax category code.
pub type TaxCategoryTable = HashMap<String, String>;
/// (geocode, tax_cat) -> sorted, deduplicated tax types.
pub type TaxTypeTable = HashMap<(String, String), Vec<String>>;
/// Normalized research id -> padded product code.
pub type ProductCodeTable = HashMap<String, String>;

/// Key used for both storing and probing the tax-type table.
pub fn tax_type_key(geocode: &str, tax_cat: &str) -> (String, String) {
    (geocode.trim().to_uppercase(), tax_cat.trim().to_uppercase())
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes())
}

fn headers(rdr: &mut csv::Reader<&[u8]>, table: &'static str) -> Result<StringRecord, IngestError> {
    rdr.headers().cloned().map_err(|source| IngestError::Csv {
        name: table.to_string(),
        source,
    })
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn require_column(
    headers: &StringRecord,
    table: &'static str,
    column: &'static str,
) -> Result<usize, IngestError> {
    find_column(headers, column).ok_or(IngestError::MissingColumn { table, column })
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

pub fn parse_geocode_table(text: &str) -> Result<GeocodeTable, IngestError> {
    const TABLE: &str = "geocode";
    let mut rdr = reader(text);
    let headers = headers(&mut rdr, TABLE)?;
    let geocode_col = require_column(&headers, TABLE, "geocode")?;
    let state_col = require_column(&headers, TABLE, "state")?;
    let city_col = find_column(&headers, "city");

    let mut table = GeocodeTable::default();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(table = TABLE, line = line + 2, error = %e, "skipping unreadable row");
                continue;
            }
        };

        let geocode = cell(&record, geocode_col).to_uppercase();
        if geocode.is_empty() {
            continue;
        }
        let city = city_col.map(|c| cell(&record, c).to_uppercase()).unwrap_or_default();

        if city.is_empty() {
            let state = cell(&record, state_col).to_uppercase();
            if state.is_empty() {
                continue;
            }
            // county and district rows carry no city but are not state rows
            if !is_state_geocode(&geocode) {
                debug!(table = TABLE, geocode = %geocode, "skipping sub-state row without city");
                continue;
            }
            table.states.insert(state, geocode);
        } else {
            let geocodes = table.cities.entry(city).or_default();
            if !geocodes.contains(&geocode) {
                geocodes.push(geocode);
            }
        }
    }

    debug!(states = table.states.len(), cities = table.cities.len(), "loaded geocode table");
    Ok(table)
}

pub fn parse_tax_category_table(text: &str) -> Result<TaxCategoryTable, IngestError> {
    const TABLE: &str = "tax category";
    let mut rdr = reader(text);
    let headers = headers(&mut rdr, TABLE)?;
    let code_col = require_column(&headers, TABLE, "tax_cat")?;
    let desc_col = require_column(&headers, TABLE, "tax_cat_desc")?;

    let mut table = TaxCategoryTable::new();
    for result in rdr.records() {
        let Ok(record) = result else { continue };
        let desc = cell(&record, desc_col).to_uppercase();
        let code = cell(&record, code_col);
        if desc.is_empty() || code.is_empty() {
            continue;
        }
        table.insert(desc, code.to_string());
    }

    debug!(categories = table.len(), "loaded tax category table");
    Ok(table)
}

pub fn parse_tax_type_table(text: &str) -> Result<TaxTypeTable, IngestError> {
    const TABLE: &str = "tax type";
    let mut rdr = reader(text);
    let headers = headers(&mut rdr, TABLE)?;
    let geocode_col = require_column(&headers, TABLE, "geocode")?;
    let cat_col = require_column(&headers, TABLE, "tax_cat")?;
    let type_col = require_column(&headers, TABLE, "tax_type")?;

    let mut table = TaxTypeTable::new();
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(table = TABLE, line = line + 2, error = %e, "skipping unreadable row");
                continue;
            }
        };
        let (geocode, tax_cat) = tax_type_key(cell(&record, geocode_col), cell(&record, cat_col));
        let tax_type = cell(&record, type_col);
        if geocode.is_empty() || tax_cat.is_empty() || tax_type.is_empty() {
            continue;
        }
        table.entry((geocode, tax_cat)).or_default().push(tax_type.to_string());
    }

    for tax_types in table.values_mut() {
        tax_types.sort();
        tax_types.dedup();
    }

    debug!(keys = table.len(), "loaded tax type table");
    Ok(table)
}

/// Research id in column 0, raw product code in column 4. Later rows for the
/// same normalized id replace earlier ones.
pub fn parse_product_code_table(text: &str) -> Result<ProductCodeTable, IngestError> {
    const TABLE: &str = "product code";
    let mut rdr = reader(text);
    headers(&mut rdr, TABLE)?;

    let mut table = ProductCodeTable::new();
    for (line, result) in rdr.records().enumerate() {
        let row = line + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(table = TABLE, line = row, error = %e, "skipping unreadable row");
                continue;
            }
        };
        if record.len() <= PRODUCT_CODE_ITEM_COLUMN {
            warn!(table = TABLE, line = row, columns = record.len(), "insufficient columns, skipping");
            continue;
        }

        let research_id = cell(&record, 0);
        let item_code = cell(&record, PRODUCT_CODE_ITEM_COLUMN);
        if research_id.is_empty() || item_code.is_empty() {
            warn!(table = TABLE, line = row, "empty research_id or item code, skipping");
            continue;
        }
        table.insert(normalize(research_id), pad_item_code(item_code));
    }

    debug!(mappings = table.len(), "loaded product code table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEO: &str = "geocode,state,county,city,tax_district,jurisdiction
US1700000000,IL,,,,STATE
US0800000000,CO,,,,STATE
US08013A0025,CO,BOULDER,Boulder,,CITY
US17031A0003,IL,COOK,CHICAGO,,CITY
US17031A0047,IL,COOK,CHICAGO,,CITY
US17043A0053,IL,DUPAGE,Chicago,,CITY
US17031A0003,IL,COOK,CHICAGO,,CITY
";

    #[test]
    fn test_geocode_table_splits_states_and_cities() {
        let table = parse_geocode_table(GEO).unwrap();
        assert_eq!(table.states.len(), 2);
        assert_eq!(table.states["IL"], "US1700000000");
        assert_eq!(
            table.cities["CHICAGO"],
            vec!["US17031A0003", "US17031A0047", "US17043A0053"]
        );
        assert_eq!(table.cities["BOULDER"], vec!["US08013A0025"]);
    }

    #[test]
    fn test_county_row_before_state_row_does_not_become_state() {
        let text = "geocode,state,county,city
US17031A0000,IL,COOK,
US1700000000,IL,,
US0800000000,CO,,
US08013A0000,CO,BOULDER,
";
        let table = parse_geocode_table(text).unwrap();
        assert_eq!(table.states["IL"], "US1700000000");
        assert_eq!(table.states["CO"], "US0800000000");
        assert!(table.cities.is_empty());
    }

    #[test]
    fn test_geocode_table_requires_columns() {
        let err = parse_geocode_table("code,name\nUS1700000000,IL\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { column: "geocode", .. }));
    }

    #[test]
    fn test_tax_type_table_sorts_and_dedups() {
        let text = "geocode,tax_cat,tax_type
US1700000000,05,47
us1700000000 , 05 ,01
US1700000000,05,02
US1700000000,05,01
US1700000000,06,
";
        let table = parse_tax_type_table(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table[&tax_type_key("US1700000000", "05")],
            vec!["01", "02", "47"]
        );
    }

    #[test]
    fn test_tax_category_table_uppercases_descriptions() {
        let text = "tax_cat,tax_cat_desc\n05,\"Tangible Personal Property\"\n06,Digital Goods\n";
        let table = parse_tax_category_table(text).unwrap();
        assert_eq!(table["TANGIBLE PERSONAL PROPERTY"], "05");
        assert_eq!(table["DIGITAL GOODS"], "06");
    }

    #[test]
    fn test_product_code_table_normalizes_and_pads() {
        let text = "research_id,taxonomy_id,product_id,group,item,description
1.1.1.4.3.0.0.0,T1,P1,ZZZZ,5,Widgets
1.2.0.0.0.0.0.0,T2,P2,ZZZZ,22,Gadgets
1.3.0.0,T3,P3
,T4,P4,ZZZZ,7,No id
";
        let table = parse_product_code_table(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["1.1.1.4.3"], "005");
        assert_eq!(table["1.2"], "022");
    }
}
