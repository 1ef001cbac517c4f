//! Tax record types: one jurisdiction line item per (geocode, tax type).
//!
//! Column order and widths follow the downstream rate-table import format, so
//! `Record::CSV_HEADERS` and `Record::csv_fields` must stay in lockstep.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Catalog grouping code used for every generated record and product item.
pub const DEFAULT_GROUP: &str = "ZZZZ";
pub const DEFAULT_PROVIDER: &str = "99";
pub const DEFAULT_TRANSACTION: &str = "01";
pub const DEFAULT_PER_TAXABLE_TYPE: &str = "01";
/// Fractional digits of `percent_taxable`.
pub const PERCENT_SCALE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CustomerType {
    /// Business use segment.
    #[serde(rename = "BB")]
    Business,
    /// Personal / general use segment.
    #[serde(rename = "99")]
    Personal,
}

impl CustomerType {
    pub fn code(&self) -> &'static str {
        match self {
            CustomerType::Business => "BB",
            CustomerType::Personal => "99",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CustomerType::Business => "business",
            CustomerType::Personal => "personal",
        }
    }
}

/// Resolved taxable status. Uncertain research states never reach a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Taxable {
    NotTaxable,
    Taxable,
}

impl Taxable {
    pub fn as_int(&self) -> u8 {
        match self {
            Taxable::NotTaxable => 0,
            Taxable::Taxable => 1,
        }
    }
}

/// Round to the output scale and pin the scale so `to_string` always
/// renders six fractional digits (`1` -> `1.000000`).
pub fn scale_percent(value: Decimal) -> Decimal {
    let mut scaled = value.round_dp(PERCENT_SCALE);
    scaled.rescale(PERCENT_SCALE);
    scaled
}

/// A record before tax-type expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    pub geocode: String,
    pub tax_auth_id: String,
    pub group: String,
    /// Hierarchical research id; converted to a product code after aggregation.
    pub item: String,
    pub customer: CustomerType,
    pub taxable: Taxable,
    pub tax_cat: String,
    pub effective: String,
    pub percent_taxable: Decimal,
}

impl RecordTemplate {
    pub fn new(
        geocode: impl Into<String>,
        item: impl Into<String>,
        customer: CustomerType,
        taxable: Taxable,
        tax_cat: impl Into<String>,
        percent_taxable: Decimal,
        effective: impl Into<String>,
    ) -> Self {
        Self {
            geocode: geocode.into(),
            tax_auth_id: String::new(),
            group: DEFAULT_GROUP.to_string(),
            item: item.into(),
            customer,
            taxable,
            tax_cat: tax_cat.into(),
            effective: effective.into(),
            percent_taxable: scale_percent(percent_taxable),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn to_record(&self, tax_type: &str) -> Record {
        Record {
            geocode: self.geocode.clone(),
            tax_auth_id: self.tax_auth_id.clone(),
            group: self.group.clone(),
            item: self.item.clone(),
            customer: self.customer,
            provider: DEFAULT_PROVIDER.to_string(),
            transaction: DEFAULT_TRANSACTION.to_string(),
            taxable: self.taxable,
            tax_type: tax_type.trim().to_string(),
            tax_cat: self.tax_cat.clone(),
            effective: self.effective.clone(),
            per_taxable_type: DEFAULT_PER_TAXABLE_TYPE.to_string(),
            percent_taxable: self.percent_taxable,
        }
    }
}

/// One output row of `records.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub geocode: String,
    pub tax_auth_id: String,
    pub group: String,
    pub item: String,
    pub customer: CustomerType,
    pub provider: String,
    pub transaction: String,
    pub taxable: Taxable,
    pub tax_type: String,
    pub tax_cat: String,
    pub effective: String,
    pub per_taxable_type: String,
    pub percent_taxable: Decimal,
}

impl Record {
    pub const CSV_HEADERS: [&'static str; 13] = [
        "geocode",
        "tax_auth_id",
        "group",
        "item",
        "customer",
        "provider",
        "transaction",
        "taxable",
        "tax_type",
        "tax_cat",
        "effective",
        "per_taxable_type",
        "percent_taxable",
    ];

    /// Check the fixed-width columns.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_len("geocode", &self.geocode, 12)?;
        check_len("provider", &self.provider, 2)?;
        check_len("transaction", &self.transaction, 2)?;
        check_len("tax_type", &self.tax_type, 2)?;
        check_len("tax_cat", &self.tax_cat, 2)?;
        check_len("per_taxable_type", &self.per_taxable_type, 2)?;
        if self.group.chars().count() < 4 {
            return Err(CoreError::InvalidRecord {
                field: "group",
                reason: format!("must be at least 4 characters, got {}", self.group.chars().count()),
            });
        }
        Ok(())
    }

    pub fn with_tax_type(&self, tax_type: &str) -> Self {
        Self {
            tax_type: tax_type.to_string(),
            ..self.clone()
        }
    }

    pub fn with_geocode(&self, geocode: &str) -> Self {
        Self {
            geocode: geocode.to_string(),
            ..self.clone()
        }
    }

    pub fn with_item(&self, item: &str) -> Self {
        Self {
            item: item.to_string(),
            ..self.clone()
        }
    }

    /// Field values in `CSV_HEADERS` order.
    pub fn csv_fields(&self) -> [String; 13] {
        [
            self.geocode.clone(),
            self.tax_auth_id.clone(),
            self.group.clone(),
            self.item.clone(),
            self.customer.code().to_string(),
            self.provider.clone(),
            self.transaction.clone(),
            self.taxable.as_int().to_string(),
            self.tax_type.clone(),
            self.tax_cat.clone(),
            self.effective.clone(),
            self.per_taxable_type.clone(),
            scale_percent(self.percent_taxable).to_string(),
        ]
    }
}

fn check_len(field: &'static str, value: &str, expected: usize) -> Result<(), CoreError> {
    let len = value.chars().count();
    if len != expected {
        return Err(CoreError::InvalidRecord {
            field,
            reason: format!("must be {expected} characters, got {len}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn template() -> RecordTemplate {
        RecordTemplate::new(
            "US1700000000",
            "1.1.1.4.3.0.0.0",
            CustomerType::Personal,
            Taxable::Taxable,
            "05",
            Decimal::from_str("0.0875").unwrap(),
            "1999-01-01",
        )
    }

    #[test]
    fn test_template_expands_with_defaults() {
        let rec = template().to_record("47");
        assert_eq!(rec.group, "ZZZZ");
        assert_eq!(rec.provider, "99");
        assert_eq!(rec.transaction, "01");
        assert_eq!(rec.per_taxable_type, "01");
        assert_eq!(rec.tax_type, "47");
        assert_eq!(rec.tax_auth_id, "");
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn test_csv_fields_order_and_format() {
        let rec = template().to_record("01");
        let fields = rec.csv_fields();
        assert_eq!(fields[0], "US1700000000");
        assert_eq!(fields[4], "99");
        assert_eq!(fields[7], "1");
        assert_eq!(fields[10], "1999-01-01");
        assert_eq!(fields[12], "0.087500");
    }

    #[test]
    fn test_scale_percent_pads_and_rounds() {
        assert_eq!(scale_percent(Decimal::ONE).to_string(), "1.000000");
        assert_eq!(
            scale_percent(Decimal::from_str("0.12345678").unwrap()).to_string(),
            "0.123457"
        );
    }

    #[test]
    fn test_validate_rejects_bad_widths() {
        let rec = template().to_record("01").with_geocode("US17");
        assert!(matches!(
            rec.validate(),
            Err(CoreError::InvalidRecord { field: "geocode", .. })
        ));

        let rec = template().to_record("1");
        assert!(rec.validate().is_err());

        let rec = template().with_group("ZZ").to_record("01");
        assert!(matches!(
            rec.validate(),
            Err(CoreError::InvalidRecord { field: "group", .. })
        ));
    }

    #[test]
    fn test_clone_helpers_only_touch_one_field() {
        let rec = template().to_record("01");
        let city = rec.with_geocode("US17031A0003");
        assert_eq!(city.geocode, "US17031A0003");
        assert_eq!(city.tax_type, rec.tax_type);
        assert_eq!(city.item, rec.item);

        let other = rec.with_tax_type("02");
        assert_eq!(other.tax_type, "02");
        assert_eq!(other.geocode, rec.geocode);
    }

    #[test]
    fn test_customer_codes() {
        assert_eq!(CustomerType::Business.code(), "BB");
        assert_eq!(CustomerType::Personal.code(), "99");
        assert_eq!(Taxable::NotTaxable.as_int(), 0);
    }
}
