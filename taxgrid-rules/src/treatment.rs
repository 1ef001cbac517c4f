//! Reading a customer segment's usage flag and percent cells.

use std::str::FromStr;

use rust_decimal::Decimal;
use taxgrid_core::{CoreError, Taxable, scale_percent};

const NOT_TAXABLE: [&str; 4] = ["NOT TAXABLE", "NONTAXABLE", "NON-TAXABLE", "EXEMPT"];
const TAXABLE: [&str; 1] = ["TAXABLE"];
/// Research is not finished; no position is asserted.
const UNCERTAIN: [&str; 2] = ["DRILL DOWN", "TO RESEARCH"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxableStatus {
    Known(Taxable),
    Uncertain,
    Unknown(String),
}

/// Classify a usage flag. Callers handle the empty cell before this.
pub fn classify_taxable(text: &str) -> TaxableStatus {
    let upper = text.trim().to_uppercase();
    if NOT_TAXABLE.contains(&upper.as_str()) {
        TaxableStatus::Known(Taxable::NotTaxable)
    } else if TAXABLE.contains(&upper.as_str()) {
        TaxableStatus::Known(Taxable::Taxable)
    } else if UNCERTAIN.contains(&upper.as_str()) {
        TaxableStatus::Uncertain
    } else {
        TaxableStatus::Unknown(text.trim().to_string())
    }
}

/// `"8.75%"` is a percentage and is divided by 100; `"0.0875"` is already a
/// fraction. Rounded to the record scale.
pub fn parse_percent(text: &str) -> Result<Decimal, CoreError> {
    let trimmed = text.trim();
    let invalid = || CoreError::InvalidPercent(trimmed.to_string());

    let value = match trimmed.strip_suffix('%') {
        Some(number) => Decimal::from_str(number.trim()).map_err(|_| invalid())? / Decimal::ONE_HUNDRED,
        None => Decimal::from_str(trimmed).map_err(|_| invalid())?,
    };
    Ok(scale_percent(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_values() {
        assert_eq!(classify_taxable("Taxable"), TaxableStatus::Known(Taxable::Taxable));
        assert_eq!(classify_taxable(" exempt "), TaxableStatus::Known(Taxable::NotTaxable));
        assert_eq!(classify_taxable("Non-Taxable"), TaxableStatus::Known(Taxable::NotTaxable));
        assert_eq!(classify_taxable("NOT TAXABLE"), TaxableStatus::Known(Taxable::NotTaxable));
        assert_eq!(classify_taxable("nontaxable"), TaxableStatus::Known(Taxable::NotTaxable));
    }

    #[test]
    fn test_classify_uncertain_is_not_unknown() {
        assert_eq!(classify_taxable("Drill Down"), TaxableStatus::Uncertain);
        assert_eq!(classify_taxable("to research"), TaxableStatus::Uncertain);
        assert_eq!(
            classify_taxable("Maybe"),
            TaxableStatus::Unknown("Maybe".to_string())
        );
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("100%").unwrap().to_string(), "1.000000");
        assert_eq!(parse_percent("8.75%").unwrap().to_string(), "0.087500");
        assert_eq!(parse_percent("1.0").unwrap().to_string(), "1.000000");
        assert_eq!(parse_percent(" 50 % ").unwrap().to_string(), "0.500000");
        assert_eq!(parse_percent("0.1234567").unwrap().to_string(), "0.123457");
    }

    #[test]
    fn test_parse_percent_rejects_text() {
        assert!(matches!(parse_percent("n/a"), Err(CoreError::InvalidPercent(v)) if v == "n/a"));
        assert!(parse_percent("%").is_err());
        assert!(parse_percent("").is_err());
    }
}
