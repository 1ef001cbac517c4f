//! Folding per-template issues into report entries.

use std::collections::BTreeMap;

use taxgrid_core::ProcessingError;

use crate::resolver::MissingTaxType;

pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// One `missing_tax_type` entry per (geocode, tax_cat), carrying at most
/// `sample_limit` item ids and the total number of distinct items.
pub fn summarize_missing_tax_types(
    file_name: &str,
    issues: &[MissingTaxType],
    sample_limit: usize,
) -> Vec<ProcessingError> {
    let mut grouped: BTreeMap<(&str, &str), Vec<String>> = BTreeMap::new();
    for issue in issues {
        let items = grouped
            .entry((issue.geocode.as_str(), issue.tax_cat.as_str()))
            .or_default();
        if !items.contains(&issue.item) {
            items.push(issue.item.clone());
        }
    }

    grouped
        .into_iter()
        .map(|((geocode, tax_cat), items)| {
            ProcessingError::missing_tax_type(file_name, geocode, tax_cat, &items, sample_limit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxgrid_core::ErrorType;

    fn issue(geocode: &str, tax_cat: &str, item: &str) -> MissingTaxType {
        MissingTaxType {
            geocode: geocode.to_string(),
            tax_cat: tax_cat.to_string(),
            item: item.to_string(),
        }
    }

    #[test]
    fn test_groups_by_geocode_and_category() {
        let issues = vec![
            issue("US1700000000", "05", "1.1.0.0"),
            issue("US1700000000", "05", "1.2.0.0"),
            issue("US1700000000", "05", "1.1.0.0"),
            issue("US1700000000", "06", "1.3.0.0"),
        ];
        let errors = summarize_missing_tax_types("Illinois Research", &issues, DEFAULT_SAMPLE_LIMIT);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.error_type == ErrorType::MissingTaxType));
        assert_eq!(errors[0].details["tax_cat"], "05");
        assert_eq!(errors[0].details["total_items"], 2);
        assert_eq!(errors[1].details["tax_cat"], "06");
    }

    #[test]
    fn test_samples_are_capped() {
        let issues: Vec<_> = (0..30)
            .map(|i| issue("US1700000000", "05", &format!("1.{i}.0.0")))
            .collect();
        let errors = summarize_missing_tax_types("Illinois Research", &issues, 10);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].details["sample_items"].as_array().unwrap().len(), 10);
        assert_eq!(errors[0].details["total_items"], 30);
    }

    #[test]
    fn test_no_issues_no_errors() {
        assert!(summarize_missing_tax_types("f", &[], 10).is_empty());
    }
}
