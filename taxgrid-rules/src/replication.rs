//! Copying state-level treatments onto city geocodes.
//!
//! A city sheet usually lists only the items whose treatment differs from the
//! state. For every (group, item, customer, provider) the city does carry,
//! the state's records for that key are copied to the city unless the city
//! already has the same (tax_type, tax_cat).

use std::collections::{HashMap, HashSet};

use taxgrid_core::{ProcessingError, Record, is_state_geocode, parent_geocode};
use tracing::{debug, info};

type TreatmentKey<'a> = (&'a str, &'a str, taxgrid_core::CustomerType, &'a str);

fn treatment_key(record: &Record) -> TreatmentKey<'_> {
    (
        record.group.as_str(),
        record.item.as_str(),
        record.customer,
        record.provider.as_str(),
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicationOutcome {
    /// Input records followed by the copies.
    pub records: Vec<Record>,
    pub errors: Vec<ProcessingError>,
    pub replicated: usize,
}

pub fn replicate_state_treatments(records: Vec<Record>) -> ReplicationOutcome {
    let (copies, errors) = city_copies(&records);
    let replicated = copies.len();

    let mut records = records;
    records.extend(copies);
    ReplicationOutcome {
        records,
        errors,
        replicated,
    }
}

fn city_copies(records: &[Record]) -> (Vec<Record>, Vec<ProcessingError>) {
    let mut cities: Vec<&str> = Vec::new();
    for record in records {
        let geocode = record.geocode.as_str();
        if !is_state_geocode(geocode) && !cities.contains(&geocode) {
            cities.push(geocode);
        }
    }
    if cities.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let mut by_geocode: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in records {
        by_geocode.entry(record.geocode.as_str()).or_default().push(record);
    }

    let mut copies = Vec::new();
    let mut errors = Vec::new();

    for city in &cities {
        let parent = parent_geocode(city);
        let city_records = by_geocode.get(city).map(Vec::as_slice).unwrap_or(&[]);
        let state_records = by_geocode.get(parent.as_str()).map(Vec::as_slice).unwrap_or(&[]);

        let mut present: HashMap<TreatmentKey<'_>, HashSet<(&str, &str)>> = HashMap::new();
        for record in city_records {
            present
                .entry(treatment_key(record))
                .or_default()
                .insert((record.tax_type.as_str(), record.tax_cat.as_str()));
        }

        let before = copies.len();
        for state_record in state_records {
            let Some(existing) = present.get_mut(&treatment_key(state_record)) else {
                continue;
            };
            if existing.insert((state_record.tax_type.as_str(), state_record.tax_cat.as_str())) {
                copies.push(state_record.with_geocode(city));
            }
        }

        let added = copies.len() - before;
        if added == 0 {
            errors.push(ProcessingError::city_replication(city, &parent, city_records.len()));
        } else {
            debug!(city = *city, parent = %parent, added, "replicated state treatments");
        }
    }

    info!(cities = cities.len(), replicated = copies.len(), "city replication complete");
    (copies, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use taxgrid_core::{CustomerType, RecordTemplate, Taxable};

    fn record(geocode: &str, item: &str, tax_cat: &str, tax_type: &str) -> Record {
        RecordTemplate::new(
            geocode,
            item,
            CustomerType::Personal,
            Taxable::Taxable,
            tax_cat,
            Decimal::ONE,
            "1999-01-01",
        )
        .to_record(tax_type)
    }

    #[test]
    fn test_state_only_records_unchanged() {
        let input = vec![record("US1700000000", "1.1", "05", "01")];
        let out = replicate_state_treatments(input.clone());
        assert_eq!(out.records, input);
        assert!(out.errors.is_empty());
        assert_eq!(out.replicated, 0);
    }

    #[test]
    fn test_copies_missing_composites_only() {
        let input = vec![
            record("US1700000000", "1.1", "05", "01"),
            record("US1700000000", "1.1", "05", "02"),
            record("US1700000000", "1.1", "06", "47"),
            record("US1700000000", "1.9", "05", "01"),
            record("US17031A0003", "1.1", "05", "01"),
        ];
        let out = replicate_state_treatments(input);

        assert_eq!(out.replicated, 2);
        let copied: Vec<(&str, &str, &str)> = out.records[5..]
            .iter()
            .map(|r| (r.geocode.as_str(), r.tax_cat.as_str(), r.tax_type.as_str()))
            .collect();
        assert_eq!(
            copied,
            vec![("US17031A0003", "05", "02"), ("US17031A0003", "06", "47")]
        );
        // item 1.9 is not carried by the city
        assert!(out.records.iter().all(|r| !(r.geocode == "US17031A0003" && r.item == "1.9")));
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_city_without_matches_reports_error() {
        let input = vec![
            record("US1700000000", "1.1", "05", "01"),
            record("US17031A0003", "1.1", "05", "01"),
            record("US17031A0003", "1.2", "05", "01"),
        ];
        let out = replicate_state_treatments(input);
        assert_eq!(out.replicated, 0);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(
            out.errors[0].message,
            "City geocode US17031A0003 has no matching state-level tax treatments in parent geocode US1700000000 (2 city records)"
        );
    }
}
