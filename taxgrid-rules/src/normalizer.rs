//! Research id → product code conversion.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use taxgrid_core::{ProductItem, Record, dedup_product_items, normalize};
use taxgrid_ingest::ReferenceData;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizerStats {
    pub total_mappings: usize,
    pub unmapped: usize,
}

/// Converts ids and remembers the ones that had no mapping.
///
/// Conversion takes `&mut self`; run it once, after per-file results have
/// been merged.
#[derive(Debug)]
pub struct ProductCodeNormalizer {
    reference: Arc<ReferenceData>,
    unmapped: BTreeSet<String>,
}

impl ProductCodeNormalizer {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self {
            reference,
            unmapped: BTreeSet::new(),
        }
    }

    /// `None` is not an id and is not tracked. An empty id is tracked as
    /// unmapped. Misses track the id as given, not its normalized form.
    pub fn convert(&mut self, research_id: Option<&str>) -> Option<String> {
        let id = research_id?;
        if id.is_empty() {
            self.unmapped.insert(String::new());
            return None;
        }

        let normalized = normalize(id);
        match self.reference.product_code(&normalized) {
            Some(code) => Some(code.to_string()),
            None => {
                debug!(research_id = id, normalized = %normalized, "no product code");
                self.unmapped.insert(id.to_string());
                None
            }
        }
    }

    /// Records whose item maps, with `item` replaced by the product code.
    pub fn convert_records(&mut self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_iter()
            .filter_map(|record| {
                self.convert(Some(&record.item))
                    .map(|code| record.with_item(&code))
            })
            .collect()
    }

    /// Catalog entries whose item maps, converted then deduplicated by code.
    pub fn convert_product_items(&mut self, items: Vec<ProductItem>) -> Vec<ProductItem> {
        let converted: Vec<ProductItem> = items
            .into_iter()
            .filter_map(|item| self.convert(Some(&item.item)).map(|code| item.with_item(&code)))
            .collect();
        dedup_product_items(converted)
    }

    /// Sorted.
    pub fn unmapped_ids(&self) -> Vec<String> {
        self.unmapped.iter().cloned().collect()
    }

    pub fn stats(&self) -> NormalizerStats {
        NormalizerStats {
            total_mappings: self.reference.product_code_count(),
            unmapped: self.unmapped.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxgrid_core::{CustomerType, RecordTemplate, Taxable};
    use taxgrid_ingest::{ReferenceSources, TableSource};

    fn normalizer() -> ProductCodeNormalizer {
        let table = "research_id,taxonomy_id,product_id,group,item,description
1.1.1.4.3.0.0.0,T,P,ZZZZ,5,Widgets
1.2.0.0.0.0.0.0,T,P,ZZZZ,22,Gadgets
2.0.0.0,T,P,ZZZZ,1234,Long code
0.0.0.0,T,P,ZZZZ,9,Root
";
        let reference = ReferenceData::new(
            ReferenceSources::default().with_product_codes(TableSource::Text(table.to_string())),
        );
        ProductCodeNormalizer::new(Arc::new(reference))
    }

    fn record(item: &str) -> Record {
        RecordTemplate::new(
            "US1700000000",
            item,
            CustomerType::Personal,
            Taxable::Taxable,
            "05",
            rust_decimal::Decimal::ONE,
            "1999-01-01",
        )
        .to_record("01")
    }

    #[test]
    fn test_convert_hits_normalized_key() {
        let mut n = normalizer();
        assert_eq!(n.convert(Some("1.1.1.4.3.0.0.0")).as_deref(), Some("005"));
        assert_eq!(n.convert(Some("1.1.1.4.3")).as_deref(), Some("005"));
        assert_eq!(n.convert(Some("1.2")).as_deref(), Some("022"));
        assert_eq!(n.convert(Some("2.0")).as_deref(), Some("1234"));
        assert_eq!(n.convert(Some("0.0.0.0")).as_deref(), Some("009"));
        assert!(n.unmapped_ids().is_empty());
    }

    #[test]
    fn test_misses_track_original_id() {
        let mut n = normalizer();
        assert_eq!(n.convert(Some("9.9.0.0")), None);
        assert_eq!(n.convert(Some("3.0")), None);
        assert_eq!(n.unmapped_ids(), vec!["3.0", "9.9.0.0"]);
    }

    #[test]
    fn test_empty_tracked_none_not() {
        let mut n = normalizer();
        assert_eq!(n.convert(None), None);
        assert!(n.unmapped_ids().is_empty());
        assert_eq!(n.convert(Some("")), None);
        assert_eq!(n.unmapped_ids(), vec![""]);
        assert_eq!(n.stats(), NormalizerStats { total_mappings: 4, unmapped: 1 });
    }

    #[test]
    fn test_convert_records_drops_unmapped() {
        let mut n = normalizer();
        let out = n.convert_records(vec![record("1.1.1.4.3.0.0.0"), record("7.7.0.0")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item, "005");
        assert_eq!(n.unmapped_ids(), vec!["7.7.0.0"]);
    }

    #[test]
    fn test_convert_product_items_dedups_by_code() {
        let mut n = normalizer();
        let out = n.convert_product_items(vec![
            ProductItem::new("1.1.1.4.3.0.0.0", "First"),
            ProductItem::new("1.1.1.4.3", "Second"),
            ProductItem::new("1.2.0.0", "Gadgets"),
            ProductItem::new("8.0.0.0", "Unmapped"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].item, "005");
        assert_eq!(out[0].description, "First");
        assert_eq!(out[1].item, "022");
    }
}
