//! Product catalog entries.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tracing::warn;

use crate::record::DEFAULT_GROUP;

/// Width of a catalog product code.
pub const ITEM_CODE_WIDTH: usize = 3;

/// Zero-pad a raw product code on the left to `ITEM_CODE_WIDTH`.
///
/// Longer codes pass through untouched: truncating would silently point at a
/// different product.
pub fn pad_item_code(item_code: &str) -> String {
    let code = item_code.trim();
    if code.is_empty() {
        return "0".repeat(ITEM_CODE_WIDTH);
    }
    if code.chars().count() > ITEM_CODE_WIDTH {
        warn!(code, width = ITEM_CODE_WIDTH, "item code is longer than the catalog width, not truncating");
        return code.to_string();
    }
    format!("{:0>width$}", code, width = ITEM_CODE_WIDTH)
}

/// One row of `product_items.csv`.
///
/// Identity is the `item` code alone; two entries with the same code are the
/// same product whatever their descriptions say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductItem {
    pub group: String,
    pub item: String,
    pub description: String,
}

impl ProductItem {
    pub const CSV_HEADERS: [&'static str; 3] = ["group", "item", "description"];

    pub fn new(item: impl AsRef<str>, description: impl AsRef<str>) -> Self {
        Self {
            group: DEFAULT_GROUP.to_string(),
            item: item.as_ref().trim().to_string(),
            description: description.as_ref().trim().to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.item.is_empty() && !self.description.is_empty()
    }

    pub fn with_item(&self, item: &str) -> Self {
        Self {
            item: item.to_string(),
            ..self.clone()
        }
    }

    pub fn csv_fields(&self) -> [String; 3] {
        [self.group.clone(), self.item.clone(), self.description.clone()]
    }
}

impl PartialEq for ProductItem {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item
    }
}

impl Eq for ProductItem {}

impl Hash for ProductItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item.hash(state);
    }
}

/// Keep the first entry per item code, preserving input order.
pub fn dedup_product_items(items: Vec<ProductItem>) -> Vec<ProductItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.item.clone()))
        .collect()
}
