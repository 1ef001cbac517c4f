//! Breadcrumb descriptions for catalog entries.

use std::collections::HashMap;
use std::ops::Range;

use taxgrid_core::{normalize, parent_ids};

const SEPARATOR: &str = " | ";
/// Stands in for a level with no text so the breadcrumb keeps its shape.
const EMPTY_LEVEL: &str = " ";

#[derive(Debug, Clone, Default)]
pub struct DescriptionComposer {
    texts: HashMap<String, String>,
}

impl DescriptionComposer {
    /// Index each row's descriptive text (the trimmed cells of `span`,
    /// concatenated) by its normalized id. The first row for an id wins.
    pub fn from_rows(rows: &[Vec<String>], id_index: usize, span: Range<usize>) -> Self {
        let mut texts = HashMap::new();
        for row in rows {
            let id = row.get(id_index).map(|s| s.trim()).unwrap_or("");
            if id.is_empty() {
                continue;
            }
            let text: String = span
                .clone()
                .filter_map(|i| row.get(i))
                .map(|s| s.trim())
                .collect();
            texts.entry(normalize(id)).or_insert(text);
        }
        Self { texts }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn level_text(&self, id: &str) -> &str {
        match self.texts.get(&normalize(id)) {
            Some(text) if !text.is_empty() => text,
            _ => EMPTY_LEVEL,
        }
    }

    /// Ancestors (shallowest first) then `id` itself, joined with `" | "`.
    pub fn compose(&self, id: &str) -> String {
        let mut levels: Vec<&str> = parent_ids(id).iter().map(|p| self.level_text(p)).collect();
        levels.push(self.level_text(id));
        levels.join(SEPARATOR)
    }
}
