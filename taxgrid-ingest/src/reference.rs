//! Read-only reference data: geocodes, tax categories, tax types, product codes.
//!
//! Tables load lazily on first use and are cached for the lifetime of the
//! value. A table that cannot be loaded degrades to empty (nothing resolves)
//! with a warning; callers that cannot run without geocodes check
//! [`ReferenceData::is_geocode_table_empty`].

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use taxgrid_core::parent_geocode;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::states::{state_code, state_names};
use crate::tables::{
    GeocodeTable, ProductCodeTable, TaxCategoryTable, TaxTypeTable, parse_geocode_table,
    parse_product_code_table, parse_tax_category_table, parse_tax_type_table, tax_type_key,
};

/// Tax category code used when a description has no mapping.
pub const UNMAPPED_TAX_CAT: &str = "00";

pub const GEOCODE_FILE: &str = "geo_state.csv";
pub const TAX_CATEGORY_FILE: &str = "tax_cat.csv";
pub const TAX_TYPE_FILE: &str = "unique_tax_type.csv";
pub const PRODUCT_CODE_FILE: &str = "product_code_mapping.csv";

/// Where one reference table comes from.
#[derive(Debug, Clone, Default)]
pub enum TableSource {
    File(PathBuf),
    Text(String),
    #[default]
    Missing,
}

impl TableSource {
    fn read(&self) -> Result<Option<String>, IngestError> {
        match self {
            TableSource::File(path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(|source| IngestError::Io {
                    path: path.clone(),
                    source,
                }),
            TableSource::Text(text) => Ok(Some(text.clone())),
            TableSource::Missing => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSources {
    pub geocodes: TableSource,
    pub tax_categories: TableSource,
    pub tax_types: TableSource,
    pub product_codes: TableSource,
}

impl ReferenceSources {
    /// The standard file names inside one directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            geocodes: TableSource::File(dir.join(GEOCODE_FILE)),
            tax_categories: TableSource::File(dir.join(TAX_CATEGORY_FILE)),
            tax_types: TableSource::File(dir.join(TAX_TYPE_FILE)),
            product_codes: TableSource::File(dir.join(PRODUCT_CODE_FILE)),
        }
    }

    pub fn with_geocodes(mut self, source: TableSource) -> Self {
        self.geocodes = source;
        self
    }

    pub fn with_tax_categories(mut self, source: TableSource) -> Self {
        self.tax_categories = source;
        self
    }

    pub fn with_tax_types(mut self, source: TableSource) -> Self {
        self.tax_types = source;
        self
    }

    pub fn with_product_codes(mut self, source: TableSource) -> Self {
        self.product_codes = source;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceStats {
    pub states: usize,
    pub cities: usize,
    pub tax_categories: usize,
    pub tax_type_keys: usize,
    pub product_codes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTarget {
    /// Postal code of a state.
    State(&'static str),
    /// Uppercased city name as keyed in the geocode table.
    City(String),
}

#[derive(Debug)]
struct NamePattern {
    name: String,
    pattern: Regex,
    target: NameTarget,
}

/// Match `name` as whole words, letting spaces in the name stand for any run
/// of separators in the searched text (`New_York`, `New-York`, `New York`).
fn name_regex(name: &str) -> Result<Regex, regex::Error> {
    let words: Vec<String> = name.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(
        r"(?i)(?:^|[^A-Za-z0-9]){}(?:$|[^A-Za-z0-9])",
        words.join(r"[\s_\-]+")
    ))
}

#[derive(Debug, Default)]
pub struct ReferenceData {
    sources: ReferenceSources,
    geocodes: OnceLock<GeocodeTable>,
    name_patterns: OnceLock<Vec<NamePattern>>,
    tax_categories: OnceLock<TaxCategoryTable>,
    tax_types: OnceLock<TaxTypeTable>,
    product_codes: OnceLock<ProductCodeTable>,
}

fn load_table<T: Default>(
    table: &str,
    source: &TableSource,
    parse: fn(&str) -> Result<T, IngestError>,
) -> T {
    let text = match source.read() {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!(table, "no source configured, using an empty table");
            return T::default();
        }
        Err(e) => {
            warn!(table, error = %e, "could not read table, using an empty table");
            return T::default();
        }
    };
    match parse(&text) {
        Ok(parsed) => {
            info!(table, "reference table loaded");
            parsed
        }
        Err(e) => {
            warn!(table, error = %e, "could not parse table, using an empty table");
            T::default()
        }
    }
}

impl ReferenceData {
    pub fn new(sources: ReferenceSources) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(ReferenceSources::from_dir(dir))
    }

    fn geocode_table(&self) -> &GeocodeTable {
        self.geocodes
            .get_or_init(|| load_table("geocode", &self.sources.geocodes, parse_geocode_table))
    }

    fn tax_category_table(&self) -> &TaxCategoryTable {
        self.tax_categories.get_or_init(|| {
            load_table("tax category", &self.sources.tax_categories, parse_tax_category_table)
        })
    }

    fn tax_type_table(&self) -> &TaxTypeTable {
        self.tax_types
            .get_or_init(|| load_table("tax type", &self.sources.tax_types, parse_tax_type_table))
    }

    fn product_code_table(&self) -> &ProductCodeTable {
        self.product_codes.get_or_init(|| {
            load_table("product code", &self.sources.product_codes, parse_product_code_table)
        })
    }

    /// State and city names ordered longest first; states win ties.
    fn name_patterns(&self) -> &[NamePattern] {
        self.name_patterns.get_or_init(|| {
            let mut candidates: Vec<(String, NameTarget)> = state_names()
                .filter_map(|name| state_code(name).map(|code| (name.to_string(), NameTarget::State(code))))
                .collect();
            candidates.extend(
                self.geocode_table()
                    .cities
                    .keys()
                    .map(|city| (city.clone(), NameTarget::City(city.clone()))),
            );
            candidates.sort_by(|(a_name, a_target), (b_name, b_target)| {
                b_name
                    .len()
                    .cmp(&a_name.len())
                    .then_with(|| {
                        let a_city = matches!(a_target, NameTarget::City(_));
                        let b_city = matches!(b_target, NameTarget::City(_));
                        a_city.cmp(&b_city)
                    })
                    .then_with(|| a_name.cmp(b_name))
            });

            candidates
                .into_iter()
                .filter_map(|(name, target)| match name_regex(&name) {
                    Ok(pattern) => Some(NamePattern { name, pattern, target }),
                    Err(e) => {
                        warn!(name = %name, error = %e, "skipping unmatchable jurisdiction name");
                        None
                    }
                })
                .collect()
        })
    }

    pub fn is_geocode_table_empty(&self) -> bool {
        self.geocode_table().is_empty()
    }

    /// State geocode for a full state name or a 2-letter code.
    pub fn resolve_geocode(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let states = &self.geocode_table().states;
        if let Some(geocode) = states.get(&name.to_uppercase()) {
            return Some(geocode.as_str());
        }
        state_code(name).and_then(|code| states.get(code)).map(String::as_str)
    }

    /// Every geocode of a city. Falls back to the state geocode when `name`
    /// is a state.
    pub fn resolve_geocodes(&self, name: &str) -> Vec<String> {
        let key = name.trim().to_uppercase();
        if let Some(geocodes) = self.geocode_table().cities.get(&key) {
            return geocodes.clone();
        }
        self.resolve_geocode(name).map(|g| vec![g.to_string()]).unwrap_or_default()
    }

    /// Geocodes for a source named after its jurisdiction, e.g.
    /// `"West Virginia Sales Tax Research"` or `"Chicago_Research"`.
    ///
    /// Names are searched anywhere in `file_name`, longest first, so a name
    /// never loses to a shorter name it contains (`West Virginia` before
    /// `Virginia`). A name only matches as whole words, with `_` and `-`
    /// counted as separators: `Kansas` does not match inside `Arkansas`. The
    /// `<Name> Sales Tax Research` export name is one case of this; reordered
    /// or suffixed names (`Sales Tax Research - Colorado`, `.xlsx`) resolve
    /// the same way.
    pub fn geocodes_for_source(&self, file_name: &str) -> Vec<String> {
        for candidate in self.name_patterns() {
            if !candidate.pattern.is_match(file_name) {
                continue;
            }
            let geocodes = match &candidate.target {
                NameTarget::State(code) => self
                    .geocode_table()
                    .states
                    .get(*code)
                    .map(|g| vec![g.clone()])
                    .unwrap_or_default(),
                NameTarget::City(city) => self.resolve_geocodes(city),
            };
            if geocodes.is_empty() {
                debug!(file_name, name = %candidate.name, "name matched but has no geocode");
                continue;
            }
            debug!(file_name, name = %candidate.name, count = geocodes.len(), "resolved source geocodes");
            return geocodes;
        }
        Vec::new()
    }

    /// Exact (case- and whitespace-insensitive) tax-type lookup.
    pub fn tax_type_lookup(&self, geocode: &str, tax_cat: &str) -> Option<&[String]> {
        let key = tax_type_key(geocode, tax_cat);
        if key.0.is_empty() || key.1.is_empty() {
            return None;
        }
        self.tax_type_table().get(&key).map(Vec::as_slice)
    }

    /// Exact geocode first, then its parent state geocode. The two are never
    /// merged.
    pub fn tax_type_with_fallback(&self, geocode: &str, tax_cat: &str) -> Option<&[String]> {
        if let Some(found) = self.tax_type_lookup(geocode, tax_cat) {
            return Some(found);
        }
        let parent = parent_geocode(geocode);
        if parent == geocode.trim().to_uppercase() {
            return None;
        }
        let found = self.tax_type_lookup(&parent, tax_cat);
        if found.is_some() {
            debug!(geocode, parent = %parent, tax_cat, "using parent geocode tax types");
        }
        found
    }

    /// Tax category code for a description; `"00"` when unmapped.
    pub fn tax_cat_code(&self, description: &str) -> String {
        let key = description.trim().to_uppercase();
        if key.is_empty() {
            return UNMAPPED_TAX_CAT.to_string();
        }
        match self.tax_category_table().get(&key) {
            Some(code) => code.clone(),
            None => {
                warn!(description, "no tax category code, using {}", UNMAPPED_TAX_CAT);
                UNMAPPED_TAX_CAT.to_string()
            }
        }
    }

    /// Product code for an already-normalized research id.
    pub fn product_code(&self, normalized_id: &str) -> Option<&str> {
        self.product_code_table().get(normalized_id).map(String::as_str)
    }

    pub fn product_code_count(&self) -> usize {
        self.product_code_table().len()
    }

    pub fn stats(&self) -> ReferenceStats {
        let geo = self.geocode_table();
        ReferenceStats {
            states: geo.states.len(),
            cities: geo.cities.len(),
            tax_categories: self.tax_category_table().len(),
            tax_type_keys: self.tax_type_table().len(),
            product_codes: self.product_code_table().len(),
        }
    }
}
