use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;

use taxgrid_core::time::is_valid_effective_date;
use taxgrid_rules::resolver::DEFAULT_EFFECTIVE_DATE;
use taxgrid_rules::{ProcessorSettings, ResolverSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory of research sheet exports, one CSV per sheet.
    pub sheets_dir: PathBuf,
    /// Directory holding geo_state.csv, tax_cat.csv, unique_tax_type.csv and
    /// product_code_mapping.csv.
    pub reference_dir: PathBuf,
    /// Each run writes into a fresh `output-YYYYMMDD-HHMM` folder under here.
    pub output_dir: PathBuf,
    /// 1-based row of the header in every sheet export.
    pub header_row: usize,
    pub max_concurrency: usize,
    pub effective_date: String,
    pub replicate_state_treatments: bool,
    pub processing: ProcessorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheets_dir: PathBuf::from("sheets"),
            reference_dir: PathBuf::from("mapping"),
            output_dir: PathBuf::from("output"),
            header_row: 4,
            max_concurrency: 5,
            effective_date: DEFAULT_EFFECTIVE_DATE.to_string(),
            replicate_state_treatments: true,
            processing: ProcessorSettings::default(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sheets_dir: Option<PathBuf>,
    pub reference_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub header_row: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub effective_date: Option<String>,
    pub no_replication: bool,
}

impl Settings {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dir) = overrides.sheets_dir {
            self.sheets_dir = dir;
        }
        if let Some(dir) = overrides.reference_dir {
            self.reference_dir = dir;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(row) = overrides.header_row {
            self.header_row = row;
        }
        if let Some(n) = overrides.max_concurrency {
            self.max_concurrency = n;
        }
        if let Some(date) = overrides.effective_date {
            self.effective_date = date;
        }
        if overrides.no_replication {
            self.replicate_state_treatments = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_effective_date(&self.effective_date) {
            bail!(
                "effective_date must be YYYY-MM-DD, got '{}'",
                self.effective_date
            );
        }
        if self.max_concurrency == 0 {
            bail!("max_concurrency must be at least 1");
        }
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            bail!(
                "max_concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_concurrency
            );
        }
        if self.header_row == 0 {
            bail!("header_row is 1-based and must be at least 1");
        }
        Ok(())
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            effective_date: self.effective_date.trim().to_string(),
            ..ResolverSettings::default()
        }
    }
}

/// Defaults when no path is given; a given path must exist.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(p) = path else {
        return Ok(Settings::default());
    };
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    let s = toml::to_string_pretty(&Settings::default()).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
