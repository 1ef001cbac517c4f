//! One conversion run: sheets in, records/catalog/error report out.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{error, info, warn};

use taxgrid_core::report::ALL_FILES;
use taxgrid_core::{ErrorReport, ProcessingError, ProductItem, Record};
use taxgrid_ingest::{ReferenceData, SourceSheet, sheet_name};
use taxgrid_rules::{FileOutcome, ProductCodeNormalizer, SheetProcessor, replicate_state_treatments};

use crate::config::Settings;
use crate::output::{
    ERRORS_FILE, PRODUCT_ITEMS_FILE, RECORDS_FILE, create_run_folder, write_error_report,
    write_product_items, write_records,
};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_generated: usize,
    pub product_items_generated: usize,
    pub records_replicated: usize,
    pub unmapped_product_ids: usize,
    pub errors: usize,
    pub output_folder: PathBuf,
    pub records_path: PathBuf,
    pub product_items_path: PathBuf,
    pub error_report_path: Option<PathBuf>,
}

/// Everything merged from the per-file outcomes, ready to write.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records: Vec<Record>,
    pub product_items: Vec<ProductItem>,
    pub errors: Vec<ProcessingError>,
    pub replicated: usize,
    pub unmapped: usize,
}

pub async fn run(settings: Arc<Settings>, now: DateTime<Utc>) -> Result<RunSummary> {
    settings.validate()?;

    let reference = Arc::new(ReferenceData::from_dir(&settings.reference_dir));
    if reference.is_geocode_table_empty() {
        bail!(
            "geocode table is empty or missing in {}; no sheet could be resolved",
            settings.reference_dir.display()
        );
    }
    info!(stats = ?reference.stats(), "reference data ready");

    let files = list_sheet_files(&settings.sheets_dir).await?;
    if files.is_empty() {
        warn!(dir = %settings.sheets_dir.display(), "no sheet exports found");
    }

    let outcomes = process_sheets(files, Arc::clone(&reference), Arc::clone(&settings)).await;
    let aggregate = aggregate(outcomes, reference, &settings);

    let folder = create_run_folder(&settings.output_dir, now)?;
    let records_path = folder.join(RECORDS_FILE);
    let product_items_path = folder.join(PRODUCT_ITEMS_FILE);
    write_records(&records_path, &aggregate.records)?;
    write_product_items(&product_items_path, &aggregate.product_items)?;

    let error_report_path = if aggregate.errors.is_empty() {
        None
    } else {
        let path = folder.join(ERRORS_FILE);
        let report = ErrorReport::new(aggregate.errors.clone(), now);
        write_error_report(&path, &report)?;
        Some(path)
    };

    let summary = RunSummary {
        files_processed: aggregate.files_processed,
        files_failed: aggregate.files_failed,
        records_generated: aggregate.records.len(),
        product_items_generated: aggregate.product_items.len(),
        records_replicated: aggregate.replicated,
        unmapped_product_ids: aggregate.unmapped,
        errors: aggregate.errors.len(),
        output_folder: folder,
        records_path,
        product_items_path,
        error_report_path,
    };
    info!(
        files = summary.files_processed,
        failed = summary.files_failed,
        records = summary.records_generated,
        errors = summary.errors,
        "run complete"
    );
    Ok(summary)
}

/// `*.csv` files directly inside `dir`, sorted by path.
pub async fn list_sheet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("read sheets dir {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("list {}", dir.display()))?
    {
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One task per file, at most `max_concurrency` in flight. A file that cannot
/// be read or panics while processing becomes a failed outcome; the others
/// carry on. Outcomes come back in `files` order.
pub async fn process_sheets(
    files: Vec<PathBuf>,
    reference: Arc<ReferenceData>,
    settings: Arc<Settings>,
) -> Vec<FileOutcome> {
    let semaphore = Arc::new(Semaphore::new(settings.max_concurrency));
    let processor = Arc::new(SheetProcessor::new(
        reference,
        settings.resolver_settings(),
        settings.processing.clone(),
    ));
    let header_row = settings.header_row;

    let mut tasks = JoinSet::new();
    let mut spawned: HashMap<Id, (usize, String)> = HashMap::new();
    for (index, path) in files.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let processor = Arc::clone(&processor);
        let name = sheet_name(&path);
        let task_name = name.clone();
        let handle = tasks.spawn(async move {
            let name = task_name;
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let message = format!("Failed to schedule sheet: {e}");
                    return (index, FileOutcome::failed(&name, message));
                }
            };
            (index, process_file(&path, name, header_row, processor).await)
        });
        spawned.insert(handle.id(), (index, name));
    }

    collect_outcomes(tasks, spawned).await
}

/// Drain `tasks`; a task that panicked or was cancelled becomes a failed
/// outcome for the file it was spawned for. Sorted by file index.
async fn collect_outcomes(
    mut tasks: JoinSet<(usize, FileOutcome)>,
    mut spawned: HashMap<Id, (usize, String)>,
) -> Vec<FileOutcome> {
    let mut outcomes: Vec<(usize, FileOutcome)> = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, outcome)) => outcomes.push(outcome),
            Err(e) => {
                let Some((index, name)) = spawned.remove(&e.id()) else {
                    error!(error = %e, "unknown sheet task did not complete");
                    continue;
                };
                error!(sheet = %name, error = %e, "sheet task did not complete");
                let message = format!("Failed to process sheet: {e}");
                outcomes.push((index, FileOutcome::failed(&name, message)));
            }
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn process_file(
    path: &Path,
    name: String,
    header_row: usize,
    processor: Arc<SheetProcessor>,
) -> FileOutcome {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(sheet = %name, error = %e, "could not read sheet");
            return FileOutcome::failed(&name, format!("Failed to read {}: {e}", path.display()));
        }
    };

    let task_name = name.clone();
    let joined = tokio::task::spawn_blocking(move || {
        match SourceSheet::from_csv_str(&task_name, &text, header_row) {
            Ok(sheet) => processor.process(&sheet),
            Err(e) => FileOutcome::failed(&task_name, format!("Failed to process sheet: {e}")),
        }
    })
    .await;

    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(sheet = %name, error = %e, "sheet processing panicked");
            FileOutcome::failed(&name, format!("Failed to process sheet: {e}"))
        }
    }
}

/// Merge per-file outcomes, replicate state treatments onto cities, convert
/// research ids to product codes and drop records that fail validation.
pub fn aggregate(outcomes: Vec<FileOutcome>, reference: Arc<ReferenceData>, settings: &Settings) -> Aggregate {
    let mut agg = Aggregate::default();
    let mut records = Vec::new();
    let mut product_items = Vec::new();

    for outcome in outcomes {
        if outcome.success {
            agg.files_processed += 1;
        } else {
            agg.files_failed += 1;
        }
        records.extend(outcome.records);
        product_items.extend(outcome.product_items);
        agg.errors.extend(outcome.errors);
    }

    if settings.replicate_state_treatments {
        let replication = replicate_state_treatments(records);
        records = replication.records;
        agg.replicated = replication.replicated;
        agg.errors.extend(replication.errors);
    }

    let mut normalizer = ProductCodeNormalizer::new(reference);
    let records = normalizer.convert_records(records);
    agg.product_items = normalizer.convert_product_items(product_items);

    let unmapped = normalizer.unmapped_ids();
    agg.unmapped = unmapped.len();
    if !unmapped.is_empty() {
        warn!(count = unmapped.len(), "research ids without product codes");
        agg.errors.push(ProcessingError::unmapped_product_ids(&unmapped));
    }

    for record in records {
        match record.validate() {
            Ok(()) => agg.records.push(record),
            Err(e) => {
                warn!(geocode = %record.geocode, item = %record.item, error = %e, "dropping invalid record");
                agg.errors.push(
                    ProcessingError::data_quality(ALL_FILES, 0, &record.item, e.to_string())
                        .with_detail("geocode", record.geocode.as_str()),
                );
            }
        }
    }

    info!(stats = ?normalizer.stats(), "product codes converted");
    agg
}
