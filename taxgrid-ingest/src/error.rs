use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table has no '{column}' column")]
    MissingColumn { table: &'static str, column: &'static str },
    #[error("{name}: header row {header_row} is past the end of the sheet ({rows} rows)")]
    MissingHeader {
        name: String,
        header_row: usize,
        rows: usize,
    },
}
