//! Bulk CSV import of service orders.
//!
//! Every row is validated with the same rules as the JSON API. If any row
//! fails, nothing is written; otherwise all rows go in one transaction.

use std::collections::HashMap;

use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::input::{FieldErrors, ServiceOrderInput};
use super::repository::ServiceOrderRepository;
use super::types::NewServiceOrder;
use crate::db::DbPool;
use crate::ServdeskError;

/// Errors for one CSV line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RowError {
    /// Line number in the file; the header is line 1.
    pub row: u64,
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

/// Why an import was refused.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No file was uploaded in the 'file' field.")]
    MissingFile,

    #[error("The file must be a .csv file.")]
    NotCsv,

    #[error("The file is not valid UTF-8.")]
    NotUtf8,

    #[error("The CSV file has no data rows.")]
    Empty,

    #[error("Could not read the CSV file: {0}")]
    Malformed(String),

    #[error("{} row(s) failed validation; nothing was imported.", .0.len())]
    Invalid(Vec<RowError>),

    #[error("An order with the same protocol already exists: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(ServdeskError),
}

/// Accept only names ending in `.csv` (any case).
pub fn check_filename(name: Option<&str>) -> Result<(), ImportError> {
    match name {
        Some(name) if name.to_ascii_lowercase().ends_with(".csv") => Ok(()),
        _ => Err(ImportError::NotCsv),
    }
}

/// Decode and parse the file into (line number, row) pairs.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<(u64, ServiceOrderInput)>, ImportError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ImportError::NotUtf8)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ImportError::Malformed(e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Malformed(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let input: ServiceOrderInput = record
            .deserialize(Some(&headers))
            .map_err(|e| ImportError::Malformed(format!("line {line}: {e}")))?;
        rows.push((line, input));
    }

    if rows.is_empty() {
        return Err(ImportError::Empty);
    }
    Ok(rows)
}

/// Validate all rows, collecting every error instead of stopping at the first.
pub fn validate_rows(
    rows: Vec<(u64, ServiceOrderInput)>,
    created_by: i64,
) -> Result<Vec<NewServiceOrder>, Vec<RowError>> {
    let mut orders = Vec::with_capacity(rows.len());
    let mut failures = Vec::new();
    let mut seen: HashMap<String, u64> = HashMap::new();

    for (row, input) in rows {
        match input.into_new_order(created_by) {
            Ok(order) => {
                if let Some(first) = seen.get(&order.protocol) {
                    let mut errors = FieldErrors::new();
                    errors.insert(
                        "protocol".to_string(),
                        vec![format!("Duplicate protocol in file (first seen on row {first}).")],
                    );
                    failures.push(RowError { row, errors });
                } else {
                    seen.insert(order.protocol.clone(), row);
                    orders.push(order);
                }
            }
            Err(errors) => failures.push(RowError { row, errors }),
        }
    }

    if failures.is_empty() {
        Ok(orders)
    } else {
        Err(failures)
    }
}

/// Parse, validate and store a CSV upload. Returns the number of rows imported.
pub async fn import_csv(pool: &DbPool, bytes: &[u8], created_by: i64) -> Result<usize, ImportError> {
    let rows = parse_rows(bytes)?;
    let orders = validate_rows(rows, created_by).map_err(ImportError::Invalid)?;

    let imported = ServiceOrderRepository::new(pool)
        .create_many(&orders)
        .await
        .map_err(|e| match e {
            ServdeskError::Conflict(msg) => ImportError::Conflict(msg),
            other => ImportError::Internal(other),
        })?;

    info!(imported, created_by, "Imported service orders from CSV");
    Ok(imported)
}
