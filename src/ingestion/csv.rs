//! Streaming CSV import through a [`SchemaMapping`].
//!
//! The import is a single sequential scan: records are read one at a time from any
//! [`std::io::Read`], coerced into typed [`Row`]s and accumulated. Only once the whole input has
//! been read are the rows sorted by id and committed with [`Store::replace_rows`]. A read error
//! anywhere aborts the import and leaves the row set untouched.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use rayon::slice::ParallelSliceMut;

use crate::coerce::coerce;
use crate::error::{LabError, LabResult};
use crate::store::{normalize_column_key, Store};
use crate::types::{ColumnDef, DataType, Provenance, Row, ID_KEY};

use super::mapping::SchemaMapping;
use super::observability::{
    IngestionContext, IngestionObserver, IngestionSeverity, IngestionSource, IngestionStats, Reporter,
};

/// Default number of rows between progress notifications.
pub const DEFAULT_PROGRESS_EVERY: usize = 1_000;

/// Options controlling a CSV import.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct CsvImportOptions {
    /// Rows between `on_progress` notifications.
    pub progress_every: usize,
    /// Human-readable description of the input, used in observer events.
    pub source_label: String,
    /// Optional observer for progress, logging and alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for CsvImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvImportOptions")
            .field("progress_every", &self.progress_every)
            .field("source_label", &self.source_label)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for CsvImportOptions {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
            source_label: "csv".to_string(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Build the CSV reader used for both header detection and import.
///
/// Rows with missing or extra fields are accepted; missing cells read as absent.
pub fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

/// Read only the header row of a CSV stream.
///
/// Returns [`LabError::HeaderDetection`] when the input has no header or only blank names.
pub fn detect_headers<R: Read>(reader: R) -> LabResult<Vec<String>> {
    let mut rdr = csv_reader(reader);
    read_headers(&mut rdr)
}

/// [`detect_headers`] for a file on disk.
pub fn detect_headers_from_path(path: impl AsRef<Path>) -> LabResult<Vec<String>> {
    detect_headers(File::open(path)?)
}

fn read_headers<R: Read>(rdr: &mut csv::Reader<R>) -> LabResult<Vec<String>> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LabError::HeaderDetection);
    }
    Ok(headers)
}

/// Import a CSV file into `store`.
///
/// See [`import_csv_from_reader`].
pub fn import_csv_from_path(
    store: &mut Store,
    path: impl AsRef<Path>,
    mapping: &SchemaMapping,
    options: &CsvImportOptions,
) -> LabResult<IngestionStats> {
    let path = path.as_ref();
    let mut options = options.clone();
    if options.source_label == CsvImportOptions::default().source_label {
        options.source_label = path.display().to_string();
    }
    let reporter = reporter(&options);
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            let result: LabResult<IngestionStats> = Err(e.into());
            reporter.outcome(&result, |s| s.rows);
            return result;
        }
    };
    let mut rdr = csv_reader(file);
    import_csv_from_reader(store, &mut rdr, mapping, &options)
}

/// Import CSV data from an existing CSV reader.
///
/// Rules:
///
/// - The CSV must have a header row, and every mapped header must be present in it.
/// - Mapped target columns missing from the store's registry are added before any row is read.
/// - The row id comes from the header mapped onto `id`; without one, ids count up from 1 in
///   record order.
/// - Every mapped cell is coerced to the column's declared type; unmapped attributes keep their
///   defaults.
/// - Rows are committed sorted by id. For duplicate ids the later record wins.
pub fn import_csv_from_reader<R: Read>(
    store: &mut Store,
    rdr: &mut csv::Reader<R>,
    mapping: &SchemaMapping,
    options: &CsvImportOptions,
) -> LabResult<IngestionStats> {
    let reporter = reporter(options);
    let result = import_inner(store, rdr, mapping, options, &reporter);
    reporter.outcome(&result, |s| s.rows);
    result
}

fn reporter(options: &CsvImportOptions) -> Reporter<'_> {
    Reporter {
        observer: options.observer.as_ref(),
        alert_at_or_above: options.alert_at_or_above,
        ctx: IngestionContext {
            source: IngestionSource::Csv {
                label: options.source_label.clone(),
            },
        },
    }
}

/// A mapped CSV column resolved to its position and target.
struct Cell {
    index: usize,
    key: String,
    data_type: DataType,
}

fn import_inner<R: Read>(
    store: &mut Store,
    rdr: &mut csv::Reader<R>,
    mapping: &SchemaMapping,
    options: &CsvImportOptions,
    reporter: &Reporter<'_>,
) -> LabResult<IngestionStats> {
    let headers = read_headers(rdr)?;
    let position = |header: &str| -> LabResult<usize> {
        headers.iter().position(|h| h == header).ok_or_else(|| LabError::SchemaMismatch {
            message: format!("missing mapped column '{header}'. headers={headers:?}"),
        })
    };

    let mut id_index = None;
    let mut cells = Vec::with_capacity(mapping.entries().len());
    for entry in mapping.entries() {
        let index = position(&entry.source_header)?;
        if entry.target.key == ID_KEY {
            id_index = Some(index);
            continue;
        }
        cells.push((index, entry));
    }

    // Columns exist before the first row is built.
    for (_, entry) in &cells {
        let key = normalize_column_key(&entry.target.key);
        if store.column(&key).is_none() {
            store.add_column(ColumnDef::new(
                key,
                entry.target.label.clone(),
                entry.target.data_type,
            ));
        }
    }
    let cells: Vec<Cell> = cells
        .into_iter()
        .map(|(index, entry)| {
            let key = normalize_column_key(&entry.target.key);
            let data_type = store
                .column(&key)
                .map(|c| c.data_type)
                .unwrap_or(entry.target.data_type);
            Cell {
                index,
                key,
                data_type,
            }
        })
        .collect();

    let progress_every = options.progress_every.max(1);
    let mut rows: Vec<Row> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let id = match id_index {
            Some(idx) => coerce(DataType::Number, record.get(idx))
                .as_f64()
                .unwrap_or_default() as i64,
            None => rows.len() as i64 + 1,
        };

        let mut row = Row::with_base_defaults(id);
        for cell in &cells {
            row.set(cell.key.as_str(), coerce(cell.data_type, record.get(cell.index)));
        }
        rows.push(row);

        if rows.len() % progress_every == 0 {
            reporter.progress(rows.len(), None);
        }
    }

    rows.par_sort_by_key(Row::id);
    let count = rows.len();
    store.replace_rows(rows, Provenance::Csv);
    Ok(IngestionStats { rows: count })
}
