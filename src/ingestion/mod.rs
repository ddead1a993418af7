//! CSV import entrypoints and the observer hooks shared by both producers.
//!
//! A CSV import is a two-step affair:
//!
//! 1. [`detect_headers`] reads only the header row so a [`SchemaMapping`] can be built.
//! 2. [`import_csv_from_reader`] / [`import_csv_from_path`] stream the records through the
//!    mapping and replace the store's rows on success.
//!
//! ```rust
//! use pokemon_research_lab::ingestion::{
//!     csv_reader, detect_headers, import_csv_from_reader, CsvImportOptions, SchemaMapping,
//! };
//! use pokemon_research_lab::store::Store;
//!
//! # fn main() -> Result<(), pokemon_research_lab::LabError> {
//! let data = "No,Pokemon,HP\n1,bulbasaur,45\n4,charmander,39\n";
//! let headers = detect_headers(data.as_bytes())?;
//! assert_eq!(headers, ["No", "Pokemon", "HP"]);
//!
//! let mapping = SchemaMapping::new().map("id", "No").map("name", "Pokemon").map("hp", "HP");
//! let mut store = Store::new();
//! let stats = import_csv_from_reader(
//!     &mut store,
//!     &mut csv_reader(data.as_bytes()),
//!     &mapping,
//!     &CsvImportOptions::default(),
//! )?;
//! assert_eq!(stats.rows, 2);
//! assert_eq!(store.row_ids(), &[1, 4]);
//! # Ok(())
//! # }
//! ```

pub mod csv;
pub mod mapping;
pub mod observability;

pub use self::csv::{
    csv_reader, detect_headers, detect_headers_from_path, import_csv_from_path, import_csv_from_reader,
    CsvImportOptions, DEFAULT_PROGRESS_EVERY,
};
pub use mapping::{target_fields, MappingEntry, SchemaMapping, TargetField};
pub use observability::{
    severity_for_error, CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionProgress,
    IngestionSeverity, IngestionSource, IngestionStats, StdErrObserver,
};
