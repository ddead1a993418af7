//! `pokemon-research-lab` keeps a Pokémon research dataset in memory and provides the three
//! ways of filling and reshaping it:
//!
//! - **CSV import** ([`ingestion`]): detect the header row, map headers onto columns with a
//!   [`ingestion::SchemaMapping`], then stream records into typed rows.
//! - **Remote aggregation** ([`aggregation`]): walk the PokeAPI listing and fetch detail payloads
//!   in bounded-concurrency batches, with cooperative cancellation.
//! - **Bulk-edit commands** ([`processing`]): a small grammar of `set`, `delete` and `update`
//!   commands applied to the whole row set.
//!
//! Everything lands in a [`store::Store`]: ordered row ids, an id → row map and a column
//! registry that users can extend.
//!
//! ## Rows and columns
//!
//! Every [`types::Row`] has an immutable integer id plus a map of attributes. Attribute values
//! are [`types::Value`]s:
//!
//! - [`types::Value::Text`]
//! - [`types::Value::Number`] (`f64`)
//! - [`types::Value::Bool`]
//! - [`types::Value::Null`] for unset
//!
//! Columns declare a [`types::DataType`]. Raw input is converted with [`coerce::coerce`], which
//! never fails: unparseable numbers become `0`, and only `true`, `1` and `yes` are truthy.
//!
//! ## Quick example: import, then edit
//!
//! ```rust
//! use pokemon_research_lab::ingestion::{csv_reader, import_csv_from_reader, CsvImportOptions, SchemaMapping};
//! use pokemon_research_lab::store::Store;
//! use pokemon_research_lab::types::Value;
//!
//! # fn main() -> Result<(), pokemon_research_lab::LabError> {
//! let data = "id,name,types,hp\n1,bulbasaur,grass / poison,45\n4,charmander,fire,39\n";
//! let mut store = Store::new();
//! import_csv_from_reader(
//!     &mut store,
//!     &mut csv_reader(data.as_bytes()),
//!     &SchemaMapping::new().map("id", "id").map("name", "name").map("types", "types").map("hp", "hp"),
//!     &CsvImportOptions::default(),
//! )?;
//!
//! let report = store.run_command("set hp to 100 for all pokemon of type 'grass'")?;
//! assert_eq!(report.updated, 1);
//! assert_eq!(store.row(1).unwrap().get("hp"), Some(Value::Number(100.0)));
//!
//! store.run_command("delete rows where name is charmander")?;
//! assert_eq!(store.row_ids(), &[1]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`store`]: the dataset and its mutation operations
//! - [`types`]: rows, values and column definitions
//! - [`coerce`]: raw input → typed value conversion
//! - [`ingestion`]: CSV import and the observer hooks shared by both producers
//! - [`aggregation`]: remote listing/detail aggregation
//! - [`processing`]: command parsing and application
//! - [`export`]: CSV export
//! - [`persist`]: snapshot save/load through a key-value collaborator
//! - [`error`]: error types used across the crate

pub mod aggregation;
pub mod coerce;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod persist;
pub mod processing;
pub mod store;
pub mod types;

pub use error::{LabError, LabResult};
