//! Bulk-edit command language.
//!
//! The processing layer turns short commands into transformations over a snapshot of rows
//! taken from the [`crate::store::Store`]:
//!
//! - [`parse_command()`]: text → [`Command`]
//! - [`apply_command()`]: (rows, command) → rows, as a pure function
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pokemon_research_lab::processing::{apply_command, parse_command};
//! use pokemon_research_lab::types::{Row, Value};
//!
//! let rows = vec![
//!     Arc::new(Row::with_base_defaults(1).with("types", "grass / poison")),
//!     Arc::new(Row::with_base_defaults(4).with("types", "fire")),
//! ];
//!
//! let cmd = parse_command("set hp to 100 for all pokemon of type 'grass'").unwrap();
//! let out = apply_command(&rows, &cmd);
//!
//! assert_eq!(out[0].get("hp"), Some(Value::Number(100.0)));
//! assert!(Arc::ptr_eq(&rows[1], &out[1]));
//! ```

pub mod apply;
pub mod command;

use std::sync::Arc;

use crate::types::Row;

pub use apply::apply_command;
pub use command::{parse_command, smart_value, Command, COMMAND_HINT};

/// Summary of what a command changed, computed by comparing snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandReport {
    /// Rows present after the command that are new copies.
    pub updated: usize,
    /// Rows dropped by the command.
    pub deleted: usize,
}

impl CommandReport {
    /// Compare a snapshot with the result of [`apply_command`] on it.
    ///
    /// Relies on untouched rows keeping their [`Arc`] identity.
    pub fn between(before: &[Arc<Row>], after: &[Arc<Row>]) -> Self {
        let deleted = before.len().saturating_sub(after.len());
        let mut updated = 0;
        let mut prev = before.iter();
        for row in after {
            // `after` is an order-preserving subsequence of `before` (by id) for every command.
            for candidate in prev.by_ref() {
                if candidate.id() == row.id() {
                    if !Arc::ptr_eq(candidate, row) {
                        updated += 1;
                    }
                    break;
                }
            }
        }
        Self { updated, deleted }
    }
}
