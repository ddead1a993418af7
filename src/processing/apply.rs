//! Applying a parsed [`Command`] to a snapshot of rows.

use std::sync::Arc;

use rayon::prelude::*;

use crate::types::{Row, Value, ID_KEY};

use super::command::Command;

/// Snapshots smaller than this are transformed on the calling thread.
const PARALLEL_THRESHOLD: usize = 4_096;

/// Apply `command` to `rows`, returning the transformed snapshot.
///
/// This is a pure function of its inputs. Rows the command does not touch are returned as the
/// same [`Arc`] (so `Arc::ptr_eq` holds against the input); touched rows are fresh copies with
/// the target field overwritten. Order is preserved, and deletes only drop matches.
///
/// Field names are resolved against each row ignoring ASCII case. Assignments to `id` leave
/// rows unchanged.
pub fn apply_command(rows: &[Arc<Row>], command: &Command) -> Vec<Arc<Row>> {
    match command {
        Command::SetForType {
            field,
            value,
            type_name,
            ..
        } => map_rows(rows, |row| {
            let types = row
                .get("types")
                .map(|v| v.to_display_string())
                .unwrap_or_default()
                .to_lowercase();
            if types.contains(type_name.as_str()) {
                assign(row, field, value)
            } else {
                None
            }
        }),
        Command::DeleteWhere { field, value } => {
            let wanted = value.to_lowercase();
            filter_rows(rows, |row| !field_equals(row, field, &wanted))
        }
        Command::UpdateWhere {
            field,
            value,
            where_field,
            where_value,
        } => {
            let wanted = where_value.to_lowercase();
            map_rows(rows, |row| {
                if field_equals(row, where_field, &wanted) {
                    assign(row, field, value)
                } else {
                    None
                }
            })
        }
    }
}

/// Case-insensitive comparison of the stringified attribute (absent reads as `""`).
fn field_equals(row: &Row, field: &str, wanted_lower: &str) -> bool {
    let key = row.resolve_key(field);
    let current = row.get(key).map(|v| v.to_display_string()).unwrap_or_default();
    current.to_lowercase() == wanted_lower
}

fn assign(row: &Row, field: &str, value: &Value) -> Option<Arc<Row>> {
    let key = row.resolve_key(field);
    if key == ID_KEY {
        return None;
    }
    let mut next = row.clone();
    next.set(key, value.clone());
    Some(Arc::new(next))
}

/// Replace rows for which `f` returns a new row; keep the original `Arc` otherwise.
fn map_rows<F>(rows: &[Arc<Row>], f: F) -> Vec<Arc<Row>>
where
    F: Fn(&Row) -> Option<Arc<Row>> + Sync,
{
    let step = |row: &Arc<Row>| f(&**row).unwrap_or_else(|| Arc::clone(row));
    if rows.len() < PARALLEL_THRESHOLD {
        rows.iter().map(step).collect()
    } else {
        rows.par_iter().map(step).collect()
    }
}

fn filter_rows<F>(rows: &[Arc<Row>], keep: F) -> Vec<Arc<Row>>
where
    F: Fn(&Row) -> bool + Sync,
{
    if rows.len() < PARALLEL_THRESHOLD {
        rows.iter().filter(|r| keep(&***r)).cloned().collect()
    } else {
        rows.par_iter().filter(|r| keep(&***r)).cloned().collect()
    }
}
