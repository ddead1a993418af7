//! Normalized in-memory dataset: ordered row ids, an id → row map and the column registry.
//!
//! The [`Store`] is the single shared state of the crate. Producers replace its row set
//! wholesale with [`Store::replace_rows`]; editors and the command interpreter mutate it
//! through the remaining operations. All mutations take `&mut self`, so a reader always
//! observes a fully formed state.
//!
//! Rows are held as [`Arc<Row>`] so snapshots are cheap and untouched rows keep their identity
//! across bulk transformations.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::coerce::coerce;
use crate::error::{LabError, LabResult};
use crate::processing::{apply_command, parse_command, CommandReport};
use crate::types::{base_columns, ColumnDef, DataType, Provenance, Row, Value, ID_KEY};

/// The research dataset.
#[derive(Debug, Clone)]
pub struct Store {
    row_ids: Vec<i64>,
    rows_by_id: HashMap<i64, Arc<Row>>,
    columns: Vec<ColumnDef>,
    provenance: Provenance,
    last_updated_at: Option<u64>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store seeded with the base columns.
    pub fn new() -> Self {
        Self {
            row_ids: Vec::new(),
            rows_by_id: HashMap::new(),
            columns: base_columns(),
            provenance: Provenance::Empty,
            last_updated_at: None,
        }
    }

    /// Rebuild a store from previously persisted parts.
    ///
    /// Ids without a row and rows without an id are dropped so the id list and the map stay in
    /// one-to-one correspondence.
    pub(crate) fn from_parts(
        row_ids: Vec<i64>,
        mut rows_by_id: HashMap<i64, Arc<Row>>,
        columns: Vec<ColumnDef>,
        provenance: Provenance,
        last_updated_at: Option<u64>,
    ) -> Self {
        let mut ids = Vec::with_capacity(row_ids.len());
        let mut rows = HashMap::with_capacity(row_ids.len());
        for id in row_ids {
            if let Some(row) = rows_by_id.remove(&id) {
                if row.id() == id {
                    ids.push(id);
                    rows.insert(id, row);
                }
            }
        }
        let columns = if columns.is_empty() { base_columns() } else { columns };
        Self {
            row_ids: ids,
            rows_by_id: rows,
            columns,
            provenance,
            last_updated_at,
        }
    }

    /// Replace the whole row set, keeping the input order as the row order.
    ///
    /// If the input carries the same id more than once, the first occurrence fixes the
    /// position and the last occurrence's values are kept.
    pub fn replace_rows<I, R>(&mut self, rows: I, provenance: Provenance)
    where
        I: IntoIterator<Item = R>,
        R: Into<Arc<Row>>,
    {
        let rows = rows.into_iter();
        let mut row_ids = Vec::with_capacity(rows.size_hint().0);
        let mut rows_by_id = HashMap::with_capacity(rows.size_hint().0);
        for row in rows {
            let row: Arc<Row> = row.into();
            match rows_by_id.entry(row.id()) {
                Entry::Occupied(mut slot) => {
                    slot.insert(row);
                }
                Entry::Vacant(slot) => {
                    row_ids.push(row.id());
                    slot.insert(row);
                }
            }
        }

        self.row_ids = row_ids;
        self.rows_by_id = rows_by_id;
        self.provenance = provenance;
        self.touch();
    }

    /// Set a single attribute on one row.
    ///
    /// Returns [`LabError::NotFound`] when the id is absent; callers treat that as a no-op.
    /// The value is not checked against the column's declared type.
    pub fn update_cell(&mut self, id: i64, key: &str, value: impl Into<Value>) -> LabResult<()> {
        if key == ID_KEY {
            return Err(LabError::ImmutableId);
        }
        let row = self.rows_by_id.get_mut(&id).ok_or(LabError::NotFound { id })?;
        let mut next = (**row).clone();
        next.set(key, value);
        *row = Arc::new(next);
        self.touch();
        Ok(())
    }

    /// Editor entry point: coerce `raw` to the column's declared type, then [`Self::update_cell`].
    ///
    /// Unknown columns are treated as text.
    pub fn edit_cell(&mut self, id: i64, key: &str, raw: &str) -> LabResult<()> {
        let data_type = self.column(key).map(|c| c.data_type).unwrap_or(DataType::Text);
        self.update_cell(id, key, coerce(data_type, Some(raw)))
    }

    /// Remove every row matching `predicate`, preserving the order of the rest.
    ///
    /// Returns the number of rows removed.
    pub fn delete_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Row) -> bool,
    {
        let before = self.row_ids.len();
        let rows_by_id = &mut self.rows_by_id;
        self.row_ids.retain(|id| {
            let matched = match rows_by_id.get(id) {
                Some(row) => predicate(&**row),
                None => return false,
            };
            if matched {
                rows_by_id.remove(id);
            }
            !matched
        });
        let removed = before - self.row_ids.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Register a new column and backfill its default onto rows lacking the key.
    ///
    /// The key is trimmed and inner whitespace runs collapse to `_`. An empty key or one that
    /// already exists is ignored. Returns whether the column was added.
    pub fn add_column(&mut self, mut column: ColumnDef) -> bool {
        let key = normalize_column_key(&column.key);
        if key.is_empty() || self.columns.iter().any(|c| c.key == key) {
            return false;
        }

        let default = column.data_type.default_value();
        for row in self.rows_by_id.values_mut() {
            if !row.contains(&key) {
                Arc::make_mut(row).set(key.clone(), default.clone());
            }
        }

        column.key = key;
        column.is_base = false;
        self.columns.push(column);
        self.touch();
        true
    }

    /// Restore the initial state: no rows, base columns only, provenance empty.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Parse `input` as a bulk-edit command and apply it to the current rows.
    ///
    /// The provenance of the row set is left as it was.
    pub fn run_command(&mut self, input: &str) -> LabResult<CommandReport> {
        let command = parse_command(input)?;
        let before = self.rows();
        let after = apply_command(&before, &command);

        let report = CommandReport::between(&before, &after);
        let provenance = self.provenance;
        self.replace_rows(after, provenance);
        Ok(report)
    }

    pub fn row(&self, id: i64) -> Option<&Arc<Row>> {
        self.rows_by_id.get(&id)
    }

    /// Ordered snapshot of the current rows.
    pub fn rows(&self) -> Vec<Arc<Row>> {
        self.row_ids
            .iter()
            .filter_map(|id| self.rows_by_id.get(id).cloned())
            .collect()
    }

    pub fn row_ids(&self) -> &[i64] {
        &self.row_ids
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Unix timestamp (milliseconds) of the last mutation, if any.
    pub fn last_updated_at(&self) -> Option<u64> {
        self.last_updated_at
    }

    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub(crate) fn rows_by_id(&self) -> &HashMap<i64, Arc<Row>> {
        &self.rows_by_id
    }

    fn touch(&mut self) {
        self.last_updated_at = Some(unix_ms());
    }
}

/// Trim and collapse whitespace runs to a single `_`.
pub fn normalize_column_key(key: &str) -> String {
    key.split_whitespace().collect::<Vec<_>>().join("_")
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{normalize_column_key, Store};
    use crate::error::LabError;
    use crate::types::{ColumnDef, DataType, Provenance, Row, Value};

    fn store_with(ids: &[i64]) -> Store {
        let mut store = Store::new();
        store.replace_rows(
            ids.iter().map(|&id| Row::with_base_defaults(id).with("name", format!("mon{id}"))),
            Provenance::Csv,
        );
        store
    }

    fn assert_consistent(store: &Store) {
        assert_eq!(store.row_ids().len(), store.rows_by_id().len());
        for id in store.row_ids() {
            assert!(store.row(*id).is_some(), "dangling id {id}");
        }
    }

    #[test]
    fn replace_rows_keeps_input_order_and_sets_provenance() {
        let store = store_with(&[3, 1, 2]);
        assert_eq!(store.row_ids(), &[3, 1, 2]);
        assert_eq!(store.provenance(), Provenance::Csv);
        assert!(store.last_updated_at().is_some());
        assert_consistent(&store);
    }

    #[test]
    fn replace_rows_with_duplicate_ids_keeps_last_values() {
        let mut store = Store::new();
        store.replace_rows(
            vec![
                Row::new(1).with("name", "first"),
                Row::new(2).with("name", "other"),
                Row::new(1).with("name", "second"),
            ],
            Provenance::Csv,
        );
        assert_eq!(store.row_ids(), &[1, 2]);
        assert_eq!(store.row(1).unwrap().get("name"), Some(Value::text("second")));
        assert_consistent(&store);
    }

    #[test]
    fn update_cell_replaces_only_the_target_row() {
        let mut store = store_with(&[1, 2]);
        let untouched = Arc::clone(store.row(2).unwrap());

        store.update_cell(1, "hp", 99.0).unwrap();

        assert_eq!(store.row(1).unwrap().get("hp"), Some(Value::Number(99.0)));
        assert_eq!(store.row(1).unwrap().get("name"), Some(Value::text("mon1")));
        assert!(Arc::ptr_eq(&untouched, store.row(2).unwrap()));
    }

    #[test]
    fn update_cell_on_missing_row_is_reported() {
        let mut store = store_with(&[1]);
        let err = store.update_cell(42, "hp", 1.0).unwrap_err();
        assert!(matches!(err, LabError::NotFound { id: 42 }));
        assert!(matches!(store.update_cell(1, "id", 5.0), Err(LabError::ImmutableId)));
    }

    #[test]
    fn edit_cell_coerces_by_declared_type() {
        let mut store = store_with(&[1]);
        store.add_column(ColumnDef::new("isLegendary", "Legendary", DataType::Boolean));

        store.edit_cell(1, "hp", "abc").unwrap();
        store.edit_cell(1, "isLegendary", "yes").unwrap();
        store.edit_cell(1, "notes", "12").unwrap();

        let row = store.row(1).unwrap();
        assert_eq!(row.get("hp"), Some(Value::Number(0.0)));
        assert_eq!(row.get("isLegendary"), Some(Value::Bool(true)));
        assert_eq!(row.get("notes"), Some(Value::text("12")));
    }

    #[test]
    fn delete_where_preserves_remaining_order() {
        let mut store = store_with(&[5, 4, 3, 2, 1]);
        let removed = store.delete_where(|row| row.id() % 2 == 0);
        assert_eq!(removed, 2);
        assert_eq!(store.row_ids(), &[5, 3, 1]);
        assert_consistent(&store);
    }

    #[test]
    fn add_column_backfills_defaults_and_is_idempotent() {
        let mut store = store_with(&[1, 2]);
        store.update_cell(2, "base_exp", 64.0).unwrap();

        assert!(store.add_column(ColumnDef::new("  base   exp ", "Base Exp", DataType::Number)));
        let cols_after_first = store.columns().to_vec();
        assert!(!store.add_column(ColumnDef::new("base_exp", "Again", DataType::Text)));
        assert_eq!(store.columns(), cols_after_first.as_slice());

        assert_eq!(store.column("base_exp").unwrap().data_type, DataType::Number);
        assert_eq!(store.row(1).unwrap().get("base_exp"), Some(Value::Number(0.0)));
        assert_eq!(store.row(2).unwrap().get("base_exp"), Some(Value::Number(64.0)));
    }

    #[test]
    fn add_column_defaults_per_type() {
        let mut store = store_with(&[1]);
        store.add_column(ColumnDef::new("notes", "Notes", DataType::Text));
        store.add_column(ColumnDef::new("caught", "Caught", DataType::Boolean));
        let row = store.row(1).unwrap();
        assert_eq!(row.get("notes"), Some(Value::text("")));
        assert_eq!(row.get("caught"), Some(Value::Bool(false)));
    }

    #[test]
    fn add_column_ignores_blank_keys() {
        let mut store = Store::new();
        let before = store.columns().len();
        assert!(!store.add_column(ColumnDef::new("   ", "Blank", DataType::Text)));
        assert_eq!(store.columns().len(), before);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut store = store_with(&[1, 2]);
        store.add_column(ColumnDef::new("notes", "Notes", DataType::Text));
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.provenance(), Provenance::Empty);
        assert_eq!(store.columns(), Store::new().columns());
        assert!(store.columns().iter().all(|c| c.is_base));
        assert_eq!(store.last_updated_at(), None);
    }

    #[test]
    fn run_command_keeps_provenance() {
        let mut store = store_with(&[1, 2]);
        store.update_cell(1, "types", "grass / poison").unwrap();

        let report = store
            .run_command("set hp to 100 for all pokemon of type grass")
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(store.provenance(), Provenance::Csv);
        assert_eq!(store.row(1).unwrap().get("hp"), Some(Value::Number(100.0)));
        assert_eq!(store.row(2).unwrap().get("hp"), Some(Value::Number(0.0)));
    }

    #[test]
    fn run_command_rejects_unknown_text_without_changes() {
        let mut store = store_with(&[1]);
        let before = store.rows();
        assert!(matches!(
            store.run_command("make everything shiny"),
            Err(LabError::CommandParse { .. })
        ));
        assert!(Arc::ptr_eq(&before[0], &store.rows()[0]));
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_column_key("  is   legendary\t now "), "is_legendary_now");
        assert_eq!(normalize_column_key("ability"), "ability");
    }

    #[test]
    fn from_parts_drops_dangling_ids_and_orphans() {
        let mut map = std::collections::HashMap::new();
        map.insert(1, Arc::new(Row::new(1)));
        map.insert(3, Arc::new(Row::new(3)));
        let store = Store::from_parts(vec![1, 2], map, Vec::new(), Provenance::Remote, None);
        assert_eq!(store.row_ids(), &[1]);
        assert_consistent(&store);
        assert_eq!(store.columns(), Store::new().columns());
    }
}
