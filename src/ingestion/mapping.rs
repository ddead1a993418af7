//! Target-column → CSV-header mapping built before a CSV import.

use crate::types::{ColumnDef, DataType};

/// A column a CSV header can be mapped onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetField {
    pub key: String,
    pub label: String,
    pub data_type: DataType,
}

impl TargetField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            data_type,
        }
    }
}

/// The standard mapping targets offered to the user, in display order.
pub fn target_fields() -> Vec<TargetField> {
    [
        ("id", "ID", DataType::Number),
        ("sprite", "Sprite", DataType::Text),
        ("name", "Name", DataType::Text),
        ("types", "Type(s)", DataType::Text),
        ("hp", "HP", DataType::Number),
        ("attack", "Attack", DataType::Number),
        ("defense", "Defense", DataType::Number),
        ("specialAttack", "Special Attack", DataType::Number),
        ("specialDefense", "Special Defense", DataType::Number),
        ("speed", "Speed", DataType::Number),
        ("generation", "Generation", DataType::Number),
        ("ability", "Ability", DataType::Text),
    ]
    .into_iter()
    .map(|(key, label, data_type)| TargetField::new(key, label, data_type))
    .collect()
}

/// One mapped target and the CSV header feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub target: TargetField,
    pub source_header: String,
}

/// Mapping from target column keys to CSV header names.
///
/// Targets that are never mapped stay at their default value during import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    entries: Vec<MappingEntry>,
}

impl SchemaMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a target to `source_header`.
    ///
    /// Standard targets (see [`target_fields`]) carry their declared type; any other key is a
    /// text target. Mapping a key again replaces its header.
    pub fn map(self, target_key: &str, source_header: impl Into<String>) -> Self {
        let target = target_fields()
            .into_iter()
            .find(|t| t.key == target_key)
            .unwrap_or_else(|| TargetField::new(target_key, target_key, DataType::Text));
        self.map_field(target, source_header)
    }

    /// Map an explicit target (e.g. a user column with a non-text type).
    pub fn map_field(mut self, target: TargetField, source_header: impl Into<String>) -> Self {
        let source_header = source_header.into();
        match self.entries.iter_mut().find(|e| e.target.key == target.key) {
            Some(existing) => {
                existing.target = target;
                existing.source_header = source_header;
            }
            None => self.entries.push(MappingEntry {
                target,
                source_header,
            }),
        }
        self
    }

    /// Map every header whose name equals a standard target key onto that target.
    pub fn identity(headers: &[String]) -> Self {
        target_fields()
            .into_iter()
            .filter(|t| headers.iter().any(|h| *h == t.key))
            .fold(Self::new(), |m, t| {
                let header = t.key.clone();
                m.map_field(t, header)
            })
    }

    /// Map every registry column whose key appears among `headers` onto itself, using the
    /// column's declared type. This is the inverse of [`crate::export`].
    pub fn from_columns(columns: &[ColumnDef], headers: &[String]) -> Self {
        columns
            .iter()
            .filter(|c| headers.iter().any(|h| *h == c.key))
            .fold(Self::new(), |m, c| {
                let target = TargetField::new(c.key.clone(), c.label.clone(), c.data_type);
                m.map_field(target, c.key.clone())
            })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Header mapped onto `target_key`, if any.
    pub fn source_for(&self, target_key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.target.key == target_key)
            .map(|e| e.source_header.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
