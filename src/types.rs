//! Core data model types for the research dataset.
//!
//! A [`Row`] is an id-keyed record holding typed [`Value`]s under column keys. The set of legal
//! keys and their declared [`DataType`]s is described by [`ColumnDef`]s held in the
//! [`crate::store::Store`] column registry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved attribute key holding the row identifier.
pub const ID_KEY: &str = "id";

/// Logical data type for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// UTF-8 text.
    Text,
    /// 64-bit floating point number.
    Number,
    /// Boolean.
    Boolean,
}

impl DataType {
    /// Value backfilled onto existing rows when a column of this type is added.
    pub fn default_value(self) -> Value {
        match self {
            DataType::Text => Value::Text(String::new()),
            DataType::Number => Value::Number(0.0),
            DataType::Boolean => Value::Bool(false),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
        })
    }
}

/// A single typed value held by a [`Row`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Unset value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// Text.
    Text(String),
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Stringified form used for matching and export.
    ///
    /// Numbers render without a trailing `.0`, booleans as `true`/`false`, and `Null` as the
    /// empty string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if *n == 0.0 => "0".to_string(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One entity record.
///
/// The `id` is fixed at construction; every other attribute lives in an ordered key → value
/// map. Attributes not present in the map read as [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    id: i64,
    #[serde(flatten)]
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Create a row with no attributes besides its id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }

    /// Create a row carrying the base attribute defaults (empty text, zero stats).
    ///
    /// `generation` and `ability` are optional base attributes and are left unset.
    pub fn with_base_defaults(id: i64) -> Self {
        let mut row = Self::new(id);
        for key in ["sprite", "name", "types"] {
            row.values.insert(key.to_string(), Value::Text(String::new()));
        }
        for key in STAT_KEYS {
            row.values.insert(key.to_string(), Value::Number(0.0));
        }
        row
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the value stored under `key`, with `id` exposed as a number.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key == ID_KEY {
            return Some(Value::Number(self.id as f64));
        }
        self.values.get(key).cloned()
    }

    /// Whether the row carries an attribute named `key`.
    pub fn contains(&self, key: &str) -> bool {
        key == ID_KEY || self.values.contains_key(key)
    }

    /// Set `key` to `value`. Returns `false` (and changes nothing) for the reserved `id` key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if key == ID_KEY {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    /// Builder-style [`Row::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Resolve a possibly lowercased key against this row's attribute names.
    ///
    /// An exact match wins; otherwise the first attribute whose name matches ignoring ASCII
    /// case is returned. Falls back to `key` itself when nothing matches.
    pub fn resolve_key<'a>(&'a self, key: &'a str) -> &'a str {
        if self.contains(key) {
            return key;
        }
        if key.eq_ignore_ascii_case(ID_KEY) {
            return ID_KEY;
        }
        self.values
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// Iterate attributes (excluding `id`) in key order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Keys of the six numeric battle stats, in display order.
pub const STAT_KEYS: [&str; 6] = [
    "hp",
    "attack",
    "defense",
    "specialAttack",
    "specialDefense",
    "speed",
];

/// Side a column is pinned to when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pin {
    Left,
    Right,
}

/// Describes one column of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Attribute name in rows.
    pub key: String,
    /// Header label.
    pub label: String,
    /// Declared type, used for coercion and editing.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Base columns are seeded by the store and cannot be removed.
    #[serde(default)]
    pub is_base: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ColumnDef {
    /// Create a user column with no presentation hints.
    pub fn new(key: impl Into<String>, label: impl Into<String>, data_type: DataType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            data_type,
            is_base: false,
            pinned: None,
            width: None,
        }
    }

    pub fn pinned(mut self, pin: Pin) -> Self {
        self.pinned = Some(pin);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    fn base(key: &str, label: &str, data_type: DataType, width: u32) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            data_type,
            is_base: true,
            pinned: None,
            width: Some(width),
        }
    }
}

/// Columns every fresh store starts with.
pub fn base_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::base("id", "ID", DataType::Number, 80).pinned(Pin::Left),
        ColumnDef::base("sprite", "Sprite", DataType::Text, 90),
        ColumnDef::base("name", "Name", DataType::Text, 200),
        ColumnDef::base("types", "Type(s)", DataType::Text, 200),
        ColumnDef::base("hp", "HP", DataType::Number, 100),
        ColumnDef::base("attack", "Attack", DataType::Number, 110),
        ColumnDef::base("defense", "Defense", DataType::Number, 120),
        ColumnDef::base("specialAttack", "Sp. Atk", DataType::Number, 120),
        ColumnDef::base("specialDefense", "Sp. Def", DataType::Number, 120),
        ColumnDef::base("speed", "Speed", DataType::Number, 110),
    ]
}

/// Where the current row set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// No data loaded yet.
    #[default]
    Empty,
    /// Aggregated from the remote API.
    Remote,
    /// Imported from a CSV file.
    Csv,
}
