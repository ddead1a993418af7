//! Parsing of the bulk-edit command language.
//!
//! Three shapes are recognised, matched case-insensitively and in this order:
//!
//! ```text
//! set <field> to <value> for all <entity> of type <type>
//! delete rows where <field> is <value>
//! update <field> to <value> where <field> is <value>
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{LabError, LabResult};
use crate::types::Value;

/// Usage hint surfaced when input matches none of the command shapes.
pub const COMMAND_HINT: &str = "set hp to 100 for all pokemon of type 'grass'";

/// A parsed bulk-edit command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Assign `value` to `field` on every row whose `types` contains `type_name`.
    SetForType {
        field: String,
        value: Value,
        entity: String,
        type_name: String,
    },
    /// Remove rows whose stringified `field` equals `value`.
    DeleteWhere { field: String, value: String },
    /// Assign `value` to `field` on rows whose stringified `where_field` equals `where_value`.
    UpdateWhere {
        field: String,
        value: Value,
        where_field: String,
        where_value: String,
    },
}

type Matcher = fn(&Captures<'_>) -> Command;

static MATCHERS: LazyLock<Vec<(Regex, Matcher)>> = LazyLock::new(|| {
    let set: Matcher = |c| Command::SetForType {
        field: c[1].to_string(),
        value: smart_value(&c[2]),
        entity: c[3].to_string(),
        type_name: c[4].to_string(),
    };
    let delete: Matcher = |c| Command::DeleteWhere {
        field: c[1].to_string(),
        value: strip_quotes(&c[2]),
    };
    let update: Matcher = |c| Command::UpdateWhere {
        field: c[1].to_string(),
        value: smart_value(&c[2]),
        where_field: c[3].to_string(),
        where_value: strip_quotes(&c[4]),
    };

    vec![
        (
            pattern(r#"^set\s+(\w+)\s+to\s+(.+?)\s+for\s+all\s+(\w+)\s+of\s+type\s+['"]?(.+?)['"]?$"#),
            set,
        ),
        (pattern(r"^delete\s+rows\s+where\s+(\w+)\s+is\s+(.+)$"), delete),
        (
            pattern(r"^update\s+(\w+)\s+to\s+(.+?)\s+where\s+(\w+)\s+is\s+(.+)$"),
            update,
        ),
    ]
});

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("command pattern is a valid regex")
}

/// Parse command text.
///
/// The input is trimmed and lowercased before matching, so field names and values come back
/// lowercased. Returns [`LabError::CommandParse`] when no shape matches.
pub fn parse_command(input: &str) -> LabResult<Command> {
    let normalized = input.trim().to_lowercase();
    MATCHERS
        .iter()
        .find_map(|(re, build)| re.captures(&normalized).map(|c| build(&c)))
        .ok_or_else(|| LabError::CommandParse {
            input: input.trim().to_string(),
            hint: COMMAND_HINT,
        })
}

/// Remove every `"` and `'` and trim.
pub(crate) fn strip_quotes(raw: &str) -> String {
    raw.replace(['"', '\''], "").trim().to_string()
}

/// Type a literal from command text: `true`/`false` become booleans, finite numbers become
/// numbers, anything else stays text. Quotes are stripped first.
pub fn smart_value(raw: &str) -> Value {
    let s = strip_quotes(raw);
    match s.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "" => Value::Text(s),
        _ => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(s),
        },
    }
}
