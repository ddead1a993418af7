//! Write rows back out as CSV, one column per registry entry.

use std::io::Write;
use std::sync::Arc;

use crate::error::LabResult;
use crate::store::Store;
use crate::types::{ColumnDef, Row, Value};

/// Write `rows` to `writer` with the column keys as the header row.
///
/// Cells use the same stringification as command matching, so numbers have no trailing `.0`
/// and absent attributes are written as empty cells.
pub fn write_csv<W: Write>(rows: &[Arc<Row>], columns: &[ColumnDef], writer: W) -> LabResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.iter().map(|c| c.key.as_str()))?;
    for row in rows {
        wtr.write_record(
            columns
                .iter()
                .map(|c| row.get(&c.key).unwrap_or(Value::Null).to_display_string()),
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render `rows` as CSV text.
pub fn export_rows_to_csv(rows: &[Arc<Row>], columns: &[ColumnDef]) -> LabResult<String> {
    let mut buf = Vec::new();
    write_csv(rows, columns, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render the whole store, in row order, as CSV text.
pub fn export_store_to_csv(store: &Store) -> LabResult<String> {
    export_rows_to_csv(&store.rows(), store.columns())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::export_rows_to_csv;
    use crate::types::{base_columns, ColumnDef, DataType, Row};

    #[test]
    fn header_follows_registry_order() {
        let mut columns = base_columns();
        columns.push(ColumnDef::new("caught", "Caught", DataType::Boolean));
        let rows = vec![Arc::new(
            Row::with_base_defaults(25)
                .with("name", "pikachu")
                .with("hp", 35.0)
                .with("caught", true),
        )];

        let text = export_rows_to_csv(&rows, &columns).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,sprite,name,types,hp,attack,defense,specialAttack,specialDefense,speed,caught")
        );
        assert_eq!(lines.next(), Some("25,,pikachu,,35,0,0,0,0,0,true"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn quotes_cells_with_delimiters() {
        let columns = vec![ColumnDef::new("id", "ID", DataType::Number), ColumnDef::new("name", "Name", DataType::Text)];
        let rows = vec![Arc::new(Row::new(1).with("name", "mr. mime, jr"))];
        let text = export_rows_to_csv(&rows, &columns).unwrap();
        assert_eq!(text, "id,name\n1,\"mr. mime, jr\"\n");
    }
}
