//! Row-level helpers shared by every backend.

use jsonsql_core::{Column, ColumnType, Error, Result, Row};

/// Fail unless `index` addresses one of `len` rows.
pub(crate) fn check_index(table: &str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange {
            table: table.to_string(),
            index,
            len,
        })
    }
}

/// Merge `changes` into `row`. Existing keys keep their position.
pub(crate) fn merge_changes(row: &mut Row, changes: Row) {
    for (key, value) in changes {
        row.insert(key, value);
    }
}

/// Remove the rows at `indices`. Every index is validated before anything
/// is removed; repeated indices collapse.
pub(crate) fn delete_rows(table: &str, rows: &mut Vec<Row>, indices: &[usize]) -> Result<()> {
    for &index in indices {
        check_index(table, index, rows.len())?;
    }

    let mut indices = indices.to_vec();
    indices.sort_unstable();
    indices.dedup();

    for index in indices.into_iter().rev() {
        rows.remove(index);
    }
    Ok(())
}

/// Columns for rows that have no schema entry: every key in first-seen
/// order, typed by the first non-null value.
pub(crate) fn infer_columns(rows: &[Row]) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();

    for row in rows {
        for (key, value) in row {
            match columns.iter_mut().find(|c| &c.name == key) {
                Some(column) => {
                    if column.column_type == ColumnType::Null && !value.is_null() {
                        column.column_type = ColumnType::from_value(value);
                    }
                }
                None => columns.push(Column::new(key.clone(), ColumnType::from_value(value))),
            }
        }
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_delete_rows_validates_first() {
        let mut data = rows(json!([{"a": 1}, {"a": 2}, {"a": 3}]));

        let err = delete_rows("t", &mut data, &[0, 7]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 7, len: 3, .. }));
        assert_eq!(data.len(), 3);

        delete_rows("t", &mut data, &[2, 0, 2]).unwrap();
        assert_eq!(data, rows(json!([{"a": 2}])));
    }

    #[test]
    fn test_merge_changes() {
        let mut row = rows(json!([{"a": 1, "b": 2}])).remove(0);
        merge_changes(&mut row, rows(json!([{"b": 5, "c": 6}])).remove(0));
        assert_eq!(row, rows(json!([{"a": 1, "b": 5, "c": 6}])).remove(0));
    }

    #[test]
    fn test_infer_columns() {
        let data = rows(json!([
            {"id": 1, "note": null},
            {"id": 2, "note": "x", "flag": true},
        ]));
        let columns = infer_columns(&data);
        let summary: Vec<_> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("id", ColumnType::Int),
                ("note", ColumnType::String),
                ("flag", ColumnType::Bool),
            ]
        );
    }
}
