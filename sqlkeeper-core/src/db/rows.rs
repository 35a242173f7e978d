//! Natural-key row editing
//!
//! The reporting tables are keyed by `(date, account_name)`. The editor
//! validates every named column against a fresh catalog read, fills
//! unspecified numeric columns with `0.0` on insert, and reports full rows
//! back so callers can show what changed.

use super::{catalog, open_connection, quote_ident, CellValue};
use crate::error::{Error, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Columns forming the natural key of a reporting table.
const KEY_COLUMNS: [&str; 2] = ["date", "account_name"];

/// A full row: `(column name, value)` in catalog order.
pub type RowValues = Vec<(String, CellValue)>;

/// A row before and after an update.
#[derive(Debug, Clone)]
pub struct RowEdit {
    pub before: RowValues,
    pub after: RowValues,
}

/// Insert a new row keyed by `(date, account_name)`.
///
/// Columns named in `values` get the given number; every other non-key
/// column defaults to `0.0`. Refuses to insert when a row with the same key
/// already exists. Returns the newly created row.
pub fn add_row(
    db_path: &Path,
    table: &str,
    date: &str,
    account: &str,
    values: &[(String, f64)],
) -> Result<RowValues> {
    let conn = open_connection(db_path)?;
    add_row_on(&conn, table, date, account, values)
}

/// [`add_row`] against an already-open connection.
pub fn add_row_on(
    conn: &Connection,
    table: &str,
    date: &str,
    account: &str,
    values: &[(String, f64)],
) -> Result<RowValues> {
    let columns = catalog::table_columns(conn, table)?;
    validate_key_shape(table, &columns)?;
    validate_value_columns(table, &columns, values)?;

    if fetch_row(conn, table, &columns, date, account)?.is_some() {
        return Err(Error::DuplicateRow {
            table: table.to_string(),
            date: date.to_string(),
            account: account.to_string(),
        });
    }

    let mut names = Vec::with_capacity(columns.len());
    let mut cells: Vec<rusqlite::types::Value> = Vec::with_capacity(columns.len());
    for column in &columns {
        names.push(quote_ident(&column.name));
        let cell = match column.name.as_str() {
            "date" => rusqlite::types::Value::Text(date.to_string()),
            "account_name" => rusqlite::types::Value::Text(account.to_string()),
            other => {
                let given = values.iter().find(|(name, _)| name == other);
                rusqlite::types::Value::Real(given.map(|(_, v)| *v).unwrap_or(0.0))
            }
        };
        cells.push(cell);
    }

    let placeholders = (1..=names.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders
        ),
        rusqlite::params_from_iter(cells),
    )?;

    tracing::info!(table, date, account, "Row inserted");

    fetch_row(conn, table, &columns, date, account)?.ok_or_else(|| Error::RowNotFound {
        table: table.to_string(),
        date: date.to_string(),
        account: account.to_string(),
    })
}

/// Update an existing row keyed by `(date, account_name)`.
///
/// Returns the row as it was before and after the update. Missing row is an
/// error; nothing is inserted.
pub fn update_row(
    db_path: &Path,
    table: &str,
    date: &str,
    account: &str,
    updates: &[(String, f64)],
) -> Result<RowEdit> {
    let conn = open_connection(db_path)?;
    update_row_on(&conn, table, date, account, updates)
}

/// [`update_row`] against an already-open connection.
pub fn update_row_on(
    conn: &Connection,
    table: &str,
    date: &str,
    account: &str,
    updates: &[(String, f64)],
) -> Result<RowEdit> {
    if updates.is_empty() {
        return Err(Error::Config("no columns to update".to_string()));
    }

    let columns = catalog::table_columns(conn, table)?;
    validate_key_shape(table, &columns)?;
    validate_value_columns(table, &columns, updates)?;

    let before = fetch_row(conn, table, &columns, date, account)?.ok_or_else(|| {
        Error::RowNotFound {
            table: table.to_string(),
            date: date.to_string(),
            account: account.to_string(),
        }
    })?;

    let set_clause = updates
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{} = ?{}", quote_ident(name), i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let mut cells: Vec<rusqlite::types::Value> = updates
        .iter()
        .map(|(_, v)| rusqlite::types::Value::Real(*v))
        .collect();
    cells.push(rusqlite::types::Value::Text(date.to_string()));
    cells.push(rusqlite::types::Value::Text(account.to_string()));

    conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE date = ?{} AND account_name = ?{}",
            quote_ident(table),
            set_clause,
            updates.len() + 1,
            updates.len() + 2
        ),
        rusqlite::params_from_iter(cells),
    )?;

    tracing::info!(table, date, account, updated = updates.len(), "Row updated");

    let after = fetch_row(conn, table, &columns, date, account)?.ok_or_else(|| {
        Error::RowNotFound {
            table: table.to_string(),
            date: date.to_string(),
            account: account.to_string(),
        }
    })?;

    Ok(RowEdit { before, after })
}

/// The natural key columns must exist on the table.
fn validate_key_shape(table: &str, columns: &[catalog::ColumnInfo]) -> Result<()> {
    for key in KEY_COLUMNS {
        if !columns.iter().any(|c| c.name == key) {
            return Err(Error::ColumnNotFound {
                table: table.to_string(),
                column: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Every user-supplied column must exist and must not be part of the key.
fn validate_value_columns(
    table: &str,
    columns: &[catalog::ColumnInfo],
    values: &[(String, f64)],
) -> Result<()> {
    for (name, _) in values {
        if KEY_COLUMNS.contains(&name.as_str()) {
            return Err(Error::Config(format!(
                "'{}' is part of the natural key and is set through the key arguments",
                name
            )));
        }
        if !columns.iter().any(|c| &c.name == name) {
            return Err(Error::ColumnNotFound {
                table: table.to_string(),
                column: name.clone(),
            });
        }
    }
    Ok(())
}

/// Read the row with the given key, in catalog column order.
fn fetch_row(
    conn: &Connection,
    table: &str,
    columns: &[catalog::ColumnInfo],
    date: &str,
    account: &str,
) -> Result<Option<RowValues>> {
    use rusqlite::OptionalExtension;

    let projection = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    let row = conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE date = ?1 AND account_name = ?2",
                projection,
                quote_ident(table)
            ),
            params![date, account],
            |row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let value: rusqlite::types::Value = row.get(i)?;
                        Ok((c.name.clone(), CellValue::from(value)))
                    })
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            },
        )
        .optional()?;

    Ok(row)
}
