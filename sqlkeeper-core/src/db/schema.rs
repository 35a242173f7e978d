//! Transactional schema mutation
//!
//! The store has no in-place "drop column" primitive, so column removal is a
//! table rebuild: copy the surviving columns into a fresh table, drop the
//! original, rename the copy back. All three steps run inside one scoped
//! transaction so no other reader ever observes an intermediate state, and
//! any failure rolls the table back untouched.

use super::{catalog, open_connection, quote_ident};
use crate::error::{Error, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;

/// Remove `column` from `table` in the database at `db_path`.
///
/// Validation happens against a fresh catalog read, before any mutating
/// statement:
/// - unknown table → [`Error::TableNotFound`]
/// - unknown column → [`Error::ColumnNotFound`]
/// - the table's only column → [`Error::LastColumn`]
///
/// On success the table keeps its name, row count, row contents and the
/// original order of the surviving columns. Indexes, triggers and
/// constraints tied to the dropped column are not recreated.
pub fn drop_column(db_path: &Path, table: &str, column: &str) -> Result<()> {
    let mut conn = open_connection(db_path)?;
    drop_column_on(&mut conn, table, column)
}

/// [`drop_column`] against an already-open connection.
pub fn drop_column_on(conn: &mut Connection, table: &str, column: &str) -> Result<()> {
    let columns = catalog::table_columns(conn, table)?;

    let keep: Vec<&catalog::ColumnInfo> =
        columns.iter().filter(|c| c.name != column).collect();

    if keep.len() == columns.len() {
        return Err(Error::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    if keep.is_empty() {
        return Err(Error::LastColumn {
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    let rebuild = rebuild_name(conn, table)?;
    let projection = keep
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    tracing::debug!(table, column, rebuild = %rebuild, "Rebuilding table without column");

    let tx = conn.transaction()?;
    tx.execute(
        &format!(
            "CREATE TABLE {} AS SELECT {} FROM {}",
            quote_ident(&rebuild),
            projection,
            quote_ident(table)
        ),
        [],
    )?;
    tx.execute(&format!("DROP TABLE {}", quote_ident(table)), [])?;
    tx.execute(
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&rebuild),
            quote_ident(table)
        ),
        [],
    )?;
    tx.commit()?;

    tracing::info!(table, column, "Column removed");
    Ok(())
}

/// Pick a rebuild table name that collides with no existing schema object.
fn rebuild_name(conn: &Connection, table: &str) -> Result<String> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master")?;
    let existing = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<String>, _>>()?;

    let mut candidate = format!("{}_rebuild", table);
    let mut n = 1;
    while existing.contains(&candidate) {
        candidate = format!("{}_rebuild{}", table, n);
        n += 1;
    }
    Ok(candidate)
}
