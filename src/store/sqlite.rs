use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use tracing::debug;

use super::{validate_columns, StoreError, Warehouse};
use crate::catalog::{Layer, TableId};
use crate::snapshot::{Scalar, Snapshot};

const BRONZE_FILE: &str = "bronze.db";
const SILVER_FILE: &str = "silver.db";

/// SQLite-backed warehouse: one database file per layer, attached under the
/// layer's schema name so tables read as `bronze.<table>` and `silver.<table>`.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::from_secs(5))?;
        for layer in [Layer::Bronze, Layer::Silver] {
            let path = Self::layer_path(dir, layer);
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {}", layer.schema()),
                params![path.to_string_lossy()],
            )?;
        }
        debug!("Opened warehouse at {}", dir.display());
        Ok(Self { conn })
    }

    pub fn layer_path(dir: &Path, layer: Layer) -> PathBuf {
        match layer {
            Layer::Bronze => dir.join(BRONZE_FILE),
            Layer::Silver => dir.join(SILVER_FILE),
        }
    }

    fn table_exists(&self, layer: Layer, table: TableId) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
            layer.schema()
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params![table.name()], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn ensure_exists(&self, layer: Layer, table: TableId) -> Result<(), StoreError> {
        if self.table_exists(layer, table)? {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.qualified(layer)))
        }
    }
}

fn quote_ident(ident: &str) -> Result<String, StoreError> {
    if !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(format!("\"{ident}\""))
    } else {
        Err(StoreError::InvalidIdentifier(ident.to_string()))
    }
}

fn scalar_from_ref(
    value: ValueRef<'_>,
    table: &str,
    column: &str,
) -> Result<Scalar, StoreError> {
    let unsupported = |kind| StoreError::UnsupportedValue {
        table: table.to_string(),
        column: column.to_string(),
        kind,
    };
    match value {
        ValueRef::Null => Ok(Scalar::Null),
        ValueRef::Integer(v) => Ok(Scalar::Integer(v)),
        // Shortest round-trip rendering keeps values written from decimals exact.
        ValueRef::Real(v) => v
            .to_string()
            .parse::<Decimal>()
            .map(Scalar::Decimal)
            .map_err(|_| unsupported("real")),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Scalar::Text(s.to_string()))
            .map_err(|_| unsupported("non-utf8 text")),
        ValueRef::Blob(_) => Err(unsupported("blob")),
    }
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Null => ToSqlOutput::Owned(Value::Null),
            Scalar::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            Scalar::Decimal(d) => ToSqlOutput::Owned(Value::Text(d.normalize().to_string())),
            Scalar::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Scalar::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

impl Warehouse for SqliteWarehouse {
    fn read_table(&self, layer: Layer, table: TableId) -> Result<Snapshot, StoreError> {
        self.ensure_exists(layer, table)?;
        let qualified = table.qualified(layer);
        let sql = format!("SELECT * FROM {}.{}", layer.schema(), quote_ident(table.name())?);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut snapshot = Snapshot {
            table: table.name().to_string(),
            columns: columns.clone(),
            rows: Vec::new(),
        };
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                values.push(scalar_from_ref(row.get_ref(idx)?, &qualified, column)?);
            }
            snapshot.push_row(values);
        }
        debug!("Read {} rows from {}", snapshot.len(), qualified);
        Ok(snapshot)
    }

    fn table_columns(&self, layer: Layer, table: TableId) -> Result<Vec<String>, StoreError> {
        self.ensure_exists(layer, table)?;
        let sql = format!(
            "PRAGMA {}.table_info({})",
            layer.schema(),
            quote_ident(table.name())?
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn truncate(&self, layer: Layer, table: TableId) -> Result<(), StoreError> {
        self.ensure_exists(layer, table)?;
        let sql = format!("DELETE FROM {}.{}", layer.schema(), quote_ident(table.name())?);
        let removed = self.conn.execute(&sql, [])?;
        debug!("Truncated {} ({} rows removed)", table.qualified(layer), removed);
        Ok(())
    }

    fn append(&self, layer: Layer, table: TableId, snapshot: &Snapshot) -> Result<usize, StoreError> {
        let qualified = table.qualified(layer);
        let declared = self.table_columns(layer, table)?;
        validate_columns(&qualified, &declared, snapshot)?;

        let column_list = snapshot
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let placeholders = (1..=snapshot.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {}.{} ({}) VALUES ({})",
            layer.schema(),
            quote_ident(table.name())?,
            column_list,
            placeholders
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for values in &snapshot.rows {
                stmt.execute(rusqlite::params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;
        debug!("Appended {} rows to {}", snapshot.len(), qualified);
        Ok(snapshot.len())
    }

    fn execute_script(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
