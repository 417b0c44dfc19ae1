use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::app::ports::StoragePort;
use crate::constants::{self, ITEM_COLUMN, NUMERIC_NUTRITION_COLUMNS, RESTAURANT_COLUMN};
use crate::domain::{NewRecord, Nutrition, Record, RecordField};
use crate::error::{EtlError, Result};

const TABLE: &str = "fastfood";

/// Storage backed by a single SQLite file.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    select_columns: String,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("SQLite storage opened at {}", db_path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(&schema())?;
        let select_columns = ["id", RESTAURANT_COLUMN, ITEM_COLUMN, constants::TRANSLATED_ITEM_COLUMN, constants::CATEGORY_COLUMN]
            .into_iter()
            .chain(constants::nutrition_columns())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            conn: Mutex::new(conn),
            select_columns,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EtlError::Io(std::io::Error::new(std::io::ErrorKind::Other, "sqlite connection lock poisoned")))
    }
}

fn schema() -> String {
    let nutrition = constants::nutrition_columns()
        .map(|column| {
            let affinity = if NUMERIC_NUTRITION_COLUMNS.contains(&column) { "REAL" } else { "TEXT" };
            format!("    {} {},\n", column, affinity)
        })
        .collect::<String>();
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            restaurant TEXT NOT NULL,
            item TEXT NOT NULL,
        {nutrition}
            translated_item TEXT,
            category TEXT
        );
        CREATE TABLE IF NOT EXISTS ingest_log (
            source_digest TEXT PRIMARY KEY,
            source_name   TEXT NOT NULL,
            row_count     INTEGER NOT NULL,
            ingested_at   TEXT NOT NULL
        );
        "#,
        table = TABLE,
        nutrition = nutrition,
    )
}

/// Stored numeric text comes back as INTEGER or REAL; render it as text again.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut nutrition = Nutrition::new();
    for (offset, column) in constants::nutrition_columns().enumerate() {
        if let Some(text) = value_to_text(row.get::<_, Value>(5 + offset)?) {
            nutrition.insert(column.to_string(), text);
        }
    }
    Ok(Record {
        id: row.get(0)?,
        restaurant: row.get(1)?,
        item: row.get(2)?,
        translated_item: row.get(3)?,
        category: row.get(4)?,
        nutrition,
    })
}

#[async_trait]
impl StoragePort for SqliteStorage {
    async fn append(&self, records: &[NewRecord]) -> Result<usize> {
        let columns: Vec<&str> = [RESTAURANT_COLUMN, ITEM_COLUMN]
            .into_iter()
            .chain(constants::nutrition_columns())
            .collect();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE,
            columns.join(", "),
            placeholders
        );

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                let mut values: Vec<Option<&str>> = vec![Some(record.restaurant.as_str()), Some(record.item.as_str())];
                values.extend(
                    constants::nutrition_columns().map(|column| record.nutrition.get(column).map(String::as_str)),
                );
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        debug!("Appended {} records", records.len());
        Ok(records.len())
    }

    async fn query_all(&self) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM {} ORDER BY id", self.select_columns, TABLE))?;
        let records = stmt
            .query_map([], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn query_page(&self, after_id: Option<i64>, limit: usize) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE id > ?1 ORDER BY id LIMIT ?2",
            self.select_columns, TABLE
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![after_id.unwrap_or(0), limit], map_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn update_field(&self, id: i64, field: RecordField, value: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!("UPDATE {} SET {} = ?1 WHERE id = ?2", TABLE, field.column()),
            params![value, id],
        )?;
        if changed == 0 {
            return Err(EtlError::Storage(rusqlite::Error::QueryReturnedNoRows));
        }
        Ok(())
    }

    async fn update_fields(&self, field: RecordField, updates: &[(i64, Option<String>)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!("UPDATE {} SET {} = ?1 WHERE id = ?2", TABLE, field.column()))?;
            for (id, value) in updates {
                if stmt.execute(params![value, id])? == 0 {
                    // Dropping the transaction rolls the whole batch back
                    return Err(EtlError::Storage(rusqlite::Error::QueryReturnedNoRows));
                }
            }
        }
        tx.commit()?;
        debug!("Updated {} on {} rows", field, updates.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", TABLE), [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    async fn sample(&self) -> Result<Option<Record>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM {} ORDER BY id LIMIT 1", self.select_columns, TABLE),
                [],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn reset(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", TABLE), [])?;
        tx.execute("DELETE FROM ingest_log", [])?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name = ?1", params![TABLE])?;
        tx.commit()?;
        info!("Storage reset");
        Ok(())
    }

    async fn has_ingested(&self, digest: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM ingest_log WHERE source_digest = ?1",
                params![digest],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn mark_ingested(&self, digest: &str, source_name: &str, rows: usize) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ingest_log (source_digest, source_name, row_count, ingested_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_digest) DO UPDATE SET source_name=excluded.source_name,
                 row_count=excluded.row_count, ingested_at=excluded.ingested_at",
            params![digest, source_name, rows as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
