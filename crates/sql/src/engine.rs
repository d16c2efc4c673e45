//! SQLite query engine with schema introspection.
//!
//! The engine owns the connection to the queryable application database,
//! renders schema descriptions for text-to-SQL generation (honoring table
//! allow-lists), and executes generated queries, returning rows as
//! column-to-value maps.

use quarry_core::{AppError, AppResult};
use rusqlite::{types::ValueRef, Connection, OpenFlags};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A result row: column name mapped to a JSON value.
pub type SqlRow = Map<String, Value>;

/// Engine over the queryable SQLite database.
///
/// A missing or unopenable database is not fatal at construction time; the
/// engine reports it on first use instead. A failed connection is retried
/// exactly once per engine lifetime, guarded by a flag, so a dead database
/// cannot trigger a reconnect storm.
pub struct SqlEngine {
    db_path: PathBuf,
    conn: Mutex<Option<Connection>>,
    reconnect_attempted: AtomicBool,
}

impl SqlEngine {
    /// Open the engine over the database at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();

        let conn = match Self::connect(&db_path) {
            Ok(conn) => {
                tracing::info!("Connected to database: {}", db_path.display());
                Some(conn)
            }
            Err(e) => {
                tracing::warn!("Database not available yet: {}", e);
                None
            }
        };

        Self {
            db_path,
            conn: Mutex::new(conn),
            reconnect_attempted: AtomicBool::new(false),
        }
    }

    fn connect(db_path: &Path) -> AppResult<Connection> {
        if !db_path.exists() {
            return Err(AppError::Sql(format!(
                "Database file not found: {}",
                db_path.display()
            )));
        }

        Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(|e| AppError::Sql(format!("Failed to open database: {}", e)))
    }

    /// Whether a live connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Run `f` with the connection, attempting a single bounded reconnect
    /// if the initial connection failed.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| AppError::Sql("Database connection lock poisoned".to_string()))?;

        if guard.is_none() && !self.reconnect_attempted.swap(true, Ordering::SeqCst) {
            match Self::connect(&self.db_path) {
                Ok(conn) => {
                    tracing::info!("Reconnected to database: {}", self.db_path.display());
                    *guard = Some(conn);
                }
                Err(e) => {
                    tracing::warn!("Reconnect attempt failed: {}", e);
                }
            }
        }

        let conn = guard.as_ref().ok_or_else(|| {
            AppError::Sql(format!(
                "Database not available: {}",
                self.db_path.display()
            ))
        })?;

        f(conn)
    }

    /// List the user tables in the database, sorted by name.
    pub fn table_names(&self) -> AppResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                     ORDER BY name",
                )
                .map_err(|e| AppError::Sql(format!("Failed to list tables: {}", e)))?;

            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| AppError::Sql(format!("Failed to list tables: {}", e)))?;

            Ok(rows.filter_map(|r| r.ok()).collect())
        })
    }

    /// Render a schema description for text-to-SQL generation.
    ///
    /// When `table_filter` is non-empty, only the listed tables are
    /// described; the generator must never see columns of tables the
    /// request restricted away.
    pub fn render_schema(&self, table_filter: &[String]) -> AppResult<String> {
        let tables = self.table_names()?;

        let selected: Vec<String> = if table_filter.is_empty() {
            tables
        } else {
            tables
                .into_iter()
                .filter(|t| table_filter.contains(t))
                .collect()
        };

        if selected.is_empty() {
            return Err(AppError::Sql(
                "No queryable tables available for this request".to_string(),
            ));
        }

        self.with_conn(|conn| {
            let mut schema = String::new();

            for table in &selected {
                let mut stmt = conn
                    .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
                    .map_err(|e| {
                        AppError::Sql(format!("Failed to describe table '{}': {}", table, e))
                    })?;

                let columns = stmt
                    .query_map([], |row| {
                        let name: String = row.get(1)?;
                        let col_type: String = row.get(2)?;
                        Ok(format!("{} {}", name, col_type))
                    })
                    .map_err(|e| {
                        AppError::Sql(format!("Failed to describe table '{}': {}", table, e))
                    })?
                    .filter_map(|r| r.ok())
                    .collect::<Vec<_>>();

                schema.push_str(&format!("TABLE {} ({})\n", table, columns.join(", ")));
            }

            Ok(schema.trim_end().to_string())
        })
    }

    /// Execute a query and return rows as column-to-value maps.
    ///
    /// Invalid SQL surfaces as an error from prepare/execute; no partial
    /// rows are returned.
    pub fn run(&self, query: &str) -> AppResult<Vec<SqlRow>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Sql("Refusing to execute an empty query".to_string()));
        }

        tracing::info!("Executing SQL query");
        tracing::debug!("Query: {}", query);

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(query)
                .map_err(|e| AppError::Sql(format!("Failed to prepare query: {}", e)))?;

            let column_names: Vec<String> =
                stmt.column_names().iter().map(|c| c.to_string()).collect();

            let mut rows = stmt
                .query([])
                .map_err(|e| AppError::Sql(format!("Failed to execute query: {}", e)))?;

            let mut results = Vec::new();

            loop {
                let row = match rows.next() {
                    Ok(Some(row)) => row,
                    Ok(None) => break,
                    Err(e) => {
                        return Err(AppError::Sql(format!("Failed to read result row: {}", e)))
                    }
                };

                let mut record = Map::new();
                for (i, name) in column_names.iter().enumerate() {
                    let value = row
                        .get_ref(i)
                        .map_err(|e| AppError::Sql(format!("Failed to read column: {}", e)))?;
                    record.insert(name.clone(), value_ref_to_json(value));
                }
                results.push(record);
            }

            tracing::debug!("Query returned {} rows", results.len());
            Ok(results)
        })
    }
}

/// Quote an identifier for use in PRAGMA statements.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a SQLite value to a JSON value.
fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).to_string()),
    }
}
