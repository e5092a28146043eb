//! Multi-row INSERT builder.

use crate::config::StoreConfig;
use crate::error::{MigrateError, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

/// Accumulates rows for one table and writes them with as few statements as
/// the bound-parameter limit allows.
#[derive(Debug)]
pub struct BulkInsert {
    table: &'static str,
    columns: &'static [&'static str],
    rows: Vec<Vec<Value>>,
}

impl BulkInsert {
    pub fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            table,
            columns,
            rows: Vec::new(),
        }
    }

    /// Queue one row. The number of values must match the declared columns.
    pub fn add_row(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(MigrateError::Database {
                message: format!(
                    "Insert into {} expects {} values, got {}",
                    self.table,
                    self.columns.len(),
                    values.len()
                ),
                source: None,
            });
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows per statement so that no statement exceeds the parameter limit.
    fn rows_per_statement(&self) -> usize {
        (StoreConfig::MAX_BOUND_PARAMS / self.columns.len().max(1)).max(1)
    }

    fn statement_sql(&self, row_count: usize) -> String {
        let placeholders = format!("({})", vec!["?"; self.columns.len()].join(","));
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(","),
            vec![placeholders; row_count].join(",")
        )
    }

    /// Execute the queued rows. Returns the number of rows inserted.
    pub fn execute(self, conn: &Connection) -> Result<usize> {
        let mut inserted = 0;
        let mut statements = 0;

        for chunk in self.rows.chunks(self.rows_per_statement()) {
            let sql = self.statement_sql(chunk.len());
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| MigrateError::database(&format!("Failed to prepare insert into {}", self.table), e))?;
            inserted += stmt
                .execute(params_from_iter(chunk.iter().flatten()))
                .map_err(|e| MigrateError::database(&format!("Failed to insert into {}", self.table), e))?;
            statements += 1;
        }

        debug!(
            "Inserted {} rows into {} using {} statements",
            inserted, self.table, statements
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "name"];

    fn create_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_rows() {
        let conn = create_test_conn();
        let mut insert = BulkInsert::new("t", COLUMNS);
        insert
            .add_row(vec![Value::Integer(1), Value::Text("a'b".into())])
            .unwrap();
        insert
            .add_row(vec![Value::Integer(2), Value::Text("c".into())])
            .unwrap();
        assert_eq!(insert.len(), 2);

        assert_eq!(insert.execute(&conn).unwrap(), 2);
        let name: String = conn
            .query_row("SELECT name FROM t WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "a'b");
    }

    #[test]
    fn test_insert_chunks_past_parameter_limit() {
        let conn = create_test_conn();
        let mut insert = BulkInsert::new("t", COLUMNS);
        let total = StoreConfig::MAX_BOUND_PARAMS + 7;
        for id in 0..total {
            insert
                .add_row(vec![Value::Integer(id as i64), Value::Text(format!("n{}", id))])
                .unwrap();
        }
        assert!(insert.rows_per_statement() < total);

        assert_eq!(insert.execute(&conn).unwrap(), total);
        assert_eq!(count(&conn), total as i64);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let mut insert = BulkInsert::new("t", COLUMNS);
        assert!(insert.add_row(vec![Value::Integer(1)]).is_err());
        assert!(insert.is_empty());
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let conn = create_test_conn();
        let insert = BulkInsert::new("t", COLUMNS);
        assert_eq!(insert.execute(&conn).unwrap(), 0);
        assert_eq!(count(&conn), 0);
    }
}
