//! Accumulator for many small UPDATE statements executed as one batch.

use crate::error::{MigrateError, Result};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

/// Quote a string as an SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Counters reported once a batch has been finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MultiUpdateStats {
    /// Statements pushed into the buffer.
    pub statements: usize,
    /// Times the buffer was sent to the database.
    pub executions: usize,
}

/// Multi-statement buffer.
///
/// Statements are appended as text. Once the buffer grows past
/// `max_bytes` it is executed and reset, which bounds the size of any
/// single batch sent to the database. SQLite needs no begin/end wrapper
/// around a statement list, so [`MultiUpdate::begin`] and
/// [`MultiUpdate::finish`] only delimit the buffer's lifetime.
#[derive(Debug)]
pub struct MultiUpdate {
    sql: String,
    max_bytes: usize,
    stats: MultiUpdateStats,
}

impl MultiUpdate {
    pub fn begin(max_bytes: usize) -> Self {
        Self {
            sql: String::new(),
            max_bytes,
            stats: MultiUpdateStats::default(),
        }
    }

    /// Append one statement. The trailing `;` is added here.
    pub fn push(&mut self, statement: &str) {
        self.sql.push_str(statement);
        self.sql.push_str(";\n");
        self.stats.statements += 1;
    }

    pub fn buffered_bytes(&self) -> usize {
        self.sql.len()
    }

    /// Execute and reset the buffer if it has grown past the threshold.
    pub fn flush_if_overflowed(&mut self, conn: &Connection) -> Result<()> {
        if self.sql.len() > self.max_bytes {
            self.execute_buffer(conn)?;
        }
        Ok(())
    }

    /// Execute whatever is left. An empty buffer is not sent.
    pub fn finish(mut self, conn: &Connection) -> Result<MultiUpdateStats> {
        if !self.sql.trim().is_empty() {
            self.execute_buffer(conn)?;
        }
        Ok(self.stats)
    }

    fn execute_buffer(&mut self, conn: &Connection) -> Result<()> {
        debug!(
            "Executing update batch of {} bytes",
            self.sql.len()
        );
        conn.execute_batch(&self.sql).map_err(|e| MigrateError::Database {
            message: format!("Failed to execute update batch: {}", e),
            source: Some(e),
        })?;
        self.sql.clear();
        self.stats.executions += 1;
        Ok(())
    }
}
