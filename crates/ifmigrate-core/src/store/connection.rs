//! Opening and configuring the monitored-device database.

use crate::config::StoreConfig;
use crate::error::{MigrateError, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open an existing database for migration.
///
/// Unlike a cache, the database must already exist: creating an empty one
/// here would only lead to a less helpful layout error later.
pub fn open_database(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(MigrateError::Io {
            message: "Database file does not exist".to_string(),
            path: Some(db_path.to_path_buf()),
            source: None,
        });
    }

    let conn = Connection::open(db_path)
        .map_err(|e| MigrateError::database("Failed to open database", e))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Configure connection pragmas.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode=WAL;\n\
         PRAGMA busy_timeout={};\n\
         PRAGMA synchronous=NORMAL;\n\
         PRAGMA foreign_keys=ON;",
        StoreConfig::BUSY_TIMEOUT_MS,
    ))
    .map_err(|e| MigrateError::database("Failed to set pragmas", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = open_database(&temp_dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, MigrateError::Io { .. }));
    }

    #[test]
    fn test_open_enables_foreign_keys() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("zabbix.db");
        Connection::open(&db_path).unwrap();

        let conn = open_database(&db_path).unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
