//! Identifier allocation for rows minted by the pass.

use crate::error::{MigrateError, Result};
use crate::model::InterfaceId;
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::debug;

/// Source of fresh, globally unique identifiers per entity class.
///
/// The entity name is the table name; its key column is `<entity>id`.
pub trait IdAllocator {
    fn next_id(&mut self, entity: &str) -> Result<InterfaceId>;
}

fn exhausted(entity: &str) -> MigrateError {
    MigrateError::IdExhausted {
        entity: entity.to_string(),
    }
}

/// Allocates identifiers above the current maximum key of each table.
///
/// The maximum is read once per entity; later allocations count up in
/// memory, so the allocator must not outlive the pass that created it.
pub struct MaxIdAllocator<'c> {
    conn: &'c Connection,
    next: HashMap<String, InterfaceId>,
}

impl<'c> MaxIdAllocator<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            next: HashMap::new(),
        }
    }

    fn current_max(&self, entity: &str) -> Result<InterfaceId> {
        if entity.is_empty()
            || !entity
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(MigrateError::Config {
                message: format!("invalid entity name for id allocation: '{}'", entity),
            });
        }

        let sql = format!(
            "SELECT COALESCE(MAX({entity}id), 0) FROM {entity}",
            entity = entity
        );
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| MigrateError::database(&format!("Failed to read max id of {}", entity), e))
    }
}

impl IdAllocator for MaxIdAllocator<'_> {
    fn next_id(&mut self, entity: &str) -> Result<InterfaceId> {
        let candidate = match self.next.get(entity) {
            Some(next) => *next,
            None => {
                let max = self.current_max(entity)?;
                debug!("Seeding {} id allocation after {}", entity, max);
                max.checked_add(1).ok_or_else(|| exhausted(entity))?
            }
        };

        let following = candidate.checked_add(1).ok_or_else(|| exhausted(entity))?;
        self.next.insert(entity.to_string(), following);
        Ok(candidate)
    }
}

/// Deterministic counter, independent of any table contents.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    next: InterfaceId,
}

impl SequenceAllocator {
    pub fn starting_at(first: InterfaceId) -> Self {
        Self { next: first }
    }
}

impl IdAllocator for SequenceAllocator {
    fn next_id(&mut self, entity: &str) -> Result<InterfaceId> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or_else(|| exhausted(entity))?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE interface (interfaceid INTEGER PRIMARY KEY);
             INSERT INTO interface (interfaceid) VALUES (3), (17);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_max_allocator_counts_up_from_table_max() {
        let conn = create_test_conn();
        let mut ids = MaxIdAllocator::new(&conn);
        assert_eq!(ids.next_id("interface").unwrap(), 18);
        assert_eq!(ids.next_id("interface").unwrap(), 19);
    }

    #[test]
    fn test_max_allocator_empty_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE interface (interfaceid INTEGER PRIMARY KEY);")
            .unwrap();
        let mut ids = MaxIdAllocator::new(&conn);
        assert_eq!(ids.next_id("interface").unwrap(), 1);
    }

    #[test]
    fn test_max_allocator_rejects_bad_entity() {
        let conn = create_test_conn();
        let mut ids = MaxIdAllocator::new(&conn);
        let err = ids.next_id("interface; DROP TABLE interface").unwrap_err();
        assert!(matches!(err, MigrateError::Config { .. }));
    }

    #[test]
    fn test_max_allocator_exhaustion() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE interface (interfaceid INTEGER PRIMARY KEY);
             INSERT INTO interface (interfaceid) VALUES ({});",
            i64::MAX
        ))
        .unwrap();
        let mut ids = MaxIdAllocator::new(&conn);
        let err = ids.next_id("interface").unwrap_err();
        assert!(matches!(err, MigrateError::IdExhausted { .. }));
    }

    #[test]
    fn test_sequence_allocator() {
        let mut ids = SequenceAllocator::starting_at(9001);
        assert_eq!(ids.next_id("interface").unwrap(), 9001);
        assert_eq!(ids.next_id("interface").unwrap(), 9002);

        let mut last = SequenceAllocator::starting_at(i64::MAX);
        assert!(last.next_id("interface").is_err());
    }
}
