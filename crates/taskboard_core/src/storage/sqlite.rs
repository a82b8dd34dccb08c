use super::{KeyValueStorage, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// `kv_entries`-table storage over one owned SQLite connection.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Wraps a connection that already went through `open_db*`.
    ///
    /// # Errors
    /// - Returns `StorageError::Unavailable` when the `kv_entries` table is
    ///   missing.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(StorageError::Unavailable(
                "kv_entries table is missing; open the connection with open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }

    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStorage;
    use crate::storage::KeyValueStorage;

    #[test]
    fn set_overwrites_and_remove_deletes() {
        let storage = SqliteStorage::open_in_memory().expect("in-memory storage");
        assert_eq!(storage.get("k").expect("get"), None);

        storage.set("k", "one").expect("first set");
        storage.set("k", "two").expect("second set");
        assert_eq!(storage.get("k").expect("get").as_deref(), Some("two"));

        storage.remove("k").expect("remove");
        assert_eq!(storage.get("k").expect("get"), None);
    }

    #[test]
    fn rejects_connection_without_schema() {
        let conn = rusqlite::Connection::open_in_memory().expect("raw connection");
        assert!(SqliteStorage::try_new(conn).is_err());
    }
}
