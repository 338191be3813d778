pub mod repository;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

/// Reader connections opened for a file-backed database. Report aggregations
/// fan out across them.
const READER_CONNECTIONS: usize = 4;

/// Database wraps one writer and several reader `tokio_rusqlite::Connection`s
/// using WAL mode for concurrent access. The writer serializes writes via
/// `tokio_rusqlite`'s internal channel; each reader runs on its own thread, so
/// queries dispatched to different readers execute in parallel.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    readers: Vec<tokio_rusqlite::Connection>,
}

impl Database {
    /// Open the database at the default path (`~/.modactivity/modactivity.db`).
    pub async fn open() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".modactivity");
        std::fs::create_dir_all(&dir).map_err(|e| Error::Config(e.to_string()))?;
        Self::open_at(dir.join("modactivity.db")).await
    }

    /// Open the database at the given path.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&writer).await?;

        let mut readers = Vec::with_capacity(READER_CONNECTIONS);
        for _ in 0..READER_CONNECTIONS {
            let reader = tokio_rusqlite::Connection::open(&path).await?;
            Self::init_reader(&reader).await?;
            readers.push(reader);
        }

        log::debug!(
            "Opened {} with {} reader connections",
            path.display(),
            readers.len()
        );
        Ok(Self { writer, readers })
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> Result<Self> {
        let writer = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&writer).await?;

        // In-memory DBs are per-connection, so the reader shares the writer.
        Ok(Self {
            readers: vec![writer.clone()],
            writer,
        })
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            let migrations =
                Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))]);
            migrations.to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;\
                 PRAGMA query_only=ON;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Get a reference to the writer connection.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Get a reference to the primary reader connection.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.readers[0]
    }

    /// Pick a reader for a given fan-out slot, wrapping around the reader set.
    pub fn reader_for(&self, slot: usize) -> &tokio_rusqlite::Connection {
        &self.readers[slot % self.readers.len()]
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(conn: &tokio_rusqlite::Connection) -> Vec<String> {
        conn.call(|conn| {
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();
        assert_eq!(db.reader_count(), 1);

        let tables = table_names(db.reader()).await;
        assert!(tables.contains(&"action_events".to_string()));
        assert!(tables.contains(&"report_events".to_string()));
        assert!(tables.contains(&"staff_members".to_string()));
        assert!(tables.contains(&"app_config".to_string()));
    }

    #[tokio::test]
    async fn test_open_at_file_fans_out_readers() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("mod.db")).await.unwrap();
        assert_eq!(db.reader_count(), READER_CONNECTIONS);

        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO staff_members (account_id, is_staff, updated_at)
                     VALUES ('a1', 1, datetime('now'))",
                    [],
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        // Every reader sees the committed write.
        for slot in 0..db.reader_count() {
            let count: i64 = db
                .reader_for(slot)
                .call(|conn| {
                    conn.query_row("SELECT COUNT(*) FROM staff_members", [], |row| row.get(0))
                })
                .await
                .unwrap();
            assert_eq!(count, 1);
        }
    }

    #[tokio::test]
    async fn test_readers_are_query_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("mod.db")).await.unwrap();

        let result = db
            .reader()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO app_config (key, value, updated_at) VALUES ('k', 'v', 'now')",
                    [],
                )
            })
            .await;
        assert!(result.is_err());
    }
}
