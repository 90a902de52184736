use crate::error::Result;
use crate::report::RecordSink;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use strata_scanner::WalkRecord;
use tracing::{debug, info, warn};

pub struct Database {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS walk_sessions (
    id TEXT PRIMARY KEY,
    source_name TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed'))
);

CREATE INDEX IF NOT EXISTS idx_walk_sessions_source ON walk_sessions(source_name);

-- One row per (depth, url) visited
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    depth INTEGER NOT NULL CHECK(depth >= 0),
    url TEXT NOT NULL,
    path TEXT NOT NULL,

    FOREIGN KEY(session_id) REFERENCES walk_sessions(id) ON DELETE CASCADE,
    UNIQUE(session_id, depth, url)
);

CREATE INDEX IF NOT EXISTS idx_records_session ON records(session_id);
CREATE INDEX IF NOT EXISTS idx_records_depth ON records(session_id, depth);
            ",
        )?;
        Ok(())
    }

    // Session management
    pub fn create_session(&self, source_name: &str) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO walk_sessions (id, source_name, start_time, status) VALUES (?1, ?2, ?3, ?4)",
            params![&session_id, source_name, current_timestamp(), "running"],
        )?;

        Ok(session_id)
    }

    pub fn complete_session(&self, session_id: &str) -> Result<()> {
        self.finish_session(session_id, "completed")
    }

    pub fn fail_session(&self, session_id: &str) -> Result<()> {
        self.finish_session(session_id, "failed")
    }

    fn finish_session(&self, session_id: &str, status: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE walk_sessions SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![status, current_timestamp(), session_id],
        )?;
        Ok(())
    }

    // Record operations
    /// Insert all records in one transaction.
    pub fn insert_records(&mut self, session_id: &str, records: &[WalkRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (session_id, depth, url, path) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    session_id,
                    record.depth as i64,
                    &record.url,
                    &record.path
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn get_records_by_session(&self, session_id: &str) -> Result<Vec<WalkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, url, path FROM records WHERE session_id = ?1 ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![session_id], |row| {
                let depth: i64 = row.get(0)?;
                Ok(WalkRecord {
                    depth: depth as usize,
                    url: row.get(1)?,
                    path: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    pub fn get_record_count_by_depth(&self, session_id: &str) -> Result<Vec<(usize, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT depth, COUNT(*) FROM records WHERE session_id = ?1 GROUP BY depth ORDER BY depth",
        )?;

        let counts = stmt
            .query_map(params![session_id], |row| {
                let depth: i64 = row.get(0)?;
                Ok((depth as usize, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }
}

/// Stores records in a SQLite database at `<output_dir>/<source_name>.db`,
/// one session per save.
pub struct SqliteSink {
    output_dir: PathBuf,
}

impl SqliteSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, source_name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.db", source_name))
    }
}

impl RecordSink for SqliteSink {
    fn save(&self, records: &[WalkRecord], source_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(source_name);
        let mut db = Database::new(&path)?;

        let session_id = db.create_session(source_name)?;
        match db.insert_records(&session_id, records) {
            Ok(count) => {
                db.complete_session(&session_id)?;
                info!("Saved {} records to {} (session {})", count, path.display(), session_id);
                for (depth, n) in db.get_record_count_by_depth(&session_id)? {
                    debug!("  depth {}: {} records", depth, n);
                }
                Ok(path)
            }
            Err(e) => {
                if let Err(fail_err) = db.fail_session(&session_id) {
                    warn!("Could not mark session {} as failed: {}", session_id, fail_err);
                }
                Err(e)
            }
        }
    }
}
