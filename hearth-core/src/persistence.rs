//! Persistence backends for memory logs.
//!
//! A log is always stored as one JSON array per character, whatever the
//! backend:
//!
//! - [`JsonFileStore`]: `{memory_dir}/{character_id}_memory.json`, written
//!   to a temporary file and renamed over the target, so a reader never sees
//!   a half-written array.
//! - [`SqliteStore`]: the same array in a BLOB column with an optional
//!   CRC-32 checksum, upserted in a single statement.
//!
//!   ```sql
//!   CREATE TABLE IF NOT EXISTS memory_logs (
//!       character_id TEXT PRIMARY KEY,
//!       data         BLOB NOT NULL,
//!       updated_at   TEXT NOT NULL,
//!       checksum     TEXT
//!   );
//!   ```
//!
//! - [`InMemoryStore`]: process-local map, for tests and throwaway sessions.
//!
//! "Not found" is never an error: `load` returns `Ok(None)`.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{HearthError, Result};
use crate::types::{CharacterId, MemoryLog};

/// Storage for per-character memory logs.
///
/// Implementations must leave storage consistent when `save` returns,
/// successfully or not: either the previous log or the new one is visible,
/// never a mixture.
pub trait PersistentStore: Send + Sync {
    /// Load the stored log, or `None` if the character has none yet.
    ///
    /// # Errors
    /// I/O, database or decoding failures.
    fn load(&self, id: &CharacterId) -> Result<Option<MemoryLog>>;

    /// Replace the stored log.
    ///
    /// # Errors
    /// I/O, database or encoding failures.
    fn save(&self, id: &CharacterId, log: &MemoryLog) -> Result<()>;

    /// Remove the stored log. Returns `true` if one existed.
    ///
    /// # Errors
    /// I/O or database failures.
    fn delete(&self, id: &CharacterId) -> Result<bool>;

    /// Every character with a stored log.
    ///
    /// # Errors
    /// I/O or database failures.
    fn list_characters(&self) -> Result<Vec<CharacterId>>;
}

/// Open the backend named by `config.backend`.
///
/// # Errors
/// Returns [`HearthError::Config`] for an unknown backend name, or the
/// backend's own error if it cannot be opened.
pub fn open_backend(config: &PersistenceConfig) -> Result<Box<dyn PersistentStore>> {
    match config.backend.as_str() {
        "json" => Ok(Box::new(JsonFileStore::open(&config.memory_dir)?)),
        "sqlite" => Ok(Box::new(SqliteStore::open(&config.sqlite_path, config)?)),
        "memory" => Ok(Box::new(InMemoryStore::new())),
        other => Err(HearthError::Config(format!(
            "unknown persistence backend '{other}' (expected json, sqlite or memory)"
        ))),
    }
}

// ---------------------------------------------------------------------------
// JSON files
// ---------------------------------------------------------------------------

const FILE_SUFFIX: &str = "_memory.json";

/// One pretty-printed JSON array per character in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Use `dir` as the memory directory, creating it if needed.
    ///
    /// # Errors
    /// Returns [`HearthError::Io`] if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "JSON memory store opened");
        Ok(Self { dir })
    }

    /// Path of the file holding `id`'s log.
    ///
    /// # Errors
    /// Returns [`HearthError::InvalidCharacterId`] for ids that are not safe
    /// to embed in a file name.
    pub fn path_for(&self, id: &CharacterId) -> Result<PathBuf> {
        let id = id.validated()?;
        Ok(self.dir.join(format!("{id}{FILE_SUFFIX}")))
    }
}

impl PersistentStore for JsonFileStore {
    fn load(&self, id: &CharacterId) -> Result<Option<MemoryLog>> {
        let path = self.path_for(id)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let log: MemoryLog = serde_json::from_slice(&data)?;
        debug!(character = %id, entries = log.len(), "Loaded memory log");
        Ok(Some(log))
    }

    fn save(&self, id: &CharacterId, log: &MemoryLog) -> Result<()> {
        let start = Instant::now();
        let path = self.path_for(id)?;
        let json = to_pretty_json(log)?;

        replace_file(&path, |file| {
            file.write_all(&json)?;
            file.sync_all()
        })?;

        debug!(
            character = %id,
            entries = log.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved memory log"
        );
        Ok(())
    }

    fn delete(&self, id: &CharacterId) -> Result<bool> {
        match fs::remove_file(self.path_for(id)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_characters(&self) -> Result<Vec<CharacterId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            if let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(FILE_SUFFIX)) {
                ids.push(CharacterId::new(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Write `path` through a `.tmp` sibling that is renamed over it. The
/// sibling is removed again if writing or renaming fails.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let written = fs::File::create(&tmp).and_then(|mut file| write(&mut file));
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Four-space indented JSON, the layout hand-edited memory files use.
fn to_pretty_json(log: &MemoryLog) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(log, &mut ser)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memory_logs (
    character_id TEXT PRIMARY KEY,
    data         BLOB NOT NULL,
    updated_at   TEXT NOT NULL,
    checksum     TEXT
);";

/// Memory logs in a single SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    checksum_enabled: bool,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("checksum_enabled", &self.checksum_enabled)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    /// Returns [`HearthError::Database`] on SQLite failures or
    /// [`HearthError::Io`] if the parent directory cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "SQLite memory store opened"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    /// Returns [`HearthError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            checksum_enabled: config.checksum_enabled,
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl PersistentStore for SqliteStore {
    fn load(&self, id: &CharacterId) -> Result<Option<MemoryLog>> {
        let id = id.validated()?;
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT data, checksum FROM memory_logs WHERE character_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![id.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        character = %id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch — possible save corruption"
                    );
                }
            }
        }

        let log: MemoryLog = serde_json::from_slice(&data)?;
        debug!(character = %id, entries = log.len(), "Loaded memory log");
        Ok(Some(log))
    }

    fn save(&self, id: &CharacterId, log: &MemoryLog) -> Result<()> {
        let id = id.validated()?;
        let json = serde_json::to_vec(log)?;
        let checksum = self.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.lock().execute(
            "INSERT INTO memory_logs (character_id, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(character_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![id.as_str(), json, now, checksum],
        )?;

        debug!(character = %id, entries = log.len(), bytes = json.len(), "Saved memory log");
        Ok(())
    }

    fn delete(&self, id: &CharacterId) -> Result<bool> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM memory_logs WHERE character_id = ?1",
            params![id.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn list_characters(&self) -> Result<Vec<CharacterId>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT character_id FROM memory_logs ORDER BY character_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(CharacterId::new(row?));
        }
        Ok(ids)
    }
}

/// Extension trait that adds an `.optional()` combinator to `rusqlite::Result`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

/// Logs kept in a process-local map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    logs: Mutex<HashMap<CharacterId, MemoryLog>>,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for InMemoryStore {
    fn load(&self, id: &CharacterId) -> Result<Option<MemoryLog>> {
        Ok(self.logs.lock().get(id).cloned())
    }

    fn save(&self, id: &CharacterId, log: &MemoryLog) -> Result<()> {
        self.logs.lock().insert(id.clone(), log.clone());
        Ok(())
    }

    fn delete(&self, id: &CharacterId) -> Result<bool> {
        Ok(self.logs.lock().remove(id).is_some())
    }

    fn list_characters(&self) -> Result<Vec<CharacterId>> {
        let mut ids: Vec<_> = self.logs.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
