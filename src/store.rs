// 🗄️ Catalog Store - durable storage for the shared table
// One trait, two backends: a plain-text CSV file (canonical layout) and an
// embedded SQLite database. Every mutation round-trips the whole catalog;
// there are no partial writes.

use crate::catalog::{Catalog, CatalogEntry, Siglum};
use rusqlite::{params, Connection};
use std::fmt;
use std::path::{Path, PathBuf};

/// Persisted column set, in order
pub const COLUMNS: [&str; 3] = ["Job_Code", "Job_Title", "Siglum"];

// ============================================================================
// STORAGE ERROR
// ============================================================================

#[derive(Debug)]
pub enum StorageError {
    /// Persisted data exists but cannot be read. Fatal to startup.
    Unavailable { path: PathBuf, message: String },

    /// Rewriting the persisted table failed. The mutation must not be
    /// considered committed; callers keep their state and may retry.
    WriteFailed { path: PathBuf, message: String },
}

impl StorageError {
    fn unavailable(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Unavailable {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn write_failed(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable { path, message } => {
                write!(f, "Catalog at {} is unavailable: {}", path.display(), message)
            }
            StorageError::WriteFailed { path, message } => {
                write!(f, "Failed to write catalog at {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// `Send` so a workflow can sit behind a shared mutex in the API server.
pub trait CatalogStore: Send {
    /// Read the persisted table. No persisted data yet means an empty
    /// catalog, not an error.
    fn load(&mut self) -> Result<Catalog, StorageError>;

    /// Atomically replace the persisted table with the full in-memory
    /// catalog. On failure nothing is considered committed.
    fn save(&mut self, catalog: &Catalog) -> Result<(), StorageError>;
}

/// Pick a backend from the file extension: `.db` / `.sqlite` / `.sqlite3`
/// opens the SQLite backend, anything else is the CSV file.
pub fn open_store(path: &Path) -> Result<Box<dyn CatalogStore>, StorageError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db") | Some("sqlite") | Some("sqlite3") => {
            Ok(Box::new(SqliteStore::open(path)?))
        }
        _ => Ok(Box::new(CsvStore::new(path))),
    }
}

// ============================================================================
// CSV STORE
// ============================================================================

/// Canonical backend: one comma-separated text file with a header row.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for CsvStore {
    fn load(&mut self) -> Result<Catalog, StorageError> {
        if !self.path.exists() {
            return Ok(Catalog::new());
        }

        let mut rdr = csv::Reader::from_path(&self.path)
            .map_err(|e| StorageError::unavailable(&self.path, e))?;

        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let entry: CatalogEntry =
                result.map_err(|e| StorageError::unavailable(&self.path, e))?;

            // Legacy rows with a blank code are skipped, never resurfaced
            if entry.code.trim().is_empty() {
                continue;
            }

            entries.push(entry);
        }

        Ok(Catalog::from_entries(entries))
    }

    fn save(&mut self, catalog: &Catalog) -> Result<(), StorageError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))
            .map_err(|e| StorageError::write_failed(&self.path, e))?;

        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file());

            let mut wrote_any = false;
            for entry in catalog.entries() {
                if entry.code.trim().is_empty() {
                    continue;
                }
                wtr.serialize(entry)
                    .map_err(|e| StorageError::write_failed(&self.path, e))?;
                wrote_any = true;
            }

            // serde only emits the header alongside the first record; an
            // empty catalog still keeps the fixed column set on disk
            if !wrote_any {
                wtr.write_record(COLUMNS)
                    .map_err(|e| StorageError::write_failed(&self.path, e))?;
            }

            wtr.flush()
                .map_err(|e| StorageError::write_failed(&self.path, e))?;
        }

        // Rename over the old table so a crash mid-write never corrupts it
        tmp.persist(&self.path)
            .map_err(|e| StorageError::write_failed(&self.path, e.error))?;

        Ok(())
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// Database backend for deployments where the catalog lives in a shared
/// dataset service rather than a flat file. Same contract, same column set.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn =
            Connection::open(path).map_err(|e| StorageError::unavailable(path, e))?;

        // WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StorageError::unavailable(path, e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS job_codes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_code TEXT NOT NULL,
                job_title TEXT NOT NULL,
                siglum TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StorageError::unavailable(path, e))?;

        Ok(SqliteStore {
            conn,
            path: path.to_path_buf(),
        })
    }
}

impl CatalogStore for SqliteStore {
    fn load(&mut self) -> Result<Catalog, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT job_code, job_title, siglum FROM job_codes ORDER BY id")
            .map_err(|e| StorageError::unavailable(&self.path, e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| StorageError::unavailable(&self.path, e))?;

        let mut entries = Vec::new();
        for row in rows {
            let (code, title, siglum) =
                row.map_err(|e| StorageError::unavailable(&self.path, e))?;

            if code.trim().is_empty() {
                continue;
            }

            let siglum: Siglum = siglum
                .parse()
                .map_err(|e| StorageError::unavailable(&self.path, e))?;

            entries.push(CatalogEntry::new(code, title, siglum));
        }

        Ok(Catalog::from_entries(entries))
    }

    fn save(&mut self, catalog: &Catalog) -> Result<(), StorageError> {
        let path = self.path.clone();

        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::write_failed(&path, e))?;

        tx.execute("DELETE FROM job_codes", [])
            .map_err(|e| StorageError::write_failed(&path, e))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO job_codes (job_code, job_title, siglum)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| StorageError::write_failed(&path, e))?;

            for entry in catalog.entries() {
                if entry.code.trim().is_empty() {
                    continue;
                }
                stmt.execute(params![entry.code, entry.title, entry.siglum.as_str()])
                    .map_err(|e| StorageError::write_failed(&path, e))?;
            }
        }

        tx.commit()
            .map_err(|e| StorageError::write_failed(&path, e))?;

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
