//! Open the metadata store.

use rusqlite::{Connection, OpenFlags};
use std::io::ErrorKind;
use std::path::Path;

use crate::engine::tools::sqlite_sidecars;
use crate::error::{StoreError, StoreResult};

use super::{FOREIGN_KEYS_ON, SCHEMA, WAL_PRAGMAS};

/// Enable WAL, foreign keys and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> StoreResult<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch(WAL_PRAGMAS)?;
    conn.execute_batch(FOREIGN_KEYS_ON)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Delete the database file and its `-wal` / `-shm` / `-journal` sidecars. Missing files are fine.
pub fn remove_store_files(path: &Path) -> StoreResult<()> {
    let mut targets = vec![path.to_path_buf()];
    targets.extend(sqlite_sidecars(path));
    for target in targets {
        match std::fs::remove_file(&target) {
            Ok(()) => log::debug!("removed {}", target.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Remove {
                    path: target,
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Open or create the store and ensure schema + WAL.
pub fn open_store(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    apply_wal_and_schema(&conn)?;
    Ok(conn)
}

/// Remove any previous store at `path`, then create it empty. Every build starts here.
pub fn open_store_fresh(path: &Path) -> StoreResult<Connection> {
    remove_store_files(path)?;
    open_store(path)
}

/// Open an existing store for lookups only; never creates or migrates.
pub fn open_store_read_only(path: &Path) -> StoreResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Open an in-memory store with the same schema (no WAL pragmas needed).
pub fn open_store_in_memory() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(FOREIGN_KEYS_ON)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
