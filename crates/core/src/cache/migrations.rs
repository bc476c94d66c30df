//! Cache schema versioning.
//!
//! The schema version is kept in SQLite's `user_version` header field, so a
//! cache file carries its own version without a bookkeeping table. Step `n`
//! in [`SCHEMA`] upgrades a database at version `n - 1` and commits together
//! with the version bump.

use super::Error;
use tokio_rusqlite::Connection;

/// Schema steps, oldest first. The database version is the number applied.
const SCHEMA: &[&str] = &[include_str!("../../migrations/001_cache_storage.sql")];

/// Version a fully upgraded cache database reports.
pub const SCHEMA_VERSION: i64 = SCHEMA.len() as i64;

/// Bring the cache schema up to [`SCHEMA_VERSION`] and return the version found on open.
///
/// # Errors
///
/// Fails with `MigrationFailed` when a step does not apply, or when the file
/// was written by a newer build whose schema this one cannot read.
pub async fn upgrade(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> {
        let found: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "cache schema version {found} is newer than supported {SCHEMA_VERSION}"
            )));
        }

        for (step, sql) in SCHEMA.iter().enumerate().skip(found.max(0) as usize) {
            let version = step as i64 + 1;
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("schema version {version}: {e}")))?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::info!(version, "upgraded cache schema");
        }

        Ok(found)
    })
    .await
    .map_err(Error::from)
}
