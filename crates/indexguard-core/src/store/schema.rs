//! SQLite schema DDL and migration framework for the reference index store.
//!
//! The tables hold what an external indexer recorded: symbols, their
//! occurrences and relations, and the build units that give whole-file
//! freshness. Timestamps are nanoseconds since the Unix epoch; role sets are
//! the raw bits of [`crate::models::SymbolRoles`].

use rusqlite::Connection;

use crate::errors::{IndexGuardError, IndexGuardResult};

/// Current schema version. Migrations run from whatever the DB currently
/// reports up to this value.
pub const SCHEMA_VERSION: i32 = 2;

/// Core DDL statements. `IF NOT EXISTS` keeps them safe to replay.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables ──────────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS symbols (
        usr TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS occurrences (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        usr TEXT NOT NULL REFERENCES symbols(usr),
        roles INTEGER NOT NULL,
        path TEXT NOT NULL,
        line INTEGER NOT NULL,
        utf8_column INTEGER NOT NULL,
        is_system INTEGER NOT NULL DEFAULT 0,
        timestamp_ns INTEGER NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS relations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        occurrence_id INTEGER NOT NULL REFERENCES occurrences(id),
        roles INTEGER NOT NULL,
        usr TEXT NOT NULL REFERENCES symbols(usr)
    );",
    "CREATE TABLE IF NOT EXISTS units (
        unit_name TEXT PRIMARY KEY,
        main_file TEXT NOT NULL,
        timestamp_ns INTEGER NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS unit_files (
        unit_name TEXT NOT NULL REFERENCES units(unit_name),
        file_path TEXT NOT NULL,
        cross_language INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY(unit_name, file_path)
    );",
    "CREATE TABLE IF NOT EXISTS unit_tests (
        occurrence_id INTEGER NOT NULL REFERENCES occurrences(id),
        main_file TEXT NOT NULL,
        PRIMARY KEY(occurrence_id, main_file)
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    // ── indexes ─────────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);",
    "CREATE INDEX IF NOT EXISTS idx_occurrences_usr ON occurrences(usr);",
    "CREATE INDEX IF NOT EXISTS idx_occurrences_path ON occurrences(path);",
    "CREATE INDEX IF NOT EXISTS idx_relations_occurrence ON relations(occurrence_id);",
    "CREATE INDEX IF NOT EXISTS idx_relations_usr ON relations(usr);",
    "CREATE INDEX IF NOT EXISTS idx_units_main_file ON units(main_file);",
    "CREATE INDEX IF NOT EXISTS idx_unit_files_path ON unit_files(file_path);",
    "CREATE INDEX IF NOT EXISTS idx_unit_tests_main_file ON unit_tests(main_file);",
];

// ─── Migration framework ────────────────────────────────────────────────────

/// Run all pending migrations from the current stored version up to
/// [`SCHEMA_VERSION`]. Each step is wrapped in a SAVEPOINT so a failure rolls
/// back only that single step.
///
/// A database written by a newer schema is rejected rather than read with
/// the wrong column meanings.
pub fn migrate_schema(conn: &Connection) -> IndexGuardResult<()> {
    let mut current_version = get_schema_version(conn);
    if current_version > SCHEMA_VERSION {
        return Err(IndexGuardError::Index(format!(
            "index schema version {current_version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    while current_version < SCHEMA_VERSION {
        let next_version = current_version + 1;
        conn.execute_batch("SAVEPOINT indexguard_migrate_step;")?;

        let step_result = (|| -> IndexGuardResult<()> {
            match next_version {
                1 => migrate_to_v1(conn)?,
                2 => migrate_to_v2(conn)?,
                _ => {}
            }
            set_schema_version(conn, next_version)?;
            record_migration_step(conn, current_version, next_version, "success", None)?;
            conn.execute_batch("RELEASE SAVEPOINT indexguard_migrate_step;")?;
            Ok(())
        })();

        match step_result {
            Ok(()) => {
                current_version = next_version;
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK TO SAVEPOINT indexguard_migrate_step;");
                let _ = conn.execute_batch("RELEASE SAVEPOINT indexguard_migrate_step;");
                let _ = record_migration_step(
                    conn,
                    current_version,
                    next_version,
                    "failed",
                    Some(&e.to_string()),
                );
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Read the current schema version from `index_meta`.
/// Returns 0 when the key is absent or unparseable.
pub fn get_schema_version(conn: &Connection) -> i32 {
    let result: Result<String, _> = conn.query_row(
        "SELECT value FROM index_meta WHERE key = 'schema_version';",
        [],
        |row| row.get(0),
    );
    match result {
        Ok(v) => v.parse::<i32>().unwrap_or(0),
        Err(_) => 0,
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> IndexGuardResult<()> {
    conn.execute(
        "INSERT INTO index_meta(key, value) \
         VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_migration_step(
    conn: &Connection,
    from_v: i32,
    to_v: i32,
    status: &str,
    error_msg: Option<&str>,
) -> IndexGuardResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![from_v, to_v, status, error_msg],
    )?;
    Ok(())
}

// ─── Individual migration steps ─────────────────────────────────────────────

/// v0 -> v1: baseline, created by `SCHEMA_STATEMENTS`.
fn migrate_to_v1(_conn: &Connection) -> IndexGuardResult<()> {
    Ok(())
}

/// v1 -> v2: case-insensitive name index for ignore-case pattern search, and
/// a covering index for latest-unit lookups.
fn migrate_to_v2(conn: &Connection) -> IndexGuardResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_symbols_name_nocase \
         ON symbols(name COLLATE NOCASE);",
    )?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_units_main_file_timestamp \
         ON units(main_file, timestamp_ns);",
    )?;
    Ok(())
}
