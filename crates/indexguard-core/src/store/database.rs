//! SQLite-backed [`PersistentIndex`].
//!
//! Reads the tables described in [`crate::store::schema`], as written by an
//! external indexer. Each query opens its own connection so readers always
//! see the latest committed state and the caller never manages connection
//! lifetime. Query failures are logged and answered with empty results; the
//! checked layer above has no error channel.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexSet;
use rusqlite::{params, Connection, Row, ToSql};
use tracing::{debug, warn};

use crate::config::IndexGuardConfig;
use crate::errors::IndexGuardResult;
use crate::index::{OccurrenceVisitor, PersistentIndex};
use crate::models::{
    PatternOptions, Symbol, SymbolKind, SymbolLocation, SymbolOccurrence, SymbolRelation, SymbolRoles,
};
use crate::store::pattern::matches_pattern;
use crate::store::schema;

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

/// Nanoseconds since the Unix epoch, saturating at the `i64` range.
pub fn system_time_to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}

pub fn nanos_to_system_time(nanos: i64) -> SystemTime {
    if nanos >= 0 {
        UNIX_EPOCH + Duration::from_nanos(nanos.unsigned_abs())
    } else {
        UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
    }
}

fn roles_to_sql(roles: SymbolRoles) -> i64 {
    roles.bits() as i64
}

fn roles_from_sql(bits: i64) -> SymbolRoles {
    SymbolRoles::from_bits_retain(bits as u64)
}

const OCCURRENCE_COLUMNS: &str = "o.id, o.usr, s.name, s.kind, o.roles, o.path, o.line, \
     o.utf8_column, o.is_system, o.timestamp_ns";

const RELATIONS_SQL: &str = "SELECT r.roles, s.usr, s.name, s.kind \
     FROM relations r JOIN symbols s ON s.usr = r.usr \
     WHERE r.occurrence_id = ?1 ORDER BY r.id;";

/// An occurrence row before its relations are loaded.
struct OccurrenceRow {
    id: i64,
    symbol: Symbol,
    roles: SymbolRoles,
    location: SymbolLocation,
}

impl OccurrenceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            symbol: Symbol::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?, SymbolKind::from_name(&kind)),
            roles: roles_from_sql(row.get(4)?),
            location: SymbolLocation {
                path: row.get(5)?,
                line: row.get(6)?,
                utf8_column: row.get(7)?,
                is_system: row.get(8)?,
                timestamp: nanos_to_system_time(row.get(9)?),
            },
        })
    }
}

fn load_relations(conn: &Connection, occurrence_id: i64) -> IndexGuardResult<Vec<SymbolRelation>> {
    let mut stmt = conn.prepare_cached(RELATIONS_SQL)?;
    let relations = stmt
        .query_map(params![occurrence_id], |row| {
            let kind: String = row.get(3)?;
            Ok(SymbolRelation::new(
                roles_from_sql(row.get(0)?),
                Symbol::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?, SymbolKind::from_name(&kind)),
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(relations)
}

/// Stream occurrences matching `where_clause` in row order.
///
/// `accept_name` runs on the symbol name before relations are loaded, so
/// pattern search does not pay for rows it rejects.
fn visit_occurrences(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn ToSql],
    accept_name: &dyn Fn(&str) -> bool,
    body: &mut OccurrenceVisitor<'_>,
) -> IndexGuardResult<ControlFlow<()>> {
    let sql = format!(
        "SELECT {OCCURRENCE_COLUMNS} FROM occurrences o JOIN symbols s ON s.usr = o.usr \
         WHERE {where_clause} ORDER BY o.id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params)?;
    while let Some(row) = rows.next()? {
        let occurrence_row = OccurrenceRow::from_row(row)?;
        if !accept_name(&occurrence_row.symbol.name) {
            continue;
        }
        let relations = load_relations(conn, occurrence_row.id)?;
        let occurrence = SymbolOccurrence::new(
            occurrence_row.symbol,
            occurrence_row.roles,
            occurrence_row.location,
            relations,
        );
        if body(&occurrence).is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn collect_occurrences(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn ToSql],
) -> IndexGuardResult<Vec<SymbolOccurrence>> {
    let mut result = Vec::new();
    let _ = visit_occurrences(conn, where_clause, params, &|_| true, &mut |occurrence| {
        result.push(occurrence.clone());
        ControlFlow::Continue(())
    })?;
    Ok(result)
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// SqliteIndex
// ---------------------------------------------------------------------------

/// Read-side persistent index stored in a SQLite database file.
#[derive(Clone, Debug)]
pub struct SqliteIndex {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteIndex {
    /// Point at `db_path`, resolving it against the working directory and
    /// creating missing parent directories. The database itself is created
    /// on first connection.
    pub fn open(db_path: impl Into<PathBuf>, config: &IndexGuardConfig) -> IndexGuardResult<Self> {
        let db_path = db_path.into();
        let resolved = if db_path.is_absolute() {
            db_path
        } else {
            std::env::current_dir()?.join(db_path)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            db_path: resolved,
            busy_timeout: config.busy_timeout(),
        })
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn connect(&self) -> IndexGuardResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// A raw connection, for the indexer that populates the tables and for
    /// tests.
    pub fn connect_internal(&self) -> IndexGuardResult<Connection> {
        self.connect()
    }

    /// Create all tables and indexes, then run pending migrations.
    pub fn init_schema(&self) -> IndexGuardResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)
    }

    // -- query implementations ---------------------------------------------

    fn for_each_symbol_occurrence_impl(
        &self,
        usr: &str,
        roles: SymbolRoles,
        body: &mut OccurrenceVisitor<'_>,
    ) -> IndexGuardResult<ControlFlow<()>> {
        let conn = self.connect()?;
        visit_occurrences(
            &conn,
            "o.usr = ?1 AND (o.roles & ?2) != 0",
            params![usr, roles_to_sql(roles)],
            &|_| true,
            body,
        )
    }

    fn occurrences_related_to_usr_impl(&self, usr: &str, roles: SymbolRoles) -> IndexGuardResult<Vec<SymbolOccurrence>> {
        let conn = self.connect()?;
        collect_occurrences(
            &conn,
            "o.id IN (SELECT occurrence_id FROM relations WHERE usr = ?1 AND (roles & ?2) != 0)",
            params![usr, roles_to_sql(roles)],
        )
    }

    fn for_each_canonical_containing_impl(
        &self,
        pattern: &str,
        options: PatternOptions,
        body: &mut OccurrenceVisitor<'_>,
    ) -> IndexGuardResult<ControlFlow<()>> {
        let conn = self.connect()?;
        visit_occurrences(
            &conn,
            "(o.roles & ?1) != 0",
            params![roles_to_sql(SymbolRoles::CANONICAL)],
            &|name| matches_pattern(name, pattern, options),
            body,
        )
    }

    fn for_each_canonical_by_name_impl(
        &self,
        name: &str,
        body: &mut OccurrenceVisitor<'_>,
    ) -> IndexGuardResult<ControlFlow<()>> {
        let conn = self.connect()?;
        visit_occurrences(
            &conn,
            "s.name = ?1 AND (o.roles & ?2) != 0",
            params![name, roles_to_sql(SymbolRoles::CANONICAL)],
            &|_| true,
            body,
        )
    }

    fn symbols_in_file_path_impl(&self, path: &str) -> IndexGuardResult<Vec<Symbol>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT s.usr, s.name, s.kind FROM occurrences o JOIN symbols s ON s.usr = o.usr \
             WHERE o.path = ?1 GROUP BY s.usr ORDER BY MIN(o.id);",
        )?;
        let symbols = stmt
            .query_map(params![path], |row| {
                let kind: String = row.get(2)?;
                Ok(Symbol::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    SymbolKind::from_name(&kind),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    fn unit_tests_impl(&self) -> IndexGuardResult<Vec<SymbolOccurrence>> {
        let conn = self.connect()?;
        collect_occurrences(&conn, "o.id IN (SELECT occurrence_id FROM unit_tests)", &[])
    }

    fn unit_tests_referenced_by_main_files_impl(
        &self,
        main_file_paths: &[String],
    ) -> IndexGuardResult<Vec<SymbolOccurrence>> {
        if main_file_paths.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let where_clause = format!(
            "o.id IN (SELECT occurrence_id FROM unit_tests WHERE main_file IN ({}))",
            placeholders(1, main_file_paths.len())
        );
        let params: Vec<&dyn ToSql> = main_file_paths.iter().map(|p| p as &dyn ToSql).collect();
        collect_occurrences(&conn, &where_clause, &params)
    }

    fn main_files_containing_file_impl(&self, path: &str, cross_language: bool) -> IndexGuardResult<Vec<String>> {
        let conn = self.connect()?;
        let mut main_files: IndexSet<String> = IndexSet::new();

        let is_main_file: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM units WHERE main_file = ?1);",
            params![path],
            |row| row.get(0),
        )?;
        if is_main_file {
            main_files.insert(path.to_string());
        }

        let mut stmt = conn.prepare(
            "SELECT u.main_file FROM unit_files f JOIN units u ON u.unit_name = f.unit_name \
             WHERE f.file_path = ?1 AND (?2 OR f.cross_language = 0) \
             ORDER BY u.main_file;",
        )?;
        let rows = stmt.query_map(params![path, cross_language], |row| row.get::<_, String>(0))?;
        for row in rows {
            main_files.insert(row?);
        }
        Ok(main_files.into_iter().collect())
    }

    fn date_of_latest_unit_for_impl(&self, file_path: &str) -> IndexGuardResult<Option<SystemTime>> {
        let conn = self.connect()?;
        let latest: Option<i64> = conn.query_row(
            "SELECT MAX(timestamp_ns) FROM units WHERE main_file = ?1;",
            params![file_path],
            |row| row.get(0),
        )?;
        Ok(latest.map(nanos_to_system_time))
    }

    /// Take and release the write lock. With the busy timeout this waits for
    /// an in-flight indexer transaction to commit.
    fn poll_for_unit_changes_impl(&self) -> IndexGuardResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE; ROLLBACK;")?;
        let units: i64 = conn.query_row("SELECT COUNT(*) FROM units;", [], |row| row.get(0))?;
        debug!("index at {} synchronized; {units} units", self.db_path.display());
        Ok(())
    }
}

fn or_warn<T>(what: &str, result: IndexGuardResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Index query {what} failed: {e}");
            fallback
        }
    }
}

impl PersistentIndex for SqliteIndex {
    fn for_each_symbol_occurrence(
        &self,
        usr: &str,
        roles: SymbolRoles,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        or_warn(
            "for_each_symbol_occurrence",
            self.for_each_symbol_occurrence_impl(usr, roles, body),
            ControlFlow::Continue(()),
        )
    }

    fn occurrences_related_to_usr(&self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence> {
        or_warn(
            "occurrences_related_to_usr",
            self.occurrences_related_to_usr_impl(usr, roles),
            Vec::new(),
        )
    }

    fn for_each_canonical_symbol_occurrence_containing(
        &self,
        pattern: &str,
        options: PatternOptions,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        or_warn(
            "for_each_canonical_symbol_occurrence_containing",
            self.for_each_canonical_containing_impl(pattern, options, body),
            ControlFlow::Continue(()),
        )
    }

    fn for_each_canonical_symbol_occurrence_by_name(
        &self,
        name: &str,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        or_warn(
            "for_each_canonical_symbol_occurrence_by_name",
            self.for_each_canonical_by_name_impl(name, body),
            ControlFlow::Continue(()),
        )
    }

    fn symbols_in_file_path(&self, path: &str) -> Vec<Symbol> {
        or_warn("symbols_in_file_path", self.symbols_in_file_path_impl(path), Vec::new())
    }

    fn unit_tests(&self) -> Vec<SymbolOccurrence> {
        or_warn("unit_tests", self.unit_tests_impl(), Vec::new())
    }

    fn unit_tests_referenced_by_main_files(&self, main_file_paths: &[String]) -> Vec<SymbolOccurrence> {
        or_warn(
            "unit_tests_referenced_by_main_files",
            self.unit_tests_referenced_by_main_files_impl(main_file_paths),
            Vec::new(),
        )
    }

    fn main_files_containing_file(&self, path: &str, cross_language: bool) -> Vec<String> {
        or_warn(
            "main_files_containing_file",
            self.main_files_containing_file_impl(path, cross_language),
            Vec::new(),
        )
    }

    fn date_of_latest_unit_for(&self, file_path: &str) -> Option<SystemTime> {
        or_warn(
            "date_of_latest_unit_for",
            self.date_of_latest_unit_for_impl(file_path),
            None,
        )
    }

    fn poll_for_unit_changes_and_wait(&self) {
        or_warn(
            "poll_for_unit_changes_and_wait",
            self.poll_for_unit_changes_impl(),
            (),
        )
    }
}
