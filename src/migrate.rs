//! Versioned migration runner
//!
//! Brings the on-disk schema up to the latest available migration unit.
//! Applied versions are tracked in the `schema_migrations` ledger; the
//! check-and-apply for one run happens inside a single transaction so a
//! failing unit leaves the ledger and schema exactly as they were.
//!
//! Unit bodies must not issue their own `BEGIN`/`COMMIT`.

mod source;

pub use source::{DirectoryMigrations, EmbeddedMigrations, MigrationSource, MigrationUnit};

use crate::db::queries::{
    INSERT_LEDGER_VERSION, LEDGER_TABLE, LEDGER_TABLE_EXISTS, SELECT_LEDGER_VERSIONS,
};
use crate::error::AppError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use tracing::{debug, info};

/// Apply every unit not yet recorded in the ledger, in name order.
///
/// Returns how many units were applied by this run.
pub fn apply(conn: &mut Connection, source: &dyn MigrationSource) -> Result<usize, AppError> {
    let units = sorted_units(source)?;
    debug!(
        "Applying migrations from {} ({} units available)",
        source.describe(),
        units.len()
    );

    let tx = conn.transaction()?;
    tx.execute_batch(LEDGER_TABLE)?;
    let applied = applied_versions(&tx)?;

    let mut count = 0;
    for unit in &units {
        let version = unit.version();
        if applied.contains(version) {
            continue;
        }

        info!("Applying migration {} ({})", version, unit.name);
        tx.execute_batch(&unit.sql)
            .map_err(|source| AppError::Migration {
                version: version.to_string(),
                source,
            })?;
        tx.execute(INSERT_LEDGER_VERSION, params![version, Utc::now().timestamp()])
            .map_err(|source| AppError::Migration {
                version: version.to_string(),
                source,
            })?;
        count += 1;
    }

    // Dropping `tx` on any early return above rolls the whole run back.
    tx.commit()?;

    if count > 0 {
        info!("Applied {} migration(s)", count);
    } else {
        debug!("Schema already up to date");
    }
    Ok(count)
}

/// Versions not yet recorded in the ledger, in application order.
///
/// Read-only: a missing ledger table means nothing has been applied.
pub fn pending(conn: &Connection, source: &dyn MigrationSource) -> Result<Vec<String>, AppError> {
    let units = sorted_units(source)?;

    let applied = if ledger_exists(conn)? {
        applied_versions(conn)?
    } else {
        HashSet::new()
    };

    Ok(units
        .iter()
        .map(MigrationUnit::version)
        .filter(|v| !applied.contains(*v))
        .map(str::to_string)
        .collect())
}

/// Load units and order them by name, rejecting duplicate versions.
fn sorted_units(source: &dyn MigrationSource) -> Result<Vec<MigrationUnit>, AppError> {
    let mut units = source.units()?;
    units.sort_by(|a, b| a.name.cmp(&b.name));

    let mut seen = HashSet::new();
    for unit in &units {
        if !seen.insert(unit.version()) {
            return Err(AppError::Internal(format!(
                "Duplicate migration version '{}' ({})",
                unit.version(),
                unit.name
            )));
        }
    }
    Ok(units)
}

fn ledger_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(LEDGER_TABLE_EXISTS, [], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
}

fn applied_versions(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare(SELECT_LEDGER_VERSIONS)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unit(name: &str, sql: &str) -> MigrationUnit {
        MigrationUnit::new(name, sql)
    }

    fn ledger(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT version FROM schema_migrations ORDER BY rowid")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()
        .unwrap()
        .is_some()
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = vec![
            unit("0001_init.sql", "CREATE TABLE a (id INTEGER);"),
            unit("0002_more.sql", "CREATE TABLE b (id INTEGER);"),
        ];

        assert_eq!(apply(&mut conn, &source).unwrap(), 2);
        let before = ledger(&conn);

        assert_eq!(apply(&mut conn, &source).unwrap(), 0);
        assert_eq!(ledger(&conn), before);
    }

    #[test]
    fn test_failed_unit_rolls_back_whole_run() {
        let mut conn = Connection::open_in_memory().unwrap();
        let first = vec![unit("0001_init.sql", "CREATE TABLE a (id INTEGER);")];
        apply(&mut conn, &first).unwrap();

        let second = vec![
            unit("0001_init.sql", "CREATE TABLE a (id INTEGER);"),
            unit("0002_ok.sql", "CREATE TABLE b (id INTEGER);"),
            unit("0003_broken.sql", "CREATE TABLE c (id INTEGER"),
        ];
        let err = apply(&mut conn, &second).unwrap_err();

        assert!(matches!(err, AppError::Migration { ref version, .. } if version == "0003"));
        assert_eq!(ledger(&conn), vec!["0001".to_string()]);
        assert!(!table_exists(&conn, "b"));
    }

    #[test]
    fn test_units_applied_in_name_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Later units depend on earlier ones; source order is scrambled.
        let source = vec![
            unit("0010_later.sql", "ALTER TABLE a ADD COLUMN extra TEXT;"),
            unit("0001_init.sql", "CREATE TABLE a (id INTEGER);"),
            unit("0002_add_field.sql", "ALTER TABLE a ADD COLUMN name TEXT;"),
        ];

        assert_eq!(apply(&mut conn, &source).unwrap(), 3);
        assert_eq!(
            ledger(&conn),
            vec!["0001".to_string(), "0002".to_string(), "0010".to_string()]
        );
    }

    #[test]
    fn test_pending_does_not_create_ledger() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = vec![
            unit("0002_b.sql", "CREATE TABLE b (id INTEGER);"),
            unit("0001_a.sql", "CREATE TABLE a (id INTEGER);"),
        ];

        let versions = pending(&conn, &source).unwrap();
        assert_eq!(versions, vec!["0001".to_string(), "0002".to_string()]);
        assert!(!table_exists(&conn, "schema_migrations"));

        assert_eq!(apply(&mut conn, &source).unwrap(), 2);
    }

    #[test]
    fn test_pending_after_partial_apply() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn, &vec![unit("0001_a.sql", "CREATE TABLE a (id INTEGER);")]).unwrap();

        let source = vec![
            unit("0001_a.sql", "CREATE TABLE a (id INTEGER);"),
            unit("0002_b.sql", "CREATE TABLE b (id INTEGER);"),
        ];
        assert_eq!(pending(&conn, &source).unwrap(), vec!["0002".to_string()]);
    }

    #[test]
    fn test_ledger_records_timestamp() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn, &vec![unit("0001_a.sql", "SELECT 1;")]).unwrap();

        let applied_at: i64 = conn
            .query_row(
                "SELECT applied_at FROM schema_migrations WHERE version = '0001'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(applied_at > 0);
    }

    #[test]
    fn test_duplicate_versions_rejected_before_running() {
        let mut conn = Connection::open_in_memory().unwrap();
        let source = vec![
            unit("0001_a.sql", "CREATE TABLE a (id INTEGER);"),
            unit("0001_b.sql", "CREATE TABLE b (id INTEGER);"),
        ];

        assert!(apply(&mut conn, &source).is_err());
        assert!(!table_exists(&conn, "a"));
        assert!(!table_exists(&conn, "schema_migrations"));
    }

    #[test]
    fn test_embedded_migrations_apply_cleanly() {
        let mut conn = Connection::open_in_memory().unwrap();
        let count = apply(&mut conn, &EmbeddedMigrations).unwrap();

        assert_eq!(count, EmbeddedMigrations.units().unwrap().len());
        for table in ["sites", "accounts", "active_accounts", "site_field_schemas"] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
        assert!(pending(&conn, &EmbeddedMigrations).unwrap().is_empty());
    }

    #[test]
    fn test_directory_source_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001_a.sql"), "CREATE TABLE a (id INTEGER);").unwrap();
        let source = DirectoryMigrations::new(dir.path());

        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply(&mut conn, &source).unwrap(), 1);

        std::fs::write(dir.path().join("0002_b.sql"), "CREATE TABLE b (id INTEGER);").unwrap();
        assert_eq!(pending(&conn, &source).unwrap(), vec!["0002".to_string()]);
        assert_eq!(apply(&mut conn, &source).unwrap(), 1);
        assert!(table_exists(&conn, "b"));
    }
}
