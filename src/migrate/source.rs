//! Migration unit discovery
//!
//! A source yields `(name, sql)` pairs; the runner sorts them by name.

use crate::error::AppError;
use std::fs;
use std::path::PathBuf;

/// One named bundle of schema-changing SQL, applied at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    pub name: String,
    pub sql: String,
}

impl MigrationUnit {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }

    /// Version recorded in the ledger for this unit
    pub fn version(&self) -> &str {
        version_of(&self.name)
    }
}

/// Prefix before the first `_`, otherwise the name without its `.sql` suffix.
///
/// Existing ledgers store exactly this string, so the rule must not change.
fn version_of(name: &str) -> &str {
    match name.find('_') {
        Some(idx) => &name[..idx],
        None => name.strip_suffix(".sql").unwrap_or(name),
    }
}

/// Anything that can enumerate migration units
pub trait MigrationSource: Send + Sync {
    /// All available units, in no particular order
    fn units(&self) -> Result<Vec<MigrationUnit>, AppError>;

    /// Human readable origin, used in logs
    fn describe(&self) -> String;
}

/// Units compiled into the binary from `migrations/`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedMigrations;

const EMBEDDED: &[(&str, &str)] = &[
    (
        "0001_init.sql",
        include_str!("../../migrations/0001_init.sql"),
    ),
    (
        "0002_account_indexes.sql",
        include_str!("../../migrations/0002_account_indexes.sql"),
    ),
];

impl MigrationSource for EmbeddedMigrations {
    fn units(&self) -> Result<Vec<MigrationUnit>, AppError> {
        Ok(EMBEDDED
            .iter()
            .map(|(name, sql)| MigrationUnit::new(*name, *sql))
            .collect())
    }

    fn describe(&self) -> String {
        "embedded".to_string()
    }
}

/// Every `*.sql` file in one directory
#[derive(Debug, Clone)]
pub struct DirectoryMigrations {
    dir: PathBuf,
}

impl DirectoryMigrations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for DirectoryMigrations {
    fn units(&self) -> Result<Vec<MigrationUnit>, AppError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AppError::Internal(format!(
                "Failed to read migrations directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut units = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::Internal(format!("Failed to list migrations directory: {}", e))
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let sql = fs::read_to_string(&path).map_err(|e| {
                AppError::Internal(format!("Failed to read migration {}: {}", name, e))
            })?;
            units.push(MigrationUnit::new(name, sql));
        }
        Ok(units)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

impl MigrationSource for Vec<MigrationUnit> {
    fn units(&self) -> Result<Vec<MigrationUnit>, AppError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory units", self.len())
    }
}
