//! Site records

use super::queries::{DELETE_SITE, GET_SITE, INSERT_SITE, LIST_SITES, UPDATE_SITE};
use super::Store;
use crate::error::{map_constraint, AppError};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

/// An external service whose accounts this server manages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub key: String,
    pub name: String,
    pub login_url: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Site {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            name: row.get(1)?,
            login_url: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl Store {
    pub fn list_sites(&self) -> Result<Vec<Site>, AppError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(LIST_SITES)?;
        let rows = stmt.query_map([], Site::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_site(&self, key: &str) -> Result<Option<Site>, AppError> {
        let conn = self.connection()?;
        Ok(conn.query_row(GET_SITE, [key], Site::from_row).optional()?)
    }

    /// Insert a new site; a duplicate key is a `Conflict`
    pub fn create_site(&self, key: &str, name: &str, login_url: &str) -> Result<Site, AppError> {
        let conn = self.connection()?;
        conn.execute(INSERT_SITE, params![key, name, login_url])
            .map_err(|e| map_constraint(e, || format!("Site '{}' already exists", key)))?;
        Ok(conn.query_row(GET_SITE, [key], Site::from_row)?)
    }

    /// Update name and login URL; `None` when the site does not exist
    pub fn update_site(
        &self,
        key: &str,
        name: &str,
        login_url: &str,
    ) -> Result<Option<Site>, AppError> {
        let conn = self.connection()?;
        let changed = conn.execute(UPDATE_SITE, params![name, login_url, key])?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(conn.query_row(GET_SITE, [key], Site::from_row).optional()?)
    }

    /// Delete a site row only; its schemas and accounts are left in place
    pub fn delete_site(&self, key: &str) -> Result<bool, AppError> {
        let conn = self.connection()?;
        Ok(conn.execute(DELETE_SITE, [key])? > 0)
    }
}
