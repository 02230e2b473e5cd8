//! Account records and the per-site active account pointer

use super::queries::{
    DELETE_ACCOUNT, GET_ACCOUNT, GET_ACTIVE_ACCOUNT, INSERT_ACCOUNT, LIST_ACCOUNTS,
    SET_ACTIVE_ACCOUNT, UPDATE_ACCOUNT,
};
use super::Store;
use crate::error::{map_constraint, AppError};
use rusqlite::{params, OptionalExtension, Row};

/// Account row as persisted; `extra` holds the encoded property bag
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub id: String,
    pub site_key: String,
    pub username: String,
    pub password: String,
    pub extra: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AccountRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            site_key: row.get(1)?,
            username: row.get(2)?,
            password: row.get(3)?,
            extra: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

/// Writable columns of an account
#[derive(Debug, Clone)]
pub struct AccountWrite<'a> {
    pub id: &'a str,
    pub site_key: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub extra: &'a str,
}

impl Store {
    pub fn list_accounts(&self, site_key: &str) -> Result<Vec<AccountRecord>, AppError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(LIST_ACCOUNTS)?;
        let rows = stmt.query_map([site_key], AccountRecord::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_account(&self, site_key: &str, id: &str) -> Result<Option<AccountRecord>, AppError> {
        let conn = self.connection()?;
        Ok(conn
            .query_row(GET_ACCOUNT, params![site_key, id], AccountRecord::from_row)
            .optional()?)
    }

    pub fn create_account(&self, account: &AccountWrite<'_>) -> Result<AccountRecord, AppError> {
        let conn = self.connection()?;
        conn.execute(
            INSERT_ACCOUNT,
            params![
                account.id,
                account.site_key,
                account.username,
                account.password,
                account.extra
            ],
        )
        .map_err(|e| map_constraint(e, || format!("Account '{}' already exists", account.id)))?;
        Ok(conn.query_row(
            GET_ACCOUNT,
            params![account.site_key, account.id],
            AccountRecord::from_row,
        )?)
    }

    /// `None` when no account with this id exists under the site
    pub fn update_account(
        &self,
        account: &AccountWrite<'_>,
    ) -> Result<Option<AccountRecord>, AppError> {
        let conn = self.connection()?;
        let changed = conn.execute(
            UPDATE_ACCOUNT,
            params![
                account.username,
                account.password,
                account.extra,
                account.site_key,
                account.id
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(conn
            .query_row(
                GET_ACCOUNT,
                params![account.site_key, account.id],
                AccountRecord::from_row,
            )
            .optional()?)
    }

    pub fn delete_account(&self, site_key: &str, id: &str) -> Result<bool, AppError> {
        let conn = self.connection()?;
        Ok(conn.execute(DELETE_ACCOUNT, params![site_key, id])? > 0)
    }

    pub fn active_account_id(&self, site_key: &str) -> Result<Option<String>, AppError> {
        let conn = self.connection()?;
        let id: Option<Option<String>> = conn
            .query_row(GET_ACTIVE_ACCOUNT, [site_key], |row| row.get(0))
            .optional()?;
        Ok(id.flatten())
    }

    /// Point the site at an account, or clear it with `None`
    pub fn set_active_account_id(
        &self,
        site_key: &str,
        account_id: Option<&str>,
    ) -> Result<(), AppError> {
        let conn = self.connection()?;
        conn.execute(SET_ACTIVE_ACCOUNT, params![site_key, account_id])?;
        Ok(())
    }
}
