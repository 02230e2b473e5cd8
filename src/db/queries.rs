//! SQL query constants
//!
//! Contains all SQL queries used by the application.

// ─── Migration ledger ───

/// Ledger of applied migration versions
pub const LEDGER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version    TEXT PRIMARY KEY,
        applied_at INTEGER NOT NULL
    )
"#;

pub const LEDGER_TABLE_EXISTS: &str = r#"
    SELECT 1 FROM sqlite_master
    WHERE type = 'table' AND name = 'schema_migrations'
"#;

pub const SELECT_LEDGER_VERSIONS: &str = "SELECT version FROM schema_migrations";

pub const INSERT_LEDGER_VERSION: &str = r#"
    INSERT INTO schema_migrations (version, applied_at)
    VALUES (?1, ?2)
    ON CONFLICT(version) DO NOTHING
"#;

// ─── Site field schemas ───

pub const SELECT_SITE_SCHEMAS: &str = r#"
    SELECT site_key, field, type, required, default_value, regex, choices, secret, "order", ui_hint
    FROM site_field_schemas
    WHERE site_key = ?1
    ORDER BY "order", field
"#;

pub const UPSERT_SITE_SCHEMA: &str = r#"
    INSERT INTO site_field_schemas
        (site_key, field, type, required, default_value, regex, choices, secret, "order", ui_hint)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(site_key, field) DO UPDATE SET
        type = excluded.type,
        required = excluded.required,
        default_value = excluded.default_value,
        regex = excluded.regex,
        choices = excluded.choices,
        secret = excluded.secret,
        "order" = excluded."order",
        ui_hint = excluded.ui_hint
"#;

pub const DELETE_SITE_SCHEMA: &str =
    "DELETE FROM site_field_schemas WHERE site_key = ?1 AND field = ?2";

// ─── Sites ───

pub const LIST_SITES: &str =
    "SELECT key, name, login_url, created_at, updated_at FROM sites ORDER BY key";

pub const GET_SITE: &str =
    "SELECT key, name, login_url, created_at, updated_at FROM sites WHERE key = ?1";

pub const INSERT_SITE: &str = "INSERT INTO sites (key, name, login_url) VALUES (?1, ?2, ?3)";

pub const UPDATE_SITE: &str = r#"
    UPDATE sites
    SET name = ?1, login_url = ?2, updated_at = CAST(strftime('%s','now') AS INTEGER)
    WHERE key = ?3
"#;

pub const DELETE_SITE: &str = "DELETE FROM sites WHERE key = ?1";

// ─── Accounts ───

pub const LIST_ACCOUNTS: &str = r#"
    SELECT id, site_key, username, password, extra, created_at, updated_at
    FROM accounts
    WHERE site_key = ?1
    ORDER BY username
"#;

pub const GET_ACCOUNT: &str = r#"
    SELECT id, site_key, username, password, extra, created_at, updated_at
    FROM accounts
    WHERE site_key = ?1 AND id = ?2
"#;

pub const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (id, site_key, username, password, extra)
    VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const UPDATE_ACCOUNT: &str = r#"
    UPDATE accounts
    SET username = ?1, password = ?2, extra = ?3,
        updated_at = CAST(strftime('%s','now') AS INTEGER)
    WHERE site_key = ?4 AND id = ?5
"#;

pub const DELETE_ACCOUNT: &str = "DELETE FROM accounts WHERE site_key = ?1 AND id = ?2";

pub const GET_ACTIVE_ACCOUNT: &str =
    "SELECT account_id FROM active_accounts WHERE site_key = ?1";

pub const SET_ACTIVE_ACCOUNT: &str = r#"
    INSERT INTO active_accounts (site_key, account_id, updated_at)
    VALUES (?1, ?2, CAST(strftime('%s','now') AS INTEGER))
    ON CONFLICT(site_key) DO UPDATE SET
        account_id = excluded.account_id,
        updated_at = excluded.updated_at
"#;
