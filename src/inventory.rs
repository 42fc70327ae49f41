//! Single-record management of redemption codes and distributable accounts.

use rusqlite::Connection;

use crate::db::now;
use crate::error::{is_constraint_violation, RedeemError, Result};
use crate::models::{Account, AccountStatus, RedemptionCode};

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RedeemError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn expect_one(changed: usize, what: &str, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(RedeemError::NotFound(format!("{what} {id}")));
    }
    Ok(())
}

fn parse_status<T: std::str::FromStr>(raw: String) -> rusqlite::Result<T> {
    raw.parse()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, raw, rusqlite::types::Type::Text))
}

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

pub fn add_code(conn: &Connection, code: &str, value: i64, issuer_id: &str, uppercase: bool) -> Result<i64> {
    let code = required(code, "code")?;
    let code = if uppercase { code.to_uppercase() } else { code.to_string() };
    let ts = now();
    conn.execute(
        "INSERT INTO redemption_codes (code, value, status, created_by, created_at, updated_at) \
         VALUES (?1, ?2, 'active', ?3, ?4, ?4)",
        rusqlite::params![code, value, issuer_id, ts],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            RedeemError::Constraint(format!("Code already exists: {code}"))
        } else {
            RedeemError::Db(e)
        }
    })?;
    tracing::info!(code = %code, value, "code added");
    Ok(conn.last_insert_rowid())
}

pub fn list_codes(conn: &Connection) -> Result<Vec<RedemptionCode>> {
    let mut stmt = conn.prepare(
        "SELECT id, code, value, status, created_by, created_at FROM redemption_codes \
         ORDER BY created_at DESC, id DESC",
    )?;
    let codes = stmt
        .query_map([], |row| {
            Ok(RedemptionCode {
                id: row.get(0)?,
                code: row.get(1)?,
                value: row.get(2)?,
                status: parse_status(row.get(3)?)?,
                created_by: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(codes)
}

pub fn delete_code(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM redemption_codes WHERE id = ?1", [id])?;
    expect_one(changed, "code", id)?;
    tracing::info!(id, "code deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub struct AccountFields<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub product_name: Option<&'a str>,
}

pub fn add_account(
    conn: &Connection,
    code: &str,
    fields: &AccountFields<'_>,
    issuer_id: &str,
    uppercase: bool,
) -> Result<i64> {
    let code = required(code, "code")?;
    let code = if uppercase { code.to_uppercase() } else { code.to_string() };
    let username = required(fields.username, "username")?;
    let password = required(fields.password, "password")?;
    conn.execute(
        "INSERT INTO accounts (code, username, password, product_name, status, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, 'available', ?5, ?6)",
        rusqlite::params![code, username, password, optional(fields.product_name), issuer_id, now()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            RedeemError::Constraint(format!("Account code already exists: {code}"))
        } else {
            RedeemError::Db(e)
        }
    })?;
    tracing::info!(code = %code, "account added");
    Ok(conn.last_insert_rowid())
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, code, username, password, product_name, status, used_by FROM accounts \
         ORDER BY created_at DESC, id DESC",
    )?;
    let accounts = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                code: row.get(1)?,
                username: row.get(2)?,
                password: row.get(3)?,
                product_name: row.get(4)?,
                status: parse_status(row.get(5)?)?,
                used_by: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}


pub fn edit_account(conn: &Connection, id: i64, fields: &AccountFields<'_>) -> Result<()> {
    let username = required(fields.username, "username")?;
    let password = required(fields.password, "password")?;
    let changed = conn.execute(
        "UPDATE accounts SET username = ?1, password = ?2, product_name = ?3 WHERE id = ?4",
        rusqlite::params![username, password, optional(fields.product_name), id],
    )?;
    expect_one(changed, "account", id)
}

/// Put a used account back into circulation.
pub fn reset_account(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET status = ?1, used_by = NULL, used_at = NULL WHERE id = ?2",
        rusqlite::params![AccountStatus::Available.as_str(), id],
    )?;
    expect_one(changed, "account", id)
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;
    expect_one(changed, "account", id)
}
