use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

use crate::db::now;
use crate::error::is_constraint_violation;
use crate::models::{Candidate, ImportKind};

/// Failure kinds a store must keep apart: the store could not be reached or
/// queried, or it refused a write because of a constraint.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Transport(String),

    #[error("constraint violation: {0}")]
    Constraint(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if is_constraint_violation(&err) {
            StoreError::Constraint(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Persistence used by the bulk-import pipeline.
pub trait Store {
    /// Return the subset of `keys` that already exist for `kind`, in one query.
    fn existing_keys(&self, kind: ImportKind, keys: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Insert a batch of candidates of one kind as a unit and return the keys
    /// of the rows that were written.
    fn insert_many(&self, issuer_id: &str, batch: &[Candidate]) -> Result<Vec<String>, StoreError>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl Store for SqliteStore<'_> {
    fn existing_keys(&self, kind: ImportKind, keys: &[String]) -> Result<HashSet<String>, StoreError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT code FROM {} WHERE code IN ({placeholders})",
            kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let found = stmt
            .query_map(rusqlite::params_from_iter(keys.iter()), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(found)
    }

    fn insert_many(&self, issuer_id: &str, batch: &[Candidate]) -> Result<Vec<String>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let created_at = now();
        let mut inserted = Vec::with_capacity(batch.len());
        for candidate in batch {
            let key: String = match candidate {
                Candidate::Code { key } => tx.query_row(
                    "INSERT INTO redemption_codes (code, status, created_by, created_at, updated_at) \
                     VALUES (?1, 'active', ?2, ?3, ?3) RETURNING code",
                    rusqlite::params![key, issuer_id, created_at],
                    |row| row.get(0),
                )?,
                Candidate::Account {
                    key,
                    username,
                    password,
                    product_name,
                } => tx.query_row(
                    "INSERT INTO accounts (code, username, password, product_name, status, created_by, created_at) \
                     VALUES (?1, ?2, ?3, ?4, 'available', ?5, ?6) RETURNING code",
                    rusqlite::params![key, username, password, product_name, issuer_id, created_at],
                    |row| row.get(0),
                )?,
            };
            inserted.push(key);
        }
        tx.commit()?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn code(key: &str) -> Candidate {
        Candidate::Code { key: key.to_string() }
    }

    #[test]
    fn test_existing_keys_single_query() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        store.insert_many("admin", &[code("A"), code("B")]).unwrap();

        let keys = vec!["A".to_string(), "C".to_string(), "B".to_string()];
        let found = store.existing_keys(ImportKind::Codes, &keys).unwrap();
        assert_eq!(found, HashSet::from(["A".to_string(), "B".to_string()]));
        assert!(store.existing_keys(ImportKind::Accounts, &keys).unwrap().is_empty());
        assert!(store.existing_keys(ImportKind::Codes, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_insert_many_returns_written_keys() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        let batch = vec![
            Candidate::Account {
                key: "X".into(),
                username: "u1".into(),
                password: "p1".into(),
                product_name: Some("Gold".into()),
            },
            Candidate::Account {
                key: "Y".into(),
                username: "u2".into(),
                password: "p2".into(),
                product_name: None,
            },
        ];
        assert_eq!(store.insert_many("admin", &batch).unwrap(), vec!["X", "Y"]);

        let (status, created_by): (String, String) = conn
            .query_row("SELECT status, created_by FROM accounts WHERE code = 'X'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "available");
        assert_eq!(created_by, "admin");
    }

    #[test]
    fn test_constraint_failure_rolls_back_whole_batch() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn);
        store.insert_many("admin", &[code("TAKEN")]).unwrap();

        let err = store
            .insert_many("admin", &[code("NEW1"), code("TAKEN"), code("NEW2")])
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let count: i64 = conn
            .query_row("SELECT count(*) FROM redemption_codes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_table_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let conn = crate::db::get_connection(&dir.path().join("empty.db")).unwrap();
        let store = SqliteStore::new(&conn);
        let err = store
            .existing_keys(ImportKind::Codes, &["A".to_string()])
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
