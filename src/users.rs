use std::sync::OnceLock;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

use crate::auth::{email_in_domains, Authorizer};
use crate::db::{new_id, now};
use crate::error::{is_constraint_violation, RedeemError, Result};
use crate::models::User;
use crate::settings::Settings;

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !email_regex().is_match(&email) {
        return Err(RedeemError::Validation(format!("'{email}' is not a valid email address")));
    }
    Ok(email)
}

/// Argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| RedeemError::Crypto(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| RedeemError::Crypto(format!("failed to parse password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(RedeemError::Crypto(format!("password verification failed: {e}"))),
    }
}

fn insert_user(conn: &Connection, email: &str, password: Option<&str>, role: Option<&str>) -> Result<String> {
    let id = new_id();
    let hash = password.map(hash_password).transpose()?;
    conn.execute(
        "INSERT INTO users (id, email, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, email, hash, role, now()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            RedeemError::Validation(format!("email '{email}' is already registered"))
        } else {
            RedeemError::Db(e)
        }
    })?;
    Ok(id)
}

/// Register a user and return the new user id.
///
/// Assigning a role needs an `issuer` the authorizer accepts, so a caller
/// cannot grant itself the `admin` role.
pub fn add_user<A: Authorizer>(
    conn: &Connection,
    authorizer: &A,
    issuer: Option<&str>,
    email: &str,
    password: Option<&str>,
    role: Option<&str>,
) -> Result<String> {
    let email = validate_email(email)?;
    let role = role.map(str::trim).filter(|r| !r.is_empty());
    let granted_by = match (role, issuer) {
        (Some(role), None) => {
            tracing::warn!(email = %email, role, "role requested without issuer");
            return Err(RedeemError::Authorization(
                "assigning a role requires an admin --issuer".into(),
            ));
        }
        (_, Some(issuer)) => Some(authorizer.authorize(issuer)?),
        (None, None) => None,
    };
    let id = insert_user(conn, &email, password, role)?;
    tracing::info!(
        user_id = %id,
        granted_by = granted_by.as_ref().map(|g| g.user_id.as_str()),
        "user added"
    );
    Ok(id)
}

/// Create a user and its `admins` row together. Requires the configured
/// admin secret and an email on the admin allow-list or an admin domain.
pub fn create_admin(conn: &Connection, settings: &Settings, email: &str, password: &str, secret: &str) -> Result<String> {
    let span = tracing::info_span!("create_admin", request_id = %new_id());
    let _guard = span.enter();

    if password.is_empty() {
        return Err(RedeemError::Validation("email and password are required".into()));
    }
    let email = validate_email(email)?;

    match settings.admin_secret.as_deref() {
        Some(expected) if !expected.is_empty() && expected == secret => {}
        Some(expected) if !expected.is_empty() => {
            tracing::warn!("invalid admin secret");
            return Err(RedeemError::Authorization("invalid admin secret".into()));
        }
        _ => {
            return Err(RedeemError::Authorization(
                "admin creation is disabled: no admin_secret configured".into(),
            ))
        }
    }

    let allowed_email = settings
        .admin_emails
        .iter()
        .any(|e| e.trim().eq_ignore_ascii_case(&email));
    let domains: Vec<String> = settings
        .admin_domains
        .iter()
        .map(|d| d.trim().trim_start_matches('@').to_lowercase())
        .collect();
    if !allowed_email && !email_in_domains(&email, &domains) {
        tracing::warn!(email = %email, "email not allowed for admin accounts");
        return Err(RedeemError::Authorization(format!(
            "'{email}' cannot be used for an admin account"
        )));
    }

    let tx = conn.unchecked_transaction()?;
    let user_id = insert_user(&tx, &email, Some(password), None)?;
    tx.execute(
        "INSERT INTO admins (user_id, email, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, email, now()],
    )?;
    tx.commit()?;

    tracing::info!(user_id = %user_id, "admin created");
    Ok(user_id)
}

/// Replace a user's password after checking the current one.
pub fn change_password(conn: &Connection, email: &str, current: &str, new: &str) -> Result<()> {
    let email = validate_email(email)?;
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(RedeemError::Validation(format!(
            "new password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            [&email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (id, stored) = row.ok_or_else(|| RedeemError::NotFound(format!("user '{email}'")))?;
    let stored = stored.ok_or_else(|| RedeemError::Authorization("user has no password set".into()))?;
    if !verify_password(current, &stored)? {
        tracing::warn!(user_id = %id, "wrong current password");
        return Err(RedeemError::Authorization("current password is incorrect".into()));
    }

    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        rusqlite::params![hash_password(new)?, id],
    )?;
    tracing::info!(user_id = %id, "password changed");
    Ok(())
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.email, u.role, u.created_at, a.id IS NOT NULL \
         FROM users u LEFT JOIN admins a ON a.user_id = u.id ORDER BY u.created_at, u.email",
    )?;
    let users = stmt
        .query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                role: row.get(2)?,
                created_at: row.get(3)?,
                is_admin: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminChain;
    use crate::db::test_db;
    use crate::importer::{bulk_import, ImportInput, ImportOptions, ImportRequest};
    use crate::models::ImportKind;
    use crate::settings::AdminCheck;
    use crate::store::SqliteStore;

    fn settings() -> Settings {
        Settings {
            admin_secret: Some("open-sesame".into()),
            admin_emails: vec!["Owner@Shop.example".into()],
            admin_domains: vec!["staff.example".into()],
            ..Settings::default()
        }
    }

    fn stored_hash(conn: &Connection, email: &str) -> String {
        conn.query_row("SELECT password_hash FROM users WHERE email = ?1", [email], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let stored = hash_password("hunter2").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify_password("hunter2", &stored).unwrap());
        assert!(!verify_password("hunter3", &stored).unwrap());
        assert_ne!(hash_password("hunter2").unwrap(), stored);
        assert!(matches!(verify_password("x", "not-a-hash"), Err(RedeemError::Crypto(_))));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email(" A@B.example ").unwrap(), "a@b.example");
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_add_user_rejects_duplicate_email() {
        let (_dir, conn) = test_db();
        let chain = AdminChain::from_settings(&conn, &settings());
        add_user(&conn, &chain, None, "a@b.example", None, None).unwrap();
        let err = add_user(&conn, &chain, None, "A@b.example", None, None).unwrap_err();
        assert!(matches!(err, RedeemError::Validation(_)));
    }

    #[test]
    fn test_self_assigned_admin_role_cannot_import() {
        let (_dir, conn) = test_db();
        let defaults = Settings::default();
        let chain = AdminChain::from_settings(&conn, &defaults);

        let err = add_user(&conn, &chain, None, "mallory@evil.example", None, Some("admin")).unwrap_err();
        assert!(matches!(err, RedeemError::Authorization(_)));
        let users: i64 = conn.query_row("SELECT count(*) FROM users", [], |r| r.get(0)).unwrap();
        assert_eq!(users, 0);

        add_user(&conn, &chain, None, "mallory@evil.example", None, None).unwrap();
        let err = add_user(
            &conn,
            &chain,
            Some("mallory@evil.example"),
            "mallory2@evil.example",
            None,
            Some("admin"),
        )
        .unwrap_err();
        assert!(matches!(err, RedeemError::Authorization(_)));

        let request = ImportRequest {
            kind: ImportKind::Codes,
            issuer_id: "mallory@evil.example".into(),
            input: ImportInput::Raw("FREE1\nFREE2".into()),
        };
        let err = bulk_import(&SqliteStore::new(&conn), &chain, request, ImportOptions::default()).unwrap_err();
        assert!(matches!(err, RedeemError::Authorization(_)));
        let codes: i64 = conn
            .query_row("SELECT count(*) FROM redemption_codes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(codes, 0);
    }

    #[test]
    fn test_admin_can_grant_role() {
        let (_dir, conn) = test_db();
        let s = settings();
        create_admin(&conn, &s, "kim@staff.example", "pw", "open-sesame").unwrap();
        let chain = AdminChain::new(&conn, vec![AdminCheck::AdminTable, AdminCheck::Role], vec![], vec![]);

        add_user(&conn, &chain, Some("kim@staff.example"), "helper@mail.example", None, Some("admin")).unwrap();
        assert!(chain.authorize("helper@mail.example").is_ok());
    }

    #[test]
    fn test_create_admin_writes_user_and_admin_row() {
        let (_dir, conn) = test_db();
        let id = create_admin(&conn, &settings(), "kim@staff.example", "pw", "open-sesame").unwrap();
        let admins: i64 = conn
            .query_row("SELECT count(*) FROM admins WHERE user_id = ?1", [&id], |r| r.get(0))
            .unwrap();
        assert_eq!(admins, 1);
        assert!(verify_password("pw", &stored_hash(&conn, "kim@staff.example")).unwrap());

        let users = list_users(&conn).unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin);
    }

    #[test]
    fn test_create_admin_checks_secret_and_email() {
        let (_dir, conn) = test_db();
        let s = settings();
        assert!(matches!(
            create_admin(&conn, &s, "kim@staff.example", "pw", "wrong"),
            Err(RedeemError::Authorization(_))
        ));
        assert!(matches!(
            create_admin(&conn, &s, "kim@gmail.example", "pw", "open-sesame"),
            Err(RedeemError::Authorization(_))
        ));
        assert!(create_admin(&conn, &s, "owner@shop.example", "pw", "open-sesame").is_ok());
        assert!(matches!(
            create_admin(&conn, &s, "owner@shop.example", "pw", "open-sesame"),
            Err(RedeemError::Validation(_))
        ));

        let disabled = Settings { admin_secret: None, ..settings() };
        assert!(matches!(
            create_admin(&conn, &disabled, "kim@staff.example", "pw", ""),
            Err(RedeemError::Authorization(_))
        ));
    }

    #[test]
    fn test_failed_admin_creation_leaves_no_user() {
        let (_dir, conn) = test_db();
        let err = create_admin(&conn, &settings(), "kim@staff.example", "", "open-sesame").unwrap_err();
        assert!(matches!(err, RedeemError::Validation(_)));
        let users: i64 = conn.query_row("SELECT count(*) FROM users", [], |r| r.get(0)).unwrap();
        assert_eq!(users, 0);
    }

    #[test]
    fn test_change_password_with_wrong_current_keeps_old_hash() {
        let (_dir, conn) = test_db();
        create_admin(&conn, &settings(), "kim@staff.example", "old-secret", "open-sesame").unwrap();
        let before = stored_hash(&conn, "kim@staff.example");

        let err = change_password(&conn, "kim@staff.example", "guess", "brand-new").unwrap_err();
        assert!(matches!(err, RedeemError::Authorization(_)));
        assert_eq!(stored_hash(&conn, "kim@staff.example"), before);
    }

    #[test]
    fn test_change_password_with_correct_current() {
        let (_dir, conn) = test_db();
        create_admin(&conn, &settings(), "kim@staff.example", "old-secret", "open-sesame").unwrap();

        change_password(&conn, "KIM@staff.example", "old-secret", "brand-new").unwrap();
        let hash = stored_hash(&conn, "kim@staff.example");
        assert!(verify_password("brand-new", &hash).unwrap());
        assert!(!verify_password("old-secret", &hash).unwrap());
    }

    #[test]
    fn test_change_password_validation() {
        let (_dir, conn) = test_db();
        let chain = AdminChain::from_settings(&conn, &settings());
        add_user(&conn, &chain, None, "nopw@mail.example", None, None).unwrap();

        assert!(matches!(
            change_password(&conn, "kim@staff.example", "a", "short"),
            Err(RedeemError::Validation(_))
        ));
        assert!(matches!(
            change_password(&conn, "ghost@mail.example", "a", "long-enough"),
            Err(RedeemError::NotFound(_))
        ));
        assert!(matches!(
            change_password(&conn, "nopw@mail.example", "a", "long-enough"),
            Err(RedeemError::Authorization(_))
        ));
    }
}
