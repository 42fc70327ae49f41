use rusqlite::{Connection, OptionalExtension};

use crate::error::{RedeemError, Result};
use crate::models::Identity;
use crate::settings::{AdminCheck, Settings};

/// Decides whether an identity may perform privileged operations.
pub trait Authorizer {
    /// Look up the identity behind an issuer id (user id or email).
    fn resolve(&self, issuer_id: &str) -> Result<Option<Identity>>;

    fn is_authorized(&self, identity: &Identity) -> bool;

    /// Resolve `issuer_id` and require it to be authorized.
    fn authorize(&self, issuer_id: &str) -> Result<Identity> {
        let identity = self
            .resolve(issuer_id)?
            .ok_or_else(|| RedeemError::Authorization(format!("unknown user '{issuer_id}'")))?;
        if !self.is_authorized(&identity) {
            tracing::warn!(user_id = %identity.user_id, "admin check failed");
            return Err(RedeemError::Authorization(format!(
                "user '{}' is not an admin",
                identity.email.as_deref().unwrap_or(&identity.user_id)
            )));
        }
        Ok(identity)
    }
}

pub fn lookup_identity(conn: &Connection, issuer_id: &str) -> Result<Option<Identity>> {
    let identity = conn
        .query_row(
            "SELECT id, email, role FROM users WHERE id = ?1 OR lower(email) = lower(?1)",
            [issuer_id.trim()],
            |row| {
                Ok(Identity {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    role: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(identity)
}

/// Ordered chain of admin checks; the first matching check grants access.
pub struct AdminChain<'a> {
    conn: &'a Connection,
    checks: Vec<AdminCheck>,
    emails: Vec<String>,
    domains: Vec<String>,
}

impl<'a> AdminChain<'a> {
    pub fn new(conn: &'a Connection, checks: Vec<AdminCheck>, emails: Vec<String>, domains: Vec<String>) -> Self {
        Self {
            conn,
            checks,
            emails: emails.iter().map(|e| e.trim().to_lowercase()).collect(),
            domains: domains
                .iter()
                .map(|d| d.trim().trim_start_matches('@').to_lowercase())
                .collect(),
        }
    }

    pub fn from_settings(conn: &'a Connection, settings: &Settings) -> Self {
        Self::new(
            conn,
            settings.admin_checks.clone(),
            settings.admin_emails.clone(),
            settings.admin_domains.clone(),
        )
    }

    /// The first check in the chain that grants `identity` admin access.
    pub fn matching_check(&self, identity: &Identity) -> Option<AdminCheck> {
        self.checks
            .iter()
            .copied()
            .find(|check| self.passes(*check, identity))
    }

    fn passes(&self, check: AdminCheck, identity: &Identity) -> bool {
        let email = identity.email.as_deref().map(str::to_lowercase);
        match check {
            AdminCheck::Email => email.is_some_and(|e| self.emails.contains(&e)),
            AdminCheck::Domain => email.is_some_and(|e| email_in_domains(&e, &self.domains)),
            AdminCheck::AdminTable => {
                let found = self
                    .conn
                    .prepare_cached("SELECT 1 FROM admins WHERE user_id = ?1")
                    .and_then(|mut stmt| stmt.exists([&identity.user_id]));
                match found {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::warn!(user_id = %identity.user_id, error = %e, "admin table lookup failed");
                        false
                    }
                }
            }
            AdminCheck::Role => identity.role.as_deref() == Some("admin"),
        }
    }
}

impl Authorizer for AdminChain<'_> {
    fn resolve(&self, issuer_id: &str) -> Result<Option<Identity>> {
        lookup_identity(self.conn, issuer_id)
    }

    fn is_authorized(&self, identity: &Identity) -> bool {
        match self.matching_check(identity) {
            Some(check) => {
                tracing::debug!(user_id = %identity.user_id, check = check.key(), "admin access granted");
                true
            }
            None => false,
        }
    }
}

/// True when `email` ends with `@<domain>` for one of `domains` (lowercase).
pub fn email_in_domains(email: &str, domains: &[String]) -> bool {
    let email = email.to_lowercase();
    domains.iter().any(|d| email.ends_with(&format!("@{d}")))
}
