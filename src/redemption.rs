use rusqlite::{Connection, OptionalExtension};

use crate::db::{new_id, now};
use crate::error::{RedeemError, Result};
use crate::models::{CodeStatus, RedemptionRequest, RequestStatus};

pub struct Submission<'a> {
    pub code: &'a str,
    pub username: &'a str,
    pub contact_info: &'a str,
}

/// Create a pending redemption request for an active code and mark the code
/// used. Returns the new request id.
pub fn submit(conn: &Connection, submission: &Submission<'_>, uppercase: bool) -> Result<String> {
    let span = tracing::info_span!("submit_redemption", request_id = %new_id());
    let _guard = span.enter();

    let code = submission.code.trim();
    let username = submission.username.trim();
    let contact = submission.contact_info.trim();
    if code.is_empty() || username.is_empty() || contact.is_empty() {
        return Err(RedeemError::Validation("code, username and contact are required".into()));
    }
    let code = if uppercase { code.to_uppercase() } else { code.to_string() };

    let tx = conn.unchecked_transaction()?;
    let status: Option<String> = tx
        .query_row(
            "SELECT status FROM redemption_codes WHERE code = ?1",
            [&code],
            |row| row.get(0),
        )
        .optional()?;
    match status.as_deref().map(str::parse::<CodeStatus>) {
        None => {
            tracing::warn!(code = %code, "code not found");
            return Err(RedeemError::NotFound(format!("code '{code}'")));
        }
        Some(Ok(CodeStatus::Active)) => {}
        Some(_) => {
            tracing::warn!(code = %code, "code already used");
            return Err(RedeemError::Validation("Code already used".into()));
        }
    }

    let id = new_id();
    let ts = now();
    tx.execute(
        "INSERT INTO redemption_requests (id, code, username, contact_info, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        rusqlite::params![id, code, username, contact, RequestStatus::Pending.as_str(), ts],
    )?;
    if let Err(e) = tx.execute(
        "UPDATE redemption_codes SET status = ?1, updated_at = ?2 WHERE code = ?3",
        rusqlite::params![CodeStatus::Used.as_str(), ts, code],
    ) {
        tracing::warn!(code = %code, error = %e, "could not mark code as used");
    }
    tx.commit()?;

    tracing::info!(code = %code, id = %id, "redemption request created");
    Ok(id)
}

pub fn list_requests(conn: &Connection, status: Option<RequestStatus>) -> Result<Vec<RedemptionRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, code, username, contact_info, status, admin_notes, created_at \
         FROM redemption_requests WHERE ?1 IS NULL OR status = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let requests = stmt
        .query_map([status.map(|s| s.as_str())], |row| {
            let raw: String = row.get(4)?;
            let status = raw.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(4, raw.clone(), rusqlite::types::Type::Text)
            })?;
            Ok(RedemptionRequest {
                id: row.get(0)?,
                code: row.get(1)?,
                username: row.get(2)?,
                contact_info: row.get(3)?,
                status,
                admin_notes: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(requests)
}

/// Move a request to `status`, replacing its admin notes.
pub fn set_status(conn: &Connection, id: &str, status: RequestStatus, notes: Option<&str>) -> Result<()> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    let changed = conn.execute(
        "UPDATE redemption_requests SET status = ?1, admin_notes = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![status.as_str(), notes, now(), id],
    )?;
    if changed == 0 {
        return Err(RedeemError::NotFound(format!("request '{id}'")));
    }
    tracing::info!(id = %id, status = %status, "request status updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::inventory::add_code;

    fn submission<'a>(code: &'a str) -> Submission<'a> {
        Submission {
            code,
            username: "player1",
            contact_info: "line:@player1",
        }
    }

    #[test]
    fn test_submit_creates_pending_request_and_uses_code() {
        let (_dir, conn) = test_db();
        add_code(&conn, "GIFT-1", 400, "admin", true).unwrap();
        let id = submit(&conn, &submission("gift-1"), true).unwrap();

        let requests = list_requests(&conn, None).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, id);
        assert_eq!(requests[0].code, "GIFT-1");
        assert_eq!(requests[0].status, RequestStatus::Pending);

        let status: String = conn
            .query_row("SELECT status FROM redemption_codes WHERE code = 'GIFT-1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(status, "used");
    }

    #[test]
    fn test_code_cannot_be_redeemed_twice() {
        let (_dir, conn) = test_db();
        add_code(&conn, "GIFT-1", 400, "admin", true).unwrap();
        submit(&conn, &submission("GIFT-1"), true).unwrap();
        let err = submit(&conn, &submission("GIFT-1"), true).unwrap_err();
        assert!(matches!(err, RedeemError::Validation(_)));
        assert_eq!(list_requests(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_code_and_missing_fields() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            submit(&conn, &submission("NOPE"), true),
            Err(RedeemError::NotFound(_))
        ));
        let blank = Submission {
            code: "X",
            username: " ",
            contact_info: "c",
        };
        assert!(matches!(submit(&conn, &blank, true), Err(RedeemError::Validation(_))));
    }

    #[test]
    fn test_set_status_and_filter() {
        let (_dir, conn) = test_db();
        add_code(&conn, "A", 1, "admin", true).unwrap();
        add_code(&conn, "B", 1, "admin", true).unwrap();
        let a = submit(&conn, &submission("A"), true).unwrap();
        submit(&conn, &submission("B"), true).unwrap();

        set_status(&conn, &a, RequestStatus::Completed, Some(" sent via chat ")).unwrap();
        let done = list_requests(&conn, Some(RequestStatus::Completed)).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].admin_notes.as_deref(), Some("sent via chat"));
        assert_eq!(list_requests(&conn, Some(RequestStatus::Pending)).unwrap().len(), 1);

        assert!(matches!(
            set_status(&conn, "missing", RequestStatus::Rejected, None),
            Err(RedeemError::NotFound(_))
        ));
    }
}
