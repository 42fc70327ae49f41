use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{RedeemError, Result};
use crate::models::{Candidate, ImportKind};

/// Maximum number of valid candidates accepted by one import.
pub const MAX_CANDIDATES: usize = 500;

/// Delimiters recognised in account lines, in priority order.
pub const ACCOUNT_DELIMITERS: [char; 3] = [':', ',', '|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Fewer than three delimited fields.
    Malformed,
    /// Key, username or password empty after trimming.
    Incomplete,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("malformed"),
            Self::Incomplete => f.write_str("incomplete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    /// 1-based line number in the raw input.
    pub line: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub candidates: Vec<Candidate>,
    pub rejected: Vec<RejectedLine>,
}

/// Split an account line on the first delimiter of `ACCOUNT_DELIMITERS` that
/// occurs in it. A line containing none of them yields a single field.
pub fn split_account_line(line: &str) -> Vec<&str> {
    match ACCOUNT_DELIMITERS.iter().find(|d| line.contains(**d)) {
        Some(delim) => line.split(*delim).map(str::trim).collect(),
        None => vec![line.trim()],
    }
}

fn parse_account_line(line: &str) -> std::result::Result<Candidate, RejectReason> {
    let fields = split_account_line(line);
    if fields.len() < 3 {
        return Err(RejectReason::Malformed);
    }
    let (key, username, password) = (fields[0], fields[1], fields[2]);
    if key.is_empty() || username.is_empty() || password.is_empty() {
        return Err(RejectReason::Incomplete);
    }
    let product_name = fields
        .get(3)
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string());
    Ok(Candidate::Account {
        key: key.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        product_name,
    })
}

/// Collapse repeated keys, keeping the first occurrence of each.
pub fn dedup_first_seen(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.key().to_string()))
        .collect()
}

/// Turn raw multi-line input into well-formed, input-deduplicated candidates.
///
/// Empty lines are skipped. Lines that cannot be parsed are reported in
/// `rejected` and never become candidates. Fails when more than
/// `MAX_CANDIDATES` distinct candidates remain.
pub fn normalize(raw: &str, kind: ImportKind) -> Result<Normalized> {
    let mut out = Normalized::default();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match kind {
            ImportKind::Codes => out.candidates.push(Candidate::Code {
                key: line.to_string(),
            }),
            ImportKind::Accounts => match parse_account_line(line) {
                Ok(candidate) => out.candidates.push(candidate),
                Err(reason) => out.rejected.push(RejectedLine {
                    line: idx + 1,
                    reason,
                }),
            },
        }
    }
    out.candidates = dedup_first_seen(out.candidates);
    check_cap(out.candidates.len())?;
    Ok(out)
}

/// Normalise an already-parsed candidate list the same way raw lines are:
/// trim fields, reject incomplete entries, dedup, enforce the cap. Entry
/// positions are reported as 1-based line numbers.
pub fn normalize_candidates(input: Vec<Candidate>, kind: ImportKind) -> Result<Normalized> {
    let mut out = Normalized::default();
    for (idx, candidate) in input.into_iter().enumerate() {
        if candidate.kind() != kind {
            out.rejected.push(RejectedLine {
                line: idx + 1,
                reason: RejectReason::Malformed,
            });
            continue;
        }
        let trimmed = match candidate {
            Candidate::Code { key } => {
                let key = key.trim();
                if key.is_empty() {
                    out.rejected.push(RejectedLine {
                        line: idx + 1,
                        reason: RejectReason::Incomplete,
                    });
                    continue;
                }
                Candidate::Code { key: key.to_string() }
            }
            Candidate::Account {
                key,
                username,
                password,
                product_name,
            } => {
                let (key, username, password) = (key.trim(), username.trim(), password.trim());
                if key.is_empty() || username.is_empty() || password.is_empty() {
                    out.rejected.push(RejectedLine {
                        line: idx + 1,
                        reason: RejectReason::Incomplete,
                    });
                    continue;
                }
                Candidate::Account {
                    key: key.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                    product_name: product_name
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty()),
                }
            }
        };
        out.candidates.push(trimmed);
    }
    out.candidates = dedup_first_seen(out.candidates);
    check_cap(out.candidates.len())?;
    Ok(out)
}

fn check_cap(count: usize) -> Result<()> {
    if count > MAX_CANDIDATES {
        return Err(RedeemError::Validation(format!(
            "at most {MAX_CANDIDATES} entries can be imported at once (got {count})"
        )));
    }
    Ok(())
}
