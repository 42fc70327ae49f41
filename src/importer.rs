use std::collections::HashSet;

use serde::Serialize;

use crate::auth::Authorizer;
use crate::db::new_id;
use crate::error::{RedeemError, Result};
use crate::models::{Candidate, ImportKind};
use crate::normalizer::{dedup_first_seen, normalize, normalize_candidates, RejectedLine};
use crate::store::Store;

/// Number of entries written per insert call.
pub const BATCH_SIZE: usize = 50;

const MSG_SUCCESS: &str = "imported";
const MSG_DUPLICATE: &str = "already exists";
const MSG_ERROR: &str = "import failed";
const MSG_NOT_STORED: &str = "not stored by the database";

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

pub enum ImportInput {
    Raw(String),
    Candidates(Vec<Candidate>),
}

impl ImportInput {
    fn is_blank(&self) -> bool {
        match self {
            Self::Raw(s) => s.trim().is_empty(),
            Self::Candidates(c) => c.is_empty(),
        }
    }
}

pub struct ImportRequest {
    pub kind: ImportKind,
    pub issuer_id: String,
    pub input: ImportInput,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Upper-case keys before duplicate resolution and commit.
    pub uppercase_keys: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { uppercase_keys: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    Duplicate,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub key: String,
    pub status: EntryStatus,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub successful: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub details: Vec<EntryOutcome>,
}

impl ImportResult {
    pub fn total(&self) -> usize {
        self.successful + self.failed + self.duplicates
    }

    fn record(&mut self, key: &str, status: EntryStatus, message: &str) {
        match status {
            EntryStatus::Success => self.successful += 1,
            EntryStatus::Duplicate => self.duplicates += 1,
            EntryStatus::Error => self.failed += 1,
        }
        self.details.push(EntryOutcome {
            key: key.to_string(),
            status,
            message: message.to_string(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ImportResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedLine>,
}

impl ImportResponse {
    pub fn error(err: &RedeemError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.to_string(),
            results: None,
            rejected: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run one bulk import: validate the request, authorize the issuer,
/// normalise the input, resolve duplicates against the store and commit the
/// rest in batches of `BATCH_SIZE`.
///
/// Every failure before the commit stage rejects the whole import with no
/// writes. Batch failures during commit are recorded per entry and do not
/// fail the call.
pub fn bulk_import<S: Store, A: Authorizer>(
    store: &S,
    authorizer: &A,
    request: ImportRequest,
    options: ImportOptions,
) -> Result<ImportResponse> {
    let span = tracing::info_span!("bulk_import", request_id = %new_id(), kind = %request.kind);
    let _guard = span.enter();
    let kind = request.kind;

    if request.issuer_id.trim().is_empty() {
        return Err(RedeemError::Validation("issuer id is required".into()));
    }
    if request.input.is_blank() {
        return Err(RedeemError::Validation("no entries to import".into()));
    }

    let identity = authorizer.authorize(&request.issuer_id)?;

    tracing::debug!("normalizing");
    let normalized = match request.input {
        ImportInput::Raw(raw) => normalize(&raw, kind)?,
        ImportInput::Candidates(list) => normalize_candidates(list, kind)?,
    };
    let mut candidates = normalized.candidates;
    if options.uppercase_keys {
        for c in &mut candidates {
            let upper = c.key().to_uppercase();
            c.set_key(upper);
        }
        candidates = dedup_first_seen(candidates);
    }
    if candidates.is_empty() {
        return Err(RedeemError::Validation("no valid entries found".into()));
    }

    tracing::debug!(candidates = candidates.len(), "resolving duplicates");
    let keys: Vec<String> = candidates.iter().map(|c| c.key().to_string()).collect();
    let existing = store.existing_keys(kind, &keys).map_err(|e| {
        tracing::error!(error = %e, "duplicate check failed");
        RedeemError::Transport(e.to_string())
    })?;

    tracing::debug!(existing = existing.len(), "committing");
    let result = commit(store, &identity.user_id, candidates, &existing);

    tracing::info!(
        total = result.total(),
        successful = result.successful,
        duplicates = result.duplicates,
        failed = result.failed,
        rejected = normalized.rejected.len(),
        "bulk import completed"
    );

    Ok(ImportResponse {
        status: ResponseStatus::Success,
        message: format!(
            "{} imported, {} already existed, {} failed",
            result.successful, result.duplicates, result.failed
        ),
        results: Some(result),
        rejected: normalized.rejected,
    })
}

/// Partition candidates against `existing` and write the unique ones batch
/// by batch. A failed batch marks all of its entries as errors and the next
/// batch still runs.
pub fn commit<S: Store>(
    store: &S,
    issuer_id: &str,
    candidates: Vec<Candidate>,
    existing: &HashSet<String>,
) -> ImportResult {
    let (duplicates, unique): (Vec<Candidate>, Vec<Candidate>) = candidates
        .into_iter()
        .partition(|c| existing.contains(c.key()));

    let mut result = ImportResult::default();

    for (idx, batch) in unique.chunks(BATCH_SIZE).enumerate() {
        match store.insert_many(issuer_id, batch) {
            Ok(inserted) => {
                let stored: HashSet<&str> = inserted.iter().map(String::as_str).collect();
                if stored.len() < batch.len() {
                    tracing::warn!(batch = idx + 1, attempted = batch.len(), stored = stored.len(), "partial batch");
                }
                for c in batch {
                    if stored.contains(c.key()) {
                        result.record(c.key(), EntryStatus::Success, MSG_SUCCESS);
                    } else {
                        result.record(c.key(), EntryStatus::Error, MSG_NOT_STORED);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(batch = idx + 1, size = batch.len(), error = %e, "batch insert failed");
                for c in batch {
                    result.record(c.key(), EntryStatus::Error, MSG_ERROR);
                }
            }
        }
    }

    for c in &duplicates {
        result.record(c.key(), EntryStatus::Duplicate, MSG_DUPLICATE);
    }

    result
}
