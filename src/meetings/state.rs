//! Verification step of the per-transaction lifecycle.
//!
//! A slot is `Absent` until a meeting is created, then `Cached`. Every read of
//! a cached record asks the provider whether the meeting still exists, which
//! yields one of:
//!
//! - `Verified`: the record is served unchanged (URLs are not refreshed from
//!   the live response).
//! - `Stale`: the record is evicted and the slot is `Absent` again.
//! - an error: the provider could not answer; the slot is left as it was.

use super::record::MeetingRecord;
use crate::errors::AppError;
use crate::zoom::MeetingResource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Verified(MeetingRecord),
    Stale(MeetingRecord),
}

/// Classify the provider's answer for a cached record.
pub fn verify(
    record: MeetingRecord,
    remote: Result<MeetingResource, AppError>,
) -> Result<Verdict, AppError> {
    match remote {
        Ok(_) => Ok(Verdict::Verified(record)),
        Err(e) if e.is_not_found() => Ok(Verdict::Stale(record)),
        Err(e) => Err(e),
    }
}
