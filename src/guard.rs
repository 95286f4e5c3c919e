use crate::model::{BracketEntry, Picks, Pool};
use chrono::{DateTime, Utc};
use std::fmt;

/// Why an entry edit was refused. These are expected outcomes, shown to the
/// participant as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRejection {
    PoolConcluded,
    NewEntryAfterLock,
    PicksLocked,
    DisplayNameTaken(String),
    NotYourEntry,
}

impl fmt::Display for EditRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditRejection::PoolConcluded => write!(f, "This pool has concluded; entries can no longer be edited"),
            EditRejection::NewEntryAfterLock => write!(f, "No new entries are accepted after the lock date"),
            EditRejection::PicksLocked => write!(f, "Picks and tiebreaker cannot be changed after the lock date"),
            EditRejection::DisplayNameTaken(name) => write!(f, "The name \"{name}\" is already taken in this pool"),
            EditRejection::NotYourEntry => write!(f, "This entry belongs to another participant"),
        }
    }
}

impl std::error::Error for EditRejection {}

/// The stored entry `proposed` would replace. An entry id never changes
/// owner, so an id held by another user is refused rather than overwritten.
pub fn existing_entry<'a>(
    entries: &'a [BracketEntry],
    proposed: &BracketEntry,
) -> Result<Option<&'a BracketEntry>, EditRejection> {
    match entries.iter().find(|e| e.id == proposed.id && e.pool_id == proposed.pool_id) {
        Some(existing) if existing.user_id != proposed.user_id => Err(EditRejection::NotYourEntry),
        found => Ok(found),
    }
}

/// Decide whether `proposed` may replace `existing` (or be created, when
/// `existing` is `None`).
///
/// Admins always pass. Before the lock date everything passes. After it a
/// closed pool refuses everything, new entries are refused, and so is any
/// change to the picks or the tiebreaker; renames still go through.
pub fn check_edit(
    pool: &Pool,
    existing: Option<&BracketEntry>,
    proposed: &BracketEntry,
    is_admin: bool,
    now: DateTime<Utc>,
) -> Result<(), EditRejection> {
    if is_admin || !pool.is_locked(now) {
        return Ok(());
    }
    if pool.is_closed() {
        return Err(EditRejection::PoolConcluded);
    }
    let Some(existing) = existing else {
        return Err(EditRejection::NewEntryAfterLock);
    };
    if existing.picks != proposed.picks || existing.tiebreaker != proposed.tiebreaker {
        return Err(EditRejection::PicksLocked);
    }
    Ok(())
}

/// Display names are unique within a pool, ignoring case.
pub fn check_display_name(entries: &[BracketEntry], proposed: &BracketEntry) -> Result<(), EditRejection> {
    let name = proposed.display_name.trim();
    let taken = entries.iter().any(|e| {
        e.id != proposed.id
            && e.pool_id == proposed.pool_id
            && e.display_name.trim().eq_ignore_ascii_case(name)
    });
    if taken {
        Err(EditRejection::DisplayNameTaken(name.to_owned()))
    } else {
        Ok(())
    }
}

/// Hide other participants' picks until the pool locks. Admins see everything
/// and everyone always sees their own picks.
pub fn redact_for_viewer(
    entries: Vec<BracketEntry>,
    pool: &Pool,
    viewer: Option<&str>,
    is_admin: bool,
    now: DateTime<Utc>,
) -> Vec<BracketEntry> {
    if is_admin || pool.is_locked(now) {
        return entries;
    }
    entries
        .into_iter()
        .map(|mut entry| {
            if viewer != Some(entry.user_id.as_str()) {
                entry.picks = Picks::Redacted;
            }
            entry
        })
        .collect()
}
