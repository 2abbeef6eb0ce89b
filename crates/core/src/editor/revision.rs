use crate::domain::asset_view::{Asset, Revision};
use crate::domain::contract::MAX_REVISIONS;

/// Prepends a snapshot of `previous` (the asset before the edit) and keeps the newest
/// [`MAX_REVISIONS`] entries.
pub fn add_revision(existing: Option<&[Revision]>, previous: &Asset) -> Vec<Revision> {
    std::iter::once(Revision::snapshot_of(previous))
        .chain(existing.unwrap_or_default().iter().cloned())
        .take(MAX_REVISIONS)
        .collect()
}
