//! Drift detection between an indexed document and its source item.

use crate::attachments::primary_attachment;
use crate::document::IndexEntry;
use crate::source_item::SourceItem;
use crate::timestamp::is_strictly_newer;

/// Why an indexed document is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftReason {
    /// The source was modified after the indexed copy.
    Modified,
    /// The primary attachment's checksum changed, appeared, or disappeared.
    ChecksumChanged,
}

/// Compare an index entry against the live source item.
///
/// The primary attachment is resolved on both sides with the same
/// `text_bearing_types`. Both checksums absent counts as unchanged; exactly
/// one absent counts as changed.
pub fn detect_drift<S: AsRef<str>>(
    entry: &IndexEntry,
    source: &SourceItem,
    text_bearing_types: &[S],
) -> Option<DriftReason> {
    if is_strictly_newer(
        source.last_modified.as_deref(),
        entry.last_modified.as_deref(),
    ) {
        return Some(DriftReason::Modified);
    }

    let indexed = primary_attachment(&entry.attachments, text_bearing_types)
        .and_then(|attachment| attachment.checksum_value());
    let live = primary_attachment(&source.attachments, text_bearing_types)
        .and_then(|attachment| attachment.checksum_value());

    if indexed != live {
        return Some(DriftReason::ChecksumChanged);
    }

    None
}

/// Convenience wrapper over [`detect_drift`].
pub fn is_updated<S: AsRef<str>>(
    entry: &IndexEntry,
    source: &SourceItem,
    text_bearing_types: &[S],
) -> bool {
    detect_drift(entry, source, text_bearing_types).is_some()
}
