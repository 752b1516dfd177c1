//! Editor buffer state, as seen by the checker.

use crate::models::DocumentUri;

/// The editor's document manager, reduced to the one question the checker
/// asks of it.
pub trait InMemoryDocumentManager: Send + Sync {
    /// True if the buffer for `uri` differs from the file on disk, i.e. the
    /// user has edits that are not saved yet.
    fn file_has_in_memory_modifications(&self, uri: &DocumentUri) -> bool;
}
