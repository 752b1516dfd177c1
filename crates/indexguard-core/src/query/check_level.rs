//! Staleness policies.

use std::fmt;
use std::sync::Arc;

use crate::oracle::documents::InMemoryDocumentManager;

/// How strictly a [`crate::query::checked::CheckedIndex`] judges index
/// results against the current state of their source files.
#[derive(Clone)]
pub enum IndexCheckLevel {
    /// Stale only if the source file has been deleted.
    ///
    /// A good default for navigation: after an edit most locations in a file
    /// are still right, and showing a slightly stale location tells the user
    /// that the index needs to catch up.
    DeletedFiles,

    /// Stale if the source file has been deleted or modified on disk after
    /// the occurrence was indexed.
    ModifiedFiles,

    /// Like [`IndexCheckLevel::ModifiedFiles`], and additionally stale if the
    /// document manager holds unsaved edits for the file.
    InMemoryModifiedFiles(Arc<dyn InMemoryDocumentManager>),
}

impl IndexCheckLevel {
    pub fn in_memory_modified_files(documents: Arc<dyn InMemoryDocumentManager>) -> Self {
        IndexCheckLevel::InMemoryModifiedFiles(documents)
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndexCheckLevel::DeletedFiles => "deletedFiles",
            IndexCheckLevel::ModifiedFiles => "modifiedFiles",
            IndexCheckLevel::InMemoryModifiedFiles(_) => "inMemoryModifiedFiles",
        }
    }

    pub(crate) fn document_manager(&self) -> Option<&Arc<dyn InMemoryDocumentManager>> {
        match self {
            IndexCheckLevel::InMemoryModifiedFiles(documents) => Some(documents),
            IndexCheckLevel::DeletedFiles | IndexCheckLevel::ModifiedFiles => None,
        }
    }
}

impl fmt::Debug for IndexCheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
