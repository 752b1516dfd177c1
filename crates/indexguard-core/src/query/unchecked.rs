//! Capability gate over the raw persistent index.
//!
//! Request handlers hold an [`UncheckedIndex`] and ask it for a
//! [`CheckedIndex`] per request. Reaching the raw index requires calling
//! [`UncheckedIndex::underlying_index`], so an unfiltered query is always
//! visible at the call site.

use std::fmt;
use std::sync::Arc;

use crate::config::IndexGuardConfig;
use crate::index::PersistentIndex;
use crate::oracle::documents::InMemoryDocumentManager;
use crate::oracle::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::oracle::filesystem::{FileSystem, RealFileSystem};
use crate::query::check_level::IndexCheckLevel;
use crate::query::checked::CheckedIndex;

#[derive(Clone)]
pub struct UncheckedIndex {
    index: Arc<dyn PersistentIndex>,
    fs: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl UncheckedIndex {
    /// Wrap `index`, checking freshness against the real filesystem and
    /// reporting through `tracing`.
    pub fn new(index: Arc<dyn PersistentIndex>) -> Self {
        Self {
            index,
            fs: Arc::new(RealFileSystem),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// `None` when there is no index (e.g. indexing is disabled).
    pub fn new_optional(index: Option<Arc<dyn PersistentIndex>>) -> Option<Self> {
        index.map(Self::new)
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// A fresh checked view with empty caches. Drop it when the request ends.
    pub fn checked(&self, check_level: IndexCheckLevel) -> CheckedIndex<'_> {
        CheckedIndex::new(self, check_level)
    }

    /// A checked view at the level named in `config`. `documents` backs the
    /// in-memory level; without it that level degrades to modified files.
    pub fn checked_with_config(
        &self,
        config: &IndexGuardConfig,
        documents: Option<Arc<dyn InMemoryDocumentManager>>,
    ) -> CheckedIndex<'_> {
        self.checked(config.default_check_level.into_check_level(documents))
    }

    /// Run `body` against a checked view that cannot outlive the call.
    pub fn with_checked<R>(
        &self,
        check_level: IndexCheckLevel,
        body: impl FnOnce(&mut CheckedIndex<'_>) -> R,
    ) -> R {
        let mut checked = self.checked(check_level);
        body(&mut checked)
    }

    /// Block until the index reflects the unit files currently on disk.
    pub fn poll_for_unit_changes_and_wait(&self) {
        self.index.poll_for_unit_changes_and_wait();
    }

    /// The raw index. Results are not checked for freshness.
    pub fn underlying_index(&self) -> &dyn PersistentIndex {
        self.index.as_ref()
    }

    pub(crate) fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    pub(crate) fn diagnostics(&self) -> Arc<dyn Diagnostics> {
        Arc::clone(&self.diagnostics)
    }
}

impl fmt::Debug for UncheckedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UncheckedIndex").finish_non_exhaustive()
    }
}
