//! Freshness evaluation for index results.
//!
//! [`IndexOutOfDateChecker`] answers "is this occurrence (or this file's unit)
//! still valid?" under one [`IndexCheckLevel`]. Every filesystem and document
//! lookup is memoized per URI and never invalidated, so a checker must not
//! outlive the request it was created for.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::index::PersistentIndex;
use crate::models::{DocumentUri, SymbolLocation};
use crate::oracle::diagnostics::Diagnostics;
use crate::oracle::filesystem::FileSystem;
use crate::query::check_level::IndexCheckLevel;
use crate::query::guards::MAX_SYMLINK_HOPS;

/// The last modification time of a file, or the fact that it is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModificationTime {
    FileDoesNotExist,
    Date(SystemTime),
}

pub struct IndexOutOfDateChecker {
    check_level: IndexCheckLevel,
    fs: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn Diagnostics>,
    in_memory_modifications_cache: HashMap<DocumentUri, bool>,
    mod_time_cache: HashMap<DocumentUri, ModificationTime>,
    file_exists_cache: HashMap<DocumentUri, bool>,
}

impl IndexOutOfDateChecker {
    pub fn new(
        check_level: IndexCheckLevel,
        fs: Arc<dyn FileSystem>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            check_level,
            fs,
            diagnostics,
            in_memory_modifications_cache: HashMap::new(),
            mod_time_cache: HashMap::new(),
            file_exists_cache: HashMap::new(),
        }
    }

    pub fn check_level(&self) -> &IndexCheckLevel {
        &self.check_level
    }

    // -----------------------------------------------------------------------
    // Policy evaluation
    // -----------------------------------------------------------------------

    /// Whether the source file of `location` exists and has not been modified
    /// since the occurrence was indexed, per the check level.
    pub fn is_up_to_date(&mut self, location: &SymbolLocation) -> bool {
        let uri = location.uri();
        if let IndexCheckLevel::DeletedFiles = self.check_level {
            return self.file_exists(&uri);
        }
        if self.has_unsaved_edits(&uri) {
            return false;
        }
        match self.modification_time(&uri) {
            Ok(ModificationTime::FileDoesNotExist) => false,
            Ok(ModificationTime::Date(modified)) => modified <= location.timestamp,
            Err(e) => {
                self.diagnostics.fault(&format!(
                    "Unable to determine if symbol location in {} is up-to-date: {e}",
                    location.path
                ));
                true
            }
        }
    }

    /// Whether the index holds a unit for `file` built after the file's last
    /// modification.
    ///
    /// `main_file` is for headers that have no unit of their own: the newest
    /// unit of the including main file is compared against the header's
    /// modification time instead.
    pub fn index_has_up_to_date_unit(
        &mut self,
        file: &DocumentUri,
        main_file: Option<&DocumentUri>,
        index: &dyn PersistentIndex,
    ) -> bool {
        if let IndexCheckLevel::DeletedFiles = self.check_level {
            // Asking about a file's unit implies the caller believes it exists.
            return true;
        }
        // Only on-disk contents are ever indexed.
        if self.has_unsaved_edits(file) {
            return false;
        }

        let unit_file = main_file.unwrap_or(file);
        let Some(unit_path) = unit_file.file_path() else {
            return false;
        };
        let real_path = match self.fs.canonicalize(unit_path) {
            Ok(real_path) => real_path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
            Err(e) => {
                self.diagnostics.warning(&format!(
                    "Failed to resolve real path of {} for up-to-date check: {e}",
                    unit_path.display()
                ));
                return true;
            }
        };
        let Some(last_unit_date) = index.date_of_latest_unit_for(&real_path.to_string_lossy()) else {
            return false;
        };

        match self.modification_time(file) {
            Ok(ModificationTime::FileDoesNotExist) => false,
            Ok(ModificationTime::Date(modified)) => modified <= last_unit_date,
            Err(e) => {
                self.diagnostics.fault(&format!(
                    "Unable to determine if {file} has an up-to-date unit: {e}"
                ));
                true
            }
        }
    }

    /// Whether the document manager holds unsaved edits for `uri`.
    ///
    /// Only meaningful under [`IndexCheckLevel::InMemoryModifiedFiles`]; any
    /// other level reports a fault and answers `false`.
    pub fn file_has_in_memory_modifications(&mut self, uri: &DocumentUri) -> bool {
        if self.check_level.document_manager().is_none() {
            self.diagnostics.fault(&format!(
                "file_has_in_memory_modifications called for {uri} under check level {}; \
                 only inMemoryModifiedFiles tracks editor buffers",
                self.check_level.name()
            ));
            return false;
        }
        self.has_unsaved_edits(uri)
    }

    // -----------------------------------------------------------------------
    // Cached primitives
    // -----------------------------------------------------------------------

    /// Unsaved-edit lookup; `false` when the level has no document manager.
    fn has_unsaved_edits(&mut self, uri: &DocumentUri) -> bool {
        let Some(documents) = self.check_level.document_manager() else {
            return false;
        };
        if let Some(&cached) = self.in_memory_modifications_cache.get(uri) {
            return cached;
        }
        let modified = documents.file_has_in_memory_modifications(uri);
        self.in_memory_modifications_cache.insert(uri.clone(), modified);
        modified
    }

    /// Effective modification time of `uri`: the newest mtime across the path
    /// and every hop of its symlink chain, so that both an edited target and
    /// a repointed link count as a modification.
    ///
    /// A missing file (anywhere along the chain) is
    /// [`ModificationTime::FileDoesNotExist`], not an error.
    pub fn modification_time(&mut self, uri: &DocumentUri) -> io::Result<ModificationTime> {
        if let Some(&cached) = self.mod_time_cache.get(uri) {
            return Ok(cached);
        }
        let mod_time = self.modification_time_uncached(uri)?;
        self.mod_time_cache.insert(uri.clone(), mod_time);
        Ok(mod_time)
    }

    fn modification_time_uncached(&self, uri: &DocumentUri) -> io::Result<ModificationTime> {
        let Some(path) = uri.file_path() else {
            return Ok(ModificationTime::FileDoesNotExist);
        };
        match self.newest_mtime_in_symlink_chain(path) {
            Ok(modified) => Ok(ModificationTime::Date(modified)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ModificationTime::FileDoesNotExist),
            Err(e) => Err(e),
        }
    }

    fn newest_mtime_in_symlink_chain(&self, path: &Path) -> io::Result<SystemTime> {
        let mut current = path.to_path_buf();
        let mut stat = self.fs.symlink_metadata(&current)?;
        let mut newest = stat.modified;
        let mut hops = 0;
        while stat.is_symlink {
            if hops == MAX_SYMLINK_HOPS {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("too many levels of symbolic links at {}", path.display()),
                ));
            }
            hops += 1;
            let destination = self.fs.read_link(&current)?;
            current = resolve_link_destination(&current, destination);
            stat = self.fs.symlink_metadata(&current)?;
            newest = newest.max(stat.modified);
        }
        Ok(newest)
    }

    /// Existence check used by [`IndexCheckLevel::DeletedFiles`].
    pub fn file_exists(&mut self, uri: &DocumentUri) -> bool {
        if let Some(&cached) = self.file_exists_cache.get(uri) {
            return cached;
        }
        let exists = uri.file_path().is_some_and(|path| self.fs.exists(path));
        self.file_exists_cache.insert(uri.clone(), exists);
        exists
    }
}

/// Relative link targets are relative to the directory holding the link.
fn resolve_link_destination(link: &Path, destination: PathBuf) -> PathBuf {
    if destination.is_absolute() {
        return destination;
    }
    match link.parent() {
        Some(parent) => parent.join(destination),
        None => destination,
    }
}
