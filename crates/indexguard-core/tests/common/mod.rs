//! Shared fixtures for the integration tests: an in-memory persistent index,
//! a scripted filesystem, and a document manager with a fixed dirty set.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexguard_core::index::OccurrenceVisitor;
use indexguard_core::store::pattern::matches_pattern;
use indexguard_core::{
    DocumentUri, FileStat, FileSystem, InMemoryDocumentManager, PatternOptions, PersistentIndex, Symbol,
    SymbolKind, SymbolLocation, SymbolOccurrence, SymbolRelation, SymbolRoles,
};

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn symbol(usr: &str, name: &str, kind: SymbolKind) -> Symbol {
    Symbol::new(usr, name, kind)
}

pub fn occurrence(
    symbol: &Symbol,
    roles: SymbolRoles,
    path: &str,
    line: u32,
    indexed_at: SystemTime,
    relations: Vec<SymbolRelation>,
) -> SymbolOccurrence {
    SymbolOccurrence::new(
        symbol.clone(),
        roles,
        SymbolLocation::new(path, line, 1, indexed_at),
        relations,
    )
}

pub fn child_of(parent: &Symbol) -> SymbolRelation {
    SymbolRelation::new(SymbolRoles::CHILD_OF, parent.clone())
}

// ---------------------------------------------------------------------------
// MemoryIndex
// ---------------------------------------------------------------------------

/// A persistent index held in vectors, answering in insertion order.
#[derive(Default)]
pub struct MemoryIndex {
    occurrences: Vec<SymbolOccurrence>,
    /// Main file path to the dates of its units.
    units: HashMap<String, Vec<SystemTime>>,
    /// `(included file, main file, cross_language)`.
    includes: Vec<(String, String, bool)>,
    /// Test occurrence and the main file of the unit declaring it.
    unit_tests: Vec<(SymbolOccurrence, String)>,
    polls: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_occurrences(occurrences: impl IntoIterator<Item = SymbolOccurrence>) -> Self {
        let mut index = Self::new();
        index.occurrences.extend(occurrences);
        index
    }

    pub fn add(&mut self, occurrence: SymbolOccurrence) -> &mut Self {
        self.occurrences.push(occurrence);
        self
    }

    pub fn add_unit(&mut self, main_file: impl Into<String>, date: SystemTime) -> &mut Self {
        self.units.entry(main_file.into()).or_default().push(date);
        self
    }

    pub fn add_include(&mut self, file: &str, main_file: &str, cross_language: bool) -> &mut Self {
        self.includes
            .push((file.to_string(), main_file.to_string(), cross_language));
        self
    }

    pub fn add_unit_test(&mut self, test: SymbolOccurrence, main_file: &str) -> &mut Self {
        self.unit_tests.push((test, main_file.to_string()));
        self
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn visit<'o>(
        occurrences: impl Iterator<Item = &'o SymbolOccurrence>,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        for occurrence in occurrences {
            body(occurrence)?;
        }
        ControlFlow::Continue(())
    }
}

impl PersistentIndex for MemoryIndex {
    fn for_each_symbol_occurrence(
        &self,
        usr: &str,
        roles: SymbolRoles,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        Self::visit(
            self.occurrences
                .iter()
                .filter(|o| o.symbol.usr == usr && o.roles.intersects(roles)),
            body,
        )
    }

    fn occurrences_related_to_usr(&self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence> {
        self.occurrences
            .iter()
            .filter(|o| o.relations_with(roles).any(|r| r.symbol.usr == usr))
            .cloned()
            .collect()
    }

    fn for_each_canonical_symbol_occurrence_containing(
        &self,
        pattern: &str,
        options: PatternOptions,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        Self::visit(
            self.occurrences.iter().filter(|o| {
                o.roles.contains(SymbolRoles::CANONICAL) && matches_pattern(&o.symbol.name, pattern, options)
            }),
            body,
        )
    }

    fn for_each_canonical_symbol_occurrence_by_name(
        &self,
        name: &str,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()> {
        Self::visit(
            self.occurrences
                .iter()
                .filter(|o| o.roles.contains(SymbolRoles::CANONICAL) && o.symbol.name == name),
            body,
        )
    }

    fn symbols_in_file_path(&self, path: &str) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        self.occurrences
            .iter()
            .filter(|o| o.location.path == path)
            .filter(|o| seen.insert(o.symbol.usr.clone()))
            .map(|o| o.symbol.clone())
            .collect()
    }

    fn unit_tests(&self) -> Vec<SymbolOccurrence> {
        self.unit_tests.iter().map(|(test, _)| test.clone()).collect()
    }

    fn unit_tests_referenced_by_main_files(&self, main_file_paths: &[String]) -> Vec<SymbolOccurrence> {
        self.unit_tests
            .iter()
            .filter(|(_, main_file)| main_file_paths.contains(main_file))
            .map(|(test, _)| test.clone())
            .collect()
    }

    fn main_files_containing_file(&self, path: &str, cross_language: bool) -> Vec<String> {
        let mut main_files = Vec::new();
        if self.units.contains_key(path) {
            main_files.push(path.to_string());
        }
        for (file, main_file, cross) in &self.includes {
            if file == path && (cross_language || !cross) && !main_files.contains(main_file) {
                main_files.push(main_file.clone());
            }
        }
        main_files
    }

    fn date_of_latest_unit_for(&self, file_path: &str) -> Option<SystemTime> {
        self.units.get(file_path)?.iter().max().copied()
    }

    fn poll_for_unit_changes_and_wait(&self) {
        self.polls.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// ScriptedFileSystem
// ---------------------------------------------------------------------------

enum Entry {
    File(SystemTime),
    Link(SystemTime, PathBuf),
}

/// A filesystem whose files and links are declared up front. Every call is
/// counted so tests can observe caching.
#[derive(Default)]
pub struct ScriptedFileSystem {
    entries: HashMap<PathBuf, Entry>,
    calls: AtomicUsize,
}

impl ScriptedFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, modified: SystemTime) -> Self {
        self.entries.insert(PathBuf::from(path), Entry::File(modified));
        self
    }

    pub fn link(mut self, path: &str, modified: SystemTime, target: &str) -> Self {
        self.entries
            .insert(PathBuf::from(path), Entry::Link(modified, PathBuf::from(target)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> io::Result<&Entry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

impl FileSystem for ScriptedFileSystem {
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileStat> {
        Ok(match self.lookup(path)? {
            Entry::File(modified) => FileStat {
                modified: *modified,
                is_symlink: false,
            },
            Entry::Link(modified, _) => FileStat {
                modified: *modified,
                is_symlink: true,
            },
        })
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.lookup(path)? {
            Entry::Link(_, target) => Ok(target.clone()),
            Entry::File(_) => Err(io::Error::new(io::ErrorKind::InvalidInput, "not a link")),
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let mut current = path.to_path_buf();
        while let Entry::Link(_, target) = self.lookup(&current)? {
            current = target.clone();
        }
        Ok(current)
    }

    fn exists(&self, path: &Path) -> bool {
        self.lookup(path).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Reports unsaved edits for a fixed set of paths.
pub struct DirtyDocuments {
    dirty: HashSet<DocumentUri>,
    queries: AtomicUsize,
}

impl DirtyDocuments {
    pub fn new(paths: &[&str]) -> Self {
        Self {
            dirty: paths.iter().map(DocumentUri::from_file_path).collect(),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl InMemoryDocumentManager for DirtyDocuments {
    fn file_has_in_memory_modifications(&self, uri: &DocumentUri) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.dirty.contains(uri)
    }
}
