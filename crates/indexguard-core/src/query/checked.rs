//! The checked query surface over a persistent index.
//!
//! Every occurrence query is post-filtered through an
//! [`IndexOutOfDateChecker`]; stale results are dropped silently. In
//! enumerations a stale occurrence is skipped without reaching the visitor,
//! so it never ends the walk early and never reorders what follows.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::index::PersistentIndex;
use crate::models::{DocumentUri, PatternOptions, Symbol, SymbolOccurrence, SymbolRoles};
use crate::oracle::diagnostics::Diagnostics;
use crate::query::check_level::IndexCheckLevel;
use crate::query::out_of_date::IndexOutOfDateChecker;
use crate::query::unchecked::UncheckedIndex;

/// A short-lived, filtering view of an [`UncheckedIndex`].
///
/// The checker and container-name caches are never invalidated, so a
/// `CheckedIndex` borrows its gate and is meant to live for one request.
/// Obtain one with [`UncheckedIndex::checked`] or, to make the scope
/// explicit, [`UncheckedIndex::with_checked`].
pub struct CheckedIndex<'a> {
    gate: &'a UncheckedIndex,
    pub(crate) checker: IndexOutOfDateChecker,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
    /// Container USR to the names of that container and all its parents,
    /// outermost first. Many workspace-symbol hits share a container, so this
    /// saves one definition lookup per hit.
    pub(crate) container_names_cache: HashMap<String, Vec<String>>,
    /// Containers whose chain is being resolved right now.
    pub(crate) resolving_containers: HashSet<String>,
    /// Accessors currently redirected to the container of their variable.
    pub(crate) resolving_accessors: HashSet<String>,
}

impl<'a> CheckedIndex<'a> {
    pub(crate) fn new(gate: &'a UncheckedIndex, check_level: IndexCheckLevel) -> Self {
        let diagnostics = gate.diagnostics();
        Self {
            gate,
            checker: IndexOutOfDateChecker::new(check_level, gate.file_system(), diagnostics.clone()),
            diagnostics,
            container_names_cache: HashMap::new(),
            resolving_containers: HashSet::new(),
            resolving_accessors: HashSet::new(),
        }
    }

    pub fn check_level(&self) -> &IndexCheckLevel {
        self.checker.check_level()
    }

    /// The gate this view was created from, for deliberate unfiltered access.
    pub fn unchecked(&self) -> &'a UncheckedIndex {
        self.gate
    }

    fn index(&self) -> &'a dyn PersistentIndex {
        self.gate.underlying_index()
    }

    // -----------------------------------------------------------------------
    // Occurrence queries
    // -----------------------------------------------------------------------

    /// Visit the up-to-date occurrences of `usr` with any of `roles`.
    ///
    /// Returns `Break` if `body` stopped the enumeration.
    pub fn for_each_symbol_occurrence(
        &mut self,
        usr: &str,
        roles: SymbolRoles,
        mut body: impl FnMut(&SymbolOccurrence) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let index = self.index();
        let checker = &mut self.checker;
        index.for_each_symbol_occurrence(usr, roles, &mut |occurrence| {
            if !checker.is_up_to_date(&occurrence.location) {
                return ControlFlow::Continue(());
            }
            body(occurrence)
        })
    }

    pub fn occurrences_of_usr(&mut self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence> {
        let occurrences = self.index().occurrences_of_usr(usr, roles);
        self.retain_up_to_date(occurrences)
    }

    pub fn occurrences_related_to_usr(&mut self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence> {
        let occurrences = self.index().occurrences_related_to_usr(usr, roles);
        self.retain_up_to_date(occurrences)
    }

    /// Workspace-symbol search over canonical occurrences.
    pub fn for_each_canonical_symbol_occurrence_containing(
        &mut self,
        pattern: &str,
        options: PatternOptions,
        mut body: impl FnMut(&SymbolOccurrence) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let index = self.index();
        let checker = &mut self.checker;
        index.for_each_canonical_symbol_occurrence_containing(pattern, options, &mut |occurrence| {
            if !checker.is_up_to_date(&occurrence.location) {
                return ControlFlow::Continue(());
            }
            body(occurrence)
        })
    }

    pub fn for_each_canonical_symbol_occurrence_by_name(
        &mut self,
        name: &str,
        mut body: impl FnMut(&SymbolOccurrence) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let index = self.index();
        let checker = &mut self.checker;
        index.for_each_canonical_symbol_occurrence_by_name(name, &mut |occurrence| {
            if !checker.is_up_to_date(&occurrence.location) {
                return ControlFlow::Continue(());
            }
            body(occurrence)
        })
    }

    fn retain_up_to_date(&mut self, mut occurrences: Vec<SymbolOccurrence>) -> Vec<SymbolOccurrence> {
        occurrences.retain(|occurrence| self.checker.is_up_to_date(&occurrence.location));
        occurrences
    }

    // -----------------------------------------------------------------------
    // File and unit queries
    // -----------------------------------------------------------------------

    /// Symbols recorded for `path`, or nothing if the file has no up-to-date
    /// unit. A stale file may be wrong anywhere, so this is gated on the unit
    /// rather than filtered per occurrence.
    pub fn symbols_in_file_path(&mut self, path: &str) -> Vec<Symbol> {
        if !self.has_up_to_date_unit(&DocumentUri::from_file_path(path), None) {
            return Vec::new();
        }
        self.index().symbols_in_file_path(path)
    }

    pub fn unit_tests(&mut self) -> Vec<SymbolOccurrence> {
        let occurrences = self.index().unit_tests();
        self.retain_up_to_date(occurrences)
    }

    /// Unit tests in units whose main file is one of `main_file_paths`.
    pub fn unit_tests_referenced_by_main_files(&mut self, main_file_paths: &[String]) -> Vec<SymbolOccurrence> {
        let occurrences = self.index().unit_tests_referenced_by_main_files(main_file_paths);
        self.retain_up_to_date(occurrences)
    }

    /// Main files that (transitively) include `uri` and themselves have an
    /// up-to-date unit.
    pub fn main_files_containing_file(&mut self, uri: &DocumentUri, cross_language: bool) -> Vec<DocumentUri> {
        let index = self.index();
        index
            .main_files_containing_file(&uri.pseudo_path(), cross_language)
            .into_iter()
            .map(DocumentUri::from_file_path)
            .filter(|main_file| self.checker.index_has_up_to_date_unit(main_file, None, index))
            .collect()
    }

    /// Whether a unit was indexed for `uri` after its last modification.
    ///
    /// For a header without a unit of its own, pass the including
    /// `main_file`; its newest unit is compared against the header's mtime.
    pub fn has_up_to_date_unit(&mut self, uri: &DocumentUri, main_file: Option<&DocumentUri>) -> bool {
        let index = self.index();
        self.checker.index_has_up_to_date_unit(uri, main_file, index)
    }

    /// Whether the editor holds unsaved edits for `uri`. Only valid under
    /// [`IndexCheckLevel::InMemoryModifiedFiles`].
    pub fn file_has_in_memory_modifications(&mut self, uri: &DocumentUri) -> bool {
        self.checker.file_has_in_memory_modifications(uri)
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Definition occurrences of `usr` if there are any, declarations
    /// otherwise. The two sets are never mixed.
    pub fn definition_or_declaration_occurrences(&mut self, usr: &str) -> Vec<SymbolOccurrence> {
        let definitions = self.occurrences_of_usr(usr, SymbolRoles::DEFINITION);
        if !definitions.is_empty() {
            return definitions;
        }
        self.occurrences_of_usr(usr, SymbolRoles::DECLARATION)
    }

    /// The occurrence treated as the definition of `usr`.
    ///
    /// Ambiguous definitions are resolved by the occurrence total order (path,
    /// position, roles, symbol), so the answer is the same on every call for
    /// the same on-disk state.
    pub fn primary_definition_or_declaration_occurrence(&mut self, usr: &str) -> Option<SymbolOccurrence> {
        let primary = self.definition_or_declaration_occurrences(usr).into_iter().min();
        if primary.is_none() {
            self.diagnostics
                .error(&format!("Failed to find definition of {usr} in index"));
        }
        primary
    }
}
