//! The raw, unfiltered query surface of a persistent symbol index.
//!
//! Implementations own storage and on-disk format; this crate only reads.
//! Results come back in index order, and the checked layer never reorders
//! them. [`crate::store::database::SqliteIndex`] is the bundled implementation.

use std::ops::ControlFlow;
use std::time::SystemTime;

use crate::models::{PatternOptions, Symbol, SymbolOccurrence, SymbolRoles};

/// Visitor over occurrences. `ControlFlow::Break` stops the enumeration.
pub type OccurrenceVisitor<'v> = dyn FnMut(&SymbolOccurrence) -> ControlFlow<()> + 'v;

pub trait PersistentIndex: Send + Sync {
    /// Visit every occurrence of `usr` whose roles intersect `roles`.
    ///
    /// Returns `Break` if the visitor stopped the enumeration.
    fn for_each_symbol_occurrence(
        &self,
        usr: &str,
        roles: SymbolRoles,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()>;

    fn occurrences_of_usr(&self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence> {
        let mut result = Vec::new();
        let _ = self.for_each_symbol_occurrence(usr, roles, &mut |occurrence| {
            result.push(occurrence.clone());
            ControlFlow::Continue(())
        });
        result
    }

    /// Occurrences that carry a relation to `usr` with any of `roles`.
    fn occurrences_related_to_usr(&self, usr: &str, roles: SymbolRoles) -> Vec<SymbolOccurrence>;

    /// Visit canonical occurrences whose symbol name matches `pattern`.
    fn for_each_canonical_symbol_occurrence_containing(
        &self,
        pattern: &str,
        options: PatternOptions,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()>;

    /// Visit canonical occurrences whose symbol name is exactly `name`.
    fn for_each_canonical_symbol_occurrence_by_name(
        &self,
        name: &str,
        body: &mut OccurrenceVisitor<'_>,
    ) -> ControlFlow<()>;

    fn symbols_in_file_path(&self, path: &str) -> Vec<Symbol>;

    fn unit_tests(&self) -> Vec<SymbolOccurrence>;

    /// Unit tests declared in units whose main file is one of `main_file_paths`.
    fn unit_tests_referenced_by_main_files(&self, main_file_paths: &[String]) -> Vec<SymbolOccurrence>;

    /// Main files whose compilation (transitively) includes `path`. With
    /// `cross_language`, files that pull `path` in through a module count too.
    fn main_files_containing_file(&self, path: &str, cross_language: bool) -> Vec<String>;

    /// Timestamp of the newest build unit recorded for the main file `file_path`.
    fn date_of_latest_unit_for(&self, file_path: &str) -> Option<SystemTime>;

    /// Block until the index has caught up with unit files already on disk.
    fn poll_for_unit_changes_and_wait(&self);
}
