//! Container-name resolution for checked occurrences.
//!
//! In
//! ```swift
//! struct Bar {
//!   struct Foo {
//!     func test() {}
//!   }
//! }
//! ```
//! the container names of `test` are `["Bar", "Foo"]`.

use std::ops::ControlFlow;

use crate::models::{Symbol, SymbolKind, SymbolOccurrence, SymbolRelation, SymbolRoles};
use crate::query::checked::CheckedIndex;
use crate::query::guards::MAX_CONTAINER_DEPTH;

impl CheckedIndex<'_> {
    /// The names of all lexical containers of `occurrence`, outermost first.
    /// A top-level symbol has none.
    pub fn container_names(&mut self, occurrence: &SymbolOccurrence) -> Vec<String> {
        // An accessor lives in the container of the property it accesses.
        let accessor_of = sorted_relations(occurrence, SymbolRoles::ACCESSOR_OF);
        if let Some(variable) = accessor_of.first() {
            if accessor_of.len() > 1 {
                self.diagnostics
                    .fault("Expected an occurrence to be an accessor of at most one symbol, not multiple");
            }
            let accessor_usr = occurrence.symbol.usr.clone();
            if self.resolving_accessors.len() + self.resolving_containers.len() >= MAX_CONTAINER_DEPTH
                || !self.resolving_accessors.insert(accessor_usr.clone())
            {
                self.diagnostics.fault(&format!(
                    "Accessor chain of {accessor_usr} does not terminate; using its own parents"
                ));
            } else {
                let variable_definition = self.primary_definition_or_declaration_occurrence(&variable.symbol.usr);
                let names = variable_definition.map(|definition| self.container_names(&definition));
                self.resolving_accessors.remove(&accessor_usr);
                if let Some(names) = names {
                    return names;
                }
            }
        }

        let child_of = sorted_relations(occurrence, SymbolRoles::CHILD_OF);
        if child_of.len() > 1 {
            self.diagnostics
                .fault("Expected an occurrence to be a child of at most one symbol, not multiple");
        }
        let Some(container) = child_of
            .into_iter()
            .find(|relation| relation.symbol.kind.is_lexical_container())
        else {
            return Vec::new();
        };
        let container_usr = container.symbol.usr.clone();
        if let Some(cached) = self.container_names_cache.get(&container_usr) {
            return cached.clone();
        }
        if self.resolving_accessors.len() + self.resolving_containers.len() >= MAX_CONTAINER_DEPTH
            || !self.resolving_containers.insert(container_usr.clone())
        {
            self.diagnostics.fault(&format!(
                "Container chain of {} does not terminate; stopping at {}",
                occurrence.symbol.usr, container.symbol.name
            ));
            return vec![container.symbol.name.clone()];
        }

        let names = self.resolve_container_names(container.symbol.clone());
        self.resolving_containers.remove(&container_usr);
        self.container_names_cache.insert(container_usr, names.clone());
        names
    }

    fn resolve_container_names(&mut self, container: Symbol) -> Vec<String> {
        // An extension is not a namable scope; name the type it extends.
        let container = if container.kind == SymbolKind::Extension {
            self.occurrences_related_to_usr(&container.usr, SymbolRoles::EXTENDED_BY)
                .into_iter()
                .next()
                .map(|extended| extended.symbol)
                .unwrap_or(container)
        } else {
            container
        };

        // Any definition or declaration will do: all of them share the same
        // parents and only the name is needed. For something like a namespace
        // declared in thousands of files this avoids a full scan.
        let mut container_definition = None;
        let _ = self.for_each_symbol_occurrence(
            &container.usr,
            SymbolRoles::DEFINITION | SymbolRoles::DECLARATION,
            |occurrence| {
                container_definition = Some(occurrence.clone());
                ControlFlow::Break(())
            },
        );

        let mut names = match container_definition {
            Some(definition) => self.container_names(&definition),
            None => Vec::new(),
        };
        names.push(container.name);
        names
    }
}

/// Relations of `occurrence` carrying any of `roles`, in the relation total
/// order so that "first" is deterministic.
fn sorted_relations<'o>(occurrence: &'o SymbolOccurrence, roles: SymbolRoles) -> Vec<&'o SymbolRelation> {
    let mut relations: Vec<&SymbolRelation> = occurrence.relations_with(roles).collect();
    relations.sort();
    relations
}
