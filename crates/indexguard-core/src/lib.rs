//! indexguard core library — freshness filtering in front of a persistent
//! symbol index.
//!
//! A persistent index lags behind live edits. This crate wraps the raw index
//! so that code-intelligence queries (definitions, references, workspace
//! symbols, container names, test discovery) only surface occurrences whose
//! source file still matches what is on disk or in an open editor buffer.
//!
//! The entry point is [`query::unchecked::UncheckedIndex`], a capability gate
//! that hands out short-lived [`query::checked::CheckedIndex`] facades bound
//! to an [`query::check_level::IndexCheckLevel`].

pub mod config;
pub mod errors;
pub mod index;
pub mod models;
pub mod oracle;
pub mod query;
pub mod store;

pub use config::{CheckLevelSetting, IndexGuardConfig};
pub use errors::{IndexGuardError, IndexGuardResult};
pub use index::PersistentIndex;
pub use models::{
    DocumentUri, PatternOptions, Symbol, SymbolKind, SymbolLocation, SymbolOccurrence,
    SymbolRelation, SymbolRoles,
};
pub use oracle::diagnostics::{Diagnostic, Diagnostics, RecordingDiagnostics, Severity, TracingDiagnostics};
pub use oracle::documents::InMemoryDocumentManager;
pub use oracle::filesystem::{FileStat, FileSystem, RealFileSystem};
pub use query::check_level::IndexCheckLevel;
pub use query::checked::CheckedIndex;
pub use query::out_of_date::{IndexOutOfDateChecker, ModificationTime};
pub use query::unchecked::UncheckedIndex;
pub use store::database::SqliteIndex;
