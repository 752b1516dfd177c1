//! Shared typed models for symbols, occurrences, and document identity.
//!
//! Occurrences are read-only snapshots handed out by a
//! [`crate::index::PersistentIndex`]. Every model here carries a total order
//! derived field by field, which is what makes "primary occurrence" selection
//! deterministic across calls and process runs.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{IndexGuardError, IndexGuardResult};

// ---------------------------------------------------------------------------
// SymbolKind
// ---------------------------------------------------------------------------

/// The kind of a symbol as recorded by the indexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Unknown,
    Module,
    Namespace,
    NamespaceAlias,
    Macro,
    Enum,
    Struct,
    Class,
    Protocol,
    Extension,
    Union,
    Typealias,
    Function,
    Variable,
    Field,
    EnumConstant,
    InstanceMethod,
    ClassMethod,
    StaticMethod,
    InstanceProperty,
    ClassProperty,
    StaticProperty,
    Constructor,
    Destructor,
    ConversionFunction,
    Parameter,
    Using,
    Concept,
    CommentTag,
}

impl SymbolKind {
    /// Stable storage name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Unknown => "unknown",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
            SymbolKind::NamespaceAlias => "namespace-alias",
            SymbolKind::Macro => "macro",
            SymbolKind::Enum => "enum",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::Protocol => "protocol",
            SymbolKind::Extension => "extension",
            SymbolKind::Union => "union",
            SymbolKind::Typealias => "typealias",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Field => "field",
            SymbolKind::EnumConstant => "enum-constant",
            SymbolKind::InstanceMethod => "instance-method",
            SymbolKind::ClassMethod => "class-method",
            SymbolKind::StaticMethod => "static-method",
            SymbolKind::InstanceProperty => "instance-property",
            SymbolKind::ClassProperty => "class-property",
            SymbolKind::StaticProperty => "static-property",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Destructor => "destructor",
            SymbolKind::ConversionFunction => "conversion-function",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Using => "using",
            SymbolKind::Concept => "concept",
            SymbolKind::CommentTag => "comment-tag",
        }
    }

    /// Parse a storage name. Names this version does not know map to
    /// [`SymbolKind::Unknown`] so that a newer indexer never breaks reads.
    pub fn from_name(name: &str) -> Self {
        match name {
            "module" => SymbolKind::Module,
            "namespace" => SymbolKind::Namespace,
            "namespace-alias" => SymbolKind::NamespaceAlias,
            "macro" => SymbolKind::Macro,
            "enum" => SymbolKind::Enum,
            "struct" => SymbolKind::Struct,
            "class" => SymbolKind::Class,
            "protocol" => SymbolKind::Protocol,
            "extension" => SymbolKind::Extension,
            "union" => SymbolKind::Union,
            "typealias" => SymbolKind::Typealias,
            "function" => SymbolKind::Function,
            "variable" => SymbolKind::Variable,
            "field" => SymbolKind::Field,
            "enum-constant" => SymbolKind::EnumConstant,
            "instance-method" => SymbolKind::InstanceMethod,
            "class-method" => SymbolKind::ClassMethod,
            "static-method" => SymbolKind::StaticMethod,
            "instance-property" => SymbolKind::InstanceProperty,
            "class-property" => SymbolKind::ClassProperty,
            "static-property" => SymbolKind::StaticProperty,
            "constructor" => SymbolKind::Constructor,
            "destructor" => SymbolKind::Destructor,
            "conversion-function" => SymbolKind::ConversionFunction,
            "parameter" => SymbolKind::Parameter,
            "using" => SymbolKind::Using,
            "concept" => SymbolKind::Concept,
            "comment-tag" => SymbolKind::CommentTag,
            _ => SymbolKind::Unknown,
        }
    }

    /// Whether a symbol of this kind can lexically contain named children and
    /// therefore contributes a segment to a container-name chain.
    ///
    /// Kept as an exhaustive match: a new kind has to pick a side here.
    pub fn is_lexical_container(self) -> bool {
        match self {
            SymbolKind::Module
            | SymbolKind::Namespace
            | SymbolKind::Enum
            | SymbolKind::Struct
            | SymbolKind::Class
            | SymbolKind::Protocol
            | SymbolKind::Extension
            | SymbolKind::Union => true,
            SymbolKind::Unknown
            | SymbolKind::NamespaceAlias
            | SymbolKind::Macro
            | SymbolKind::Typealias
            | SymbolKind::Function
            | SymbolKind::Variable
            | SymbolKind::Field
            | SymbolKind::EnumConstant
            | SymbolKind::InstanceMethod
            | SymbolKind::ClassMethod
            | SymbolKind::StaticMethod
            | SymbolKind::InstanceProperty
            | SymbolKind::ClassProperty
            | SymbolKind::StaticProperty
            | SymbolKind::Constructor
            | SymbolKind::Destructor
            | SymbolKind::ConversionFunction
            | SymbolKind::Parameter
            | SymbolKind::Using
            | SymbolKind::Concept
            | SymbolKind::CommentTag => false,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SymbolRoles
// ---------------------------------------------------------------------------

bitflags! {
    /// How a symbol is used at an occurrence, or how a relation links two
    /// symbols. Persisted as raw bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct SymbolRoles: u64 {
        const DECLARATION = 1 << 0;
        const DEFINITION = 1 << 1;
        const REFERENCE = 1 << 2;
        const READ = 1 << 3;
        const WRITE = 1 << 4;
        const CALL = 1 << 5;
        const DYNAMIC = 1 << 6;
        const ADDRESS_OF = 1 << 7;
        const IMPLICIT = 1 << 8;

        const CHILD_OF = 1 << 9;
        const BASE_OF = 1 << 10;
        const OVERRIDE_OF = 1 << 11;
        const RECEIVED_BY = 1 << 12;
        const CALLED_BY = 1 << 13;
        const EXTENDED_BY = 1 << 14;
        const ACCESSOR_OF = 1 << 15;
        const CONTAINED_BY = 1 << 16;
        const IB_TYPE_OF = 1 << 17;
        const SPECIALIZATION_OF = 1 << 18;

        const CANONICAL = 1 << 19;
    }
}

// ---------------------------------------------------------------------------
// Symbol / relation / location / occurrence
// ---------------------------------------------------------------------------

/// A logical symbol. `usr` is unique across the whole index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub usr: String,
    pub name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(usr: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            usr: usr.into(),
            name: name.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolRelation {
    pub symbol: Symbol,
    pub roles: SymbolRoles,
}

impl SymbolRelation {
    pub fn new(roles: SymbolRoles, symbol: Symbol) -> Self {
        Self { symbol, roles }
    }
}

/// Where an occurrence was recorded, and when the indexer captured it.
///
/// Ordered by path, then position, then the system flag and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolLocation {
    pub path: String,
    pub line: u32,
    pub utf8_column: u32,
    pub is_system: bool,
    pub timestamp: SystemTime,
}

impl SymbolLocation {
    pub fn new(path: impl Into<String>, line: u32, utf8_column: u32, timestamp: SystemTime) -> Self {
        Self {
            path: path.into(),
            line,
            utf8_column,
            is_system: false,
            timestamp,
        }
    }

    pub fn uri(&self) -> DocumentUri {
        DocumentUri::from_file_path(&self.path)
    }
}

/// A single use of a symbol in source, as captured by the indexer.
///
/// Field order defines the total order: location first, then role bits, then
/// symbol identity, then relations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolOccurrence {
    pub location: SymbolLocation,
    pub roles: SymbolRoles,
    pub symbol: Symbol,
    pub relations: Vec<SymbolRelation>,
}

impl SymbolOccurrence {
    pub fn new(
        symbol: Symbol,
        roles: SymbolRoles,
        location: SymbolLocation,
        relations: Vec<SymbolRelation>,
    ) -> Self {
        Self {
            location,
            roles,
            symbol,
            relations,
        }
    }

    /// Relations carrying any of `roles`, in recorded order.
    pub fn relations_with(&self, roles: SymbolRoles) -> impl Iterator<Item = &SymbolRelation> + '_ {
        self.relations.iter().filter(move |r| r.roles.intersects(roles))
    }
}

// ---------------------------------------------------------------------------
// Pattern options
// ---------------------------------------------------------------------------

/// Flags for canonical-occurrence pattern search (workspace symbols).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternOptions {
    pub anchor_start: bool,
    pub anchor_end: bool,
    pub subsequence: bool,
    pub ignore_case: bool,
}

// ---------------------------------------------------------------------------
// DocumentUri
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum UriRepr {
    File(PathBuf),
    Other(Url),
}

/// Normalized identity of a document.
///
/// File documents are keyed by their lexically normalized path (no `.`
/// segments, no repeated or trailing separators); symlinks are not resolved.
/// Anything else (`untitled:` buffers and the like) keeps its URL and never
/// exists on disk.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentUri(UriRepr);

impl DocumentUri {
    pub fn from_file_path(path: impl AsRef<Path>) -> Self {
        let normalized: PathBuf = path
            .as_ref()
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        Self(UriRepr::File(normalized))
    }

    /// Parse a URI string as sent by an editor.
    pub fn parse(uri: &str) -> IndexGuardResult<Self> {
        let url = Url::parse(uri).map_err(|e| IndexGuardError::InvalidUri(format!("{uri}: {e}")))?;
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|()| IndexGuardError::InvalidUri(format!("{uri}: not a local file path")))?;
            return Ok(Self::from_file_path(path));
        }
        Ok(Self(UriRepr::Other(url)))
    }

    /// The on-disk path, if this document is a file.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.0 {
            UriRepr::File(path) => Some(path),
            UriRepr::Other(_) => None,
        }
    }

    /// A path-like string usable as an index key even for non-file URIs.
    pub fn pseudo_path(&self) -> String {
        match &self.0 {
            UriRepr::File(path) => path.to_string_lossy().into_owned(),
            UriRepr::Other(url) => url.to_string(),
        }
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            UriRepr::File(path) => match Url::from_file_path(path) {
                Ok(url) => write!(f, "{url}"),
                Err(()) => write!(f, "{}", path.display()),
            },
            UriRepr::Other(url) => write!(f, "{url}"),
        }
    }
}
