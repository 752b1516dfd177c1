//! External collaborators the checker consults: the filesystem, the editor's
//! document manager, and the diagnostics sink.

pub mod diagnostics;
pub mod documents;
pub mod filesystem;
