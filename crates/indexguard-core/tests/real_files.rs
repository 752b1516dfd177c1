//! Freshness checks against files on disk, with mtimes pinned by `filetime`.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::*;
use filetime::FileTime;
use indexguard_core::{
    DocumentUri, IndexCheckLevel, IndexOutOfDateChecker, ModificationTime, RealFileSystem,
    RecordingDiagnostics, SymbolKind, SymbolLocation, SymbolRoles, UncheckedIndex,
};

const T1: u64 = 1_600_000_000;
const T2: u64 = 1_650_000_000;
const T3: u64 = 1_700_000_000;

fn write_with_mtime(path: &Path, secs: u64) {
    fs::write(path, "func f() {}\n").unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs as i64, 0)).unwrap();
}

fn checker_for(level: IndexCheckLevel) -> IndexOutOfDateChecker {
    IndexOutOfDateChecker::new(
        level,
        Arc::new(RealFileSystem),
        Arc::new(RecordingDiagnostics::new()),
    )
}

fn location(path: &Path, indexed_at: u64) -> SymbolLocation {
    SymbolLocation::new(path.to_string_lossy(), 1, 1, at(indexed_at))
}

#[test]
fn deleted_file_is_out_of_date() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.swift");
    write_with_mtime(&path, T2);

    let mut before = checker_for(IndexCheckLevel::DeletedFiles);
    assert!(before.is_up_to_date(&location(&path, T1)));

    fs::remove_file(&path).unwrap();
    // The earlier checker keeps its answer; a new one sees the deletion.
    assert!(before.is_up_to_date(&location(&path, T1)));
    let mut after = checker_for(IndexCheckLevel::DeletedFiles);
    assert!(!after.is_up_to_date(&location(&path, T1)));
    assert_eq!(
        after.modification_time(&DocumentUri::from_file_path(&path)).unwrap(),
        ModificationTime::FileDoesNotExist
    );
}

#[test]
fn modified_file_compares_against_index_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.swift");
    write_with_mtime(&path, T2);

    let mut checker = checker_for(IndexCheckLevel::ModifiedFiles);
    assert!(!checker.is_up_to_date(&location(&path, T1)));
    assert!(checker.is_up_to_date(&location(&path, T2)));
    assert!(checker.is_up_to_date(&location(&path, T3)));

    // Deleted-files level accepts the stale occurrence.
    let mut lenient = checker_for(IndexCheckLevel::DeletedFiles);
    assert!(lenient.is_up_to_date(&location(&path, T1)));
}

#[cfg(unix)]
#[test]
fn symlink_chain_uses_newest_mtime() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("real.swift");
    let middle = dir.path().join("middle.swift");
    let link = dir.path().join("link.swift");
    write_with_mtime(&target, T1);
    symlink("real.swift", &middle).unwrap();
    symlink(&middle, &link).unwrap();
    filetime::set_symlink_file_times(
        &middle,
        FileTime::from_unix_time(T2 as i64, 0),
        FileTime::from_unix_time(T2 as i64, 0),
    )
    .unwrap();
    filetime::set_symlink_file_times(
        &link,
        FileTime::from_unix_time(T1 as i64, 0),
        FileTime::from_unix_time(T1 as i64, 0),
    )
    .unwrap();

    let mut checker = checker_for(IndexCheckLevel::ModifiedFiles);
    assert_eq!(
        checker.modification_time(&DocumentUri::from_file_path(&link)).unwrap(),
        ModificationTime::Date(at(T2))
    );
    assert!(!checker.is_up_to_date(&location(&link, T1)));
    assert!(checker.is_up_to_date(&location(&link, T3)));
}

#[test]
fn checked_index_over_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let fresh = root.join("fresh.swift");
    let stale = root.join("stale.swift");
    write_with_mtime(&fresh, T1);
    write_with_mtime(&stale, T3);

    let f = symbol("s:f", "f", SymbolKind::Function);
    let fresh_path = fresh.to_string_lossy().into_owned();
    let stale_path = stale.to_string_lossy().into_owned();
    let mut index = MemoryIndex::with_occurrences([
        occurrence(&f, SymbolRoles::DEFINITION, &stale_path, 1, at(T2), vec![]),
        occurrence(&f, SymbolRoles::DEFINITION, &fresh_path, 2, at(T2), vec![]),
    ]);
    index.add_unit(fresh_path.clone(), at(T2)).add_unit(stale_path.clone(), at(T2));

    let gate = UncheckedIndex::new(Arc::new(index));
    gate.with_checked(IndexCheckLevel::ModifiedFiles, |checked| {
        let primary = checked.primary_definition_or_declaration_occurrence("s:f").unwrap();
        assert_eq!(primary.location.path, fresh_path);
        assert_eq!(checked.symbols_in_file_path(&fresh_path).len(), 1);
        assert!(checked.symbols_in_file_path(&stale_path).is_empty());
    });
}
