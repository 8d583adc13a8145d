//! Reconciliation scenarios between two participants.

use std::sync::Arc;
use synctool_engine::{
    Change, DiffSource, Directory, Error, FilePath, FileReference, FileSystemDiff, MetadataEquality,
    SyncAction, SyncConflict, SyncParticipant, SynchronizationResult, Synchronizer,
};

const T1: u64 = 1_700_000_000_000;
const T2: u64 = T1 + 60_000;
const T3: u64 = T2 + 60_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn file(p: &str, time: u64) -> FileReference {
    FileReference::new(FilePath::parse(p).unwrap(), time, 42)
}

fn diff(name: &str, files: Vec<FileReference>, changes: Vec<Change>) -> FileSystemDiff {
    FileSystemDiff::new(name, Directory::from_files(files).unwrap(), changes)
}

fn sync(left: &FileSystemDiff, right: &FileSystemDiff) -> Result<SynchronizationResult, Error> {
    init_tracing();
    Synchronizer::new(Arc::new(MetadataEquality)).synchronize(left, right)
}

#[test]
fn added_file_already_on_other_side() {
    let left = diff("left", vec![file("/file2", T1)], vec![Change::added(file("/file2", T1))]);
    let right = diff("right", vec![file("/file2", T1)], vec![]);

    let result = sync(&left, &right).unwrap();
    assert!(result.actions.is_empty());
    assert!(result.conflicts.is_empty());
}

#[test]
fn added_file_with_same_timestamp_is_noop() {
    let left = diff("left", vec![file("/file1", T1)], vec![Change::added(file("/file1", T1))]);
    let right = diff("right", vec![file("/FILE1", T1)], vec![]);

    assert!(sync(&left, &right).unwrap().is_empty());
}

#[test]
fn deleted_file_already_absent() {
    let left = diff("left", vec![], vec![Change::deleted(file("/file1", T1))]);
    let right = diff("right", vec![], vec![]);

    assert!(sync(&left, &right).unwrap().is_empty());
}

#[test]
fn modification_against_deletion_conflicts() {
    let left = diff(
        "left",
        vec![file("/file1", T2)],
        vec![Change::modified(file("/file1", T1), file("/file1", T2)).unwrap()],
    );
    let right = diff("right", vec![], vec![Change::deleted(file("/file1", T1))]);

    let result = sync(&left, &right).unwrap();
    assert!(result.actions.is_empty());
    assert_eq!(
        result.conflicts,
        vec![SyncConflict::modification_deletion(
            file("/file1", T2),
            file("/file1", T1)
        )]
    );
}

#[test]
fn chained_modifications_replace_older_side() {
    let left = diff(
        "left",
        vec![file("/file1", T2)],
        vec![Change::modified(file("/file1", T1), file("/file1", T2)).unwrap()],
    );
    let right = diff(
        "right",
        vec![file("/file1", T3)],
        vec![Change::modified(file("/file1", T2), file("/file1", T3)).unwrap()],
    );

    let result = sync(&left, &right).unwrap();
    assert_eq!(
        result.actions,
        vec![SyncAction::replace(
            SyncParticipant::Left,
            file("/file1", T2),
            file("/file1", T3)
        )]
    );
    assert!(result.conflicts.is_empty());
}

#[test]
fn added_and_deleted_is_fatal_in_both_orders() {
    let added = diff("left", vec![file("/file1", T1)], vec![Change::added(file("/file1", T1))]);
    let deleted = diff("right", vec![], vec![Change::deleted(file("/file1", T2))]);

    for (left, right) in [(&added, &deleted), (&deleted, &added)] {
        let err = sync(left, right).unwrap_err();
        assert!(matches!(err, Error::AddedAndDeleted(_)));
        assert!(err.is_invariant_violation());
    }
}

#[test]
fn mixed_pass_is_ordered_by_path() {
    let left = diff(
        "left",
        vec![file("/b.txt", T2), file("/c.txt", T1)],
        vec![
            Change::modified(file("/b.txt", T1), file("/b.txt", T2)).unwrap(),
            Change::added(file("/c.txt", T1)),
        ],
    );
    let right = diff(
        "right",
        vec![file("/b.txt", T1)],
        vec![Change::deleted(file("/a.txt", T1))],
    );

    let result = sync(&left, &right).unwrap();
    let paths: Vec<_> = result.actions.iter().map(|a| a.path().to_string()).collect();
    assert_eq!(paths, vec!["/b.txt", "/c.txt"]);
    assert!(result
        .actions
        .iter()
        .all(|a| a.target() == SyncParticipant::Right));
}

#[test]
fn applying_result_converges_both_trees() {
    let base = vec![file("/a", T1), file("/b", T1), file("/docs/c", T1)];

    let left_tree = vec![file("/a", T2), file("/b", T1), file("/docs/new", T1)];
    let left = diff(
        "left",
        left_tree.clone(),
        vec![
            Change::modified(base[0].clone(), file("/a", T2)).unwrap(),
            Change::deleted(base[2].clone()),
            Change::added(file("/docs/new", T1)),
        ],
    );
    let right_tree = vec![file("/a", T1), file("/b", T3), file("/docs/c", T1)];
    let right = diff(
        "right",
        right_tree,
        vec![Change::modified(base[1].clone(), file("/b", T3)).unwrap()],
    );

    let result = sync(&left, &right).unwrap();
    assert!(!result.has_conflicts());

    let eq = MetadataEquality;
    let new_left = result
        .apply_to(left.root_directory(), SyncParticipant::Left, &eq)
        .unwrap();
    let new_right = result
        .apply_to(right.root_directory(), SyncParticipant::Right, &eq)
        .unwrap();

    assert_eq!(new_left, new_right);
    assert_eq!(new_left.file_count(), 3);
    assert!(new_left.get_directory(&FilePath::parse("/docs").unwrap()).is_some());
}

#[test]
fn stale_tree_is_not_applicable() {
    let left = diff(
        "left",
        vec![file("/a", T2)],
        vec![Change::modified(file("/a", T1), file("/a", T2)).unwrap()],
    );
    let right = diff("right", vec![file("/a", T1)], vec![]);
    let result = sync(&left, &right).unwrap();

    // Right changed again after the diff was taken
    let moved_on = Directory::from_files(vec![file("/a", T3)]).unwrap();
    let err = result
        .apply_to(&moved_on, SyncParticipant::Right, &MetadataEquality)
        .unwrap_err();
    assert_eq!(err, Error::FileVersionMismatch(FilePath::parse("/a").unwrap()));
    assert!(err.is_not_applicable());
}
