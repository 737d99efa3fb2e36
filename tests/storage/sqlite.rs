use pcm5_pairing_repair::codec::parse;
use pcm5_pairing_repair::storage::SqliteStore;
use pcm5_pairing_repair::{
    exit_status, run, DeviceListStore, ErrorKind, FileCopyBackup, Mode, StorageSchema, Target,
};

use super::{device_list, phone, read_entry, reporter, seed_database};

#[test]
fn fix_on_disk_keeps_original_in_backup() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("persistence.sqlite");
    let original = device_list(&[
        phone("Pixel", "NATIVE_SELECTED"),
        phone("Galaxy", "DISCLAIMER_ACCEPTED"),
        phone("Fairphone", "NATIVE_SELECTED"),
    ]);
    seed_database(&db, Some(&original));

    let mut store = SqliteStore::open(&db, StorageSchema::default()).unwrap();
    let backup = FileCopyBackup::new(&db);
    let mut report = reporter();
    let outcome = run(
        &mut store,
        &backup,
        &mut report,
        &Target::default(),
        Mode::Fix { backup: true },
    )
    .unwrap();
    drop(store);

    assert_eq!(outcome.fixed, 2);
    let backup_path = outcome.backup.expect("backup path");
    assert!(backup_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("persistence.sqlite.backup_"));
    // The backup was taken before the write.
    assert_eq!(read_entry(&backup_path), original);

    let written = read_entry(&db);
    assert_eq!(written.len(), original.len() + 8);
    let summary = parse(&written).unwrap();
    assert!(summary.checksum_valid());
    assert!(summary.occurrences().is_empty());
}

#[test]
fn dry_run_leaves_database_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("persistence.sqlite");
    let original = device_list(&[phone("Pixel", "NATIVE_SELECTED")]);
    seed_database(&db, Some(&original));

    let mut store = SqliteStore::open(&db, StorageSchema::default()).unwrap();
    let backup = FileCopyBackup::new(&db);
    let mut report = reporter();
    let outcome = run(&mut store, &backup, &mut report, &Target::default(), Mode::DryRun).unwrap();
    drop(store);

    assert_eq!(outcome.issues, 1);
    assert_eq!(read_entry(&db), original);
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1, "no backup file in dry-run");
}

#[test]
fn absent_device_list_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("persistence.sqlite");
    seed_database(&db, None);

    let mut store = SqliteStore::open(&db, StorageSchema::default()).unwrap();
    let backup = FileCopyBackup::new(&db);
    let mut report = reporter();
    let result = run(
        &mut store,
        &backup,
        &mut report,
        &Target::default(),
        Mode::Fix { backup: true },
    );
    assert_eq!(exit_status(&result), 0);
    assert_eq!(result.unwrap().fixed, 0);
}

#[test]
fn resolves_partition_among_others() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("persistence.sqlite");
    seed_database(&db, Some(&device_list(&[])));

    let store = SqliteStore::open(&db, StorageSchema::default()).unwrap();
    assert_eq!(store.resolve_partition("1008").unwrap(), 7);
    assert_eq!(store.resolve_partition("1009").unwrap(), 8);
    assert_eq!(
        store.resolve_partition("2000").unwrap_err().kind(),
        ErrorKind::PartitionNotFound
    );
}

#[test]
fn missing_database_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteStore::open(dir.path().join("nope.sqlite"), StorageSchema::default())
        .err()
        .expect("open should fail");
    assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
}
