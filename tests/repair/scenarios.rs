use pcm5_pairing_repair::codec::checksum::seal;
use pcm5_pairing_repair::codec::{
    parse, DeviceRecord, DISCLAIMER_ACCEPTED_SENTINEL, NATIVE_SELECTED_SENTINEL, UNKNOWN_NAME,
};
use pcm5_pairing_repair::{repair, ErrorKind};

use super::{assert_sealed, blob_of, phone, stored_crc, ACCEPTED, NATIVE};

#[test]
fn empty_list_is_left_alone() {
    let blob = blob_of(&[]);
    let summary = parse(&blob).unwrap();
    assert!(summary.checksum_valid());
    assert!(summary.occurrences().is_empty());

    let repaired = repair(&blob).unwrap();
    assert_eq!(repaired.blob, blob);
    assert!(repaired.occurrences.is_empty());
}

#[test]
fn single_healthy_device_is_left_alone() {
    let blob = blob_of(&[phone("Phone", ACCEPTED)]);
    assert!(parse(&blob).unwrap().occurrences().is_empty());
    assert_eq!(repair(&blob).unwrap().blob, blob);
}

#[test]
fn single_corrupted_device_is_rewritten() {
    let blob = blob_of(&[phone("Phone", NATIVE)]);
    let summary = parse(&blob).unwrap();
    let state_at = summary.devices[0].accept_state_offset;
    assert_eq!(summary.occurrences()[0].device_name, "Phone");

    let repaired = repair(&blob).unwrap();
    assert_eq!(repaired.blob.len(), blob.len() + 4);
    assert_eq!(repaired.size_delta(), 4);
    assert_eq!(
        &repaired.blob[state_at..state_at + DISCLAIMER_ACCEPTED_SENTINEL.len()],
        &DISCLAIMER_ACCEPTED_SENTINEL[..]
    );
    assert_eq!(&repaired.blob[8..state_at], &blob[8..state_at]);
    assert_eq!(
        &repaired.blob[state_at + 21..],
        &blob[state_at + NATIVE_SELECTED_SENTINEL.len()..]
    );
    assert_sealed(&repaired.blob);
    assert_eq!(u64::from(repaired.new_checksum), stored_crc(&repaired.blob));

    let reparsed = parse(&repaired.blob).unwrap();
    assert!(reparsed.defect.is_none());
    assert_eq!(reparsed.devices[0].accept_state, ACCEPTED.as_bytes());
}

#[test]
fn mixed_list_rewrites_only_affected_devices() {
    let blob = blob_of(&[
        phone("Pixel", NATIVE),
        phone("Galaxy", ACCEPTED),
        phone("OnePlus", NATIVE),
    ]);
    let before = parse(&blob).unwrap();
    let healthy = &before.devices[1];
    let healthy_bytes = blob[healthy.offset..healthy.end].to_vec();

    let repaired = repair(&blob).unwrap();
    assert_eq!(repaired.blob.len(), blob.len() + 8);
    let names: Vec<_> = repaired
        .occurrences
        .iter()
        .map(|o| o.device_name.as_str())
        .collect();
    assert_eq!(names, ["Pixel", "OnePlus"]);

    let after = parse(&repaired.blob).unwrap();
    assert!(after.defect.is_none());
    let states: Vec<_> = after.devices.iter().map(|d| d.accept_state).collect();
    assert_eq!(states, [ACCEPTED.as_bytes(); 3]);
    // The healthy record moved by one rewrite but is otherwise untouched.
    let moved = &after.devices[1];
    assert_eq!(moved.offset, healthy.offset + 4);
    assert_eq!(&repaired.blob[moved.offset..moved.end], &healthy_bytes[..]);
    assert_sealed(&repaired.blob);
}

#[test]
fn unnamed_device_is_reported_as_unknown() {
    let blob = blob_of(&[DeviceRecord::new("anon-0001", NATIVE)]);
    let repaired = repair(&blob).unwrap();
    assert_eq!(repaired.occurrences.len(), 1);
    assert_eq!(repaired.occurrences[0].device_name, UNKNOWN_NAME);
    assert_sealed(&repaired.blob);
}

#[test]
fn corrupted_checksum_is_healed() {
    let mut blob = blob_of(&[phone("Phone", NATIVE)]);
    blob[7] ^= 0xa5;
    assert!(!parse(&blob).unwrap().checksum_valid());

    let repaired = repair(&blob).unwrap();
    assert_ne!(u64::from(repaired.new_checksum), repaired.old_checksum);
    assert_sealed(&repaired.blob);
    assert!(parse(&repaired.blob).unwrap().checksum_valid());
}

#[test]
fn truncated_final_record_is_refused() {
    let mut blob = blob_of(&[phone("Pixel", ACCEPTED), phone("Galaxy", NATIVE)]);
    // Drop the tail of the last lastConnectionType ("USB" -> "U").
    blob.truncate(blob.len() - 2);
    seal(&mut blob).unwrap();

    let summary = parse(&blob).unwrap();
    let defect = summary.defect.as_ref().expect("structural defect");
    assert_eq!(defect.device_index, Some(1));
    assert_eq!(defect.field, "lastConnectionType");
    assert_eq!(summary.devices.len(), 1);

    let err = repair(&blob).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn blob_shorter_than_header_is_truncated() {
    let err = repair(&[0u8; 10]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedBlob);
}

#[test]
fn sentinel_inside_a_name_is_refused() {
    let mut name = NATIVE_SELECTED_SENTINEL.to_vec();
    name.extend_from_slice(b" phone");
    let blob = blob_of(&[DeviceRecord::new("odd-0001", ACCEPTED).with_name(name)]);

    let err = repair(&blob).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LocatorDisagreement);
}

#[test]
fn trailing_bytes_are_structural() {
    let mut blob = blob_of(&[phone("Phone", NATIVE)]);
    blob.extend_from_slice(&[0xde, 0xad]);
    seal(&mut blob).unwrap();

    let summary = parse(&blob).unwrap();
    assert_eq!(summary.devices.len(), 1);
    assert_eq!(summary.defect.as_ref().map(|d| d.field), Some("trailer"));
    assert_eq!(repair(&blob).unwrap_err().kind(), ErrorKind::Structural);
}
