use proptest::prelude::*;

use pcm5_pairing_repair::codec::{
    parse, scan_native_selected, DeviceRecord, NATIVE_SELECTED_SENTINEL,
};
use pcm5_pairing_repair::repair;

use super::{assert_sealed, blob_of, stored_crc, ACCEPTED, NATIVE};

// Lowercase text never spells out a sentinel, so every generated blob is one
// the parser and the byte scan agree on.
fn text() -> impl Strategy<Value = String> {
    "[a-z0-9 ._-]{0,24}"
}

fn record() -> impl Strategy<Value = DeviceRecord> {
    (
        text(),
        prop::option::of(text()),
        prop::sample::select(vec![NATIVE, ACCEPTED, "USER_DECLINED", ""]),
        any::<bool>(),
        any::<bool>(),
        0i32..8,
        prop::sample::select(vec!["USB", "WIFI", "BLUETOOTH"]),
    )
        .prop_map(
            |(unique_id, name, state, prev, store, last_mode, connection)| {
                let mut record = DeviceRecord::new(unique_id, state);
                record.name = name.map(String::into_bytes);
                record.was_disclaimer_previously_accepted = prev;
                record.store_user_accept_state = store;
                record.last_mode = last_mode;
                record.last_connection_type = connection.as_bytes().to_vec();
                record
            },
        )
}

fn device_list() -> impl Strategy<Value = Vec<DeviceRecord>> {
    prop::collection::vec(record(), 0..8)
}

proptest! {
    #[test]
    fn healthy_lists_are_unchanged(records in device_list()) {
        let records: Vec<_> = records
            .into_iter()
            .filter(|r| r.accept_state != NATIVE.as_bytes())
            .collect();
        let blob = blob_of(&records);
        prop_assert_eq!(repair(&blob).unwrap().blob, blob);
    }

    #[test]
    fn repair_is_idempotent(records in device_list()) {
        let once = repair(&blob_of(&records)).unwrap().blob;
        let twice = repair(&once).unwrap().blob;
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn grows_four_bytes_per_occurrence(records in device_list()) {
        let blob = blob_of(&records);
        let found = scan_native_selected(&blob).len();
        let repaired = repair(&blob).unwrap();
        prop_assert_eq!(repaired.blob.len(), blob.len() + 4 * found);
        prop_assert_eq!(repaired.occurrences.len(), found);
    }

    #[test]
    fn bytes_outside_rewrites_are_preserved(records in device_list()) {
        let blob = blob_of(&records);
        let offsets = scan_native_selected(&blob);
        let out = repair(&blob).unwrap().blob;

        for (i, byte) in blob.iter().enumerate().skip(8) {
            if offsets
                .iter()
                .any(|&o| (o..o + NATIVE_SELECTED_SENTINEL.len()).contains(&i))
            {
                continue;
            }
            let shift = 4 * offsets
                .iter()
                .filter(|&&o| o + NATIVE_SELECTED_SENTINEL.len() <= i)
                .count();
            prop_assert_eq!(out[i + shift], *byte, "byte {} moved to {}", i, i + shift);
        }
    }

    #[test]
    fn output_is_always_sealed(records in device_list(), damage in any::<u8>()) {
        let mut blob = blob_of(&records);
        blob[4] ^= damage;
        let repaired = repair(&blob).unwrap();
        assert_sealed(&repaired.blob);
        prop_assert_eq!(stored_crc(&repaired.blob), u64::from(repaired.new_checksum));
    }

    #[test]
    fn parser_and_scan_agree(records in device_list()) {
        let blob = blob_of(&records);
        let summary = parse(&blob).unwrap();
        prop_assert!(summary.defect.is_none());
        prop_assert_eq!(summary.devices.len(), records.len());
        prop_assert_eq!(summary.native_selected_offsets(), scan_native_selected(&blob));
    }
}
