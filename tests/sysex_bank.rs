//! Sysex bank loading: header/length validation and payload placement.

mod common;

use common::{bulk_dump, loud_single_carrier_patch};
use dx7fm::{Engine, EngineError, PatchBank, BANK_DATA_SIZE, BULK_FULL_SYSEX_SIZE, HEADER_BANK};

#[test]
fn full_bank_round_trips_payload_bytes() {
    let message = bulk_dump(&loud_single_carrier_patch());
    let bank = PatchBank::from_sysex(&message).unwrap();
    let patch = bank.patch(0);
    assert_eq!(patch.algorithm, 31);
    assert_eq!(&patch.name, b"TESTCARRIER");
}

#[test]
fn header_mismatch_is_rejected() {
    let mut message = vec![0u8; BULK_FULL_SYSEX_SIZE];
    message[..HEADER_BANK.len()].copy_from_slice(&HEADER_BANK);
    message[1] = 0x00; // corrupt the manufacturer byte
    let result = PatchBank::from_sysex(&message);
    assert!(matches!(result, Err(EngineError::BadSysexHeader)));
}

#[test]
fn truncated_message_is_rejected() {
    let mut message = HEADER_BANK.to_vec();
    message.resize(BANK_DATA_SIZE, 0);
    let result = PatchBank::from_sysex(&message);
    assert!(matches!(result, Err(EngineError::TruncatedSysex { .. })));
}

#[test]
fn engine_rejects_same_way_as_patch_bank() {
    let mut engine = Engine::new(48000.0).unwrap();
    let short = vec![0xF0, 0x43, 0x00, 0x09, 0x20, 0x00, 0x01, 0x02];
    assert!(engine.load_sysex_bank(&short).is_err());

    let good = bulk_dump(&loud_single_carrier_patch());
    assert!(engine.load_sysex_bank(&good).is_ok());
}

#[test]
fn every_patch_in_a_single_patch_seed_matches() {
    let patch_bytes = loud_single_carrier_patch();
    let message = bulk_dump(&patch_bytes);
    let bank = PatchBank::from_sysex(&message).unwrap();
    for i in 0..32 {
        assert_eq!(bank.patch(i).algorithm, 31);
    }
}
