//! Shared helpers for the integration tests: building a minimal sysex
//! bank and computing simple signal statistics over rendered PCM.

use dx7fm::{BANK_DATA_SIZE, BULK_FULL_SYSEX_SIZE, HEADER_BANK, SYX_SIZE};

/// Build a full 32-voice bulk-dump message (header + 4096-byte payload +
/// trailing `F7`) where every patch is the single 128-byte patch given.
pub fn bulk_dump(patch_bytes: &[u8; SYX_SIZE]) -> Vec<u8> {
    let mut message = HEADER_BANK.to_vec();
    let mut payload = [0u8; BANK_DATA_SIZE];
    for chunk in payload.chunks_mut(SYX_SIZE) {
        chunk.copy_from_slice(patch_bytes);
    }
    message.extend_from_slice(&payload);
    message.push(0x00); // checksum, unchecked by the core
    message.push(0xF7);
    assert_eq!(message.len(), BULK_FULL_SYSEX_SIZE);
    message
}

/// A loud, fast-decaying single-carrier patch: algorithm 32 (all
/// operators independent carriers), operator 1 loud, the rest silent.
pub fn loud_single_carrier_patch() -> [u8; SYX_SIZE] {
    let mut bytes = [0u8; SYX_SIZE];
    for op in 0..6 {
        let b = op * 17;
        bytes[b..b + 4].copy_from_slice(&[99, 99, 99, 60]); // rates
        bytes[b + 4..b + 8].copy_from_slice(&[99, 99, 99, 0]); // levels
        bytes[b + 16] = if op == 0 { 99 } else { 0 };
    }
    bytes[110] = 31; // algorithm 32, zero-based
    bytes[111] = 0;
    bytes[117] = 24; // transpose, centered (no shift)
    bytes[118..128].copy_from_slice(b"TESTCARRIER");
    bytes
}

pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}
