// Copyright 2021 Emilie Gillet.
// Rust port by Tyler Neely.
//
// Author: Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! DX7 "packed voice" patch format: 128 bytes per patch, 32 patches per
//! bulk-dump bank.

use crate::error::EngineError;

/// Size in bytes of one packed patch.
pub const SYX_SIZE: usize = 128;

/// Patches per bulk-dump bank.
pub const BANK_PATCHES: usize = 32;

/// Header bytes of a Yamaha 32-voice bulk dump sysex message.
pub const HEADER_BANK: [u8; 6] = [0xF0, 0x43, 0x00, 0x09, 0x20, 0x00];

/// Total length of a full 32-voice bulk dump, header through checksum.
pub const BULK_FULL_SYSEX_SIZE: usize = 4104;

/// Size of the raw patch bank payload (32 patches x 128 bytes).
pub const BANK_DATA_SIZE: usize = BANK_PATCHES * SYX_SIZE;

/// A bank of 32 DX7 patches, stored as the raw packed bytes. Unpacked only
/// on demand (at voice construction) rather than eagerly, since a voice
/// only ever touches the patch it was built from.
#[derive(Clone)]
pub struct PatchBank {
    data: [u8; BANK_DATA_SIZE],
}

impl PatchBank {
    /// A bank seeded entirely with patch index 0's bytes (silence-safe:
    /// an all-zero operator block decodes to a valid, very quiet patch).
    pub fn from_single_patch(patch_bytes: &[u8; SYX_SIZE]) -> Self {
        let mut data = [0u8; BANK_DATA_SIZE];
        data[..SYX_SIZE].copy_from_slice(patch_bytes);
        Self { data }
    }

    /// Parse a full 32-voice bulk-dump sysex message (header through
    /// checksum, `BULK_FULL_SYSEX_SIZE` bytes).
    pub fn from_sysex(message: &[u8]) -> Result<Self, EngineError> {
        if message.len() < HEADER_BANK.len() || message[..HEADER_BANK.len()] != HEADER_BANK {
            return Err(EngineError::BadSysexHeader);
        }
        if message.len() < BULK_FULL_SYSEX_SIZE {
            return Err(EngineError::TruncatedSysex { got: message.len(), want: BULK_FULL_SYSEX_SIZE });
        }

        let mut data = [0u8; BANK_DATA_SIZE];
        data.copy_from_slice(&message[HEADER_BANK.len()..HEADER_BANK.len() + BANK_DATA_SIZE]);
        Ok(Self { data })
    }

    /// Overwrite this bank's bytes in place from a validated bulk dump.
    pub fn load_sysex(&mut self, message: &[u8]) -> Result<(), EngineError> {
        *self = Self::from_sysex(message)?;
        Ok(())
    }

    pub fn patch(&self, index: usize) -> Patch {
        let start = index * SYX_SIZE;
        Patch::unpack(&self.data[start..start + SYX_SIZE])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    pub rate: [i32; 4],
    pub level: [i32; 4],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardScaling {
    pub break_point: i32,
    pub left_depth: i32,
    pub right_depth: i32,
    pub left_curve: i32,
    pub right_curve: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Operator {
    pub envelope: Envelope,
    pub keyboard_scaling: KeyboardScaling,
    pub rate_scaling: i32,
    pub amp_mod_sensitivity: i32,
    pub velocity_sensitivity: i32,
    pub level: i32,
    pub mode: i32,
    pub coarse: i32,
    pub fine: i32,
    pub detune: i32,
}

/// A fully decoded patch: six operators plus the common block.
#[derive(Debug, Clone, Copy)]
pub struct Patch {
    pub op: [Operator; 6],
    pub algorithm: u8,
    pub feedback: u8,
    pub reset_phase: bool,
    pub transpose: i32,
    pub name: [u8; 10],
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            op: [Operator::default(); 6],
            algorithm: 0,
            feedback: 0,
            reset_phase: false,
            transpose: 0,
            name: [b' '; 10],
        }
    }
}

impl Patch {
    /// Unpack one 128-byte packed patch. Operator blocks run 0 (nearest
    /// byte 0) through 5, matching patch-byte order (operator 6 last).
    pub fn unpack(data: &[u8]) -> Self {
        debug_assert_eq!(data.len(), SYX_SIZE);
        let mut patch = Self::default();

        for i in 0..6 {
            let o = &mut patch.op[i];
            let b = &data[i * 17..i * 17 + 17];

            for j in 0..4 {
                o.envelope.rate[j] = (b[j] & 0x7f).min(99) as i32;
                o.envelope.level[j] = (b[4 + j] & 0x7f).min(99) as i32;
            }

            o.keyboard_scaling.break_point = (b[8] & 0x7f).min(99) as i32;
            o.keyboard_scaling.left_depth = (b[9] & 0x7f).min(99) as i32;
            o.keyboard_scaling.right_depth = (b[10] & 0x7f).min(99) as i32;
            o.keyboard_scaling.left_curve = (b[11] & 0x3) as i32;
            o.keyboard_scaling.right_curve = ((b[11] >> 2) & 0x3) as i32;

            o.rate_scaling = (b[12] & 0x7) as i32;
            o.amp_mod_sensitivity = (b[13] & 0x3) as i32;
            o.velocity_sensitivity = ((b[13] >> 2) & 0x7) as i32;
            o.level = (b[14] & 0x7f).min(99) as i32;
            o.mode = (b[15] & 0x1) as i32;
            o.coarse = ((b[15] >> 1) & 0x1f) as i32;
            o.fine = (b[16] & 0x7f).min(99) as i32;
            o.detune = (((b[12] >> 3) & 0xf) as i32).min(14);
        }

        patch.algorithm = data[110] & 0x1f;
        patch.feedback = data[111] & 0x7;
        patch.reset_phase = (data[111] >> 3) & 0x1 != 0;
        patch.transpose = (data[117] & 0x7f).min(48) as i32;

        for i in 0..10 {
            patch.name[i] = data[118 + i] & 0x7f;
        }

        patch
    }
}
