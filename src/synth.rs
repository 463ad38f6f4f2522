//! The synth unit: voice allocation, MIDI dispatch, block rendering.
//!
//! Ported from the reference `SynthUnit::ProcessMidiMessage` and
//! `SynthUnit::GetSamples`, generalized so the patch bank and voice
//! table are owned fields rather than process-wide singletons.

use log::{debug, warn};

use crate::constants::N;
use crate::filter::{FilterControl, ResoFilter};
use crate::patch::{PatchBank, SYX_SIZE};
use crate::tables::Tables;
use crate::voice::Voice;

const NUM_VOICES: usize = 16;
const STAGING_CAPACITY: usize = 8192;

/// A single entry in the fixed-size voice table: at most one active note
/// per slot, bound to its MIDI note number for matching note-offs.
struct Slot {
    voice: Option<Voice>,
    midi_note: u8,
    keydown: bool,
    sustained: bool,
}

impl Slot {
    fn empty() -> Self {
        Self { voice: None, midi_note: 0, keydown: false, sustained: false }
    }
}

/// MIDI-driven, polyphonic FM synth: owns the patch bank, the voice
/// table, and the resonant filter. Stateless with respect to threads —
/// callers serialize access to this from the audio thread only; MIDI
/// bytes arrive pre-drained from the ring buffer by the caller.
pub struct SynthUnit {
    sample_rate: f64,
    tables: Tables,
    slots: [Slot; NUM_VOICES],
    patch_bank: PatchBank,
    current_patch: usize,
    alloc_cursor: usize,
    sustain: bool,
    filter: ResoFilter,
    filter_control: FilterControl,
    staging: [u8; STAGING_CAPACITY],
    staging_len: usize,
}

/// A quiet built-in patch so the unit makes sound before any sysex
/// arrives, mirroring the reference's hardcoded startup patch.
fn default_patch_bytes() -> [u8; SYX_SIZE] {
    let mut bytes = [0u8; SYX_SIZE];
    for op in 0..6 {
        let b = op * 17;
        bytes[b..b + 4].copy_from_slice(&[99, 99, 99, 99]); // rates
        bytes[b + 4..b + 8].copy_from_slice(&[99, 99, 99, 0]); // levels
        bytes[b + 16] = if op == 0 { 90 } else { 70 }; // output level, op 0 loudest
    }
    bytes[110] = 0; // algorithm 1 (stacked carriers + modulators)
    bytes[111] = 0; // no feedback
    bytes[117] = 24; // transpose, centered (no shift)
    bytes[118..128].copy_from_slice(b"EPIANO 1  ");
    bytes
}

impl SynthUnit {
    pub fn new(sample_rate: f64) -> Self {
        let tables = Tables::new(sample_rate);
        let slots = std::array::from_fn(|_| Slot::empty());
        Self {
            sample_rate,
            tables,
            slots,
            patch_bank: PatchBank::from_single_patch(&default_patch_bytes()),
            current_patch: 0,
            alloc_cursor: 0,
            sustain: false,
            filter: ResoFilter::new(),
            filter_control: [129_423_563 + 64 * 1_019_083, 0],
            staging: [0u8; STAGING_CAPACITY],
            staging_len: 0,
        }
    }

    pub fn load_sysex_bank(&mut self, message: &[u8]) -> Result<(), crate::error::EngineError> {
        self.patch_bank.load_sysex(message)
    }

    /// Copy as many bytes of `bytes` into the staging buffer as fit.
    /// Returns the number actually accepted.
    pub fn feed_midi(&mut self, bytes: &[u8]) -> usize {
        let room = STAGING_CAPACITY - self.staging_len;
        let n = bytes.len().min(room);
        self.staging[self.staging_len..self.staging_len + n].copy_from_slice(&bytes[..n]);
        self.staging_len += n;
        n
    }

    fn drain_staging(&mut self) {
        let mut pos = 0;
        loop {
            let consumed = self.process_message(pos);
            if consumed == 0 {
                break;
            }
            pos += consumed;
        }
        if pos > 0 {
            self.staging.copy_within(pos..self.staging_len, 0);
            self.staging_len -= pos;
        }
    }

    /// Try to parse one message starting at `self.staging[pos..]`. Returns
    /// bytes consumed, or 0 if the message is incomplete.
    fn process_message(&mut self, pos: usize) -> usize {
        let len = self.staging_len - pos;
        if len == 0 {
            return 0;
        }
        let status = self.staging[pos];

        match status {
            0x80..=0x8F => {
                if len < 3 {
                    return 0;
                }
                self.note_off(self.staging[pos + 1]);
                3
            }
            0x90..=0x9F => {
                if len < 3 {
                    return 0;
                }
                let note = self.staging[pos + 1];
                let velocity = self.staging[pos + 2];
                if velocity == 0 {
                    self.note_off(note);
                } else {
                    self.note_on(note, velocity);
                }
                3
            }
            0xB0..=0xBF => {
                if len < 3 {
                    return 0;
                }
                self.control_change(self.staging[pos + 1], self.staging[pos + 2]);
                3
            }
            0xC0..=0xCF => {
                if len < 2 {
                    return 0;
                }
                self.current_patch = (self.staging[pos + 1] as usize).min(31);
                debug!("program change -> patch {}", self.current_patch);
                2
            }
            0xF0 => self.sysex(pos, len),
            _ => {
                warn!("unknown MIDI status byte 0x{:02x}, dropping staging buffer", status);
                len
            }
        }
    }

    fn note_off(&mut self, note: u8) {
        for slot in &mut self.slots {
            if slot.keydown && slot.midi_note == note {
                if self.sustain {
                    slot.sustained = true;
                } else if let Some(voice) = &mut slot.voice {
                    voice.keyup();
                }
                slot.keydown = false;
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let start = self.alloc_cursor;
        let mut chosen = None;
        for i in 0..NUM_VOICES {
            let idx = (start + i) % NUM_VOICES;
            if !self.slots[idx].keydown {
                chosen = Some(idx);
                break;
            }
        }
        let Some(idx) = chosen else {
            warn!("all {} voice slots held, dropping note-on for {}", NUM_VOICES, note);
            return;
        };
        self.alloc_cursor = (idx + 1) % NUM_VOICES;

        let patch = self.patch_bank.patch(self.current_patch);
        let mut voice = self.slots[idx].voice.take().unwrap_or_else(|| Voice::new(self.sample_rate));
        voice.trigger(&self.tables, &patch, note, velocity);
        self.slots[idx] = Slot { voice: Some(voice), midi_note: note, keydown: true, sustained: false };
        debug!("note-on {} vel {} -> slot {}", note, velocity, idx);
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        match controller {
            1 => self.filter_control[0] = 129_423_563 + (value as i32) * 1_019_083,
            2 => self.filter_control[1] = (value as i32) * 528_416,
            64 => {
                let new_sustain = value != 0;
                if self.sustain && !new_sustain {
                    for slot in &mut self.slots {
                        if slot.sustained && !slot.keydown {
                            if let Some(voice) = &mut slot.voice {
                                voice.keyup();
                            }
                            slot.sustained = false;
                        }
                    }
                }
                self.sustain = new_sustain;
            }
            _ => {}
        }
    }

    fn sysex(&mut self, pos: usize, len: usize) -> usize {
        const HEADER: [u8; 6] = [0xF0, 0x43, 0x00, 0x09, 0x20, 0x00];
        const FULL_LEN: usize = 4104;

        if len >= HEADER.len() && self.staging[pos..pos + HEADER.len()] == HEADER {
            if len < FULL_LEN {
                return 0;
            }
            match self.patch_bank.load_sysex(&self.staging[pos..pos + FULL_LEN]) {
                Ok(()) => debug!("loaded 32-voice bulk dump"),
                Err(e) => warn!("sysex bulk dump rejected: {e}"),
            }
            return FULL_LEN;
        }
        warn!("unrecognized sysex message, dropping staging buffer");
        len
    }

    fn reap_done_voices(&mut self) {
        for slot in &mut self.slots {
            if let Some(voice) = &slot.voice {
                if !voice.is_active() {
                    slot.voice = None;
                    slot.keydown = false;
                    slot.sustained = false;
                }
            }
        }
    }

    /// Render `n` samples (a multiple of 64) of signed 16-bit mono PCM.
    pub fn get_samples(&mut self, out: &mut [i16]) {
        debug_assert_eq!(out.len() % N, 0);

        self.drain_staging();

        let mut i = 0;
        while i < out.len() {
            let mut mix = [0i32; N];
            for slot in &mut self.slots {
                if let Some(voice) = &mut slot.voice {
                    voice.render(&self.tables, &mut mix);
                }
            }

            let mut filtered = [0i32; N];
            self.filter.process(&self.tables.freqlut, self.filter_control, self.filter_control, &mix, &mut filtered);

            for (slot, &s) in out[i..i + N].iter_mut().zip(filtered.iter()) {
                let shifted = s >> 4;
                *slot = if shifted < -(1 << 24) {
                    -0x8000
                } else if shifted >= (1 << 24) {
                    0x7FFF
                } else {
                    (shifted >> 9) as i16
                };
            }

            self.reap_done_voices();
            i += N;
        }
    }
}
