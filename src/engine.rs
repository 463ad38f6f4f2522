//! Public handle-style API: the lock-free MIDI hand-off plus the synth
//! unit behind it, as one owned object a host embeds in its audio/MIDI
//! callbacks.

use crate::constants::N;
use crate::error::EngineError;
use crate::ringbuffer::RingBuffer;
use crate::synth::SynthUnit;

const MIDI_RING_CAPACITY: usize = 4096;
/// Stack-sized chunk for draining the MIDI ring buffer into the synth's
/// staging buffer without allocating on the render path.
const DRAIN_CHUNK: usize = 256;

/// One synthesizer instance: a ring buffer for incoming MIDI bytes and
/// the synth unit that drains it on every render call.
pub struct Engine {
    midi_in: RingBuffer,
    synth: SynthUnit,
}

impl Engine {
    /// Build a new engine at `sample_rate` Hz. Tables are built here, once,
    /// up front — the only allocation-heavy step in the engine's lifetime.
    pub fn new(sample_rate: f64) -> Result<Self, EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            midi_in: RingBuffer::new(MIDI_RING_CAPACITY),
            synth: SynthUnit::new(sample_rate),
        })
    }

    /// Load a full 32-voice bulk-dump sysex bank, replacing the current
    /// patch bank outright.
    pub fn load_sysex_bank(&mut self, message: &[u8]) -> Result<(), EngineError> {
        self.synth.load_sysex_bank(message)
    }

    /// Enqueue raw MIDI bytes for the next `get_samples` call to drain.
    /// Returns the number of bytes actually accepted; the caller decides
    /// whether to drop or retry the remainder.
    pub fn send_midi(&self, bytes: &[u8]) -> usize {
        if self.midi_in.write(bytes) {
            bytes.len()
        } else {
            0
        }
    }

    /// Drain pending MIDI and render `out.len()` samples of signed 16-bit
    /// mono PCM. `out.len()` must be a positive multiple of 64.
    pub fn get_samples(&mut self, out: &mut [i16]) {
        assert!(!out.is_empty() && out.len() % N == 0, "sample count must be a positive multiple of {N}");

        let mut remaining = self.midi_in.bytes_available();
        let mut chunk = [0u8; DRAIN_CHUNK];
        while remaining > 0 {
            let n = remaining.min(DRAIN_CHUNK);
            self.midi_in.read(&mut chunk[..n]);
            self.synth.feed_midi(&chunk[..n]);
            remaining -= n;
        }

        self.synth.get_samples(out);
    }
}
