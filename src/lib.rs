// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
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

//! Fixed-point, polyphonic FM synthesis engine modeled on the Yamaha DX7.
//!
//! Given a stream of MIDI bytes and a requested sample count, [`Engine`]
//! renders signed 16-bit mono PCM at a configured sample rate. Everything
//! on the render path is fixed-point, allocation-free, and deterministic:
//! no floating point touches a sample between an operator's sine lookup
//! and the final int16 clip.

#![warn(missing_docs)]

mod algorithms;
mod constants;
mod engine;
mod envelope;
mod error;
mod filter;
mod fm_core;
mod patch;
mod ringbuffer;
mod synth;
mod tables;
mod voice;

pub use engine::Engine;
pub use error::EngineError;
pub use patch::{Patch, PatchBank, BANK_DATA_SIZE, BANK_PATCHES, BULK_FULL_SYSEX_SIZE, HEADER_BANK, SYX_SIZE};

/// Control block size in samples that the engine renders internally; any
/// caller-visible sample count must be a positive multiple of this.
pub const BLOCK_SIZE: usize = constants::N;
