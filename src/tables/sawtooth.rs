//! Band-limited sawtooth table.
//!
//! Ported from the reference `Sawtooth` module: `N_SLICES` (64) octave
//! slices, each `N_SAMPLES` (2048) wide, built by summing band-limited
//! partials with a linear roll-off over the top quarter of partials and a
//! Goertzel-style sine recurrence (no per-partial `sin()` call at the
//! per-sample level, only once per partial to seed the recurrence).
//!
//! Exposed for determinism testing alongside its sibling tables. No
//! voice-rendering path in this crate consumes it yet: the DX7 algorithm
//! graph is sine-only, exactly as in the reference engine, where
//! `Sawtooth` implements the same `Module` interface as the resonant
//! filter but is never wired into `synth_unit.cc`'s signal path either.

const LG_N_SAMPLES: usize = 11;
const N_SAMPLES: usize = 1 << LG_N_SAMPLES;
const N_PARTIALS_MAX: i32 = (N_SAMPLES / 2) as i32;

const LG_SLICES_PER_OCTAVE: i32 = 2;
const SLICES_PER_OCTAVE: i32 = 1 << LG_SLICES_PER_OCTAVE;
const SLICE_SHIFT: i32 = 24 - LG_SLICES_PER_OCTAVE;

const LG_N_SLICES: usize = (LG_SLICES_PER_OCTAVE as usize) + 4;
const N_SLICES: usize = 1 << LG_N_SLICES;

const NEG2OVERPI: f64 = -0.636_619_772_367_581_4;
const R: i64 = 1 << 29;

/// Band-limited sawtooth, indexed by phase and log-frequency slice.
#[derive(Clone)]
pub struct SawtoothTable {
    // Row-major [N_SLICES + 1][N_SAMPLES]; the extra row duplicates the
    // top slice so `lookup`'s slice+1 high-quality interpolation never
    // reads out of bounds.
    table: Box<[i32]>,
}

impl SawtoothTable {
    pub fn new(sample_rate: f64) -> Self {
        let mut table = vec![0i32; (N_SLICES + 1) * N_SAMPLES];
        let mut lut = vec![0i32; N_SAMPLES / 2];

        let slice_inc = 2.0_f64.powf(1.0 / SLICES_PER_OCTAVE as f64);
        let mut f_0 = slice_inc.powi(N_SLICES as i32 - 1);
        let mut n_partials_last = 0i32;

        for j in (0..N_SLICES).rev() {
            for v in lut.iter_mut() {
                *v = 0;
            }
            let mut n_partials = (0.5 * sample_rate / f_0).floor() as i32;
            n_partials = n_partials.min(N_PARTIALS_MAX);

            for k in (n_partials_last + 1)..=n_partials {
                let mut scale = NEG2OVERPI / k as f64;
                if (N_PARTIALS_MAX - k) <= (N_PARTIALS_MAX >> 2) {
                    scale *= (N_PARTIALS_MAX - k) as f64 / (N_PARTIALS_MAX >> 2) as f64;
                }
                let dphase = k as f64 * 2.0 * std::f64::consts::PI / N_SAMPLES as f64;

                let ds_d = (1i64 << 30) as f64 * scale * dphase.sin();
                let cm2_d = (1i64 << 29) as f64 * (2.0 * (dphase.cos() - 1.0));
                let mut dshift = 0i32;
                while dshift < 16 {
                    if ds_d < -((1i64 << (30 - dshift)) as f64) {
                        break;
                    }
                    if cm2_d < -((1i64 << (30 - dshift)) as f64) {
                        break;
                    }
                    dshift += 1;
                }
                let mut ds = ((1i64 << dshift) as f64 * ds_d + 0.5).floor() as i32;
                let cm2 = ((1i64 << dshift) as f64 * cm2_d + 0.5).floor() as i32;

                let mut s = 0i32;
                let round = (1i32 << dshift) >> 1;
                for i in 0..(N_SAMPLES / 2) {
                    lut[i] += s;
                    ds = (((cm2 as i64) * (s as i64) + R) >> 29) as i32 + ds;
                    s += (ds + round) >> dshift;
                }
            }

            let row = j * N_SAMPLES;
            table[row] = 0;
            table[row + N_SAMPLES / 2] = 0;
            for i in 1..(N_SAMPLES / 2) {
                let value = (lut[i] + 32) >> 6;
                table[row + i] = value;
                table[row + N_SAMPLES - i] = -value;
            }

            n_partials_last = n_partials;
            f_0 *= 1.0 / slice_inc;
        }

        // Duplicate the top slice into the guard row.
        let top = (N_SLICES - 1) * N_SAMPLES;
        let guard = N_SLICES * N_SAMPLES;
        table.copy_within(top..top + N_SAMPLES, guard);

        Self { table: table.into_boxed_slice() }
    }

    /// Bilinearly interpolated sawtooth lookup, `phase` and `log_f` in Q24.
    #[inline]
    pub fn lookup(&self, phase: i32, log_f: i32) -> i32 {
        let log_f = log_f.max(0);
        let slice = (((log_f + (1 << SLICE_SHIFT) - 1) >> SLICE_SHIFT) as usize).min(N_SLICES - 1);
        let phase_int = ((phase >> (24 - LG_N_SAMPLES)) & (N_SAMPLES as i32 - 1)) as usize;
        let lowbits = phase & ((1 << (24 - LG_N_SAMPLES)) - 1);

        let row0 = slice * N_SAMPLES;
        let y0 = self.table[row0 + phase_int];
        let y1 = self.table[row0 + ((phase_int + 1) & (N_SAMPLES - 1))];
        let y4 = y0 + ((((y1 - y0) as i64) * (lowbits as i64)) >> (24 - LG_N_SAMPLES)) as i32;

        let row1 = (slice + 1) * N_SAMPLES;
        let y2 = self.table[row1 + phase_int];
        let y3 = self.table[row1 + ((phase_int + 1) & (N_SAMPLES - 1))];
        let y5 = y2 + ((((y3 - y2) as i64) * (lowbits as i64)) >> (24 - LG_N_SAMPLES)) as i32;

        let slice_lowbits = log_f & ((1 << SLICE_SHIFT) - 1);
        y4 + ((((y5 - y4) as i64) * (slice_lowbits as i64)) >> SLICE_SHIFT) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_symmetry_around_half_cycle() {
        let saw = SawtoothTable::new(44100.0);
        let a = saw.lookup(1 << 20, 10 << 24);
        let b = saw.lookup((1 << 24) - (1 << 20), 10 << 24);
        assert!((a + b).abs() < (1 << 16), "a={a} b={b}");
    }

    #[test]
    fn zero_phase_is_zero_crossing() {
        let saw = SawtoothTable::new(44100.0);
        assert!(saw.lookup(0, 10 << 24).abs() < (1 << 14));
    }

    #[test]
    fn deterministic_across_instances() {
        let a = SawtoothTable::new(48000.0);
        let b = SawtoothTable::new(48000.0);
        for phase in (0..(1 << 24)).step_by(500_003) {
            assert_eq!(a.lookup(phase, 8 << 24), b.lookup(phase, 8 << 24));
        }
    }
}
