//! FM operator core: the per-block oscillator kernels and the 32-algorithm
//! routing dispatcher built on top of them.
//!
//! Ported from the reference `FmOpKernel` (`compute`/`compute_pure`/
//! `compute_fb`) and `FmCore::render`'s bus-routing loop.

use crate::algorithms::{operator_flags, FmAlgorithm};
use crate::constants::{LG_N, N};
use crate::tables::SinTable;

/// Gain below this (Q24, `1<<24` = unity) is treated as inaudible; the
/// reference engine skips synthesis entirely rather than spend cycles on
/// a buffer that will round to zero.
pub const LEVEL_THRESH: i32 = 1120;

/// Per-operator oscillator state carried across control blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct OperatorRuntime {
    pub phase: i32,
    pub freq: i32,
    /// Gain at the end of the previous block, the interpolation start
    /// point for this block.
    pub gain_out: i32,
}

/// Modulated sine: `sin(phase + input[i]) * gain`, gain ramped linearly
/// from `gain1` to `gain2` over the block.
pub fn compute(
    sin: &SinTable,
    output: &mut [i32],
    input: &[i32],
    phase0: i32,
    freq: i32,
    gain1: i32,
    gain2: i32,
    add: bool,
) {
    debug_assert_eq!(output.len(), N);
    debug_assert_eq!(input.len(), N);

    let dgain = (gain2 - gain1 + (N >> 1) as i32) >> LG_N;
    let mut gain = gain1;
    let mut phase = phase0;

    for i in 0..N {
        gain += dgain;
        let y = sin.lookup(phase + input[i]);
        let y1 = (((y as i64) * (gain as i64)) >> 24) as i32;
        if add {
            output[i] += y1;
        } else {
            output[i] = y1;
        }
        phase += freq;
    }
}

/// Unmodulated sine carrier.
pub fn compute_pure(sin: &SinTable, output: &mut [i32], phase0: i32, freq: i32, gain1: i32, gain2: i32, add: bool) {
    debug_assert_eq!(output.len(), N);

    let dgain = (gain2 - gain1 + (N >> 1) as i32) >> LG_N;
    let mut gain = gain1;
    let mut phase = phase0;

    for slot in output.iter_mut() {
        gain += dgain;
        let y = sin.lookup(phase);
        let y1 = (((y as i64) * (gain as i64)) >> 24) as i32;
        if add {
            *slot += y1;
        } else {
            *slot = y1;
        }
        phase += freq;
    }
}

/// Self-modulating sine: the operator's own delayed output feeds its
/// phase, averaged over the two-sample delay line and shifted down by
/// `fb_shift`.
pub fn compute_fb(
    sin: &SinTable,
    output: &mut [i32],
    phase0: i32,
    freq: i32,
    gain1: i32,
    gain2: i32,
    fb_buf: &mut [i32; 2],
    fb_shift: i32,
    add: bool,
) {
    debug_assert_eq!(output.len(), N);

    let dgain = (gain2 - gain1 + (N >> 1) as i32) >> LG_N;
    let mut gain = gain1;
    let mut phase = phase0;
    let mut y0 = fb_buf[0];
    let mut y = fb_buf[1];

    for slot in output.iter_mut() {
        gain += dgain;
        let shift_amount = (fb_shift + 1).min(31);
        let scaled_fb = (y0 + y) >> shift_amount;
        y0 = y;
        y = sin.lookup(phase + scaled_fb);
        y = (((y as i64) * (gain as i64)) >> 24) as i32;
        if add {
            *slot += y;
        } else {
            *slot = y;
        }
        phase += freq;
    }

    fb_buf[0] = y0;
    fb_buf[1] = y;
}

/// Render one control block through the chosen algorithm's routing graph,
/// adding the result into `output` (never clearing it — the voice's
/// caller owns the mix buffer).
#[allow(clippy::too_many_arguments)]
pub fn render(
    sin: &SinTable,
    algorithm: &FmAlgorithm,
    operators: &mut [OperatorRuntime; 6],
    gains2: &[i32; 6],
    fb_buf: &mut [i32; 2],
    fb_shift: i32,
    output: &mut [i32; N],
) {
    let mut bus1 = [0i32; N];
    let mut bus2 = [0i32; N];
    let mut has_contents = [true, false, false];

    for op_idx in 0..6 {
        let flags = algorithm.ops[op_idx];
        let mut add = (flags & operator_flags::OUT_BUS_ADD) != 0;
        let inbus = (flags >> 4) & 3;
        let outbus = flags & 3;

        let gain1 = operators[op_idx].gain_out;
        let gain2 = gains2[op_idx];
        operators[op_idx].gain_out = gain2;

        if gain1 >= LEVEL_THRESH || gain2 >= LEVEL_THRESH {
            if !has_contents[outbus as usize] {
                add = false;
            }

            let phase = operators[op_idx].phase;
            let freq = operators[op_idx].freq;
            let has_input = inbus != 0 && has_contents[inbus as usize];
            // Copy the modulation input by value before taking the output
            // bus's mutable borrow below, so this never aliases it even
            // when an algorithm reuses the same bus for both.
            let input: [i32; N] = match (has_input, inbus) {
                (true, 1) => bus1,
                (true, 2) => bus2,
                _ => [0i32; N],
            };

            let out_slice: &mut [i32] = match outbus {
                0 => &mut output[..],
                1 => &mut bus1,
                2 => &mut bus2,
                _ => unreachable!("outbus is masked to 2 bits"),
            };

            if !has_input {
                if (flags & (operator_flags::FB_IN | operator_flags::FB_OUT))
                    == (operator_flags::FB_IN | operator_flags::FB_OUT)
                    && fb_shift < 16
                {
                    compute_fb(sin, out_slice, phase, freq, gain1, gain2, fb_buf, fb_shift, add);
                } else {
                    compute_pure(sin, out_slice, phase, freq, gain1, gain2, add);
                }
            } else {
                compute(sin, out_slice, &input, phase, freq, gain1, gain2, add);
            }

            has_contents[outbus as usize] = true;
        } else if !add {
            has_contents[outbus as usize] = false;
        }

        operators[op_idx].phase = operators[op_idx]
            .phase
            .wrapping_add(operators[op_idx].freq << LG_N);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::ALGORITHMS;

    #[test]
    fn compute_pure_produces_signal() {
        let sin = SinTable::new();
        let mut output = [0i32; N];
        compute_pure(&sin, &mut output, 0, 1 << 20, 1 << 24, 1 << 24, false);
        assert!(output.iter().any(|&x| x != 0));
    }

    #[test]
    fn below_threshold_gain_is_silent() {
        let sin = SinTable::new();
        let mut operators = [OperatorRuntime { phase: 0, freq: 1 << 20, gain_out: 0 }; 6];
        let gains = [0i32; 6];
        let mut fb_buf = [0i32; 2];
        let mut output = [0i32; N];
        render(&sin, &ALGORITHMS[0], &mut operators, &gains, &mut fb_buf, 16, &mut output);
        assert!(output.iter().all(|&x| x == 0));
    }

    #[test]
    fn single_carrier_algorithm_renders_nonzero() {
        let sin = SinTable::new();
        let mut operators = [OperatorRuntime { phase: 0, freq: 1 << 20, gain_out: 1 << 24 }; 6];
        let gains = [1 << 24; 6];
        let mut fb_buf = [0i32; 2];
        let mut output = [0i32; N];
        render(&sin, &ALGORITHMS[31], &mut operators, &gains, &mut fb_buf, 16, &mut output);
        assert!(output.iter().any(|&x| x != 0));
    }
}
