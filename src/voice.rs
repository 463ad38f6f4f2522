//! A single playing note: six operators, their envelopes, and the
//! per-operator frequency/level derivation from a decoded patch.
//!
//! Ported from the reference `Dx7Note`/`FmOperator` pair, generalized so
//! the bus-routing itself lives in `fm_core::render` rather than being
//! inlined into the note's `process` method.

use crate::algorithms::ALGORITHMS;
use crate::constants::N;
use crate::envelope::Env;
use crate::fm_core::{self, OperatorRuntime};
use crate::patch::Patch;
use crate::tables::Tables;

const VELOCITY_DATA: [u8; 64] = [
    0, 70, 86, 97, 106, 114, 121, 126, 132, 138, 142, 148, 152, 156, 160, 163, 166, 170, 173, 174,
    178, 181, 184, 186, 189, 190, 194, 196, 198, 200, 202, 205, 206, 209, 211, 214, 216, 218, 220,
    222, 224, 225, 227, 229, 230, 232, 233, 235, 237, 238, 240, 241, 242, 243, 244, 246, 246, 248,
    249, 250, 251, 252, 253, 254,
];

const EXP_SCALE_DATA: [u8; 33] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 14, 16, 19, 23, 27, 33, 39, 47, 56, 66, 80, 94, 110, 126,
    142, 158, 174, 190, 206, 222, 238, 250,
];

const COARSE_MUL: [i32; 32] = [
    -16777216, 0, 16777216, 26591258, 33554432, 38955489, 43368474, 47099600, 50331648, 53182516,
    55732705, 58039632, 60145690, 62083076, 63876816, 65546747, 67108864, 68576247, 69959732,
    71268397, 72509921, 73690858, 74816848, 75892776, 76922906, 77910978, 78860292, 79773775,
    80654032, 81503396, 82323963, 83117622,
];

const LEVEL_LUT: [i32; 20] = [
    0, 5, 9, 13, 17, 20, 23, 25, 27, 29, 31, 33, 35, 37, 39, 41, 42, 43, 45, 46,
];

fn scale_velocity(velocity: i32, sensitivity: i32) -> i32 {
    let clamped_vel = velocity.clamp(0, 127);
    let vel_value = VELOCITY_DATA[(clamped_vel >> 1) as usize] as i32 - 239;
    ((sensitivity * vel_value + 7) >> 3) << 4
}

fn scale_rate(midinote: i32, sensitivity: i32) -> i32 {
    let x = (midinote / 3 - 7).clamp(0, 31);
    (sensitivity * x) >> 3
}

fn scale_curve(group: i32, depth: i32, curve: i32) -> i32 {
    let scale = if curve == 0 || curve == 3 {
        (group * depth * 329) >> 12
    } else {
        let raw_exp = EXP_SCALE_DATA[group.clamp(0, 32) as usize] as i32;
        (raw_exp * depth * 329) >> 15
    };
    if curve < 2 {
        -scale
    } else {
        scale
    }
}

fn scale_level(midinote: i32, break_pt: i32, left_depth: i32, right_depth: i32, left_curve: i32, right_curve: i32) -> i32 {
    let offset = midinote - break_pt - 17;
    if offset >= 0 {
        scale_curve((offset + 1) / 3, right_depth, right_curve)
    } else {
        scale_curve(-(offset - 1) / 3, left_depth, left_curve)
    }
}

fn scale_out_level(outlevel: i32) -> i32 {
    if outlevel >= 20 {
        28 + outlevel
    } else {
        LEVEL_LUT[outlevel as usize]
    }
}

/// Logarithmic-frequency phase increment for one operator, Q24.
fn osc_freq(midinote: i32, mode: i32, coarse: i32, fine: i32, detune: i32) -> i32 {
    let mut logfreq = if mode == 0 {
        let base = 50857777; // (1<<24) * (log2(440) - 69/12)
        let step = (1 << 24) / 12; // 1398101
        base + step * midinote
    } else {
        (4458616 * ((coarse & 3) * 100 + fine)) >> 3
    };

    if mode == 0 {
        logfreq += COARSE_MUL[(coarse & 31) as usize];
        if fine != 0 {
            let fine_adjust = (24204406.0 * (1.0 + 0.01 * fine as f64).ln()) as i32;
            logfreq += fine_adjust;
        }
        if detune != 7 {
            logfreq += 13457 * (detune - 7);
        }
    } else if detune > 7 {
        logfreq += 13457 * (detune - 7);
    }

    logfreq
}

#[derive(Clone, Debug)]
struct OperatorState {
    env: Env,
    runtime: OperatorRuntime,
}

/// One active DX7 note: six operators bound to a patch, a MIDI note and
/// velocity, plus the algorithm's shared feedback state.
#[derive(Clone, Debug)]
pub struct Voice {
    operators: [OperatorState; 6],
    algorithm: usize,
    fb_buf: [i32; 2],
    fb_shift: i32,
    triggered: bool,
}

impl Voice {
    /// Build a silent, inactive voice. `trigger` brings it to life.
    pub fn new(sample_rate: f64) -> Self {
        let operators = std::array::from_fn(|_| OperatorState {
            env: Env::new(sample_rate),
            runtime: OperatorRuntime::default(),
        });
        Self {
            operators,
            algorithm: 0,
            fb_buf: [0; 2],
            fb_shift: 16,
            triggered: false,
        }
    }

    /// Bind this voice to a patch, MIDI note, and velocity, and key all
    /// six envelopes down into attack.
    pub fn trigger(&mut self, tables: &Tables, patch: &Patch, note: u8, velocity: u8) {
        self.triggered = true;
        self.algorithm = (patch.algorithm & 0x1f) as usize;
        self.fb_shift = if patch.feedback != 0 {
            (7 - (patch.feedback as i32 & 7)).max(0)
        } else {
            16
        };
        self.fb_buf = [0; 2];

        // Patch byte 117 is centered at 24 (no transpose); 0 and 48 are
        // an octave down/up.
        let midinote = note as i32 - 24 + patch.transpose;

        for (i, op_state) in self.operators.iter_mut().enumerate() {
            let op = &patch.op[i];

            let mut outlevel = scale_out_level(op.level);
            outlevel += scale_level(
                midinote,
                op.keyboard_scaling.break_point,
                op.keyboard_scaling.left_depth,
                op.keyboard_scaling.right_depth,
                op.keyboard_scaling.left_curve,
                op.keyboard_scaling.right_curve,
            );
            outlevel = outlevel.min(127) << 5;
            outlevel += scale_velocity(velocity as i32, op.velocity_sensitivity);
            let outlevel = outlevel.max(0).min(20000);

            let rate_scaling = scale_rate(midinote, op.rate_scaling);
            op_state.env.init(&op.envelope.rate, &op.envelope.level, outlevel, rate_scaling);
            op_state.env.keydown(true);

            let logfreq = osc_freq(midinote, op.mode, op.coarse, op.fine, op.detune);
            op_state.runtime.freq = tables.freqlut.lookup(logfreq);
            if patch.reset_phase {
                op_state.runtime.phase = 0;
            }
            op_state.runtime.gain_out = 0;
        }
    }

    pub fn keyup(&mut self) {
        for op_state in &mut self.operators {
            op_state.env.keydown(false);
        }
    }

    /// True while any operator's envelope is still producing audio.
    pub fn is_active(&self) -> bool {
        self.triggered && self.operators.iter().any(|op_state| !op_state.env.is_done())
    }

    /// Advance all envelopes one block and add the rendered samples into
    /// `output`. Caller is responsible for zeroing `output` first if it
    /// wants a clean mix rather than an accumulation.
    pub fn render(&mut self, tables: &Tables, output: &mut [i32; N]) {
        let mut gains2 = [0i32; 6];
        for (i, op_state) in self.operators.iter_mut().enumerate() {
            let env_level = op_state.env.get_sample();
            let exp2_input = env_level.saturating_sub(14 << 24);
            gains2[i] = tables.exp2.lookup(exp2_input);
        }

        let mut runtimes = [OperatorRuntime::default(); 6];
        for i in 0..6 {
            runtimes[i] = self.operators[i].runtime;
        }

        fm_core::render(
            &tables.sin,
            &ALGORITHMS[self.algorithm],
            &mut runtimes,
            &gains2,
            &mut self.fb_buf,
            self.fb_shift,
            output,
        );

        for i in 0..6 {
            self.operators[i].runtime = runtimes[i];
        }
    }
}
