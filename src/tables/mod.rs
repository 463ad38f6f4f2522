//! Fixed-point lookup tables shared by the rest of the engine.
//!
//! Each table is an owned, independently constructible struct rather than
//! the reference implementation's lazily-initialized globals: `Tables`
//! builds all of them once per [`crate::Engine`] and is held by the synth
//! unit, passed by reference into every voice's render call.

mod exp2;
mod freqlut;
mod sawtooth;
mod sin;

pub use exp2::Exp2Table;
pub use freqlut::FreqLut;
pub use sawtooth::SawtoothTable;
pub use sin::SinTable;

/// Every table construction is a pure function of its inputs (none of
/// them, or just `sample_rate`), so two `Tables` built from the same
/// sample rate are byte-identical — that determinism is this module's
/// correctness contract.
#[derive(Clone)]
pub struct Tables {
    pub sin: SinTable,
    pub exp2: Exp2Table,
    pub freqlut: FreqLut,
    pub sawtooth: SawtoothTable,
}

impl Tables {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sin: SinTable::new(),
            exp2: Exp2Table::new(),
            freqlut: FreqLut::new(sample_rate),
            sawtooth: SawtoothTable::new(sample_rate),
        }
    }
}
