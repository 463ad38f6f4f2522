//! Construction-time error type. Nothing on the real-time audio path
//! returns `Result`: a playing note cannot fail, only a malformed sysex
//! load or an invalid sample rate at setup time can.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("sysex header does not match the 32-voice bulk dump header")]
    BadSysexHeader,

    #[error("sysex message truncated: got {got} bytes, need at least {want}")]
    TruncatedSysex { got: usize, want: usize },
}
