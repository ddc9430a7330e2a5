//! Demodulated-signal handling: level+duration pairs and the PWM slicer.

pub mod demodulator;

pub use demodulator::LevelDuration;

#[allow(unused_imports)]
pub use demodulator::PwmSlicer;
