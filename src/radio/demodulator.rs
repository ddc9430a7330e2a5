//! Pulse-width (PWM) slicer: level+duration pairs to row-based bit buffers.
//!
//! The upstream envelope demodulator reduces radio samples to a stream of
//! (level, duration_us) pairs; this slicer turns those into bits. HCS-style
//! code words are 3x TE: a short high followed by a long low is a 1, a long
//! high followed by a short low is a 0, so only high widths carry data. Low
//! widths delimit structure instead: a gap past the profile's gap limit ends
//! the current row (the header gap between preamble and data), and a gap
//! past the reset limit ends the transmission (inter-packet guard time).
//!
//! With no tolerance configured the short/long decision is the midpoint of
//! the two nominal widths — 590 µs for standard timing — which gives the
//! widest margin for TE drift. With a tolerance, a high matching neither
//! width starts a new row so the slicer can resync mid-stream.

use crate::bitbuffer::BitBuffer;
use crate::protocols::DeviceProfile;

/// A single level+duration pair representing one segment of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDuration {
    /// Signal level (true = high, false = low)
    pub level: bool,
    /// Duration in microseconds
    pub duration_us: u32,
}

impl LevelDuration {
    pub fn new(level: bool, duration_us: u32) -> Self {
        Self { level, duration_us }
    }
}

/// PWM slicer configured from one profile's timing block.
pub struct PwmSlicer {
    short_us: u32,
    long_us: u32,
    gap_limit_us: u32,
    reset_limit_us: u32,
    tolerance_us: Option<u32>,
    /// Short/long discriminator when no tolerance is set.
    midpoint_us: u32,
}

impl PwmSlicer {
    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self {
            short_us: profile.short_pulse_us,
            long_us: profile.long_pulse_us,
            gap_limit_us: profile.gap_limit_us,
            reset_limit_us: profile.reset_limit_us,
            tolerance_us: profile.tolerance_us,
            midpoint_us: (profile.short_pulse_us + profile.long_pulse_us) / 2,
        }
    }

    /// Slice one pulse train into gap-delimited rows. Pairs after a reset
    /// gap belong to the next transmission and are not consumed here.
    pub fn slice(&self, pairs: &[LevelDuration]) -> BitBuffer {
        let mut buf = BitBuffer::new();
        for pair in pairs {
            if pair.level {
                match self.classify(pair.duration_us) {
                    Some(bit) => buf.add_bit(bit),
                    // Unmatched width: resync on a fresh row.
                    None => {
                        if buf.bits_in_current_row() > 0 && !buf.new_row() {
                            break;
                        }
                    }
                }
            } else if pair.duration_us >= self.reset_limit_us {
                break;
            } else if pair.duration_us >= self.gap_limit_us {
                if buf.bits_in_current_row() > 0 && !buf.new_row() {
                    break;
                }
            }
        }
        buf
    }

    /// Short high = 1, long high = 0; None when the width matches neither.
    fn classify(&self, width_us: u32) -> Option<bool> {
        match self.tolerance_us {
            None => Some(width_us <= self.midpoint_us),
            Some(tol) => {
                if width_us.abs_diff(self.short_us) <= tol {
                    Some(true)
                } else if width_us.abs_diff(self.long_us) <= tol {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }
}
