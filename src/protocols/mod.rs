//! Device profiles and decode dispatch for KeeLoq hopping-code remotes.
//!
//! Three named profiles share one decode entry point: standard HCS200/HCS300
//! timing under OOK and FSK carriers, and the Genie / Overhead Door
//! Intellicode variant at double baud. A profile is a plain value — timing
//! block plus a fn pointer — so registration is a table, not a trait object
//! hierarchy. The registry slices a pulse train per profile timing, hands
//! the resulting buffer to the decode fn, and logs rejects at the level each
//! classification deserves; the decoders themselves never log.

pub mod common;
pub mod hcs200;

use crate::bitbuffer::BitBuffer;
use crate::radio::demodulator::{LevelDuration, PwmSlicer};
use crate::report::Report;

/// Carrier modulation a profile expects from the receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    OokPwm,
    FskPwm,
}

/// Why a buffer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// Row lengths are not {12, 66}. Other protocols share the air; this is
    /// a normal occurrence, not an error.
    LengthMismatch,
    /// Right lengths, wrong preamble bits. Possibly a corrupted capture;
    /// worth a low-priority diagnostic.
    PreambleMismatch,
    /// Right shape, implausible all-0xff payload: demodulator noise.
    SanityFail,
}

impl Reject {
    /// Stable classification token reported to the dispatcher.
    pub fn classification(self) -> &'static str {
        match self {
            Reject::LengthMismatch => "LENGTH_MISMATCH",
            Reject::PreambleMismatch => "PREAMBLE_MISMATCH",
            Reject::SanityFail => "SANITY_FAIL",
        }
    }
}

/// Shared decode entry point signature: pure function of the buffer.
pub type DecodeFn = fn(&BitBuffer) -> Result<Report, Reject>;

/// Timing and dispatch data for one named modulation profile.
#[derive(Debug, Clone, Copy)]
pub struct DeviceProfile {
    pub name: &'static str,
    pub modulation: Modulation,
    pub short_pulse_us: u32,
    pub long_pulse_us: u32,
    /// A low gap at least this long ends the current row.
    pub gap_limit_us: u32,
    /// A low gap at least this long ends the transmission.
    pub reset_limit_us: u32,
    /// None: the slicer discriminates short/long at their midpoint.
    pub tolerance_us: Option<u32>,
    pub decode: DecodeFn,
}

/// Standard HCS200/HCS300 timing, OOK carrier. TE is nominally 400 µs but
/// drifts with temperature and battery voltage, hence the midpoint split.
pub static HCS200: DeviceProfile = DeviceProfile {
    name: "hcs200",
    modulation: Modulation::OokPwm,
    short_pulse_us: 393,
    long_pulse_us: 787,
    gap_limit_us: 1500,
    reset_limit_us: 9000,
    tolerance_us: None,
    decode: hcs200::decode,
};

/// Standard HCS200/HCS300 timing, FSK carrier.
pub static HCS200_FSK: DeviceProfile = DeviceProfile {
    name: "hcs200-fsk",
    modulation: Modulation::FskPwm,
    short_pulse_us: 393,
    long_pulse_us: 787,
    gap_limit_us: 1500,
    reset_limit_us: 9000,
    tolerance_us: None,
    decode: hcs200::decode,
};

/// Genie / Overhead Door Intellicode: same frame at double baud (TE 200 µs).
pub static INTELLICODE: DeviceProfile = DeviceProfile {
    name: "intellicode",
    modulation: Modulation::OokPwm,
    short_pulse_us: 197,
    long_pulse_us: 393,
    gap_limit_us: 750,
    reset_limit_us: 4500,
    tolerance_us: None,
    decode: hcs200::decode,
};

/// Every built-in profile, in dispatch order.
pub static ALL_PROFILES: [&DeviceProfile; 3] = [&HCS200, &HCS200_FSK, &INTELLICODE];

/// Registry of enabled profiles.
pub struct DecoderRegistry {
    profiles: Vec<&'static DeviceProfile>,
}

impl DecoderRegistry {
    /// Registry with all built-in profiles enabled.
    pub fn new() -> Self {
        Self {
            profiles: ALL_PROFILES.to_vec(),
        }
    }

    /// Registry restricted to the named profiles. Names that match nothing
    /// are returned so the caller can warn about them.
    pub fn with_enabled(names: &[String]) -> (Self, Vec<String>) {
        let mut profiles = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match ALL_PROFILES
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
            {
                Some(profile) => profiles.push(*profile),
                None => unknown.push(name.clone()),
            }
        }
        (Self { profiles }, unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profile_names(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.name).collect()
    }

    /// Run one pulse train through the enabled profiles and return the first
    /// successful decode. An RF hint (from the capturing tool) skips
    /// profiles on the other carrier so one transmission yields one record.
    pub fn process(
        &self,
        pairs: &[LevelDuration],
        rf: Option<Modulation>,
    ) -> Option<(&'static str, Report)> {
        for profile in &self.profiles {
            if let Some(hint) = rf {
                if profile.modulation != hint {
                    continue;
                }
            }

            let buffer = PwmSlicer::for_profile(profile).slice(pairs);
            if buffer.is_empty() {
                continue;
            }

            match (profile.decode)(&buffer) {
                Ok(report) => {
                    tracing::debug!(profile = profile.name, "decoded transmission");
                    return Some((profile.name, report));
                }
                Err(Reject::LengthMismatch) => {
                    // Foreign traffic; keep it out of normal diagnostic runs.
                    tracing::trace!(profile = profile.name, "length mismatch");
                }
                Err(reject) => {
                    tracing::debug!(
                        profile = profile.name,
                        classification = reject.classification(),
                        "rejected transmission"
                    );
                }
            }
        }
        None
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
