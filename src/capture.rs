//! Pulse capture input: the level+duration sequences the decoders consume.
//!
//! Captures arrive in two forms. JSON files hold one capture object or an
//! array of them, as written by the capturing tool. Text streams (stdin
//! pipes) hold one `H <µs>` / `L <µs>` pair per line — `1`/`0` also work —
//! with `#` comments and a blank line separating captures. Both forms
//! produce [PulseCapture] values; the decoders never see the difference.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocols::Modulation;
use crate::radio::LevelDuration;

/// Level+duration pair for storage (serializable version)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredLevelDuration {
    pub level: bool,
    pub duration_us: u32,
}

/// Receive-path hint recorded by the capturing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfHint {
    /// AM/OOK envelope path
    Am,
    /// 2FSK discriminator path
    Fsk,
}

impl RfHint {
    pub fn modulation(self) -> Modulation {
        match self {
            RfHint::Am => Modulation::OokPwm,
            RfHint::Fsk => Modulation::FskPwm,
        }
    }
}

/// One demodulated transmission as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseCapture {
    /// When the signal was captured; stamped at parse time for text input.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Capture frequency in Hz, if the capturing tool recorded it.
    #[serde(default)]
    pub frequency: Option<u32>,
    /// Which receive path produced this capture; used to skip profiles on
    /// the other carrier.
    #[serde(default)]
    pub rf: Option<RfHint>,
    /// Source file; None for stdin captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Raw level+duration pairs
    pub raw_pairs: Vec<StoredLevelDuration>,
}

impl PulseCapture {
    pub fn from_pairs(pairs: Vec<StoredLevelDuration>) -> Self {
        Self {
            timestamp: Utc::now(),
            frequency: None,
            rf: None,
            source_file: None,
            raw_pairs: pairs,
        }
    }

    /// Pairs in the form the slicer consumes.
    pub fn pairs(&self) -> Vec<LevelDuration> {
        self.raw_pairs
            .iter()
            .map(|p| LevelDuration::new(p.level, p.duration_us))
            .collect()
    }

    /// Short label for diagnostics.
    pub fn source_label(&self) -> &str {
        self.source_file.as_deref().unwrap_or("<stdin>")
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capture JSON in {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: malformed pulse entry {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// Load captures from a JSON file holding one capture object or an array.
pub fn load_json(path: &Path) -> Result<Vec<PulseCapture>, CaptureError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| CaptureError::Io {
        path: display.clone(),
        source,
    })?;

    let trimmed = text.trim_start();
    let mut captures: Vec<PulseCapture> = if trimmed.starts_with('[') {
        serde_json::from_str(&text).map_err(|source| CaptureError::Json {
            path: display.clone(),
            source,
        })?
    } else {
        let capture = serde_json::from_str(&text).map_err(|source| CaptureError::Json {
            path: display.clone(),
            source,
        })?;
        vec![capture]
    };

    for capture in &mut captures {
        capture.source_file.get_or_insert_with(|| display.clone());
    }
    Ok(captures)
}

/// Parse the line-oriented text form. Blank lines close the current capture;
/// trailing pairs form the final one.
pub fn parse_pulse_text(input: &str) -> Result<Vec<PulseCapture>, CaptureError> {
    let mut captures = Vec::new();
    let mut pairs: Vec<StoredLevelDuration> = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            if !pairs.is_empty() {
                captures.push(PulseCapture::from_pairs(std::mem::take(&mut pairs)));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let malformed = || CaptureError::MalformedLine {
            line: idx + 1,
            text: raw_line.to_string(),
        };

        let mut tokens = line.split_whitespace();
        let level = match tokens.next() {
            Some(t) if t.eq_ignore_ascii_case("h") || t == "1" => true,
            Some(t) if t.eq_ignore_ascii_case("l") || t == "0" => false,
            _ => return Err(malformed()),
        };
        let duration_us = tokens
            .next()
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(|| malformed())?;
        if tokens.next().is_some() {
            return Err(malformed());
        }

        pairs.push(StoredLevelDuration { level, duration_us });
    }

    if !pairs.is_empty() {
        captures.push(PulseCapture::from_pairs(pairs));
    }
    Ok(captures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_pairs_parse() {
        let caps = parse_pulse_text("H 393\nL 787\n1 393\n0 1500\n").unwrap();
        assert_eq!(caps.len(), 1);
        let pairs = caps[0].pairs();
        assert_eq!(pairs.len(), 4);
        assert!(pairs[0].level);
        assert_eq!(pairs[1].duration_us, 787);
        assert!(pairs[2].level);
        assert!(!pairs[3].level);
    }

    #[test]
    fn blank_line_splits_captures() {
        let caps = parse_pulse_text("H 393\n\nH 197\nL 393\n").unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[0].raw_pairs.len(), 1);
        assert_eq!(caps[1].raw_pairs.len(), 2);
    }

    #[test]
    fn comments_and_padding_are_ignored() {
        let caps = parse_pulse_text("# preamble\n  H 393  \n# done\n").unwrap();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].raw_pairs.len(), 1);
    }

    #[test]
    fn malformed_lines_carry_position() {
        let err = parse_pulse_text("H 393\nX 100\n").unwrap_err();
        match err {
            CaptureError::MalformedLine { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "X 100");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse_pulse_text("H\n").is_err());
        assert!(parse_pulse_text("H 393 extra\n").is_err());
        assert!(parse_pulse_text("H -5\n").is_err());
    }

    #[test]
    fn empty_input_is_no_captures() {
        assert!(parse_pulse_text("").unwrap().is_empty());
        assert!(parse_pulse_text("\n# nothing\n\n").unwrap().is_empty());
    }

    #[test]
    fn json_capture_round_trips() {
        let capture = PulseCapture {
            timestamp: Utc::now(),
            frequency: Some(433_920_000),
            rf: Some(RfHint::Am),
            source_file: None,
            raw_pairs: vec![StoredLevelDuration {
                level: true,
                duration_us: 393,
            }],
        };
        let json = serde_json::to_string(&capture).unwrap();
        let back: PulseCapture = serde_json::from_str(&json).unwrap();
        assert_eq!(back.frequency, Some(433_920_000));
        assert_eq!(back.rf, Some(RfHint::Am));
        assert_eq!(back.raw_pairs.len(), 1);
    }

    #[test]
    fn rf_hint_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RfHint::Fsk).unwrap(), "\"fsk\"");
    }
}
