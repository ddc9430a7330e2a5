//! Microchip HCS200/HCS300 KeeLoq code-hopping remote decoder.
//!
//! 66 bits transmitted, LSB first:
//!
//! |  0-31 | Encrypted portion
//! | 32-59 | Serial number
//! | 60-63 | Button status (S3, S0, S1, S2)
//! |  64   | Battery low
//! |  65   | Repeat
//!
//! The data row is preceded by a 12-bit all-ones preamble row. Because the
//! wire is LSB-first and the slicer packs rows MSB-first, every byte of a
//! multi-byte field is bit-reversed before reassembly. The button nibble is
//! the exception: it is read in packed order, then repositioned, since the
//! encoder emits it as (S3, S0, S1, S2) while consumers number buttons with
//! S3 highest and S2 lowest. All four button bits set at once is the
//! transmitter's learn mode, not a button press.
//!
//! Genie / Overhead Door Intellicode remotes transmit the same frame at
//! double baud and decode through this same entry point.
//!
//! Decoding is pure: no state between calls, no diagnostics emitted here.
//! The dispatcher in [super] decides what to log for each [Reject].

use super::common::reverse8;
use super::Reject;
use crate::bitbuffer::BitBuffer;
use crate::report::{FieldValue, Report};

/// Model constant reported by every profile sharing this frame layout.
pub const MODEL: &str = "Microchip-HCS200";

const PREAMBLE_BITS: usize = 12;
const DATA_BITS: usize = 66;
/// The 66-bit row spans 9 packed bytes; byte 8 carries only the flag bits.
const DATA_BYTES: usize = 9;

/// Raw values extracted from one validated frame. Transient: built fresh
/// per call, discarded once the report exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecodedFrame {
    encrypted: u32,
    /// 28-bit serial number.
    serial: u32,
    button_raw: u8,
    button_index: u8,
    learn: bool,
    battery_low: bool,
    repeat: bool,
}

/// Decode one two-row buffer into an output record.
pub fn decode(buffer: &BitBuffer) -> Result<Report, Reject> {
    validate_shape(buffer)?;

    // Shape validation pinned the row to 66 bits, which packs into exactly
    // 9 bytes; the checked slice guards against a buffer that lies.
    let row = buffer.row_bytes(1);
    let Some(data) = row.get(..DATA_BYTES) else {
        return Err(Reject::LengthMismatch);
    };

    sanity_check(data)?;
    let frame = extract_fields(data);
    Ok(build_report(&frame))
}

/// Row count, row lengths, and the 0xFFF preamble pattern.
fn validate_shape(buffer: &BitBuffer) -> Result<(), Reject> {
    if buffer.num_rows() != 2
        || buffer.bits_per_row(0) != PREAMBLE_BITS
        || buffer.bits_per_row(1) != DATA_BITS
    {
        return Err(Reject::LengthMismatch);
    }
    let preamble = buffer.row_bytes(0);
    let header_ok = preamble.first() == Some(&0xFF)
        && preamble.get(1).is_some_and(|b| b & 0xF0 == 0xF0);
    if !header_ok {
        return Err(Reject::PreambleMismatch);
    }
    Ok(())
}

/// Reject degenerate captures where bytes 1..=7 are all 0xff. Byte 0 (low
/// byte of the encrypted field) alone being 0xff is not diagnostic and is
/// excluded from the check.
fn sanity_check(data: &[u8]) -> Result<(), Reject> {
    if data[1..8].iter().all(|&b| b == 0xFF) {
        return Err(Reject::SanityFail);
    }
    Ok(())
}

fn extract_fields(b: &[u8]) -> DecodedFrame {
    debug_assert!(b.len() >= DATA_BYTES);

    let encrypted = u32::from_be_bytes([
        reverse8(b[3]),
        reverse8(b[2]),
        reverse8(b[1]),
        reverse8(b[0]),
    ]);
    // Only the top nibble of byte 7 belongs to the serial; mask before the
    // reversal so the button bits stay out of it.
    let serial = u32::from_be_bytes([
        reverse8(b[7] & 0xF0),
        reverse8(b[6]),
        reverse8(b[5]),
        reverse8(b[4]),
    ]);
    // Button/flag nibble is in packed order, not bit-reversed.
    let button_raw = b[7] & 0x0F;

    DecodedFrame {
        encrypted,
        serial,
        button_raw,
        button_index: normalize_button(button_raw),
        learn: button_raw == 0x0F,
        battery_low: b[8] & 0x80 != 0,
        repeat: b[8] & 0x40 != 0,
    }
}

/// Reposition the wire nibble (bit3..bit0 = S3, S0, S1, S2) into canonical
/// significance order: S3 stays at bit 3, S0 moves to bit 2, S1 stays at
/// bit 1, S2 moves to bit 0.
fn normalize_button(raw: u8) -> u8 {
    (raw & 0x08) | ((raw & 0x01) << 2) | (raw & 0x02) | ((raw & 0x04) >> 2)
}

fn build_report(frame: &DecodedFrame) -> Report {
    Report::new(vec![
        ("model", FieldValue::Str(MODEL.to_string())),
        ("id", FieldValue::Str(format!("{:07X}", frame.serial))),
        ("battery_ok", FieldValue::Bool(!frame.battery_low)),
        ("button", FieldValue::Int(frame.button_index as i64)),
        ("learn", FieldValue::Bool(frame.learn)),
        ("repeat", FieldValue::Bool(frame.repeat)),
        ("encrypted", FieldValue::Str(format!("{:08X}", frame.encrypted))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OUTPUT_FIELDS;

    fn push_bits(buf: &mut BitBuffer, bytes: &[u8], count: usize) {
        for i in 0..count {
            buf.add_bit(bytes[i / 8] & (0x80 >> (i % 8)) != 0);
        }
    }

    fn build(preamble: &[u8], preamble_bits: usize, data: &[u8], data_bits: usize) -> BitBuffer {
        let mut buf = BitBuffer::new();
        push_bits(&mut buf, preamble, preamble_bits);
        buf.new_row();
        push_bits(&mut buf, data, data_bits);
        buf
    }

    const GOOD_PREAMBLE: [u8; 2] = [0xFF, 0xF0];
    const SCENARIO_A: [u8; 9] = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0x07, 0x00];

    fn valid_buffer(data: &[u8; 9]) -> BitBuffer {
        build(&GOOD_PREAMBLE, PREAMBLE_BITS, data, DATA_BITS)
    }

    #[test]
    fn scenario_a_extracts_all_fields() {
        let report = decode(&valid_buffer(&SCENARIO_A)).unwrap();
        // encrypted from reversed bytes 0..=3, serial from reversed 4..=6
        // plus the reversed top nibble of byte 7
        assert_eq!(report.get("encrypted"), Some(&FieldValue::Str("1E6A2C48".into())));
        assert_eq!(report.get("id"), Some(&FieldValue::Str("07B3D59".into())));
        assert_eq!(report.get("button"), Some(&FieldValue::Int(7)));
        assert_eq!(report.get("learn"), Some(&FieldValue::Bool(false)));
        assert_eq!(report.get("battery_ok"), Some(&FieldValue::Bool(true)));
        assert_eq!(report.get("repeat"), Some(&FieldValue::Bool(false)));
        assert_eq!(report.get("model"), Some(&FieldValue::Str(MODEL.into())));
    }

    #[test]
    fn scenario_b_learn_nibble() {
        let mut data = SCENARIO_A;
        data[7] = (data[7] & 0xF0) | 0x0F;
        let report = decode(&valid_buffer(&data)).unwrap();
        assert_eq!(report.get("learn"), Some(&FieldValue::Bool(true)));
        assert_eq!(report.get("button"), Some(&FieldValue::Int(0x0F)));
        // serial comes only from the masked top nibble, so it is unchanged
        assert_eq!(report.get("id"), Some(&FieldValue::Str("07B3D59".into())));
    }

    #[test]
    fn scenario_c_all_ff_payload_fails_sanity() {
        let mut data = [0xFF; 9];
        data[0] = 0x12;
        data[8] = 0x00;
        assert_eq!(decode(&valid_buffer(&data)), Err(Reject::SanityFail));
    }

    #[test]
    fn byte0_ff_alone_is_not_noise() {
        let mut data = SCENARIO_A;
        data[0] = 0xFF;
        assert!(decode(&valid_buffer(&data)).is_ok());
    }

    #[test]
    fn scenario_d_short_preamble_row() {
        let buf = build(&GOOD_PREAMBLE, 11, &SCENARIO_A, DATA_BITS);
        assert_eq!(decode(&buf), Err(Reject::LengthMismatch));
    }

    #[test]
    fn wrong_data_row_lengths() {
        for bits in [65, 67] {
            let buf = build(&GOOD_PREAMBLE, PREAMBLE_BITS, &SCENARIO_A, bits);
            assert_eq!(decode(&buf), Err(Reject::LengthMismatch), "{} bits", bits);
        }
    }

    #[test]
    fn wrong_row_count() {
        let mut one_row = BitBuffer::new();
        push_bits(&mut one_row, &GOOD_PREAMBLE, PREAMBLE_BITS);
        assert_eq!(decode(&one_row), Err(Reject::LengthMismatch));

        let mut three_rows = valid_buffer(&SCENARIO_A);
        three_rows.new_row();
        three_rows.add_bit(true);
        assert_eq!(decode(&three_rows), Err(Reject::LengthMismatch));
    }

    #[test]
    fn preamble_content_is_checked() {
        // right lengths, wrong bits
        for preamble in [[0x7F, 0xF0], [0xFF, 0x70], [0x00, 0x00]] {
            let buf = build(&preamble, PREAMBLE_BITS, &SCENARIO_A, DATA_BITS);
            assert_eq!(decode(&buf), Err(Reject::PreambleMismatch), "{:02X?}", preamble);
        }
    }

    #[test]
    fn battery_and_repeat_flags() {
        let mut data = SCENARIO_A;
        data[8] = 0x80;
        let report = decode(&valid_buffer(&data)).unwrap();
        assert_eq!(report.get("battery_ok"), Some(&FieldValue::Bool(false)));
        assert_eq!(report.get("repeat"), Some(&FieldValue::Bool(false)));

        data[8] = 0x40;
        let report = decode(&valid_buffer(&data)).unwrap();
        assert_eq!(report.get("battery_ok"), Some(&FieldValue::Bool(true)));
        assert_eq!(report.get("repeat"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn button_map_is_a_bijection() {
        let mut seen = [false; 16];
        for raw in 0..16u8 {
            let idx = normalize_button(raw);
            assert!(idx < 16);
            assert!(!seen[idx as usize], "raw {:X} collides", raw);
            seen[idx as usize] = true;
        }
        // spot-check the permutation: S0 (wire bit 0) lands at bit 2,
        // S2 (wire bit 2) lands at bit 0
        assert_eq!(normalize_button(0x1), 0x4);
        assert_eq!(normalize_button(0x4), 0x1);
        assert_eq!(normalize_button(0x2), 0x2);
        assert_eq!(normalize_button(0x8), 0x8);
    }

    #[test]
    fn learn_iff_all_button_bits() {
        for nibble in 0..16u8 {
            let mut data = SCENARIO_A;
            data[7] = (data[7] & 0xF0) | nibble;
            let report = decode(&valid_buffer(&data)).unwrap();
            let expected = nibble == 0x0F;
            assert_eq!(report.get("learn"), Some(&FieldValue::Bool(expected)));
        }
    }

    #[test]
    fn decode_is_idempotent() {
        let buf = valid_buffer(&SCENARIO_A);
        let first = decode(&buf).unwrap();
        let second = decode(&buf).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn report_fields_in_declared_order() {
        let report = decode(&valid_buffer(&SCENARIO_A)).unwrap();
        let keys: Vec<&str> = report.fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, OUTPUT_FIELDS);
    }

    #[test]
    fn hex_fields_are_zero_padded() {
        let data = [0x80, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00];
        let report = decode(&valid_buffer(&data)).unwrap();
        // rev(0x80) = 0x01 in the lowest byte of each field
        assert_eq!(report.get("encrypted"), Some(&FieldValue::Str("00000001".into())));
        assert_eq!(report.get("id"), Some(&FieldValue::Str("0000001".into())));
    }
}
