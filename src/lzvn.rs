//! LZVN decompression.
//!
//! LZVN is a byte-oriented opcode machine: each opcode emits a run of
//! literals from the compressed stream and/or a back-reference copy within
//! the output. Overlapping copies are legal and serve as run-length
//! encoding.

use crate::error::{HfsError, Result};

// Opcode kinds.
const DS: u8 = 0; // distance small: distance in opcode + 1 byte
const DM: u8 = 1; // distance medium: distance split across 2 extra bytes
const DL: u8 = 2; // distance large: distance in 2 extra bytes
const DP: u8 = 3; // distance previous: reuse the last distance
const LS: u8 = 4; // literal small: size in the opcode
const LL: u8 = 5; // literal large: size in the next byte + 16
const MS: u8 = 6; // match small: size in the opcode, previous distance
const ML: u8 = 7; // match large: size in the next byte + 16
const EOS: u8 = 8; // end of stream
const NOP: u8 = 9; // no operation
const INV: u8 = 10; // invalid opcode

/// Opcode to kind, for all 256 opcode values.
static OPCODE_KINDS: [u8; 256] = [
    DS, DS, DS, DS, DS, DS, EOS, DL, DS, DS, DS, DS, DS, DS, NOP, DL, // 0x00
    DS, DS, DS, DS, DS, DS, NOP, DL, DS, DS, DS, DS, DS, DS, INV, DL, // 0x10
    DS, DS, DS, DS, DS, DS, INV, DL, DS, DS, DS, DS, DS, DS, INV, DL, // 0x20
    DS, DS, DS, DS, DS, DS, INV, DL, DS, DS, DS, DS, DS, DS, INV, DL, // 0x30
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0x40
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0x50
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0x60
    INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, // 0x70
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0x80
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0x90
    DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, // 0xA0
    DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, DM, // 0xB0
    DS, DS, DS, DS, DS, DS, DP, DL, DS, DS, DS, DS, DS, DS, DP, DL, // 0xC0
    INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, INV, // 0xD0
    LL, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, LS, // 0xE0
    ML, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, MS, // 0xF0
];

fn truncated() -> HfsError {
    HfsError::CorruptedData("LZVN stream truncated inside an opcode".into())
}

/// Decompress an LZVN stream into `dst`. Decoding stops at the end-of-stream
/// opcode, when the compressed input is exhausted, or when `dst` is full.
/// Returns the number of bytes written.
pub fn decompress(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut sp = 0usize; // compressed cursor
    let mut dp = 0usize; // uncompressed cursor
    let mut distance = 0usize;

    while sp < src.len() && dp < dst.len() {
        let opcode = src[sp];
        sp += 1;

        let mut literal_size = 0usize;
        let mut match_size = 0usize;

        match OPCODE_KINDS[opcode as usize] {
            DS => {
                if sp >= src.len() {
                    return Err(truncated());
                }
                literal_size = ((opcode & 0xC0) >> 6) as usize;
                match_size = (((opcode & 0x38) >> 3) + 3) as usize;
                distance = (((opcode & 0x07) as usize) << 8) | src[sp] as usize;
                sp += 1;
            }
            DM => {
                if sp + 1 >= src.len() {
                    return Err(truncated());
                }
                let extra = src[sp];
                sp += 1;
                literal_size = ((opcode & 0x18) >> 3) as usize;
                match_size = ((((opcode & 0x07) << 2) | (extra & 0x03)) + 3) as usize;
                distance = ((src[sp] as usize) << 6) | ((extra & 0xFC) >> 2) as usize;
                sp += 1;
            }
            DL => {
                if sp + 1 >= src.len() {
                    return Err(truncated());
                }
                let low = src[sp];
                sp += 1;
                literal_size = ((opcode & 0xC0) >> 6) as usize;
                match_size = (((opcode & 0x38) >> 3) + 3) as usize;
                distance = ((src[sp] as usize) << 8) | low as usize;
                sp += 1;
            }
            DP => {
                literal_size = ((opcode & 0xC0) >> 6) as usize;
                match_size = (((opcode & 0x38) >> 3) + 3) as usize;
            }
            LL => {
                if sp >= src.len() {
                    return Err(truncated());
                }
                literal_size = src[sp] as usize + 16;
                sp += 1;
            }
            LS => {
                literal_size = (opcode & 0x0F) as usize;
            }
            ML => {
                if sp >= src.len() {
                    return Err(truncated());
                }
                match_size = src[sp] as usize + 16;
                sp += 1;
            }
            MS => {
                match_size = (opcode & 0x0F) as usize;
            }
            EOS => break,
            NOP => {}
            _ => {
                return Err(HfsError::CorruptedData(format!(
                    "invalid LZVN opcode 0x{:02X}",
                    opcode
                )));
            }
        }

        if literal_size > 0 {
            if sp + literal_size > src.len() {
                return Err(HfsError::CorruptedData(
                    "LZVN literal exceeds compressed data".into(),
                ));
            }
            if dp + literal_size > dst.len() {
                return Err(HfsError::CorruptedData(
                    "LZVN literal exceeds uncompressed capacity".into(),
                ));
            }
            dst[dp..dp + literal_size].copy_from_slice(&src[sp..sp + literal_size]);
            sp += literal_size;
            dp += literal_size;
        }

        if match_size > 0 {
            if distance > dp {
                return Err(HfsError::CorruptedData(
                    "LZVN match distance exceeds output written so far".into(),
                ));
            }
            if dp + match_size > dst.len() {
                return Err(HfsError::CorruptedData(
                    "LZVN match exceeds uncompressed capacity".into(),
                ));
            }
            // Byte-by-byte: source and destination may overlap.
            let mut from = dp - distance;
            for _ in 0..match_size {
                dst[dp] = dst[from];
                dp += 1;
                from += 1;
            }
        }
    }

    Ok(dp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_literal_block() {
        // LITERAL_LARGE with next byte 0 -> 16 literal bytes, then
        // END_OF_STREAM.
        let compressed: &[u8] = &[
            0xE0, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C,
            0x0D, 0x0E, 0x0F, 0x06,
        ];
        let mut out = [0u8; 32];
        let written = decompress(compressed, &mut out).unwrap();
        assert_eq!(written, 16);
        assert_eq!(
            &out[..16],
            &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]
        );
    }

    #[test]
    fn test_overlapping_match_run_length() {
        // Literal "AB", DISTANCE_SMALL match of 3 at distance 2, then a
        // MATCH_SMALL of 3 reusing the distance: run-length "ABABABAB".
        let compressed: &[u8] = &[0xE2, b'A', b'B', 0x00, 0x02, 0xF3, 0x06];
        let mut out = [0u8; 16];
        let written = decompress(compressed, &mut out).unwrap();
        assert_eq!(written, 8);
        assert_eq!(&out[..8], b"ABABABAB");
    }

    #[test]
    fn test_distance_large_opcode() {
        // Opcode 0x47: literal 1, match 3, distance from the next two bytes
        // (low then high). Literal 'X' then distance 1 copies 'X' thrice.
        let compressed: &[u8] = &[0x47, 0x01, 0x00, b'X', 0x06];
        let mut out = [0u8; 8];
        let written = decompress(compressed, &mut out).unwrap();
        assert_eq!(written, 4);
        assert_eq!(&out[..4], b"XXXX");
    }

    #[test]
    fn test_invalid_opcode() {
        let mut out = [0u8; 8];
        assert!(matches!(
            decompress(&[0x1E], &mut out),
            Err(HfsError::CorruptedData(_))
        ));
        assert!(matches!(
            decompress(&[0x70], &mut out),
            Err(HfsError::CorruptedData(_))
        ));
    }

    #[test]
    fn test_truncated_literal() {
        // LITERAL_SMALL of 4 with only 2 bytes following.
        let mut out = [0u8; 8];
        assert!(matches!(
            decompress(&[0xE4, b'a', b'b'], &mut out),
            Err(HfsError::CorruptedData(_))
        ));
    }

    #[test]
    fn test_match_before_any_output() {
        // MATCH_SMALL with no prior literal: distance 0 is fine, but a
        // non-zero previous distance never exists, so a DISTANCE_SMALL with
        // distance beyond the cursor must fail.
        let mut out = [0u8; 8];
        assert!(matches!(
            decompress(&[0x00, 0x05], &mut out),
            Err(HfsError::CorruptedData(_))
        ));
    }

    #[test]
    fn test_input_exhaustion_terminates() {
        // No END_OF_STREAM: decoding stops when the input runs out.
        let compressed: &[u8] = &[0xE2, b'h', b'i'];
        let mut out = [0u8; 8];
        let written = decompress(compressed, &mut out).unwrap();
        assert_eq!(written, 2);
        assert_eq!(&out[..2], b"hi");
    }
}
