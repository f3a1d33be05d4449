//! MacRoman name handling for classic HFS volumes.
//!
//! Classic HFS stores names as Pascal strings of MacRoman bytes and compares
//! them case-insensitively through an upper-case table.

use std::cmp::Ordering;

/// Unicode mapping for MacRoman bytes 0x80..=0xFF (0x00..=0x7F are ASCII).
static MACROMAN_HIGH: [u16; 128] = [
    0x00C4, 0x00C5, 0x00C7, 0x00C9, 0x00D1, 0x00D6, 0x00DC, 0x00E1, // 0x80
    0x00E0, 0x00E2, 0x00E4, 0x00E3, 0x00E5, 0x00E7, 0x00E9, 0x00E8,
    0x00EA, 0x00EB, 0x00ED, 0x00EC, 0x00EE, 0x00EF, 0x00F1, 0x00F3, // 0x90
    0x00F2, 0x00F4, 0x00F6, 0x00F5, 0x00FA, 0x00F9, 0x00FB, 0x00FC,
    0x2020, 0x00B0, 0x00A2, 0x00A3, 0x00A7, 0x2022, 0x00B6, 0x00DF, // 0xA0
    0x00AE, 0x00A9, 0x2122, 0x00B4, 0x00A8, 0x2260, 0x00C6, 0x00D8,
    0x221E, 0x00B1, 0x2264, 0x2265, 0x00A5, 0x00B5, 0x2202, 0x2211, // 0xB0
    0x220F, 0x03C0, 0x222B, 0x00AA, 0x00BA, 0x03A9, 0x00E6, 0x00F8,
    0x00BF, 0x00A1, 0x00AC, 0x221A, 0x0192, 0x2248, 0x2206, 0x00AB, // 0xC0
    0x00BB, 0x2026, 0x00A0, 0x00C0, 0x00C3, 0x00D5, 0x0152, 0x0153,
    0x2013, 0x2014, 0x201C, 0x201D, 0x2018, 0x2019, 0x00F7, 0x25CA, // 0xD0
    0x00FF, 0x0178, 0x2044, 0x20AC, 0x2039, 0x203A, 0xFB01, 0xFB02,
    0x2021, 0x00B7, 0x201A, 0x201E, 0x2030, 0x00C2, 0x00CA, 0x00C1, // 0xE0
    0x00CB, 0x00C8, 0x00CD, 0x00CE, 0x00CF, 0x00CC, 0x00D3, 0x00D4,
    0xF8FF, 0x00D2, 0x00DA, 0x00DB, 0x00D9, 0x0131, 0x02C6, 0x02DC, // 0xF0
    0x00AF, 0x02D8, 0x02D9, 0x02DA, 0x00B8, 0x02DD, 0x02DB, 0x02C7,
];

/// Lower/upper pairs for MacRoman bytes where both cases exist in the
/// encoding. ASCII a-z is handled arithmetically.
static UPPER_PAIRS: &[(u8, u8)] = &[
    (0x87, 0xE7), // á -> Á
    (0x88, 0xCB), // à -> À
    (0x89, 0xE5), // â -> Â
    (0x8A, 0x80), // ä -> Ä
    (0x8B, 0xCC), // ã -> Ã
    (0x8C, 0x81), // å -> Å
    (0x8D, 0x82), // ç -> Ç
    (0x8E, 0x83), // é -> É
    (0x8F, 0xE9), // è -> È
    (0x90, 0xE6), // ê -> Ê
    (0x91, 0xE8), // ë -> Ë
    (0x92, 0xEA), // í -> Í
    (0x93, 0xED), // ì -> Ì
    (0x94, 0xEB), // î -> Î
    (0x95, 0xEC), // ï -> Ï
    (0x96, 0x84), // ñ -> Ñ
    (0x97, 0xEE), // ó -> Ó
    (0x98, 0xF1), // ò -> Ò
    (0x99, 0xEF), // ô -> Ô
    (0x9A, 0x85), // ö -> Ö
    (0x9B, 0xCD), // õ -> Õ
    (0x9C, 0xF2), // ú -> Ú
    (0x9D, 0xF4), // ù -> Ù
    (0x9E, 0xF3), // û -> Û
    (0x9F, 0x86), // ü -> Ü
    (0xBE, 0xAE), // æ -> Æ
    (0xBF, 0xAF), // ø -> Ø
    (0xCF, 0xCE), // œ -> Œ
    (0xD8, 0xD9), // ÿ -> Ÿ
];

/// Upper-case a single MacRoman byte for comparison purposes.
fn upper(c: u8) -> u8 {
    if c.is_ascii_lowercase() {
        return c - 0x20;
    }
    match UPPER_PAIRS.binary_search_by_key(&c, |&(from, _)| from) {
        Ok(idx) => UPPER_PAIRS[idx].1,
        Err(_) => c,
    }
}

/// Case-insensitive comparison of two MacRoman names.
pub fn compare_case_insensitive(a: &[u8], b: &[u8]) -> Ordering {
    let len = a.len().min(b.len());
    for i in 0..len {
        match upper(a[i]).cmp(&upper(b[i])) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

/// Decode a MacRoman byte string to a Rust string.
pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                // Mapped code points are all in the BMP.
                char::from_u32(MACROMAN_HIGH[(b - 0x80) as usize] as u32).unwrap_or('\u{FFFD}')
            }
        })
        .collect()
}

/// Encode a Rust string as MacRoman, or `None` when a character has no
/// MacRoman representation (such a name cannot exist on a classic volume).
pub fn encode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let code = c as u32;
        if code < 0x80 {
            out.push(code as u8);
        } else {
            let unit = u16::try_from(code).ok()?;
            let pos = MACROMAN_HIGH.iter().position(|&m| m == unit)?;
            out.push(0x80 + pos as u8);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_case_insensitive() {
        assert_eq!(compare_case_insensitive(b"README", b"readme"), Ordering::Equal);
        assert_eq!(compare_case_insensitive(b"abc", b"ABD"), Ordering::Less);
        assert_eq!(compare_case_insensitive(b"abc", b"ab"), Ordering::Greater);
    }

    #[test]
    fn test_accented_case_insensitive() {
        // ä (0x8A) compares equal to Ä (0x80)
        assert_eq!(compare_case_insensitive(&[0x8A], &[0x80]), Ordering::Equal);
    }

    #[test]
    fn test_decode_encode_roundtrip() {
        let name = "Système Dossier";
        let encoded = encode(name).unwrap();
        assert_eq!(decode(&encoded), name);
    }

    #[test]
    fn test_encode_unmappable() {
        assert!(encode("日本語").is_none());
    }
}
