//! Unicode name comparison for HFS+ / HFSX volumes.
//!
//! HFSX (key compare type 0xBC) uses binary comparison of the raw UTF-16
//! code units. HFS+ (0xCF) compares case-folded code units with a fixed
//! folding table (Apple TN1150 FastUnicodeCompare); a small set of format
//! characters folds to nothing and is skipped entirely.

use std::cmp::Ordering;

/// Folding table entries for code points above ASCII that differ from
/// identity (Latin-1 Supplement and Latin Extended-A, per TN1150).
static CASE_FOLD: &[(u16, u16)] = &[
    (0x00C0, 0x00E0),
    (0x00C1, 0x00E1),
    (0x00C2, 0x00E2),
    (0x00C3, 0x00E3),
    (0x00C4, 0x00E4),
    (0x00C5, 0x00E5),
    (0x00C6, 0x00E6),
    (0x00C7, 0x00E7),
    (0x00C8, 0x00E8),
    (0x00C9, 0x00E9),
    (0x00CA, 0x00EA),
    (0x00CB, 0x00EB),
    (0x00CC, 0x00EC),
    (0x00CD, 0x00ED),
    (0x00CE, 0x00EE),
    (0x00CF, 0x00EF),
    (0x00D0, 0x00F0),
    (0x00D1, 0x00F1),
    (0x00D2, 0x00F2),
    (0x00D3, 0x00F3),
    (0x00D4, 0x00F4),
    (0x00D5, 0x00F5),
    (0x00D6, 0x00F6),
    (0x00D8, 0x00F8),
    (0x00D9, 0x00F9),
    (0x00DA, 0x00FA),
    (0x00DB, 0x00FB),
    (0x00DC, 0x00FC),
    (0x00DD, 0x00FD),
    (0x00DE, 0x00FE),
    (0x0100, 0x0101),
    (0x0102, 0x0103),
    (0x0104, 0x0105),
    (0x0106, 0x0107),
    (0x0108, 0x0109),
    (0x010A, 0x010B),
    (0x010C, 0x010D),
    (0x010E, 0x010F),
    (0x0110, 0x0111),
    (0x0112, 0x0113),
    (0x0114, 0x0115),
    (0x0116, 0x0117),
    (0x0118, 0x0119),
    (0x011A, 0x011B),
    (0x011C, 0x011D),
    (0x011E, 0x011F),
    (0x0120, 0x0121),
    (0x0122, 0x0123),
    (0x0124, 0x0125),
    (0x0126, 0x0127),
    (0x0128, 0x0129),
    (0x012A, 0x012B),
    (0x012C, 0x012D),
    (0x012E, 0x012F),
    (0x0130, 0x0069),
    (0x0132, 0x0133),
    (0x0134, 0x0135),
    (0x0136, 0x0137),
    (0x0139, 0x013A),
    (0x013B, 0x013C),
    (0x013D, 0x013E),
    (0x013F, 0x0140),
    (0x0141, 0x0142),
    (0x0143, 0x0144),
    (0x0145, 0x0146),
    (0x0147, 0x0148),
    (0x014A, 0x014B),
    (0x014C, 0x014D),
    (0x014E, 0x014F),
    (0x0150, 0x0151),
    (0x0152, 0x0153),
    (0x0154, 0x0155),
    (0x0156, 0x0157),
    (0x0158, 0x0159),
    (0x015A, 0x015B),
    (0x015C, 0x015D),
    (0x015E, 0x015F),
    (0x0160, 0x0161),
    (0x0162, 0x0163),
    (0x0164, 0x0165),
    (0x0166, 0x0167),
    (0x0168, 0x0169),
    (0x016A, 0x016B),
    (0x016C, 0x016D),
    (0x016E, 0x016F),
    (0x0170, 0x0171),
    (0x0172, 0x0173),
    (0x0174, 0x0175),
    (0x0176, 0x0177),
    (0x0178, 0x00FF),
    (0x0179, 0x017A),
    (0x017B, 0x017C),
    (0x017D, 0x017E),
];

/// Format characters that fold to nothing and are skipped by the
/// case-insensitive comparison.
fn is_ignorable(c: u16) -> bool {
    matches!(
        c,
        0x200C..=0x200F | 0x202A..=0x202E | 0x206A..=0x206F | 0xFEFF
    )
}

/// Case-fold a single UTF-16 code unit. Table lookup only, no allocation.
fn case_fold(c: u16) -> u16 {
    if (0x0041..=0x005A).contains(&c) {
        return c + 0x20;
    }
    match CASE_FOLD.binary_search_by_key(&c, |&(from, _)| from) {
        Ok(idx) => CASE_FOLD[idx].1,
        Err(_) => c,
    }
}

/// Binary comparison of raw UTF-16 code units (HFSX, compare type 0xBC).
/// Iterator-based so catalog keys compare straight from their on-disk
/// big-endian form without allocating.
pub fn compare_binary_iter<A, C>(a: A, b: C) -> Ordering
where
    A: Iterator<Item = u16>,
    C: Iterator<Item = u16>,
{
    let mut a = a.fuse();
    let mut b = b.fuse();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
        }
    }
}

/// Case-folded comparison (HFS+, compare type 0xCF). Ignorable code units
/// contribute nothing on either side.
pub fn compare_case_insensitive_iter<A, C>(a: A, b: C) -> Ordering
where
    A: Iterator<Item = u16>,
    C: Iterator<Item = u16>,
{
    compare_binary_iter(
        a.filter(|&c| !is_ignorable(c)).map(case_fold),
        b.filter(|&c| !is_ignorable(c)).map(case_fold),
    )
}

/// Binary comparison of two code-unit slices.
pub fn compare_binary(a: &[u16], b: &[u16]) -> Ordering {
    compare_binary_iter(a.iter().copied(), b.iter().copied())
}

/// Case-folded comparison of two code-unit slices.
pub fn compare_case_insensitive(a: &[u16], b: &[u16]) -> Ordering {
    compare_case_insensitive_iter(a.iter().copied(), b.iter().copied())
}

/// Iterate the code units of a UTF-16BE byte slice without copying it.
pub fn utf16be_units(bytes: &[u8]) -> impl Iterator<Item = u16> + '_ {
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
}

/// Convert a UTF-16BE byte slice to code units.
pub fn utf16be_to_units(bytes: &[u8]) -> Vec<u16> {
    utf16be_units(bytes).collect()
}

/// Convert UTF-16 code units to a Rust string (lossy on unpaired surrogates).
pub fn units_to_string(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

/// Encode a Rust string as HFS+ UTF-16 code units.
pub fn str_to_units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}
