// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! UTF-8 sequence scanning, case folding, cropping, and the common-word
//! table. Everything here operates on raw bytes rather than `str` because
//! the indexer and query engine both need destructive, in-place transforms
//! (fold-then-crop) on scratch buffers that get reused across millions of
//! words during install.
//!
//! `DEPTH` and `MIN` are the two constants that tune indexing: a word must
//! fold to at least `MIN` characters to be indexable or queryable, and a
//! prefix is truncated to at most `DEPTH` characters before it becomes an
//! index key.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::{DeenError, Result};

/// Max unicode character length of a prefix.
pub const DEPTH: usize = 5;
/// Min unicode character length of an indexable word or queryable keyword.
pub const MIN: usize = 3;

/// Classification of a single UTF-8 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceResult {
    Ok,
    Bad,
    Incomplete,
}

/// Length in bytes of the UTF-8 sequence starting at `bytes[0]`, along with
/// its classification. A `Bad`/`Incomplete` result carries no meaningful
/// length.
pub fn sequence_len(bytes: &[u8]) -> (SequenceResult, usize) {
    if bytes.is_empty() {
        return (SequenceResult::Incomplete, 0);
    }

    let lead = bytes[0];
    let expected_len = if lead & 0x80 == 0 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        return (SequenceResult::Bad, 0);
    };

    if bytes.len() < expected_len {
        return (SequenceResult::Incomplete, 0);
    }

    for &b in &bytes[1..expected_len] {
        if b & 0xC0 != 0x80 {
            return (SequenceResult::Bad, 0);
        }
    }

    (SequenceResult::Ok, expected_len)
}

/// Count the number of UTF-8 sequences (characters) in `bytes`.
pub fn sequences_count(bytes: &[u8]) -> Result<usize> {
    let mut count = 0usize;
    let mut offset = 0usize;

    while offset < bytes.len() {
        match sequence_len(&bytes[offset..]) {
            (SequenceResult::Ok, len) => {
                offset += len;
                count += 1;
            }
            (SequenceResult::Bad, _) => return Err(DeenError::BadUtf8 { offset }),
            (SequenceResult::Incomplete, _) => {
                return Err(DeenError::IncompleteUtf8 { offset })
            }
        }
    }

    Ok(count)
}

/// Crop `buf` in place to the first `unicode_length` complete sequences,
/// truncating the `Vec` and returning the number of characters retained
/// (which is `< unicode_length` only if the buffer ended first).
pub fn crop_to_unicode_len(buf: &mut Vec<u8>, unicode_length: usize) -> Result<usize> {
    let mut offset = 0usize;
    let mut count = 0usize;

    while count < unicode_length && offset < buf.len() {
        match sequence_len(&buf[offset..]) {
            (SequenceResult::Ok, len) => {
                offset += len;
                count += 1;
            }
            (SequenceResult::Bad, _) => return Err(DeenError::BadUtf8 { offset }),
            (SequenceResult::Incomplete, _) => {
                return Err(DeenError::IncompleteUtf8 { offset })
            }
        }
    }

    buf.truncate(offset);
    Ok(count)
}

/// Two-byte UTF-8 sequences for the German accented letters this crate
/// folds, paired lowercase -> uppercase. `ß` folds to itself.
const ACCENT_FOLD_PAIRS: &[([u8; 2], [u8; 2])] = &[
    ([0xC3, 0xA4], [0xC3, 0x84]), // ä -> Ä
    ([0xC3, 0xB6], [0xC3, 0x96]), // ö -> Ö
    ([0xC3, 0xBC], [0xC3, 0x9C]), // ü -> Ü
    ([0xC3, 0xAB], [0xC3, 0x8B]), // ë -> Ë
    ([0xC3, 0xAF], [0xC3, 0x8F]), // ï -> Ï
    ([0xC3, 0x9F], [0xC3, 0x9F]), // ß -> ß (self)
];

/// Fold a UTF-8 buffer to uppercase in place: US-ASCII lowercase letters
/// become uppercase, and the German accented lowercase letters become their
/// uppercase counterparts (`ß` is unchanged). Every other byte is untouched.
/// Because every substitution preserves byte length, this never needs to
/// resize the buffer.
pub fn fold_upper_in_place(buf: &mut [u8]) -> Result<()> {
    let mut i = 0usize;
    while i < buf.len() {
        let b = buf[i];
        if b.is_ascii_lowercase() {
            buf[i] = b.to_ascii_uppercase();
            i += 1;
            continue;
        }

        if b & 0x80 != 0 {
            let (result, len) = sequence_len(&buf[i..]);
            match result {
                SequenceResult::Ok => {
                    if len == 2 {
                        let pair = [buf[i], buf[i + 1]];
                        if let Some((_, upper)) =
                            ACCENT_FOLD_PAIRS.iter().find(|(lower, _)| *lower == pair)
                        {
                            buf[i] = upper[0];
                            buf[i + 1] = upper[1];
                        }
                    }
                    i += len;
                }
                SequenceResult::Bad => return Err(DeenError::BadUtf8 { offset: i }),
                SequenceResult::Incomplete => {
                    return Err(DeenError::IncompleteUtf8 { offset: i })
                }
            }
            continue;
        }

        i += 1;
    }

    Ok(())
}

/// Fixed, case-folded table of short high-frequency German and English
/// words excluded from indexing and from keyword lists. Must be identical
/// on the install and query side, or a word dropped from one side silently
/// breaks lookups for it on the other.
static COMMON_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // English
        "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "CAN", "HER",
        "WAS", "ONE", "OUR", "OUT", "HIS", "HAS", "HIM", "ITS", "WHO", "GET",
        "HOW", "NOW", "DID", "YES", "YET", "TOO", "ANY", "SHE", "HAD", "A",
        "AN", "AS", "AT", "BE", "BY", "DO", "IF", "IN", "IS", "IT", "OF",
        "ON", "OR", "SO", "TO", "UP", "WE",
        // German
        "DER", "DIE", "DAS", "DEN", "DEM", "DES", "EIN", "EINE", "EINEN",
        "EINEM", "EINER", "EINES", "UND", "ODER", "ABER", "NICHT", "AUCH",
        "WIR", "ICH", "DU", "ER", "SIE", "ES", "IHR", "MAN", "MIT", "VON",
        "ZU", "ZUM", "ZUR", "AUF", "AUS", "BEI", "FUER", "IM", "IN", "AN",
        "AM", "NACH", "UEBER", "UNTER", "VOR", "WIE", "WAS", "WER", "WO",
        "IST", "SIND", "HAT", "HABEN", "WAR", "WAREN",
    ]
    .into_iter()
    .collect()
});

/// Case-sensitive membership test against the common-word table. Inputs are
/// expected to already be folded.
pub fn is_common_word(folded: &[u8]) -> bool {
    std::str::from_utf8(folded)
        .map(|s| COMMON_WORDS.contains(s))
        .unwrap_or(false)
}

/// A buffer is US-ASCII clean if every byte has its high bit clear.
pub fn is_usascii_clean(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b & 0x80 == 0)
}

/// Short ASCII transliteration for a single UTF-8 sequence, used by the
/// terminal rendering fallback when the locale isn't UTF-8 capable.
pub fn usascii_equivalent(seq: &[u8]) -> Option<&'static str> {
    match seq {
        [0xC3, 0xA4] => Some("ae"), // ä
        [0xC3, 0x84] => Some("Ae"), // Ä
        [0xC3, 0xB6] => Some("oe"), // ö
        [0xC3, 0x96] => Some("Oe"), // Ö
        [0xC3, 0xBC] => Some("ue"), // ü
        [0xC3, 0x9C] => Some("Ue"), // Ü
        [0xC3, 0xAB] => Some("ee"), // ë
        [0xC3, 0x8B] => Some("Ee"), // Ë
        [0xC3, 0xAF] => Some("ie"), // ï
        [0xC3, 0x8F] => Some("Ie"), // Ï
        [0xC3, 0x9F] => Some("ss"), // ß
        _ => None,
    }
}
