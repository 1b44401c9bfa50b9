// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Parses a user query string into an ordered, deduplicated keyword set,
//! and the German-abbreviation adjustment pass used for the one-shot
//! fallback retry described in the query engine.

use crate::error::Result;
use crate::text::{self, is_common_word, MIN};

/// An ordered, deduplicated set of normalized (uppercased) query keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords {
    items: Vec<Vec<u8>>,
}

impl Keywords {
    /// Parse `query`: fold to uppercase, split on whitespace, drop common
    /// words and words shorter than [`MIN`] characters, drop any word that
    /// is itself a byte-prefix of a keyword already accepted, then sort by
    /// descending character length (ties broken by ascending byte order).
    ///
    /// An empty result (no non-common words) is valid: it represents a
    /// query that matches nothing.
    pub fn parse(query: &str) -> Result<Self> {
        let mut folded = query.as_bytes().to_vec();
        text::fold_upper_in_place(&mut folded)?;

        let mut items: Vec<Vec<u8>> = Vec::new();
        for word in split_whitespace(&folded) {
            if word.is_empty() || is_common_word(word) {
                continue;
            }
            if char_len(word)? < MIN {
                continue;
            }
            if is_prefix_of_existing(word, &items) {
                continue;
            }
            items.push(word.to_vec());
        }

        sort_keywords(&mut items)?;
        Ok(Keywords { items })
    }

    /// The keywords, longest (by unicode character count) first.
    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Replace `AE, OE, UE, EE, IE, SS` with their German-accented
    /// uppercase equivalent in every keyword, in place. Returns whether any
    /// substitution occurred, so the caller can decide whether a fallback
    /// retry is worth doing.
    ///
    /// Re-sorts afterwards: a two-byte `AE` becomes a one-character `Ä`,
    /// which can change the descending-length ordering the query engine
    /// relies on.
    pub fn adjust(&mut self) -> Result<bool> {
        let mut adjusted = false;
        for keyword in &mut self.items {
            adjusted |= substitute_abbreviations(keyword);
        }
        if adjusted {
            sort_keywords(&mut self.items)?;
        }
        Ok(adjusted)
    }
}

fn split_whitespace(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .split(|&b| b == b' ' || b == b'\t' || b == b'\n')
        .filter(|w| !w.is_empty())
}

fn char_len(word: &[u8]) -> Result<usize> {
    text::sequences_count(word)
}

fn is_prefix_of_existing(word: &[u8], existing: &[Vec<u8>]) -> bool {
    existing
        .iter()
        .any(|k| k.len() >= word.len() && &k[..word.len()] == word)
}

fn sort_keywords(items: &mut [Vec<u8>]) -> Result<()> {
    // Pre-compute lengths so a failing sequences_count surfaces as an error
    // rather than panicking inside the comparator.
    let mut with_len: Vec<(usize, Vec<u8>)> = Vec::with_capacity(items.len());
    for item in items.iter() {
        with_len.push((text::sequences_count(item)?, item.clone()));
    }
    with_len.sort_by(|(la, a), (lb, b)| lb.cmp(la).then_with(|| a.cmp(b)));
    for (slot, (_, bytes)) in items.iter_mut().zip(with_len.into_iter()) {
        *slot = bytes;
    }
    Ok(())
}

/// Two-byte ASCII abbreviation -> two-byte UTF-8 accented replacement,
/// applied in a fixed order so repeated substitutions can't cascade into
/// each other.
const ABBREVIATIONS: &[(&[u8; 2], [u8; 2])] = &[
    (b"EE", [0xC3, 0x8B]), // EE -> Ë
    (b"UE", [0xC3, 0x9C]), // UE -> Ü
    (b"OE", [0xC3, 0x96]), // OE -> Ö
    (b"AE", [0xC3, 0x84]), // AE -> Ä
    (b"IE", [0xC3, 0x8F]), // IE -> Ï
    (b"SS", [0xC3, 0x9F]), // SS -> ß (one-way; ß itself folds to ß, not SS)
];

fn substitute_abbreviations(word: &mut Vec<u8>) -> bool {
    let mut adjusted = false;
    for (search, replace) in ABBREVIATIONS {
        let mut i = 0;
        while i + 1 < word.len() {
            if &word[i..i + 2] == *search {
                word[i] = replace[0];
                word[i + 1] = replace[1];
                adjusted = true;
                i += 2;
            } else {
                i += 1;
            }
        }
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(k: &Keywords) -> Vec<String> {
        k.as_slice()
            .iter()
            .map(|w| String::from_utf8(w.clone()).unwrap())
            .collect()
    }

    #[test]
    fn common_word_is_dropped() {
        let k = Keywords::parse("the haus").unwrap();
        assert_eq!(words(&k), vec!["HAUS"]);
    }

    #[test]
    fn descending_length_then_lexicographic_order() {
        let k = Keywords::parse("bahn hausboot haus").unwrap();
        assert_eq!(words(&k), vec!["HAUSBOOT", "BAHN", "HAUS"]);
    }

    #[test]
    fn shorter_word_prefixed_by_existing_is_dropped() {
        // "HAU" would be a byte-prefix of "HAUS" if "HAUS" is already kept.
        let k = Keywords::parse("haus hau").unwrap();
        assert_eq!(words(&k), vec!["HAUS"]);
    }

    #[test]
    fn words_shorter_than_min_are_dropped() {
        let k = Keywords::parse("ei haus").unwrap();
        assert_eq!(words(&k), vec!["HAUS"]);
    }

    #[test]
    fn empty_query_is_a_valid_empty_keyword_set() {
        let k = Keywords::parse("the und").unwrap();
        assert!(k.is_empty());
    }

    #[test]
    fn adjust_substitutes_abbreviations_and_reports_change() {
        let mut k = Keywords::parse("oel").unwrap();
        assert_eq!(words(&k), vec!["OEL"]);
        let changed = k.adjust().unwrap();
        assert!(changed);
        assert_eq!(words(&k), vec!["ÖL"]);
    }

    #[test]
    fn adjust_is_idempotent() {
        let mut k = Keywords::parse("oel strasse").unwrap();
        k.adjust().unwrap();
        let once = words(&k);
        let changed_again = k.adjust().unwrap();
        assert!(!changed_again);
        assert_eq!(words(&k), once);
    }

    #[test]
    fn adjust_maps_ss_to_eszett_one_way() {
        let mut k = Keywords::parse("strasse").unwrap();
        k.adjust().unwrap();
        assert_eq!(words(&k), vec!["STRAßE"]);
    }
}
