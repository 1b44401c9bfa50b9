// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! A single parsed corpus line, and the keyword-distance score used to rank
//! search results.

use crate::text;

/// Extra penalty per English-side sense index, added on top of the sense
/// index itself, so a German-side match always outranks an English-side
/// match at the same sense depth.
pub const BASE_ENGLISH: u32 = 1;

/// Returned by [`Entry::distance`] when some keyword never matched either
/// side of the entry; the query engine rejects such entries before ranking.
pub const DISTANCE_REJECTED: u32 = u32::MAX;

/// A single dictionary line, split into its German/English halves and their
/// `|`-separated senses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    pub german_text: &'a str,
    pub english_text: &'a str,
    pub german_senses: Vec<&'a str>,
    pub english_senses: Vec<&'a str>,
    pub line_ref: u64,
}

impl<'a> Entry<'a> {
    /// Parse a corpus line. Returns `None` if the line has no `::`
    /// separator (comment, blank, or otherwise malformed line) — the query
    /// engine simply drops such candidates.
    pub fn parse(line: &'a str, line_ref: u64) -> Option<Self> {
        let sep = line.find("::")?;
        let german_text = &line[..sep];
        let english_text = &line[sep + 2..];

        Some(Entry {
            german_text,
            english_text,
            german_senses: split_senses(german_text),
            english_senses: split_senses(english_text),
            line_ref,
        })
    }

    /// Every keyword must appear, case-insensitively (bytewise over folded
    /// text), somewhere in the joined German+English text. This is the
    /// full-keyword filter that rejects prefix-index false positives: two
    /// words sharing a cropped index key but differing past it.
    pub fn keywords_all_present(&self, keywords: &[Vec<u8>]) -> bool {
        let folded_german = fold_copy(self.german_text);
        let folded_english = fold_copy(self.english_text);
        keywords
            .iter()
            .all(|kw| contains(&folded_german, kw) || contains(&folded_english, kw))
    }

    /// Score this entry against `keywords` (already normalized/folded
    /// uppercase). Lower is better; [`DISTANCE_REJECTED`] means some
    /// keyword matched neither side, so the entry should not be ranked.
    ///
    /// Rewards entries whose first sense contains all keywords; penalizes
    /// hits deep in alternative senses or on the English side.
    pub fn distance(&self, keywords: &[Vec<u8>]) -> u32 {
        let mut matched = vec![false; keywords.len()];
        let mut score: u32 = 0;

        for (s, sense) in self.german_senses.iter().enumerate() {
            let folded = fold_copy(sense);
            for (ki, kw) in keywords.iter().enumerate() {
                if !matched[ki] && contains(&folded, kw) {
                    matched[ki] = true;
                    score += s as u32;
                }
            }
        }

        for (s, sense) in self.english_senses.iter().enumerate() {
            let folded = fold_copy(sense);
            for (ki, kw) in keywords.iter().enumerate() {
                if !matched[ki] && contains(&folded, kw) {
                    matched[ki] = true;
                    score += s as u32 + BASE_ENGLISH;
                }
            }
        }

        if matched.iter().any(|&m| !m) {
            return DISTANCE_REJECTED;
        }

        score
    }
}

fn split_senses(side: &str) -> Vec<&str> {
    side.split('|').map(|s| s.trim()).collect()
}

/// Fold a sense/side of entry text to uppercase bytes for matching against
/// already-folded keywords. Corpus text is assumed well-formed UTF-8; if a
/// stray line isn't, fall back to the unfolded bytes rather than failing
/// the whole query over one bad line.
fn fold_copy(s: &str) -> Vec<u8> {
    let mut buf = s.as_bytes().to_vec();
    if text::fold_upper_in_place(&mut buf).is_err() {
        buf = s.as_bytes().to_vec();
    }
    buf
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return needle.is_empty();
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<Vec<u8>> {
        words.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn parses_senses_split_on_pipe_and_trimmed() {
        let line = "Haus {n} | Gebaeude :: house | building";
        let e = Entry::parse(line, 0).unwrap();
        assert_eq!(e.german_senses, vec!["Haus {n}", "Gebaeude"]);
        assert_eq!(e.english_senses, vec!["house", "building"]);
    }

    #[test]
    fn line_without_separator_is_not_an_entry() {
        assert!(Entry::parse("# a comment", 0).is_none());
        assert!(Entry::parse("", 0).is_none());
    }

    #[test]
    fn first_sense_all_keywords_scores_zero() {
        let e = Entry::parse("Haus :: house", 0).unwrap();
        assert_eq!(e.distance(&kw(&["HAUS"])), 0);
    }

    #[test]
    fn missing_keyword_is_rejected() {
        let e = Entry::parse("Haus :: house", 0).unwrap();
        assert_eq!(e.distance(&kw(&["HAUS", "GARTEN"])), DISTANCE_REJECTED);
    }

    #[test]
    fn english_side_match_incurs_base_penalty() {
        let e = Entry::parse("xyz :: house", 0).unwrap();
        assert_eq!(e.distance(&kw(&["HOUSE"])), BASE_ENGLISH);
    }

    #[test]
    fn deeper_sense_costs_more() {
        let e = Entry::parse("a | b | haus :: x", 0).unwrap();
        assert_eq!(e.distance(&kw(&["HAUS"])), 2);
    }

    #[test]
    fn keywords_all_present_rejects_prefix_false_positive() {
        let e = Entry::parse("Hauptbahnhof :: main station", 0).unwrap();
        assert!(!e.keywords_all_present(&kw(&["HAUSBOOT"])));
        assert!(e.keywords_all_present(&kw(&["HAUP"])));
    }
}
