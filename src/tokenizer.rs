// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Word extraction from a file stream or an in-memory buffer.
//!
//! A word is a maximal run of bytes none of which is whitespace, punctuation,
//! or one of the corpus format's structural delimiters. Multi-byte UTF-8
//! bytes (high bit set) are always word-constituent, so accented letters
//! never split a word.
//!
//! The file iterator guarantees that every word sharing a `ref` (the byte
//! offset just past the previous newline) is delivered consecutively — the
//! indexer's per-line batching in `indexer.rs` depends on that.

use std::io::Read;

use crate::error::{DeenError, Result};

const STRUCTURAL_DELIMITERS: &[u8] = b"|:;{}()[]/\\\"'<>";

/// Is `b` a word boundary byte under the corpus tokenizer's rule?
fn is_boundary_byte(b: u8) -> bool {
    if b & 0x80 != 0 {
        return false; // multi-byte UTF-8 continuation/lead bytes are word-constituent
    }
    b.is_ascii_control()
        || b == b' '
        || b.is_ascii_digit()
        || STRUCTURAL_DELIMITERS.contains(&b)
}

/// Receives words as the tokenizer finds them. Returning `false` halts
/// iteration early (used for both caller-driven early termination and
/// cooperative cancellation, checked on every word).
pub trait WordSink {
    fn on_word(&mut self, word: &[u8], line_ref: u64, progress: f32) -> bool;
}

/// Tokenize `reader`, which is assumed to have `file_len` bytes remaining.
/// Reads in `buffer_size` chunks, accumulating enough of the tail of each
/// chunk to never split a word across a read boundary.
///
/// Returns `Ok(true)` if the whole stream was consumed, `Ok(false)` if the
/// sink halted iteration early.
pub fn for_each_word_from_file<R: Read>(
    mut reader: R,
    file_len: u64,
    buffer_size: usize,
    sink: &mut dyn WordSink,
) -> Result<bool> {
    let mut carry: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; buffer_size.max(1)];
    let mut bytes_read: u64 = 0;
    let mut line_ref: u64 = 0;
    let mut base_offset: u64 = 0;

    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| DeenError::io("<corpus>", e))?;
        if n == 0 {
            break;
        }
        bytes_read += n as u64;
        carry.extend_from_slice(&chunk[..n]);

        let progress = ((bytes_read as f64 / file_len.max(1) as f64) as f32).min(1.0);
        let mut word_start: Option<usize> = None;
        let mut i = 0usize;

        while i < carry.len() {
            let b = carry[i];
            if is_boundary_byte(b) {
                if let Some(start) = word_start.take() {
                    if !sink.on_word(&carry[start..i], line_ref, progress) {
                        return Ok(false);
                    }
                }
            } else if word_start.is_none() {
                word_start = Some(i);
            }

            if b == b'\n' {
                line_ref = base_offset + i as u64 + 1;
            }
            i += 1;
        }

        match word_start {
            Some(start) => {
                base_offset += start as u64;
                carry.drain(0..start);
            }
            None => {
                base_offset += carry.len() as u64;
                carry.clear();
            }
        }
    }

    if !carry.is_empty() && !sink.on_word(&carry, line_ref, 1.0) {
        return Ok(false);
    }

    Ok(true)
}

/// Same boundary rule as [`for_each_word_from_file`], but over an in-memory
/// buffer, reporting `(offset, length)` pairs rather than reading the word
/// bytes into the callback directly.
pub fn for_each_word_in_str(bytes: &[u8], mut callback: impl FnMut(usize, usize) -> bool) -> bool {
    let mut word_start: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if is_boundary_byte(b) {
            if let Some(start) = word_start.take() {
                if !callback(start, i - start) {
                    return false;
                }
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }

    if let Some(start) = word_start {
        if !callback(start, bytes.len() - start) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Collector {
        words: Vec<(Vec<u8>, u64)>,
    }

    impl WordSink for Collector {
        fn on_word(&mut self, word: &[u8], line_ref: u64, _progress: f32) -> bool {
            self.words.push((word.to_vec(), line_ref));
            true
        }
    }

    #[test]
    fn splits_on_structural_delimiters_and_digits() {
        let data = b"Haus|house 123 foo:bar";
        let mut c = Collector { words: Vec::new() };
        for_each_word_from_file(Cursor::new(&data[..]), data.len() as u64, 8, &mut c).unwrap();
        let words: Vec<_> = c.words.iter().map(|(w, _)| w.clone()).collect();
        assert_eq!(words, vec![b"Haus".to_vec(), b"house".to_vec(), b"foo".to_vec(), b"bar".to_vec()]);
    }

    #[test]
    fn words_on_first_line_have_ref_zero() {
        let data = b"Haus :: house\nHausaufgabe :: homework\n";
        let mut c = Collector { words: Vec::new() };
        for_each_word_from_file(Cursor::new(&data[..]), data.len() as u64, 4096, &mut c).unwrap();
        assert_eq!(c.words[0].1, 0);
        let second_line_ref = data.iter().position(|&b| b == b'\n').unwrap() as u64 + 1;
        assert!(c.words.iter().any(|(w, r)| w == b"Hausaufgabe" && *r == second_line_ref));
    }

    #[test]
    fn words_sharing_a_ref_are_consecutive() {
        let data = b"one two three\nfour five\n";
        let mut c = Collector { words: Vec::new() };
        for_each_word_from_file(Cursor::new(&data[..]), data.len() as u64, 5, &mut c).unwrap();
        let mut seen_refs = Vec::new();
        for (_, r) in &c.words {
            if seen_refs.last() != Some(r) {
                seen_refs.push(*r);
            }
        }
        assert_eq!(seen_refs.len(), 2, "each ref group should appear exactly once consecutively");
    }

    #[test]
    fn small_buffer_does_not_split_words_across_chunks() {
        let data = b"Hauptbahnhof :: main station\n";
        let mut c = Collector { words: Vec::new() };
        for_each_word_from_file(Cursor::new(&data[..]), data.len() as u64, 3, &mut c).unwrap();
        assert!(c.words.iter().any(|(w, _)| w == b"Hauptbahnhof"));
    }

    #[test]
    fn callback_returning_false_halts_early() {
        struct Halter {
            count: usize,
        }
        impl WordSink for Halter {
            fn on_word(&mut self, _word: &[u8], _line_ref: u64, _progress: f32) -> bool {
                self.count += 1;
                self.count < 2
            }
        }
        let data = b"one two three four\n";
        let mut h = Halter { count: 0 };
        let completed =
            for_each_word_from_file(Cursor::new(&data[..]), data.len() as u64, 4096, &mut h)
                .unwrap();
        assert!(!completed);
        assert_eq!(h.count, 2);
    }

    #[test]
    fn string_iteration_reports_offsets() {
        let data = b"hello, world!";
        let mut found = Vec::new();
        for_each_word_in_str(data, |offset, len| {
            found.push((offset, len));
            true
        });
        assert_eq!(found, vec![(0, 5), (7, 5)]);
    }
}
