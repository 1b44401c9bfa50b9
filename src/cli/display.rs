// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Terminal rendering that degrades gracefully on a non-UTF-8 locale.
//!
//! Most terminals these days are UTF-8, but `deen` can be piped into one
//! that isn't (an old serial console, a minimal container shell with `LANG`
//! unset). Rather than emit mojibake or bail out, fall back to a short
//! transliteration table and print `?` for anything it doesn't cover.

use std::io::{self, Write};

use crate::text;

/// Does the environment's `LANG` claim a UTF-8 capable terminal?
pub fn is_utf8_langenv() -> bool {
    std::env::var("LANG")
        .map(|lang| lang.to_uppercase().ends_with(".UTF-8"))
        .unwrap_or(false)
}

/// Whether output should go through the locale-aware rendering path at all.
/// A pipe or redirected file isn't a terminal with a `LANG`-driven character
/// set limitation, so write it raw UTF-8 regardless of `LANG`.
pub fn should_use_terminal_rendering() -> bool {
    atty::is(atty::Stream::Stdout)
}

/// Write `s` to `out`, respecting the terminal's UTF-8 capability:
/// passed through as-is if `utf8_capable`, otherwise passed through as-is
/// if it's already US-ASCII clean, otherwise transliterated sequence by
/// sequence (unmapped sequences become `?`).
pub fn print_str(out: &mut dyn Write, s: &str, utf8_capable: bool) -> io::Result<()> {
    let bytes = s.as_bytes();
    if utf8_capable || text::is_usascii_clean(bytes) {
        return out.write_all(bytes);
    }

    let mut offset = 0;
    while offset < bytes.len() {
        match text::sequence_len(&bytes[offset..]) {
            (text::SequenceResult::Ok, len) => {
                let seq = &bytes[offset..offset + len];
                if len == 1 {
                    out.write_all(seq)?;
                } else if let Some(ascii) = text::usascii_equivalent(seq) {
                    out.write_all(ascii.as_bytes())?;
                } else {
                    out.write_all(b"?")?;
                }
                offset += len;
            }
            _ => {
                out.write_all(b"?")?;
                offset += 1;
            }
        }
    }
    Ok(())
}
