// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Error kinds shared by the installer and the query engine.
//!
//! One variant per error kind named in the design: `IO_PROBLEM`,
//! `IS_COMPRESSED`, `TOO_SMALL`, `BAD_FORMAT`, `BAD_UTF8`, `INCOMPLETE_UTF8`,
//! `CANCELLED`, plus `Corrupt` for an on-disk index that fails its checksum.
//! `OOM` is deliberately absent: allocation failure is fail-fast (abort),
//! not something callers recover from.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeenError {
    #[error("io problem at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source file appears to be gzip compressed: {0}")]
    IsCompressed(PathBuf),

    #[error("source file is too small to be a valid corpus: {0}")]
    TooSmall(PathBuf),

    #[error("source file does not look like a ding-format corpus: {0}")]
    BadFormat(PathBuf),

    #[error("bad UTF-8 sequence at byte offset {offset}")]
    BadUtf8 { offset: usize },

    #[error("incomplete UTF-8 sequence at byte offset {offset}")]
    IncompleteUtf8 { offset: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("index file is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, DeenError>;

impl DeenError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DeenError::Io {
            path: path.into(),
            source,
        }
    }
}
