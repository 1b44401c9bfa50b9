// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! On-disk index: a map from folded, depth-cropped prefix to the sorted set
//! of corpus byte offsets (`ref`s) of lines containing a word with that
//! prefix.
//!
//! The wire format is a flat table rather than a WAL: a full corpus (a few
//! megabytes of ding-format text) comfortably fits in memory, so a single
//! install builds the whole table and writes it once on commit. There's no
//! intermediate durability to buy here, unlike a server-sized search index.
//!
//! ```text
//! "DEEN" version:u8
//! count:varint
//! ( prefix_len:varint prefix_bytes refs_len:varint (delta:varint)* )*
//! crc32:u32-le "NEED"
//! ```
//! `refs` are stored sorted ascending and delta-encoded against the previous
//! ref in the list (the first is a delta against zero), since hit lists for
//! common prefixes can run into the thousands and deltas compress far better
//! than raw 64-bit offsets.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

use crate::error::{DeenError, Result};

const MAGIC: [u8; 4] = *b"DEEN";
const FOOTER_MAGIC: [u8; 4] = *b"NEED";
const VERSION: u8 = 1;

/// Persistent prefix -> ref-list index.
pub trait IndexStore {
    /// Begin accumulating adds. Must be called before [`IndexStore::add`].
    fn begin_transaction(&mut self) -> Result<()>;

    /// Record that `prefix` occurs at corpus offset `reference`.
    fn add(&mut self, prefix: &[u8], reference: u64) -> Result<()>;

    /// Merge the transaction's adds into the committed table and persist it.
    fn commit_transaction(&mut self) -> Result<()>;

    /// All refs recorded against keys of which `prefix` is itself a
    /// leading-byte prefix, sorted ascending. A query keyword shorter than
    /// [`crate::text::DEPTH`] is never cropped further, so this has to be a
    /// prefix scan over stored keys rather than an exact lookup: the stored
    /// key for a long word is cropped to `DEPTH` characters, which is
    /// itself longer than a short query keyword.
    fn lookup(&self, prefix: &[u8]) -> Vec<u64>;
}

/// A single-file [`IndexStore`] using the wire format documented above.
/// Keys are kept in byte order so [`FileIndexStore::lookup`] can answer a
/// prefix query with a bounded range scan instead of visiting every key.
pub struct FileIndexStore {
    path: PathBuf,
    table: BTreeMap<Vec<u8>, Vec<u64>>,
    staging: Option<BTreeMap<Vec<u8>, BTreeSet<u64>>>,
}

impl FileIndexStore {
    /// Open an existing index file for querying (or continued installs).
    /// A missing file is treated as an empty index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match fs::read(&path) {
            Ok(bytes) => decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(DeenError::io(path, e)),
        };
        Ok(FileIndexStore {
            path,
            table,
            staging: None,
        })
    }

    /// Start a fresh index at `path`, discarding anything already there.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        FileIndexStore {
            path: path.into(),
            table: BTreeMap::new(),
            staging: None,
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl IndexStore for FileIndexStore {
    fn begin_transaction(&mut self) -> Result<()> {
        self.staging = Some(BTreeMap::new());
        Ok(())
    }

    fn add(&mut self, prefix: &[u8], reference: u64) -> Result<()> {
        let staging = self
            .staging
            .as_mut()
            .expect("add called outside a transaction");
        staging
            .entry(prefix.to_vec())
            .or_default()
            .insert(reference);
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        let staging = self
            .staging
            .take()
            .expect("commit_transaction called outside a transaction");

        for (prefix, refs) in staging {
            let entry = self.table.entry(prefix).or_default();
            entry.extend(refs);
            entry.sort_unstable();
            entry.dedup();
        }

        let encoded = encode(&self.table);
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = File::create(&tmp).map_err(|e| DeenError::io(&tmp, e))?;
            f.write_all(&encoded).map_err(|e| DeenError::io(&tmp, e))?;
            f.sync_all().map_err(|e| DeenError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| DeenError::io(&self.path, e))?;
        Ok(())
    }

    fn lookup(&self, prefix: &[u8]) -> Vec<u64> {
        let mut refs = BTreeSet::new();
        for (key, list) in self.table.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            refs.extend(list.iter().copied());
        }
        refs.into_iter().collect()
    }
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn decode_varint(bytes: &[u8], offset: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*offset)
            .ok_or_else(|| DeenError::Corrupt("truncated varint".into()))?;
        *offset += 1;
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(DeenError::Corrupt("varint too long".into()));
        }
    }
}

fn encode(table: &BTreeMap<Vec<u8>, Vec<u64>>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&MAGIC);
    body.push(VERSION);

    encode_varint(table.len() as u64, &mut body);
    for (prefix, refs) in table {
        encode_varint(prefix.len() as u64, &mut body);
        body.extend_from_slice(prefix);

        let mut sorted = refs.clone();
        sorted.sort_unstable();
        encode_varint(sorted.len() as u64, &mut body);
        let mut prev = 0u64;
        for r in sorted {
            encode_varint(r - prev, &mut body);
            prev = r;
        }
    }

    let mut hasher = Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let mut out = body;
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&FOOTER_MAGIC);
    out
}

fn decode(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u64>>> {
    if bytes.len() < MAGIC.len() + 1 + 8 {
        return Err(DeenError::Corrupt("index file too small".into()));
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(DeenError::Corrupt("bad index magic".into()));
    }
    let footer_start = bytes.len() - FOOTER_MAGIC.len() - 4;
    if bytes[footer_start + 4..] != FOOTER_MAGIC {
        return Err(DeenError::Corrupt("bad index footer magic".into()));
    }
    let stored_crc = u32::from_le_bytes(
        bytes[footer_start..footer_start + 4]
            .try_into()
            .expect("slice is exactly 4 bytes"),
    );
    let body = &bytes[..footer_start];

    let mut hasher = Hasher::new();
    hasher.update(body);
    if hasher.finalize() != stored_crc {
        return Err(DeenError::Corrupt("index checksum mismatch".into()));
    }

    let mut offset = MAGIC.len();
    let version = *bytes
        .get(offset)
        .ok_or_else(|| DeenError::Corrupt("truncated header".into()))?;
    if version != VERSION {
        return Err(DeenError::Corrupt(format!(
            "unsupported index version {version}"
        )));
    }
    offset += 1;

    let count = decode_varint(body, &mut offset)?;
    let mut table = BTreeMap::new();

    for _ in 0..count {
        let prefix_len = decode_varint(body, &mut offset)? as usize;
        let prefix_end = offset
            .checked_add(prefix_len)
            .filter(|&end| end <= body.len())
            .ok_or_else(|| DeenError::Corrupt("truncated prefix".into()))?;
        let prefix = body[offset..prefix_end].to_vec();
        offset = prefix_end;

        let ref_count = decode_varint(body, &mut offset)?;
        let mut refs = Vec::with_capacity(ref_count as usize);
        let mut prev = 0u64;
        for _ in 0..ref_count {
            let delta = decode_varint(body, &mut offset)?;
            prev += delta;
            refs.push(prev);
        }

        table.insert(prefix, refs);
    }

    Ok(table)
}

pub fn index_file_path(root: &Path) -> PathBuf {
    root.join("ding.idx")
}
