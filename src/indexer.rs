// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Install pipeline: validate a source corpus, copy it into the root
//! directory, and build its index.
//!
//! Three phases, run in order: check format, copy bytes, tokenize-and-index
//! in one transaction, driving the index through [`IndexStore`].

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::config::{corpus_path, ensure_root_dir};
use crate::error::{DeenError, Result};
use crate::index_store::{index_file_path, FileIndexStore, IndexStore};
use crate::progress::{CancellationToken, InstallState, PercentGate, ProgressObserver};
use crate::text::{self, DEPTH, MIN};
use crate::tokenizer::{self, WordSink};

const CHECK_BUFFER_SIZE: usize = 4096;
const FILE_COPY_BUFFER_SIZE: usize = 4096;
const TOKENIZE_BUFFER_SIZE: usize = 64 * 1024;

/// Sniff-test a candidate corpus file: reject `.gz`-suffixed paths outright,
/// then read the first [`CHECK_BUFFER_SIZE`] bytes and require at least one
/// non-comment, non-blank line containing `::`.
pub fn check_format(path: &Path) -> Result<()> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
    {
        return Err(DeenError::IsCompressed(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(|e| DeenError::io(path, e))?;
    let mut buf = vec![0u8; CHECK_BUFFER_SIZE];
    let n = file.read(&mut buf).map_err(|e| DeenError::io(path, e))?;
    if n < 16 {
        return Err(DeenError::TooSmall(path.to_path_buf()));
    }
    buf.truncate(n);

    let text = String::from_utf8_lossy(&buf);
    let has_entry_line = text.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#') && line.contains("::")
    });

    if has_entry_line {
        Ok(())
    } else {
        Err(DeenError::BadFormat(path.to_path_buf()))
    }
}

/// Copy `source` to `dest` in fixed-size chunks, byte-exact.
fn copy_corpus(source: &Path, dest: &Path) -> Result<()> {
    let mut input = BufReader::new(File::open(source).map_err(|e| DeenError::io(source, e))?);
    let mut output = File::create(dest).map_err(|e| DeenError::io(dest, e))?;
    let mut buf = vec![0u8; FILE_COPY_BUFFER_SIZE];

    loop {
        let n = input.read(&mut buf).map_err(|e| DeenError::io(source, e))?;
        if n == 0 {
            break;
        }
        output
            .write_all(&buf[..n])
            .map_err(|e| DeenError::io(dest, e))?;
    }
    output.sync_all().map_err(|e| DeenError::io(dest, e))?;
    Ok(())
}

/// Accumulates the prefixes seen for the current `ref`, flushing them to the
/// index store whenever the tokenizer moves on to a new line. Batching by
/// line (rather than writing straight through per word) means a word
/// repeated several times on one line only costs one set-insert at flush
/// time, not several.
struct IndexingSink<'a> {
    store: &'a mut FileIndexStore,
    observer: &'a mut dyn ProgressObserver,
    cancellation: &'a CancellationToken,
    gate: PercentGate,
    current_ref: u64,
    pending_prefixes: Vec<Vec<u8>>,
    upper_scratch: Vec<u8>,
    error: Option<DeenError>,
}

impl<'a> IndexingSink<'a> {
    fn new(
        store: &'a mut FileIndexStore,
        observer: &'a mut dyn ProgressObserver,
        cancellation: &'a CancellationToken,
    ) -> Self {
        IndexingSink {
            store,
            observer,
            cancellation,
            gate: PercentGate::new(),
            current_ref: 0,
            pending_prefixes: Vec::new(),
            upper_scratch: Vec::new(),
            error: None,
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.pending_prefixes.is_empty() {
            log::trace!(
                "flushing {} prefixes for ref {}",
                self.pending_prefixes.len(),
                self.current_ref
            );
        }
        for prefix in self.pending_prefixes.drain(..) {
            self.store.add(&prefix, self.current_ref)?;
        }
        Ok(())
    }

    fn add_prefix_if_not_present(&mut self, prefix: &[u8]) {
        if !self.pending_prefixes.iter().any(|p| p.as_slice() == prefix) {
            self.pending_prefixes.push(prefix.to_vec());
        }
    }

    fn into_error(self) -> Option<DeenError> {
        self.error
    }
}

impl<'a> WordSink for IndexingSink<'a> {
    fn on_word(&mut self, word: &[u8], line_ref: u64, progress: f32) -> bool {
        if line_ref != self.current_ref {
            if let Err(e) = self.flush() {
                self.error = Some(e);
                return false;
            }
            self.current_ref = line_ref;
        }

        if self.gate.should_report(progress) {
            self.observer.on_progress(InstallState::Indexing {
                fraction: progress,
            });
        }

        if self.cancellation.is_cancelled() {
            self.error = Some(DeenError::Cancelled);
            return false;
        }

        let char_len = match text::sequences_count(word) {
            Ok(n) => n,
            Err(_) => return true, // skip words with malformed UTF-8 rather than abort the install
        };
        if char_len < MIN {
            return true;
        }

        self.upper_scratch.clear();
        self.upper_scratch.extend_from_slice(word);
        if text::fold_upper_in_place(&mut self.upper_scratch).is_err() {
            return true;
        }
        if text::is_common_word(&self.upper_scratch) {
            return true;
        }

        let mut prefix = self.upper_scratch.clone();
        if text::crop_to_unicode_len(&mut prefix, DEPTH).is_err() {
            return true;
        }

        self.add_prefix_if_not_present(&prefix);
        true
    }
}

/// Install `source` as the corpus at `root`: validate, copy, and index it.
/// Held for the duration of the install behind the caller's [`RootLock`].
pub fn install_from_path(
    root: &Path,
    source: &Path,
    observer: &mut dyn ProgressObserver,
    cancellation: &CancellationToken,
) -> Result<()> {
    log::info!("install starting: {}", source.display());
    observer.on_progress(InstallState::Starting);

    check_format(source)?;
    ensure_root_dir(root)?;

    let dest_corpus = corpus_path(root);
    let dest_index = index_file_path(root);

    let result = run_install(root, source, &dest_corpus, observer, cancellation);
    match &result {
        Ok(()) => {}
        Err(DeenError::Cancelled) => {
            let _ = std::fs::remove_file(&dest_corpus);
            let _ = std::fs::remove_file(&dest_index);
            log::info!("install cancelled; removed partial artifacts");
            observer.on_progress(InstallState::Idle);
        }
        Err(e) => {
            let _ = std::fs::remove_file(&dest_corpus);
            let _ = std::fs::remove_file(&dest_index);
            log::error!("install failed: {e}");
            observer.on_progress(InstallState::Error);
        }
    }
    result
}

fn run_install(
    root: &Path,
    source: &Path,
    dest_corpus: &Path,
    observer: &mut dyn ProgressObserver,
    cancellation: &CancellationToken,
) -> Result<()> {
    copy_corpus(source, dest_corpus)?;

    let file_len = std::fs::metadata(dest_corpus)
        .map_err(|e| DeenError::io(dest_corpus, e))?
        .len();
    let reader = File::open(dest_corpus).map_err(|e| DeenError::io(dest_corpus, e))?;

    let mut store = FileIndexStore::create(index_file_path(root));
    store.begin_transaction()?;

    let completed = {
        let mut sink = IndexingSink::new(&mut store, observer, cancellation);
        let completed =
            tokenizer::for_each_word_from_file(reader, file_len, TOKENIZE_BUFFER_SIZE, &mut sink)?;
        if completed {
            sink.flush()?;
        }
        if let Some(e) = sink.into_error() {
            return Err(e);
        }
        completed
    };

    if !completed {
        return Err(DeenError::Cancelled);
    }

    store.commit_transaction()?;
    log::info!("install complete: {} prefixes indexed", store.len());
    observer.on_progress(InstallState::Completed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn rejects_gz_suffixed_paths_outright() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.gz");
        write(&path, "Haus :: house\n".repeat(10).as_str());
        assert!(matches!(check_format(&path), Err(DeenError::IsCompressed(_))));
    }

    #[test]
    fn rejects_too_small_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        write(&path, "x");
        assert!(matches!(check_format(&path), Err(DeenError::TooSmall(_))));
    }

    #[test]
    fn rejects_files_without_a_double_colon_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        write(&path, "# just a comment, nothing indexable here at all\n");
        assert!(matches!(check_format(&path), Err(DeenError::BadFormat(_))));
    }

    #[test]
    fn accepts_a_well_formed_corpus() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        write(&path, "# comment\nHaus {n} :: house\nGarten {m} :: garden\n");
        assert!(check_format(&path).is_ok());
    }

    #[test]
    fn install_builds_a_queryable_index() {
        let src_dir = tempdir().unwrap();
        let root_dir = tempdir().unwrap();
        let source = src_dir.path().join("corpus.txt");
        write(
            &source,
            "Haus {n} :: house\nHauptbahnhof {n} :: main station\nGarten {m} :: garden\n",
        );

        let mut observer = NullProgress;
        let cancellation = CancellationToken::new();
        install_from_path(root_dir.path(), &source, &mut observer, &cancellation).unwrap();

        assert!(corpus_path(root_dir.path()).exists());
        let store = FileIndexStore::open(index_file_path(root_dir.path())).unwrap();
        assert!(!store.lookup(b"HAUS").is_empty());
        assert!(!store.lookup(b"GARTE").is_empty());
    }

    #[test]
    fn cancellation_mid_install_leaves_no_partial_files() {
        let src_dir = tempdir().unwrap();
        let root_dir = tempdir().unwrap();
        let source = src_dir.path().join("corpus.txt");
        let mut body = String::new();
        for i in 0..200 {
            body.push_str(&format!("wordnumber{i} :: entrynumber{i}\n"));
        }
        write(&source, &body);

        let mut observer = NullProgress;
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = install_from_path(root_dir.path(), &source, &mut observer, &cancellation);
        assert!(result.is_err());
        assert!(!corpus_path(root_dir.path()).exists());
        assert!(!index_file_path(root_dir.path()).exists());
    }

    #[test]
    fn cancellation_reports_idle_rather_than_error() {
        struct LastState(Option<InstallState>);
        impl ProgressObserver for LastState {
            fn on_progress(&mut self, state: InstallState) {
                self.0 = Some(state);
            }
        }

        let src_dir = tempdir().unwrap();
        let root_dir = tempdir().unwrap();
        let source = src_dir.path().join("corpus.txt");
        let mut body = String::new();
        for i in 0..200 {
            body.push_str(&format!("wordnumber{i} :: entrynumber{i}\n"));
        }
        write(&source, &body);

        let mut observer = LastState(None);
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        install_from_path(root_dir.path(), &source, &mut observer, &cancellation).unwrap_err();
        assert!(matches!(observer.0, Some(InstallState::Idle)));
    }

    #[test]
    fn genuine_failure_reports_error_not_idle() {
        struct LastState(Option<InstallState>);
        impl ProgressObserver for LastState {
            fn on_progress(&mut self, state: InstallState) {
                self.0 = Some(state);
            }
        }

        let src_dir = tempdir().unwrap();
        let root_dir = tempdir().unwrap();
        let source = src_dir.path().join("corpus.gz");
        write(&source, "Haus :: house\n".repeat(10).as_str());

        let mut observer = LastState(None);
        let cancellation = CancellationToken::new();
        let err = install_from_path(root_dir.path(), &source, &mut observer, &cancellation);
        assert!(matches!(err, Err(DeenError::IsCompressed(_))));
        assert!(!matches!(observer.0, Some(InstallState::Idle)));
    }
}
