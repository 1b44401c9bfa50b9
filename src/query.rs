// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Turns a query string into ranked dictionary entries.
//!
//! Each keyword is cropped to [`text::DEPTH`] and looked up in the index
//! independently; the keyword lists are intersected (starting from the
//! longest, most selective keyword, since [`Keywords`] is already sorted
//! that way) to get a small candidate set before the corpus is touched at
//! all. Candidates are re-verified against the full (uncropped) keyword
//! text and scored by [`Entry::distance`] before ranking.
//!
//! If that first pass finds nothing, the keywords are adjusted for the
//! German US-ASCII abbreviations (`oel` -> `öl`) and the search is retried
//! once — the bulk of the "typed it without umlauts" case.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::config::corpus_path;
use crate::entry::{Entry, DISTANCE_REJECTED};
use crate::error::Result;
use crate::index_store::{index_file_path, FileIndexStore, IndexStore};
use crate::keywords::Keywords;
use crate::progress::{CancellationToken, InstallState, ProgressObserver};
use crate::text::{self, DEPTH};

/// A single ranked result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub german_text: String,
    pub english_text: String,
    pub distance: u32,
    pub line_ref: u64,
}

/// The result of a search: the ranked hits found before it stopped, and
/// whether it stopped early because of cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub truncated: bool,
}

pub struct QueryEngine {
    store: FileIndexStore,
    corpus: Vec<u8>,
}

impl QueryEngine {
    pub fn open(root: &Path) -> Result<Self> {
        let store = FileIndexStore::open(index_file_path(root))?;
        let corpus = fs::read(corpus_path(root)).unwrap_or_default();
        Ok(QueryEngine { store, corpus })
    }

    /// Search for `query`, returning at most `limit` hits ordered by
    /// ascending distance (best match first). `cancellation` is polled
    /// between candidate evaluations; on cancellation the search returns
    /// whatever hits it had already scored, with `truncated` set — it does
    /// not attempt the abbreviation-adjusted retry in that case.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        observer: &mut dyn ProgressObserver,
        cancellation: &CancellationToken,
    ) -> Result<SearchOutcome> {
        log::info!("searching for {query:?}");
        let mut keywords = Keywords::parse(query)?;
        if keywords.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let outcome = self.rank(&keywords, limit, observer, cancellation)?;
        if outcome.truncated || !outcome.hits.is_empty() {
            log::info!("search for {query:?} found {} hit(s)", outcome.hits.len());
            return Ok(outcome);
        }

        if keywords.adjust()? {
            let outcome = self.rank(&keywords, limit, observer, cancellation)?;
            log::info!(
                "search for {query:?} found {} hit(s) after abbreviation adjustment",
                outcome.hits.len()
            );
            return Ok(outcome);
        }

        Ok(outcome)
    }

    fn rank(
        &self,
        keywords: &Keywords,
        limit: usize,
        observer: &mut dyn ProgressObserver,
        cancellation: &CancellationToken,
    ) -> Result<SearchOutcome> {
        let candidates = self.candidate_refs(keywords)?;
        let total = candidates.len();
        let mut scored = Vec::new();
        let mut truncated = false;

        for (scanned, line_ref) in candidates.into_iter().enumerate() {
            if cancellation.is_cancelled() {
                log::info!("search cancelled after {scanned}/{total} candidates scanned");
                truncated = true;
                break;
            }

            observer.on_progress(InstallState::Indexing {
                fraction: (scanned as f32 + 1.0) / total.max(1) as f32,
            });

            let Some(line) = self.line_at(line_ref) else {
                continue;
            };
            let Some(entry) = Entry::parse(line, line_ref) else {
                continue;
            };
            if !entry.keywords_all_present(keywords.as_slice()) {
                continue;
            }
            let distance = entry.distance(keywords.as_slice());
            log::trace!("candidate ref {line_ref}: distance {distance}");
            if distance == DISTANCE_REJECTED {
                continue;
            }
            scored.push(SearchHit {
                german_text: entry.german_text.to_string(),
                english_text: entry.english_text.to_string(),
                distance,
                line_ref,
            });
        }

        scored.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.line_ref.cmp(&b.line_ref)));
        scored.truncate(limit);
        Ok(SearchOutcome {
            hits: scored,
            truncated,
        })
    }

    /// Intersect the per-keyword ref lists, most selective (longest
    /// keyword, since the list is already sorted descending) first.
    fn candidate_refs(&self, keywords: &Keywords) -> Result<Vec<u64>> {
        let mut candidates: Option<HashSet<u64>> = None;

        for keyword in keywords.as_slice() {
            let mut cropped = keyword.clone();
            text::crop_to_unicode_len(&mut cropped, DEPTH)?;
            let refs: HashSet<u64> = self.store.lookup(&cropped).into_iter().collect();

            candidates = Some(match candidates {
                None => refs,
                Some(existing) => existing.intersection(&refs).copied().collect(),
            });

            if candidates.as_ref().is_some_and(HashSet::is_empty) {
                break;
            }
        }

        let mut result: Vec<u64> = candidates.unwrap_or_default().into_iter().collect();
        result.sort_unstable();
        Ok(result)
    }

    /// The corpus line starting at byte offset `line_ref`, stripped of its
    /// trailing newline. `None` if the offset is out of range or the slice
    /// at that offset isn't valid UTF-8 (a corrupt or hand-edited corpus).
    fn line_at(&self, line_ref: u64) -> Option<&str> {
        let start = usize::try_from(line_ref).ok()?;
        let rest = self.corpus.get(start..)?;
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        std::str::from_utf8(&rest[..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::install_from_path;
    use crate::progress::{CancellationToken, NullProgress};
    use tempfile::tempdir;

    fn install(corpus: &str) -> tempfile::TempDir {
        let src_dir = tempdir().unwrap();
        let root_dir = tempdir().unwrap();
        let source = src_dir.path().join("corpus.txt");
        std::fs::write(&source, corpus).unwrap();
        install_from_path(
            root_dir.path(),
            &source,
            &mut NullProgress,
            &CancellationToken::new(),
        )
        .unwrap();
        root_dir
    }

    /// Run a search with no observer/cancellation wired up, for tests that
    /// don't care about either.
    fn search(engine: &QueryEngine, query: &str, limit: usize) -> Vec<SearchHit> {
        engine
            .search(query, limit, &mut NullProgress, &CancellationToken::new())
            .unwrap()
            .hits
    }

    #[test]
    fn finds_an_exact_single_keyword_match() {
        let root = install("Haus {n} :: house\nGarten {m} :: garden\n");
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "haus", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].german_text.trim(), "Haus {n}");
    }

    #[test]
    fn cropped_index_false_positive_is_filtered_by_full_keyword_check() {
        // "Hausboot" and "Hausbau" share the same 5-character index prefix
        // ("HAUSB"), so looking up the 8-character keyword "hausboot" (also
        // cropped to 5 before the index lookup) surfaces both as
        // candidates. Only the one that genuinely contains "hausboot"
        // should survive the full-keyword recheck.
        let root = install("Hausboot {n} :: houseboat\nHausbau {m} :: house construction\n");
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "hausboot", 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].german_text.contains("Hausboot"));
    }

    #[test]
    fn common_words_contribute_nothing_to_the_search() {
        let root = install("Haus {n} :: house\n");
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "the haus", 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn abbreviation_fallback_finds_umlaut_entries() {
        let root = install("Öltank {m} :: oil tank\n");
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "oeltank", 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].german_text.contains("Öltank"));
    }

    #[test]
    fn ranks_first_sense_matches_ahead_of_later_senses() {
        let root = install(
            "xyz | Haus {n} :: thing | house\nHaus {n} :: house\n",
        );
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "haus", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].distance, 0);
        assert!(hits[0].german_text.starts_with("Haus"));
    }

    #[test]
    fn empty_query_of_only_common_words_returns_no_hits() {
        let root = install("Haus {n} :: house\n");
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "the and", 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn result_limit_is_respected() {
        let root = install(
            "Haus {n} :: house one\nHaus {m} :: house two\nHaus {f} :: house three\n",
        );
        let engine = QueryEngine::open(root.path()).unwrap();
        let hits = search(&engine, "haus", 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn cancellation_mid_search_returns_truncated_partial_results() {
        let root = install(
            "Haus {n} :: house one\nHaus {m} :: house two\nHaus {f} :: house three\n",
        );
        let engine = QueryEngine::open(root.path()).unwrap();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let outcome = engine
            .search("haus", 10, &mut NullProgress, &cancellation)
            .unwrap();
        assert!(outcome.truncated);
        assert!(outcome.hits.is_empty());
    }

    #[test]
    fn progress_is_reported_once_per_candidate() {
        struct Counter {
            reports: usize,
        }
        impl ProgressObserver for Counter {
            fn on_progress(&mut self, state: InstallState) {
                if matches!(state, InstallState::Indexing { .. }) {
                    self.reports += 1;
                }
            }
        }

        let root = install(
            "Haus {n} :: house one\nHaus {m} :: house two\nHaus {f} :: house three\n",
        );
        let engine = QueryEngine::open(root.path()).unwrap();
        let mut counter = Counter { reports: 0 };
        let outcome = engine
            .search("haus", 10, &mut counter, &CancellationToken::new())
            .unwrap();
        assert_eq!(counter.reports, outcome.hits.len());
    }
}
