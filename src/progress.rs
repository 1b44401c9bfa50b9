// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Progress reporting and cooperative cancellation, shared by the install
//! pipeline and the query engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coarse lifecycle state, reported to a [`ProgressObserver`] as an install
/// or a search runs. A search only ever reports `Indexing` (its progress
/// through the candidate list); the other variants are install-specific.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstallState {
    /// No install in progress. Also reported when an install is cancelled —
    /// a cancelled install leaves nothing committed, the same as if it had
    /// never started.
    Idle,
    Starting,
    /// `fraction` is in `0.0..=1.0`: words tokenized so far during an
    /// install, or candidates scanned so far during a search.
    Indexing { fraction: f32 },
    Completed,
    /// The install failed for a reason other than cancellation.
    Error,
}

/// Receives [`InstallState`] transitions during an install or a search.
///
/// During an install, `Indexing` is gated through [`PercentGate`] so it's
/// only reported when the integer percentage changes, not on every word — a
/// naive fractional comparison would fire thousands of times a second on a
/// fast disk for no benefit to a human watching a progress bar. A search's
/// candidate set is normally small enough that it reports every candidate
/// without gating.
pub trait ProgressObserver {
    fn on_progress(&mut self, state: InstallState);
}

/// A [`ProgressObserver`] that discards everything, for tests and
/// non-interactive callers.
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_progress(&mut self, _state: InstallState) {}
}

/// Gates repeated `Indexing` reports to one per whole-percentage-point
/// change. A naive version of this gate truncates `progress * 100` into a
/// `u8` and compares the raw byte, which wraps silently past 255% on
/// pathological inputs; using a `u32` here keeps the comparison exact for
/// the entire `0..=100` range.
pub struct PercentGate {
    last_percent: Option<u32>,
}

impl PercentGate {
    pub fn new() -> Self {
        PercentGate { last_percent: None }
    }

    /// Returns `true` the first time a given whole percentage is seen.
    pub fn should_report(&mut self, fraction: f32) -> bool {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0) as u32;
        if self.last_percent == Some(percent) {
            false
        } else {
            self.last_percent = Some(percent);
            true
        }
    }
}

impl Default for PercentGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag, checked between work units (words during
/// install, candidate entries during a search). Cheap to clone and share
/// with whatever triggers cancellation (a CLI Ctrl-C handler, a UI button).
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
