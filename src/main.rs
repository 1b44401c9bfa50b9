// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

use std::io;
use std::path::Path;

use clap::Parser;

use deen::cli::{display, Cli, Command};
use deen::config::{self, RootLock};
use deen::error::Result;
use deen::indexer;
use deen::progress::{CancellationToken, InstallState, NullProgress, ProgressObserver};
#[cfg(not(feature = "parallel"))]
use deen::progress::PercentGate;
use deen::query::QueryEngine;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .init();

    let root = cli.root.clone().unwrap_or_else(config::root_dir);

    let result = match &cli.command {
        Command::Install { source } => run_install(&root, source),
        Command::Search { words, limit } => run_search(&root, &words.join(" "), *limit),
    };

    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_install(root: &Path, source: &Path) -> Result<()> {
    config::ensure_root_dir(root)?;
    let _lock = RootLock::acquire(root)?;

    log::info!("installing {} into {}", source.display(), root.display());
    let cancellation = CancellationToken::new();

    #[cfg(feature = "parallel")]
    let mut observer = IndicatifProgress::new();
    #[cfg(not(feature = "parallel"))]
    let mut observer = EprintProgress::new();

    indexer::install_from_path(root, source, &mut observer, &cancellation)?;
    log::info!("install complete");
    Ok(())
}

fn run_search(root: &Path, query: &str, limit: usize) -> Result<()> {
    let engine = QueryEngine::open(root)?;
    let cancellation = CancellationToken::new();
    let outcome = engine.search(query, limit, &mut NullProgress, &cancellation)?;
    let utf8_capable = !display::should_use_terminal_rendering() || display::is_utf8_langenv();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if outcome.hits.is_empty() {
        eprintln!("no matches for {query:?}");
        return Ok(());
    }

    for hit in &outcome.hits {
        let line = format!("{}  ::  {}\n", hit.german_text.trim(), hit.english_text.trim());
        let _ = display::print_str(&mut out, &line, utf8_capable);
    }
    if outcome.truncated {
        eprintln!("search was interrupted; showing partial results");
    }
    Ok(())
}

/// Plain-text fallback install progress for builds without the `parallel`
/// (and therefore `indicatif`) feature.
#[cfg(not(feature = "parallel"))]
struct EprintProgress {
    gate: PercentGate,
}

#[cfg(not(feature = "parallel"))]
impl EprintProgress {
    fn new() -> Self {
        EprintProgress {
            gate: PercentGate::new(),
        }
    }
}

#[cfg(not(feature = "parallel"))]
impl ProgressObserver for EprintProgress {
    fn on_progress(&mut self, state: InstallState) {
        match state {
            InstallState::Starting => eprintln!("starting install..."),
            InstallState::Indexing { fraction } => {
                if self.gate.should_report(fraction) {
                    eprintln!("indexing: {:>3}%", (fraction.clamp(0.0, 1.0) * 100.0) as u32);
                }
            }
            InstallState::Completed => eprintln!("install complete"),
            InstallState::Error => eprintln!("install failed"),
            InstallState::Idle => {}
        }
    }
}

#[cfg(feature = "parallel")]
struct IndicatifProgress {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "parallel")]
impl IndicatifProgress {
    fn new() -> Self {
        let bar = indicatif::ProgressBar::new(100);
        bar.set_style(
            indicatif::ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        IndicatifProgress { bar }
    }
}

#[cfg(feature = "parallel")]
impl ProgressObserver for IndicatifProgress {
    fn on_progress(&mut self, state: InstallState) {
        match state {
            InstallState::Starting => self.bar.set_message("starting"),
            InstallState::Indexing { fraction } => {
                self.bar.set_position((fraction.clamp(0.0, 1.0) * 100.0) as u64);
                self.bar.set_message("indexing");
            }
            InstallState::Completed => {
                self.bar.set_position(100);
                self.bar.finish_with_message("done");
            }
            InstallState::Error => self.bar.abandon_with_message("failed"),
            InstallState::Idle => {}
        }
    }
}
