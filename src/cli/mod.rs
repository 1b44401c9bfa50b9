// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! Command line interface.

pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Offline German/English dictionary lookup over a ding-format corpus.
#[derive(Debug, Parser)]
#[command(name = "deen", version, about)]
pub struct Cli {
    /// Enable trace-level logging.
    #[arg(long, global = true)]
    pub trace: bool,

    /// Override the root directory deen stores its corpus and index in
    /// (defaults to `$DEEN_ROOT`, then the platform data directory).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install a ding-format corpus file, building its search index.
    Install {
        /// Path to the corpus file to install.
        source: PathBuf,
    },

    /// Search the installed corpus.
    Search {
        /// Query words, e.g. `deen search haus`.
        #[arg(required = true)]
        words: Vec<String>,

        /// Maximum number of results to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.trace {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        }
    }
}
