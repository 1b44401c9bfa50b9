// Copyright 2025-present Andrew Lindesay
// SPDX-License-Identifier: MIT

//! `deen` is an offline German/English dictionary: install a plain-text
//! ding-format corpus once, then run fast keyword lookups against the
//! index it builds.
//!
//! The pipeline splits into two halves:
//! - [`indexer`] validates and installs a corpus (`text`, `tokenizer`,
//!   `index_store` do the heavy lifting).
//! - [`query`] turns a query string into ranked [`entry::Entry`] hits
//!   (`keywords`, `entry` do the heavy lifting).
//!
//! [`config`] resolves where the corpus and index live on disk and
//! arbitrates install-vs-query exclusion; [`progress`] carries install
//! progress and cancellation; [`cli`] is the binary's command surface.

pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod index_store;
pub mod indexer;
pub mod keywords;
pub mod progress;
pub mod query;
pub mod text;
pub mod tokenizer;

pub use entry::Entry;
pub use error::{DeenError, Result};
pub use keywords::Keywords;
pub use query::{QueryEngine, SearchHit};
