//! Word-frequency dictionary and n-gram table builder.
//!
//! This crate turns raw text corpora and word lists into the artifacts a
//! predictive keyboard ships with:
//! - Bigram and trigram tables counted over canonical tokens
//! - Merged word-frequency dictionaries (several sources, one ranking)
//! - Resumable partial counts for sharded corpora
//! - A build pipeline that chains extraction and merging per language
//!
//! The core never prints; progress is reported through an [`Observer`].

/// Tokenization, n-gram counting and dictionary merging.
pub mod model;

/// Whole-language builds and artifact writers.
pub mod pipeline;

/// Progress notifications.
pub mod observer;

/// Error type shared by every operation.
pub mod error;

/// File helpers (line streaming, output paths, atomic writes).
pub mod io;

pub use error::{DictError, Result};
pub use model::dictionary_store::{DictionaryStore, Entry, SourceFormat};
pub use model::extractor::{Extractor, extract};
pub use model::merge_engine::{MergeEngine, merge};
pub use model::ngram_counts::NgramCounts;
pub use model::ngram_tables::{BigramTable, NgramTables, TrigramTable};
pub use model::normalizer::normalize;
pub use model::options::{ExtractOptions, MergeOptions, MergeStrategy};
pub use observer::{LogObserver, Observer, SilentObserver};
