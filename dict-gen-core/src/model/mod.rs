//! Counting and merging models.
//!
//! - Canonical keys (`normalizer`) and interned symbols (`interner`)
//! - Additive n-gram counts (`NgramCounts`) and filtered tables (`NgramTables`)
//! - Dictionary sources (`DictionaryStore`) and their merge (`MergeEngine`)

/// Canonical key computation and tokenization.
pub mod normalizer;

/// String interning for n-gram keys.
///
/// Each distinct token is stored once; counts refer to it by `Symbol`.
pub mod interner;

/// Successor counts of one n-gram prefix.
pub mod successors;

/// Unfiltered bigram/trigram counts.
///
/// Additive: counts built on disjoint shards merge into the counts of the whole,
/// and can be saved to disk between runs.
pub mod ngram_counts;

/// Bigram/trigram tables after frequency filtering, with their JSON-ready views.
pub mod ngram_tables;

/// Line- and file-level n-gram extraction, optionally parallel.
pub mod extractor;

/// Merge strategies and run options.
pub mod options;

/// Word-frequency sources (JSON, frequency lists, CSV).
pub mod dictionary_store;

/// Grouping, resolution and ranking of dictionary entries.
pub mod merge_engine;
