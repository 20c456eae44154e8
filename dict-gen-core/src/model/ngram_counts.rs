use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DictError, Result};
use crate::io;
use super::interner::{Interner, Symbol};
use super::ngram_tables::NgramTables;
use super::normalizer::canonical_tokens;
use super::successors::Successors;

/// Unfiltered bigram and trigram counts for (part of) a corpus.
///
/// `NgramCounts` is the accumulator behind extraction. It is additive: the
/// counts of two shards merged together equal the counts of the
/// concatenated shards, so a corpus can be split across workers (or
/// processes, through [`save_partial`](Self::save_partial)) and reduced
/// afterwards. Frequency filtering only happens in [`finalize`](Self::finalize),
/// once every shard has been seen.
///
/// # Invariants
/// - Every symbol used as a key belongs to `interner`
/// - Every stored count is >= 1
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NgramCounts {
	interner: Interner,

	/// word1 -> word2 -> count
	bigrams: HashMap<Symbol, Successors>,

	/// word1 -> word2 -> word3 -> count
	trigrams: HashMap<Symbol, HashMap<Symbol, Successors>>,
}

impl NgramCounts {
	pub fn new() -> Self {
		Self::default()
	}

	/// Tokenizes and normalizes a line, then records its bigrams and trigrams.
	///
	/// Lines with fewer than two usable tokens contribute nothing.
	pub fn add_line(&mut self, line: &str) {
		let symbols: Vec<Symbol> = canonical_tokens(line)
			.map(|key| self.interner.intern(&key))
			.collect();
		self.add_symbols(&symbols);
	}

	/// Records one observation for each adjacent pair and triple of `symbols`.
	fn add_symbols(&mut self, symbols: &[Symbol]) {
		for pair in symbols.windows(2) {
			self.bigrams.entry(pair[0]).or_default().observe(pair[1]);
		}
		for triple in symbols.windows(3) {
			self.trigrams
				.entry(triple[0])
				.or_default()
				.entry(triple[1])
				.or_default()
				.observe(triple[2]);
		}
	}

	/// Merges the counts of another shard into this one.
	///
	/// # Notes
	/// - Counts for matching n-grams are summed.
	/// - The other shard's keys are re-interned into this shard's arena.
	pub fn merge(&mut self, other: &Self) {
		let mut remap: HashMap<Symbol, Symbol> = HashMap::with_capacity(other.interner.len());
		let mut translate = |interner: &mut Interner, symbol: Symbol| -> Symbol {
			*remap
				.entry(symbol)
				.or_insert_with(|| interner.intern(other.interner.resolve(symbol)))
		};

		for (first, successors) in &other.bigrams {
			let first = translate(&mut self.interner, *first);
			let target = self.bigrams.entry(first).or_default();
			target.merge_with(successors, |s| translate(&mut self.interner, s));
		}

		for (first, seconds) in &other.trigrams {
			let first = translate(&mut self.interner, *first);
			for (second, successors) in seconds {
				let second = translate(&mut self.interner, *second);
				let target = self.trigrams.entry(first).or_default().entry(second).or_default();
				target.merge_with(successors, |s| translate(&mut self.interner, s));
			}
		}
	}

	/// Number of distinct bigrams recorded so far.
	pub fn bigram_len(&self) -> usize {
		self.bigrams.values().map(Successors::len).sum()
	}

	/// Number of distinct trigrams recorded so far.
	pub fn trigram_len(&self) -> usize {
		self.trigrams
			.values()
			.flat_map(|seconds| seconds.values())
			.map(Successors::len)
			.sum()
	}

	pub fn is_empty(&self) -> bool {
		self.bigrams.is_empty() && self.trigrams.is_empty()
	}

	/// Applies the minimum frequency and freezes the counts into tables.
	///
	/// Drops every count below `min_freq`, then prunes prefixes left without
	/// successors, at both levels of the trigram table.
	pub fn finalize(mut self, min_freq: u64) -> NgramTables {
		self.bigrams.retain(|_, successors| {
			successors.retain_frequent(min_freq);
			!successors.is_empty()
		});

		self.trigrams.retain(|_, seconds| {
			seconds.retain(|_, successors| {
				successors.retain_frequent(min_freq);
				!successors.is_empty()
			});
			!seconds.is_empty()
		});

		NgramTables::new(self.interner, self.bigrams, self.trigrams)
	}

	/// Writes these unfiltered counts to `path` in postcard's compact binary form.
	pub fn save_partial<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		io::write_atomic(path, &bytes)
	}

	/// Loads counts written by [`save_partial`](Self::save_partial).
	pub fn load_partial<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).map_err(|e| DictError::unavailable(path, e))?;
		let mut counts: Self = postcard::from_bytes(&bytes)?;
		counts.interner.rebuild_index();
		Ok(counts)
	}
}
