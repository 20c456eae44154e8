use std::collections::{BTreeMap, HashMap};

use super::interner::{Interner, Symbol};
use super::successors::Successors;

/// String-keyed bigram table: word1 -> word2 -> count.
///
/// Ordered maps, so the serialized form is deterministic.
pub type BigramTable = BTreeMap<String, BTreeMap<String, u64>>;

/// String-keyed trigram table: word1 -> word2 -> word3 -> count.
pub type TrigramTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>;

/// Filtered, immutable bigram and trigram tables.
///
/// Produced by [`NgramCounts::finalize`](super::ngram_counts::NgramCounts::finalize).
///
/// # Invariants
/// - Every count is >= the `min_freq` used to build the tables
/// - No prefix maps to an empty set of successors, at any level
#[derive(Clone, Debug)]
pub struct NgramTables {
	interner: Interner,
	bigrams: HashMap<Symbol, Successors>,
	trigrams: HashMap<Symbol, HashMap<Symbol, Successors>>,
}

impl NgramTables {
	pub(crate) fn new(
		interner: Interner,
		bigrams: HashMap<Symbol, Successors>,
		trigrams: HashMap<Symbol, HashMap<Symbol, Successors>>,
	) -> Self {
		Self { interner, bigrams, trigrams }
	}

	/// Count of the bigram `first second`, keys given in canonical form.
	pub fn bigram_count(&self, first: &str, second: &str) -> Option<u64> {
		let first = self.interner.get(first)?;
		let second = self.interner.get(second)?;
		self.bigrams.get(&first)?.get(second)
	}

	/// Count of the trigram `first second third`, keys given in canonical form.
	pub fn trigram_count(&self, first: &str, second: &str, third: &str) -> Option<u64> {
		let first = self.interner.get(first)?;
		let second = self.interner.get(second)?;
		let third = self.interner.get(third)?;
		self.trigrams.get(&first)?.get(&second)?.get(third)
	}

	/// Number of distinct bigrams.
	pub fn bigram_len(&self) -> usize {
		self.bigrams.values().map(Successors::len).sum()
	}

	/// Number of distinct trigrams.
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

	fn successor_map(&self, successors: &Successors) -> BTreeMap<String, u64> {
		successors
			.iter()
			.map(|(next, count)| (self.interner.resolve(next).to_owned(), count))
			.collect()
	}

	pub fn to_bigram_table(&self) -> BigramTable {
		self.bigrams
			.iter()
			.map(|(first, successors)| {
				(self.interner.resolve(*first).to_owned(), self.successor_map(successors))
			})
			.collect()
	}

	pub fn to_trigram_table(&self) -> TrigramTable {
		self.trigrams
			.iter()
			.map(|(first, seconds)| {
				let inner = seconds
					.iter()
					.map(|(second, successors)| {
						(self.interner.resolve(*second).to_owned(), self.successor_map(successors))
					})
					.collect();
				(self.interner.resolve(*first).to_owned(), inner)
			})
			.collect()
	}

	/// Converts both tables into their string-keyed form.
	pub fn into_tables(self) -> (BigramTable, TrigramTable) {
		(self.to_bigram_table(), self.to_trigram_table())
	}
}
