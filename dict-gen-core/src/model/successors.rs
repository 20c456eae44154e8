use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::interner::Symbol;

/// Observed successors of a single n-gram prefix.
///
/// This is the innermost level of both n-gram tables: for a prefix such as
/// `the` (bigrams) or `the cat` (trigrams) it records how many times each
/// following word was seen.
///
/// ## Responsibilities:
/// - Accumulate observations during counting
/// - Merge with the successors of the same prefix from another shard
/// - Drop rare successors once the whole corpus has been seen
///
/// ## Invariants
/// - Each count is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Successors {
	/// Example: { cat => 42, dog => 3 }
	counts: HashMap<Symbol, u64>,
}

impl Successors {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one observation of `next`.
	pub fn observe(&mut self, next: Symbol) {
		self.add(next, 1);
	}

	/// Adds `count` observations of `next`.
	pub fn add(&mut self, next: Symbol, count: u64) {
		if count == 0 {
			return;
		}
		*self.counts.entry(next).or_insert(0) += count;
	}

	pub fn get(&self, next: Symbol) -> Option<u64> {
		self.counts.get(&next).copied()
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
		self.counts.iter().map(|(symbol, count)| (*symbol, *count))
	}

	/// Merges the successors of the same prefix seen by another shard.
	///
	/// `remap` translates the other shard's symbols into this table's symbols.
	/// Counts are summed.
	pub fn merge_with<F>(&mut self, other: &Self, mut remap: F)
	where
		F: FnMut(Symbol) -> Symbol,
	{
		for (next, count) in other.iter() {
			self.add(remap(next), count);
		}
	}

	/// Keeps only the successors seen at least `min_freq` times.
	pub fn retain_frequent(&mut self, min_freq: u64) {
		self.counts.retain(|_, count| *count >= min_freq);
	}
}
