use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Compact handle to a canonical key stored in an [`Interner`].
///
/// Only meaningful together with the interner that produced it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
	fn index(self) -> usize {
		self.0 as usize
	}
}

/// Arena of canonical keys.
///
/// Every distinct key is stored once; tables refer to it through a
/// [`Symbol`] so millions of observations never re-allocate the same string.
///
/// # Invariants
/// - `keys[ids[k].0] == k` for every interned key `k`
/// - Symbols are dense, assigned in first-seen order
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Interner {
	keys: Vec<String>,
	#[serde(skip)]
	ids: HashMap<String, Symbol>,
}

impl Interner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the symbol for `key`, interning it on first sight.
	pub fn intern(&mut self, key: &str) -> Symbol {
		if let Some(symbol) = self.ids.get(key) {
			return *symbol;
		}
		let symbol = Symbol(self.keys.len() as u32);
		self.keys.push(key.to_owned());
		self.ids.insert(key.to_owned(), symbol);
		symbol
	}

	/// Looks up a key without interning it.
	pub fn get(&self, key: &str) -> Option<Symbol> {
		self.ids.get(key).copied()
	}

	/// Returns the key behind `symbol`.
	///
	/// # Panics
	/// Panics if `symbol` was produced by another interner with more keys.
	pub fn resolve(&self, symbol: Symbol) -> &str {
		&self.keys[symbol.index()]
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Rebuilds the reverse index after deserialization (the index is not persisted).
	pub(crate) fn rebuild_index(&mut self) {
		self.ids = self
			.keys
			.iter()
			.enumerate()
			.map(|(i, key)| (key.clone(), Symbol(i as u32)))
			.collect();
	}
}
