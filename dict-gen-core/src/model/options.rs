use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DictError, Result};

/// Policy used to collapse several observations of the same canonical word.
///
/// # Variants
/// - `Max`: keep the member with the highest frequency (first one on ties).
/// - `Sum`: add all frequencies up.
/// - `Avg`: floor of the mean frequency.
/// - `Weighted`: the first source weighs 0.6, the others share 0.4 evenly.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
	#[default]
	Max,
	Sum,
	Avg,
	Weighted,
}

impl MergeStrategy {
	pub const ALL: [MergeStrategy; 4] = [
		MergeStrategy::Max,
		MergeStrategy::Sum,
		MergeStrategy::Avg,
		MergeStrategy::Weighted,
	];

	pub fn name(self) -> &'static str {
		match self {
			MergeStrategy::Max => "max",
			MergeStrategy::Sum => "sum",
			MergeStrategy::Avg => "avg",
			MergeStrategy::Weighted => "weighted",
		}
	}
}

impl fmt::Display for MergeStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for MergeStrategy {
	type Err = DictError;

	fn from_str(s: &str) -> Result<Self> {
		let wanted = s.trim().to_lowercase();
		Self::ALL
			.into_iter()
			.find(|strategy| strategy.name() == wanted)
			.ok_or_else(|| {
				DictError::InvalidConfig(format!(
					"unknown merge strategy '{s}', expected one of max, sum, avg, weighted"
				))
			})
	}
}

fn check_min_freq(min_freq: u64) -> Result<()> {
	if min_freq == 0 {
		return Err(DictError::InvalidConfig("min_freq must be >= 1".to_owned()));
	}
	Ok(())
}

/// Parameters of a dictionary merge run.
///
/// # Invariants (checked by [`validate`](Self::validate))
/// - `min_freq >= 1`
/// - `limit`, when set, is >= 1
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MergeOptions {
	pub strategy: MergeStrategy,

	/// Entries whose merged frequency is below this are dropped.
	pub min_freq: u64,

	/// Maximum number of accepted records read from each source.
	pub limit: Option<usize>,
}

impl Default for MergeOptions {
	fn default() -> Self {
		Self { strategy: MergeStrategy::Max, min_freq: 1, limit: None }
	}
}

impl MergeOptions {
	pub fn new(strategy: MergeStrategy, min_freq: u64) -> Self {
		Self { strategy, min_freq, limit: None }
	}

	/// Rejects invalid thresholds before any processing begins.
	pub fn validate(&self) -> Result<()> {
		check_min_freq(self.min_freq)?;
		if self.limit == Some(0) {
			return Err(DictError::InvalidConfig("limit must be >= 1 when set".to_owned()));
		}
		Ok(())
	}
}

/// Parameters of an n-gram extraction run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractOptions {
	/// N-grams seen fewer times than this are dropped.
	pub min_freq: u64,

	/// Worker threads used to count shards; `1` streams the corpus on the caller thread.
	pub workers: usize,
}

impl Default for ExtractOptions {
	fn default() -> Self {
		Self { min_freq: 1, workers: num_cpus::get() }
	}
}

impl ExtractOptions {
	pub fn new(min_freq: u64) -> Self {
		Self { min_freq, ..Self::default() }
	}

	pub fn validate(&self) -> Result<()> {
		check_min_freq(self.min_freq)?;
		if self.workers == 0 {
			return Err(DictError::InvalidConfig("workers must be >= 1".to_owned()));
		}
		Ok(())
	}
}
