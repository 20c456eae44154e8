use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DictError, Result};
use crate::io::source_name;
use crate::observer::{Observer, SilentObserver};
use super::dictionary_store::{DictionaryStore, Entry};
use super::normalizer::normalize;
use super::options::{MergeOptions, MergeStrategy};

/// Number of top-ranked entries handed to the observer after a merge.
const TOP_ENTRIES: usize = 10;

/// Weight of the first (most authoritative) member under [`MergeStrategy::Weighted`].
const FIRST_SOURCE_WEIGHT: f64 = 0.6;

/// Counters describing a finished merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
	/// Number of stores that contributed entries.
	pub sources: usize,
	/// Entries across all stores, before grouping.
	pub input_entries: usize,
	/// Distinct canonical keys.
	pub groups: usize,
	/// Entries collapsed into another one (sum over groups of `size - 1`).
	pub duplicates: usize,
	/// Entries left after filtering.
	pub kept: usize,
}

/// A source that could not be loaded during [`MergeEngine::merge_sources`].
#[derive(Debug)]
pub struct SourceFailure {
	pub path: PathBuf,
	pub error: DictError,
}

/// Outcome of a merge run: ranked entries plus what went wrong on the way.
#[derive(Debug)]
pub struct MergeReport {
	pub entries: Vec<Entry>,
	pub stats: MergeStats,
	pub failures: Vec<SourceFailure>,
}

/// Entries of every store sharing one canonical key, in encounter order.
struct MergeGroup<'a> {
	members: Vec<&'a Entry>,
}

/// Groups entries by canonical key, keeping groups in first-appearance order.
///
/// Entries whose key is empty are dropped.
fn group_entries<'a, S: AsRef<[Entry]>>(stores: &'a [S]) -> Vec<MergeGroup<'a>> {
	let mut index: HashMap<String, usize> = HashMap::new();
	let mut groups: Vec<MergeGroup<'a>> = Vec::new();

	for entry in stores.iter().flat_map(|store| store.as_ref()) {
		let key = normalize(&entry.word);
		if key.is_empty() {
			continue;
		}
		let slot = *index.entry(key).or_insert_with(|| {
			groups.push(MergeGroup { members: Vec::new() });
			groups.len() - 1
		});
		groups[slot].members.push(entry);
	}

	groups
}

/// Collapses a group with several members into one entry.
///
/// Casing comes from the first member, except for `Max` where it comes
/// from the winner.
fn resolve(strategy: MergeStrategy, members: &[&Entry]) -> Entry {
	let first = members[0];
	let sum = || members.iter().map(|e| e.frequency as u128).sum::<u128>();

	match strategy {
		MergeStrategy::Max => {
			let winner = members
				.iter()
				.copied()
				.skip(1)
				.fold(first, |best, e| if e.frequency > best.frequency { e } else { best });
			winner.clone()
		}
		MergeStrategy::Sum => {
			let total = u64::try_from(sum()).unwrap_or(u64::MAX);
			Entry::new(first.word.clone(), total)
		}
		MergeStrategy::Avg => {
			// Never exceeds the largest member, so it fits back into u64.
			let average = (sum() / members.len() as u128) as u64;
			Entry::new(first.word.clone(), average)
		}
		MergeStrategy::Weighted => {
			let others = (members.len() - 1) as f64;
			let other_weight = (1.0 - FIRST_SOURCE_WEIGHT) / others;
			let weighted = members
				.iter()
				.skip(1)
				.fold(first.frequency as f64 * FIRST_SOURCE_WEIGHT, |acc, e| {
					acc + e.frequency as f64 * other_weight
				});
			Entry::new(first.word.clone(), weighted as u64)
		}
	}
}

/// Orders entries by descending frequency, then by ascending word.
///
/// The secondary key makes the ranking independent of input order for
/// entries with equal frequency.
pub fn rank(entries: &mut [Entry]) {
	entries.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.word.cmp(&b.word)));
}

/// Merges several dictionaries into one ranked list.
///
/// # Errors
/// - `InvalidConfig` if `min_freq` is 0.
/// - `EmptyInput` if the stores hold no entries at all.
/// - `EmptyResult` if every merged entry falls below `min_freq`.
pub fn merge<S>(stores: &[S], strategy: MergeStrategy, min_freq: u64) -> Result<Vec<Entry>>
where
	S: AsRef<[Entry]>,
{
	let engine = MergeEngine::new(MergeOptions::new(strategy, min_freq))?;
	Ok(engine.merge(stores)?.0)
}

/// Groups, resolves, filters and ranks dictionary entries.
///
/// # Responsibilities
/// - Validate options before any source is read
/// - Load sources, reporting (not propagating) the ones that fail
/// - Apply the selected strategy to each group of duplicates
/// - Produce a deterministic ranking
pub struct MergeEngine<'a> {
	options: MergeOptions,
	observer: &'a dyn Observer,
}

impl<'a> MergeEngine<'a> {
	/// # Errors
	/// `InvalidConfig` if the options do not validate.
	pub fn new(options: MergeOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self { options, observer: &SilentObserver })
	}

	pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
		self.observer = observer;
		self
	}

	pub fn options(&self) -> &MergeOptions {
		&self.options
	}

	/// Merges in-memory stores; earlier stores take precedence for casing and weighting.
	///
	/// # Errors
	/// - `EmptyInput` if the stores hold no entries at all.
	/// - `EmptyResult` if every merged entry falls below `min_freq`.
	pub fn merge<S: AsRef<[Entry]>>(&self, stores: &[S]) -> Result<(Vec<Entry>, MergeStats)> {
		let mut stats = MergeStats {
			sources: stores.iter().filter(|s| !s.as_ref().is_empty()).count(),
			input_entries: stores.iter().map(|s| s.as_ref().len()).sum(),
			..MergeStats::default()
		};
		if stats.input_entries == 0 {
			return Err(DictError::EmptyInput);
		}

		let groups = group_entries(stores);
		stats.groups = groups.len();

		let mut merged = Vec::with_capacity(groups.len());
		for group in &groups {
			let entry = match group.members.as_slice() {
				[single] => (*single).clone(),
				members => {
					stats.duplicates += members.len() - 1;
					resolve(self.options.strategy, members)
				}
			};
			if entry.frequency >= self.options.min_freq {
				merged.push(entry);
			}
		}

		rank(&mut merged);
		stats.kept = merged.len();
		self.observer
			.merge_finished(&stats, &merged[..merged.len().min(TOP_ENTRIES)]);

		if stats.groups == 0 {
			return Err(DictError::EmptyResult(format!(
				"none of the {} entries has a usable canonical key",
				stats.input_entries
			)));
		}
		if merged.is_empty() {
			return Err(DictError::EmptyResult(format!(
				"all {} words fell below the minimum frequency of {}",
				stats.groups, self.options.min_freq
			)));
		}
		Ok((merged, stats))
	}

	/// Loads every source and merges what could be loaded.
	///
	/// A source that cannot be read is recorded in the report's `failures`
	/// and the remaining sources are still merged. Each source is truncated
	/// to the configured `limit`.
	///
	/// # Errors
	/// - `SourcesFailed` if no entry was loaded and at least one source
	///   could not be read; it carries every failure.
	/// - `EmptyInput` if the readable sources produced no entry.
	/// - `EmptyResult` if every merged entry falls below `min_freq`.
	pub fn merge_sources<P: AsRef<Path>>(&self, paths: &[P]) -> Result<MergeReport> {
		let mut stores = Vec::with_capacity(paths.len());
		let mut failures = Vec::new();

		for path in paths {
			let path = path.as_ref();
			match DictionaryStore::load(path, self.options.limit) {
				Ok(store) => {
					if let Some(reason) = store.rejection() {
						self.observer.source_rejected(store.name(), reason);
					}
					self.observer.source_loaded(store.name(), store.len(), store.skipped());
					stores.push(store);
				}
				Err(error) => {
					self.observer.source_failed(&source_name(path), &error);
					failures.push(SourceFailure { path: path.to_path_buf(), error });
				}
			}
		}

		let loaded: usize = stores.iter().map(DictionaryStore::len).sum();
		if loaded == 0 && !failures.is_empty() {
			return Err(DictError::SourcesFailed(failures));
		}

		let (entries, stats) = self.merge(&stores)?;
		Ok(MergeReport { entries, stats, failures })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store(entries: &[(&str, u64)]) -> Vec<Entry> {
		entries.iter().map(|(w, f)| Entry::new(*w, *f)).collect()
	}

	fn pairs(entries: &[Entry]) -> Vec<(&str, u64)> {
		entries.iter().map(|e| (e.word.as_str(), e.frequency)).collect()
	}

	#[test]
	fn weighted_favours_the_first_source() {
		let stores = [store(&[("Hello", 10)]), store(&[("hello", 5)])];
		let merged = merge(&stores, MergeStrategy::Weighted, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("Hello", 8)]);
	}

	#[test]
	fn weighted_splits_the_remaining_weight_evenly() {
		let stores = [store(&[("casa", 100)]), store(&[("Casa", 50)]), store(&[("CASA", 30)])];
		let merged = merge(&stores, MergeStrategy::Weighted, 1).unwrap();
		// 100 * 0.6 + 50 * 0.2 + 30 * 0.2
		assert_eq!(pairs(&merged), vec![("casa", 76)]);
	}

	#[test]
	fn max_keeps_the_winning_casing_and_first_on_ties() {
		let stores = [store(&[("paris", 3), ("Roma", 7)]), store(&[("Paris", 9), ("roma", 7)])];
		let merged = merge(&stores, MergeStrategy::Max, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("Paris", 9), ("Roma", 7)]);
	}

	#[test]
	fn sum_and_avg_take_casing_from_the_first_member() {
		let stores = [store(&[("Città", 4)]), store(&[("citta", 7)]), store(&[("CITTA", 6)])];
		let summed = merge(&stores, MergeStrategy::Sum, 1).unwrap();
		assert_eq!(pairs(&summed), vec![("Città", 17)]);

		let averaged = merge(&stores, MergeStrategy::Avg, 1).unwrap();
		assert_eq!(pairs(&averaged), vec![("Città", 5)]);
	}

	#[test]
	fn duplicates_inside_one_store_are_grouped_too() {
		let stores = [store(&[("Perché", 2), ("perche", 3), ("altro", 1)])];
		let merged = merge(&stores, MergeStrategy::Sum, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("Perché", 5), ("altro", 1)]);
	}

	#[test]
	fn empty_keys_are_dropped() {
		let stores = [store(&[("123", 50), ("!!", 40), ("ok", 1)])];
		let merged = merge(&stores, MergeStrategy::Max, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("ok", 1)]);
	}

	#[test]
	fn single_members_pass_through_unchanged() {
		let stores = [store(&[("Über", 3)])];
		let merged = merge(&stores, MergeStrategy::Weighted, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("Über", 3)]);
	}

	#[test]
	fn ranking_breaks_ties_by_word() {
		let stores = [store(&[("zeta", 5), ("alpha", 5), ("mid", 9), ("beta", 5)])];
		let merged = merge(&stores, MergeStrategy::Max, 1).unwrap();
		assert_eq!(pairs(&merged), vec![("mid", 9), ("alpha", 5), ("beta", 5), ("zeta", 5)]);
	}

	#[test]
	fn min_freq_filters_resolved_frequencies() {
		let stores = [store(&[("kept", 3), ("dropped", 2)]), store(&[("dropped", 2)])];
		let merged = merge(&stores, MergeStrategy::Max, 3).unwrap();
		assert_eq!(pairs(&merged), vec![("kept", 3)]);

		let merged = merge(&stores, MergeStrategy::Sum, 3).unwrap();
		assert_eq!(pairs(&merged), vec![("dropped", 4), ("kept", 3)]);
	}

	#[test]
	fn stats_count_groups_and_duplicates() {
		let stores = [
			store(&[("a1", 1), ("bb", 2)]),
			store(&[("BB", 3), ("cc", 4)]),
			store(&[("bB", 1)]),
		];
		let engine = MergeEngine::new(MergeOptions::default()).unwrap();
		let (_, stats) = engine.merge(&stores).unwrap();
		assert_eq!(
			stats,
			MergeStats { sources: 3, input_entries: 5, groups: 3, duplicates: 2, kept: 3 }
		);
	}

	#[test]
	fn empty_input_and_empty_result_are_errors() {
		let nothing: [Vec<Entry>; 2] = [Vec::new(), Vec::new()];
		assert!(matches!(merge(&nothing, MergeStrategy::Max, 1), Err(DictError::EmptyInput)));

		let low = [store(&[("tiny", 1)])];
		assert!(matches!(merge(&low, MergeStrategy::Max, 2), Err(DictError::EmptyResult(_))));
	}

	#[test]
	fn entries_without_a_key_are_reported_as_such() {
		let stores = [store(&[("123", 5), ("!!", 3)])];
		match merge(&stores, MergeStrategy::Max, 1) {
			Err(DictError::EmptyResult(reason)) => assert!(reason.contains("usable canonical key")),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn failures_are_kept_when_no_source_loads() {
		let engine = MergeEngine::new(MergeOptions::default()).unwrap();
		let missing = ["/no/such/base.json", "/no/such/list.txt"];
		match engine.merge_sources(&missing) {
			Err(DictError::SourcesFailed(failures)) => {
				assert_eq!(failures.len(), 2);
				assert_eq!(failures[1].path, PathBuf::from("/no/such/list.txt"));
				assert!(matches!(failures[0].error, DictError::SourceUnavailable { .. }));
			}
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn zero_threshold_is_rejected() {
		let stores = [store(&[("word", 1)])];
		assert!(matches!(merge(&stores, MergeStrategy::Max, 0), Err(DictError::InvalidConfig(_))));
	}

	#[test]
	fn large_sums_saturate() {
		let stores = [store(&[("big", u64::MAX)]), store(&[("big", 10)])];
		let summed = merge(&stores, MergeStrategy::Sum, 1).unwrap();
		assert_eq!(summed[0].frequency, u64::MAX);
		let averaged = merge(&stores, MergeStrategy::Avg, 1).unwrap();
		assert_eq!(averaged[0].frequency, u64::MAX / 2 + 5);
	}
}
