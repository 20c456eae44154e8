use std::collections::{BTreeMap, HashSet};
use std::fs;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dict_gen_core::model::merge_engine::MergeEngine;
use dict_gen_core::observer::SilentObserver;
use dict_gen_core::{DictError, Entry, MergeOptions, MergeStrategy, merge, normalize};

const LETTERS: &[u8] = b"abcdefgh";

fn random_word(rng: &mut StdRng) -> String {
	let len = rng.random_range(2..6);
	(0..len)
		.map(|_| {
			let c = LETTERS[rng.random_range(0..LETTERS.len())] as char;
			if rng.random_bool(0.3) { c.to_ascii_uppercase() } else { c }
		})
		.collect()
}

/// A dictionary whose words all have distinct canonical keys.
fn random_dictionary(rng: &mut StdRng, size: usize) -> Vec<Entry> {
	let mut seen = HashSet::new();
	let mut entries = Vec::new();
	while entries.len() < size {
		let word = random_word(rng);
		if seen.insert(normalize(&word)) {
			entries.push(Entry::new(word, rng.random_range(1..1_000)));
		}
	}
	entries
}

fn by_key(entries: &[Entry]) -> BTreeMap<String, u64> {
	entries.iter().map(|e| (normalize(&e.word), e.frequency)).collect()
}

#[test]
fn max_and_avg_are_idempotent() {
	let mut rng = StdRng::seed_from_u64(7);
	for _ in 0..20 {
		let dictionary = random_dictionary(&mut rng, 40);
		for strategy in [MergeStrategy::Max, MergeStrategy::Avg] {
			let once = merge(&[dictionary.clone()], strategy, 1).unwrap();
			let twice = merge(&[dictionary.clone(), dictionary.clone()], strategy, 1).unwrap();
			assert_eq!(once, twice, "{strategy}");
		}
	}
}

#[test]
fn sum_is_commutative_up_to_casing() {
	let mut rng = StdRng::seed_from_u64(11);
	for _ in 0..20 {
		let left = random_dictionary(&mut rng, 30);
		let right = random_dictionary(&mut rng, 30);
		let forward = merge(&[left.clone(), right.clone()], MergeStrategy::Sum, 1).unwrap();
		let backward = merge(&[right, left], MergeStrategy::Sum, 1).unwrap();
		assert_eq!(by_key(&forward), by_key(&backward));
	}
}

#[test]
fn raising_the_threshold_never_adds_entries() {
	let mut rng = StdRng::seed_from_u64(23);
	let stores = [random_dictionary(&mut rng, 50), random_dictionary(&mut rng, 50)];
	let mut previous = usize::MAX;
	for min_freq in [1, 10, 100, 500, 900] {
		let kept = merge(&stores, MergeStrategy::Avg, min_freq)
			.map(|entries| entries.len())
			.unwrap_or(0);
		assert!(kept <= previous, "min_freq = {min_freq}");
		previous = kept;
	}
}

#[test]
fn case_and_accent_variants_share_a_key() {
	assert_eq!(normalize("Café"), normalize("CAFE"));
	assert_eq!(normalize("  perché "), "perche");

	let stores = [vec![Entry::new("Café", 4)], vec![Entry::new("CAFE", 6)]];
	let merged = merge(&stores, MergeStrategy::Sum, 1).unwrap();
	assert_eq!(merged, vec![Entry::new("Café", 10)]);
}

#[test]
fn missing_sources_do_not_stop_a_merge() {
	let dir = tempfile::tempdir().unwrap();
	let base = dir.path().join("it_base.json");
	let list = dir.path().join("it_50k.txt");
	let missing = dir.path().join("it_missing.json");
	fs::write(&base, r#"[{"w": "Ciao", "f": 10}, {"w": "grazie", "f": 4}, {"w": "", "f": 3}]"#).unwrap();
	fs::write(&list, "ciao 30\nprego 12\nnot-a-number x\n").unwrap();

	let engine = MergeEngine::new(MergeOptions::default())
		.unwrap()
		.with_observer(&SilentObserver);
	let report = engine.merge_sources(&[&base, &missing, &list]).unwrap();

	assert_eq!(report.failures.len(), 1);
	assert_eq!(report.failures[0].path, missing);
	assert!(report.failures[0].error.is_retryable());
	assert_eq!(
		report.entries,
		vec![Entry::new("ciao", 30), Entry::new("prego", 12), Entry::new("grazie", 4)]
	);
	assert_eq!(report.stats.sources, 2);
	assert_eq!(report.stats.duplicates, 1);
}

#[test]
fn a_source_that_is_not_a_list_contributes_nothing() {
	let dir = tempfile::tempdir().unwrap();
	let object = dir.path().join("object.json");
	let list = dir.path().join("words.json");
	fs::write(&object, r#"{"w": "ciao", "f": 3}"#).unwrap();
	fs::write(&list, r#"[{"word": "ciao", "frequency": "5"}]"#).unwrap();

	let engine = MergeEngine::new(MergeOptions::default()).unwrap();
	let report = engine.merge_sources(&[&object, &list]).unwrap();
	assert!(report.failures.is_empty());
	assert_eq!(report.entries, vec![Entry::new("ciao", 5)]);

	let err = engine.merge_sources(&[&object]).unwrap_err();
	assert!(matches!(err, DictError::EmptyInput));
}

#[test]
fn limit_truncates_every_source() {
	let dir = tempfile::tempdir().unwrap();
	let first = dir.path().join("first.csv");
	let second = dir.path().join("second.csv");
	fs::write(&first, "word,count\nuno,5\ndue,4\ntre,3\n").unwrap();
	fs::write(&second, "quattro,9\ncinque,8\n").unwrap();

	let options = MergeOptions { strategy: MergeStrategy::Max, min_freq: 1, limit: Some(1) };
	let report = MergeEngine::new(options).unwrap().merge_sources(&[first, second]).unwrap();
	assert_eq!(report.entries, vec![Entry::new("quattro", 9), Entry::new("uno", 5)]);
}
