//! End-to-end dictionary builds and the artifact writers they rely on.
//!
//! A build runs, for one language, the optional steps
//! 1. n-gram extraction over every `{lang}_*.txt` corpus
//! 2. merge of the base dictionary with every `{lang}_*.json` word list
//!
//! and writes JSON artifacts next to the corpora (or to `output_dir`).

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DictError, Result};
use crate::io::{list_files, write_json};
use crate::model::dictionary_store::{DictionaryStore, Entry, SourceFormat};
use crate::model::extractor::Extractor;
use crate::model::merge_engine::{MergeEngine, MergeStats, SourceFailure};
use crate::model::ngram_tables::NgramTables;
use crate::model::options::{ExtractOptions, MergeOptions, MergeStrategy};
use crate::observer::Observer;

/// Writes a ranked dictionary as a JSON list of `{w, f}` records.
pub fn save_dictionary<P: AsRef<Path>>(path: P, entries: &[Entry]) -> Result<()> {
	write_json(path, entries)
}

/// Writes both n-gram tables as nested JSON objects with sorted keys.
pub fn save_ngrams<P, Q>(tables: &NgramTables, bigrams_path: P, trigrams_path: Q) -> Result<()>
where
	P: AsRef<Path>,
	Q: AsRef<Path>,
{
	write_json(bigrams_path, &tables.to_bigram_table())?;
	write_json(trigrams_path, &tables.to_trigram_table())
}

/// Converts a raw word list (frequency list or CSV) into the JSON dictionary format.
///
/// Entries keep their source order. Returns the number of entries written.
///
/// # Errors
/// - `SourceUnavailable` if the input cannot be read.
/// - `EmptyResult` if no record could be parsed.
pub fn convert<P, Q>(
	input: P,
	format: SourceFormat,
	output: Q,
	limit: Option<usize>,
) -> Result<usize>
where
	P: AsRef<Path>,
	Q: AsRef<Path>,
{
	let store = DictionaryStore::load_as(input.as_ref(), format, limit)?;
	if store.is_empty() {
		let reason = store.rejection().unwrap_or("no valid word/frequency record");
		return Err(DictError::EmptyResult(format!("{}: {reason}", input.as_ref().display())));
	}
	save_dictionary(output, store.entries())?;
	Ok(store.len())
}

fn default_corpora_dir() -> PathBuf {
	PathBuf::from("corpora")
}

fn default_base_dir() -> PathBuf {
	PathBuf::from("dictionaries")
}

/// Description of a complete build, loadable from a JSON file.
///
/// Omitted fields take their defaults: n-gram `min_freq` 2, `weighted`
/// merge, merge `min_freq` 1, one worker per CPU, outputs next to the corpora.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
	/// Language code used as file prefix (`it`, `en`, ...).
	pub language: String,
	pub corpora_dir: PathBuf,
	/// Directory holding `{lang}_base.json`.
	pub base_dir: PathBuf,
	/// Where artifacts are written; defaults to `corpora_dir`.
	pub output_dir: Option<PathBuf>,
	pub extract_ngrams: bool,
	pub merge: bool,
	pub ngram_min_freq: u64,
	pub workers: usize,
	pub strategy: MergeStrategy,
	pub merge_min_freq: u64,
	pub limit: Option<usize>,
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			language: String::new(),
			corpora_dir: default_corpora_dir(),
			base_dir: default_base_dir(),
			output_dir: None,
			extract_ngrams: false,
			merge: false,
			ngram_min_freq: 2,
			workers: num_cpus::get(),
			strategy: MergeStrategy::Weighted,
			merge_min_freq: 1,
			limit: None,
		}
	}
}

impl BuildConfig {
	pub fn new<L: Into<String>>(language: L) -> Self {
		Self { language: language.into(), ..Self::default() }
	}

	/// Reads a build description from a JSON file.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).map_err(|e| DictError::unavailable(path, e))?;
		serde_json::from_slice(&bytes)
			.map_err(|e| DictError::InvalidConfig(format!("{}: {e}", path.display())))
	}

	pub fn extract_options(&self) -> ExtractOptions {
		ExtractOptions { min_freq: self.ngram_min_freq, workers: self.workers }
	}

	pub fn merge_options(&self) -> MergeOptions {
		MergeOptions { strategy: self.strategy, min_freq: self.merge_min_freq, limit: self.limit }
	}

	pub fn output_dir(&self) -> &Path {
		self.output_dir.as_deref().unwrap_or(&self.corpora_dir)
	}

	fn artifact(&self, suffix: &str) -> PathBuf {
		self.output_dir().join(format!("{}_{suffix}.json", self.language))
	}

	pub fn bigrams_path(&self) -> PathBuf {
		self.artifact("bigrams")
	}

	pub fn trigrams_path(&self) -> PathBuf {
		self.artifact("trigrams")
	}

	pub fn merged_path(&self) -> PathBuf {
		self.artifact("merged")
	}

	pub fn base_dictionary_path(&self) -> PathBuf {
		self.base_dir.join(format!("{}_base.json", self.language))
	}

	/// Rejects a configuration before any step runs.
	pub fn validate(&self) -> Result<()> {
		let language_ok = !self.language.is_empty()
			&& self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
		if !language_ok {
			let reason = format!("invalid language code '{}'", self.language);
			return Err(DictError::InvalidConfig(reason));
		}
		if !self.extract_ngrams && !self.merge {
			return Err(DictError::InvalidConfig(
				"no step enabled, enable n-gram extraction and/or merge".to_owned(),
			));
		}
		self.extract_options().validate()?;
		self.merge_options().validate()
	}
}

/// What a build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
	/// Bigram and trigram table paths, when extraction ran.
	pub ngrams: Option<(PathBuf, PathBuf)>,
	pub bigram_count: usize,
	pub trigram_count: usize,
	/// Merged dictionary path, when the merge ran.
	pub merged: Option<PathBuf>,
	pub merge_stats: Option<MergeStats>,
	/// Word lists that could not be read during the merge.
	pub failures: Vec<SourceFailure>,
}

/// Runs the enabled steps of a build.
///
/// # Errors
/// - `InvalidConfig` before anything runs.
/// - `SourceUnavailable` if a corpus or the base dictionary cannot be read.
/// - `EmptyResult` if a step ends up with nothing to write.
pub fn build(config: &BuildConfig, observer: &dyn Observer) -> Result<BuildReport> {
	config.validate()?;
	let mut report = BuildReport::default();
	let prefix = format!("{}_", config.language);

	if config.extract_ngrams {
		let corpora = list_files(&config.corpora_dir, &prefix, "txt")?;
		if corpora.is_empty() {
			let reason = format!("no {prefix}*.txt corpus in {}", config.corpora_dir.display());
			observer.step_skipped("extract-ngrams", &reason);
		} else {
			let extractor = Extractor::new(config.extract_options())?.with_observer(observer);
			let tables = extractor.extract_files(&corpora)?;
			let (bigrams, trigrams) = (config.bigrams_path(), config.trigrams_path());
			save_ngrams(&tables, &bigrams, &trigrams)?;
			observer.artifact_written(&bigrams);
			observer.artifact_written(&trigrams);
			report.bigram_count = tables.bigram_len();
			report.trigram_count = tables.trigram_len();
			report.ngrams = Some((bigrams, trigrams));
		}
	}

	if config.merge {
		let base = config.base_dictionary_path();
		if !base.is_file() {
			let missing = io::Error::new(io::ErrorKind::NotFound, "base dictionary not found");
			return Err(DictError::unavailable(base, missing));
		}

		let merged_path = config.merged_path();
		let mut inputs = Vec::new();
		for path in list_files(&config.corpora_dir, &prefix, "json")? {
			if path != base && is_word_list(&path, &merged_path) {
				inputs.push(path);
			}
		}
		inputs.insert(0, base);

		if inputs.len() < 2 {
			observer.step_skipped("merge", "only the base dictionary is available");
		} else {
			let engine = MergeEngine::new(config.merge_options())?.with_observer(observer);
			let merge = engine.merge_sources(&inputs)?;
			save_dictionary(&merged_path, &merge.entries)?;
			observer.artifact_written(&merged_path);
			report.merge_stats = Some(merge.stats);
			report.failures = merge.failures;
			report.merged = Some(merged_path);
		}
	}

	Ok(report)
}

/// Whether a `{lang}_*.json` file in the corpora directory is a word list
/// rather than an artifact of a previous build.
fn is_word_list(path: &Path, merged_path: &Path) -> bool {
	let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
	let is_ngram = name.contains("bigram") || name.contains("trigram");
	let is_previous_merge = path.file_name() == merged_path.file_name();
	!is_ngram && !is_previous_merge
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;
	use crate::observer::SilentObserver;
	use crate::observer::testing::RecordingObserver;

	fn read_entries(path: &Path) -> Vec<Entry> {
		serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
	}

	#[test]
	fn config_defaults_follow_the_build_tooling() {
		let config: BuildConfig = serde_json::from_str(r#"{"language": "it", "merge": true}"#).unwrap();
		assert_eq!(config.ngram_min_freq, 2);
		assert_eq!(config.strategy, MergeStrategy::Weighted);
		assert_eq!(config.merge_min_freq, 1);
		assert_eq!(config.merged_path(), PathBuf::from("corpora/it_merged.json"));
		assert_eq!(config.base_dictionary_path(), PathBuf::from("dictionaries/it_base.json"));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn config_requires_a_language_and_a_step() {
		assert!(BuildConfig::new("").validate().is_err());
		assert!(BuildConfig::new("../it").validate().is_err());
		assert!(BuildConfig::new("it").validate().is_err());
		let config = BuildConfig { extract_ngrams: true, ngram_min_freq: 0, ..BuildConfig::new("it") };
		assert!(matches!(config.validate(), Err(DictError::InvalidConfig(_))));
	}

	#[test]
	fn word_list_filter_skips_previous_artifacts() {
		let merged = Path::new("out/it_merged.json");
		assert!(is_word_list(Path::new("c/it_wikipedia.json"), merged));
		assert!(!is_word_list(Path::new("c/it_bigrams.json"), merged));
		assert!(!is_word_list(Path::new("c/it_trigrams.json"), merged));
		assert!(!is_word_list(Path::new("c/it_merged.json"), merged));
	}

	#[test]
	fn convert_writes_json_in_source_order() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("it_50k.txt");
		let output = dir.path().join("it_frequencywords.json");
		fs::write(&input, "di 900\nche 800\nbroken\nnon 700\n").unwrap();

		let written = convert(&input, SourceFormat::FrequencyList, &output, Some(2)).unwrap();
		assert_eq!(written, 2);
		assert_eq!(read_entries(&output), vec![Entry::new("di", 900), Entry::new("che", 800)]);
	}

	#[test]
	fn convert_refuses_to_write_empty_dictionaries() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("empty.csv");
		let output = dir.path().join("empty.json");
		fs::write(&input, "word,count\n").unwrap();

		let err = convert(&input, SourceFormat::Csv, &output, None).unwrap_err();
		assert!(matches!(err, DictError::EmptyResult(_)));
		assert!(!output.exists());
	}

	#[test]
	fn build_extracts_and_merges() {
		let dir = tempfile::tempdir().unwrap();
		let corpora = dir.path().join("corpora");
		let base = dir.path().join("dictionaries");
		fs::create_dir_all(&corpora).unwrap();
		fs::create_dir_all(&base).unwrap();

		fs::write(corpora.join("it_books.txt"), "buona sera amici\nbuona sera a tutti\n").unwrap();
		fs::write(corpora.join("it_news.txt"), "buona sera\n").unwrap();
		fs::write(corpora.join("en_books.txt"), "good evening friends\n").unwrap();
		fs::write(base.join("it_base.json"), r#"[{"w": "Sera", "f": 10}, {"w": "casa", "f": 4}]"#).unwrap();
		fs::write(corpora.join("it_wikipedia.json"), r#"[{"w": "sera", "f": 5}, {"w": "perché", "f": 3}]"#).unwrap();

		let config = BuildConfig {
			corpora_dir: corpora.clone(),
			base_dir: base,
			extract_ngrams: true,
			merge: true,
			workers: 2,
			..BuildConfig::new("it")
		};
		let observer = RecordingObserver::default();
		let report = build(&config, &observer).unwrap();

		let (bigrams_path, _) = report.ngrams.clone().unwrap();
		let bigrams = fs::read_to_string(bigrams_path).unwrap();
		let bigrams: serde_json::Value = serde_json::from_str(&bigrams).unwrap();
		assert_eq!(bigrams["buona"]["sera"], 3);
		assert!(bigrams.get("sera").is_none());
		assert_eq!(report.trigram_count, 0);

		let merged = read_entries(&config.merged_path());
		assert_eq!(
			merged,
			vec![Entry::new("Sera", 8), Entry::new("casa", 4), Entry::new("perché", 3)]
		);
		assert!(report.failures.is_empty());
		assert!(observer.events().contains(&"merged 3 3".to_owned()));

		// a second run must not pick up its own artifacts
		let again = build(&config, &SilentObserver).unwrap();
		assert_eq!(again.merge_stats.unwrap().input_entries, 4);
	}

	#[test]
	fn build_skips_steps_without_inputs() {
		let dir = tempfile::tempdir().unwrap();
		let base = dir.path().join("it_base.json");
		fs::write(&base, r#"[{"w": "ciao", "f": 1}]"#).unwrap();

		let config = BuildConfig {
			corpora_dir: dir.path().to_path_buf(),
			base_dir: dir.path().to_path_buf(),
			extract_ngrams: true,
			merge: true,
			..BuildConfig::new("it")
		};
		let observer = RecordingObserver::default();
		let report = build(&config, &observer).unwrap();

		assert!(report.ngrams.is_none());
		assert!(report.merged.is_none());
		assert_eq!(observer.events(), vec!["skipped extract-ngrams", "skipped merge"]);
	}

	#[test]
	fn build_requires_the_base_dictionary() {
		let dir = tempfile::tempdir().unwrap();
		let config = BuildConfig {
			corpora_dir: dir.path().to_path_buf(),
			base_dir: dir.path().join("missing"),
			merge: true,
			..BuildConfig::new("it")
		};
		let err = build(&config, &SilentObserver).unwrap_err();
		assert!(matches!(err, DictError::SourceUnavailable { .. }));
	}
}
