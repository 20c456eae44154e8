use std::path::Path;
use std::sync::mpsc;
use std::thread;

use crate::error::{DictError, Result};
use crate::io::{self, source_name};
use crate::observer::{Observer, SilentObserver};
use super::ngram_counts::NgramCounts;
use super::ngram_tables::{BigramTable, NgramTables, TrigramTable};
use super::options::ExtractOptions;

/// Number of lines between two progress notifications.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Summary of a finished extraction, handed to the observer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
	pub lines: usize,
	pub bigrams: usize,
	pub trigrams: usize,
	pub min_freq: u64,
}

/// Counts the n-grams of a sequence of lines without filtering.
pub fn count_lines<I, S>(lines: I) -> NgramCounts
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut counts = NgramCounts::new();
	for line in lines {
		counts.add_line(line.as_ref());
	}
	counts
}

/// Extracts bigram and trigram tables from a sequence of lines.
///
/// Counts every adjacent pair and triple of canonical tokens, then drops
/// the n-grams seen fewer than `min_freq` times. Never fails: lines
/// without usable tokens simply contribute nothing.
pub fn extract<I, S>(lines: I, min_freq: u64) -> (BigramTable, TrigramTable)
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	count_lines(lines).finalize(min_freq).into_tables()
}

/// Counts the n-grams of `lines` on `workers` threads.
///
/// # Behavior
/// - Splits the lines into `workers` contiguous shards.
/// - Each worker counts its shard into its own `NgramCounts` (no shared state).
/// - Partial counts are sent back over a channel and summed on the caller thread.
///
/// The result is identical to [`count_lines`] over the same lines.
pub fn count_parallel<S>(lines: &[S], workers: usize) -> NgramCounts
where
	S: AsRef<str> + Sync,
{
	if lines.is_empty() {
		return NgramCounts::new();
	}
	let chunk_size = lines.len().div_ceil(workers.max(1));

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			scope.spawn(move || {
				let partial = count_lines(chunk);
				// The receiver lives until every worker has finished.
				let _ = tx.send(partial);
			});
		}
		drop(tx);

		let mut total = NgramCounts::new();
		for partial in rx.iter() {
			total.merge(&partial);
		}
		total
	})
}

/// Counts a buffered batch of lines in parallel and empties it.
fn flush_batch(counts: &mut NgramCounts, batch: &mut Vec<String>, workers: usize) {
	if batch.is_empty() {
		return;
	}
	counts.merge(&count_parallel(&batch[..], workers));
	batch.clear();
}

/// File-level n-gram extraction with progress reporting.
///
/// # Responsibilities
/// - Validate options before touching any source
/// - Stream a corpus, sharding each batch of lines across threads
/// - Sum the counts of several corpora before filtering once
/// - Refuse to produce empty tables
pub struct Extractor<'a> {
	options: ExtractOptions,
	observer: &'a dyn Observer,
}

impl<'a> Extractor<'a> {
	/// # Errors
	/// `InvalidConfig` if the options do not validate.
	pub fn new(options: ExtractOptions) -> Result<Self> {
		options.validate()?;
		Ok(Self { options, observer: &SilentObserver })
	}

	pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
		self.observer = observer;
		self
	}

	pub fn options(&self) -> &ExtractOptions {
		&self.options
	}

	/// Counts the n-grams of one corpus file without filtering.
	///
	/// The file is streamed. With one worker every line is counted on the
	/// caller thread; with more, lines are buffered in batches of
	/// [`PROGRESS_INTERVAL`] and each batch is sharded with [`count_parallel`].
	/// Progress is reported after every batch, then with the total when it
	/// does not fall on a batch boundary.
	///
	/// Returns the counts and the number of lines read.
	///
	/// # Errors
	/// `SourceUnavailable` if the file cannot be read; nothing is returned
	/// for a source that fails half-way.
	pub fn count_file<P: AsRef<Path>>(&self, path: P) -> Result<(NgramCounts, usize)> {
		let path = path.as_ref();
		let name = source_name(path);
		let observer = self.observer;
		let workers = self.options.workers;

		let mut counts = NgramCounts::new();
		let mut batch: Vec<String> = Vec::new();
		let mut seen = 0;

		let lines = io::for_each_line(path, |line| {
			if workers == 1 {
				counts.add_line(line);
			} else {
				batch.push(line.to_owned());
			}
			seen += 1;
			if seen % PROGRESS_INTERVAL == 0 {
				flush_batch(&mut counts, &mut batch, workers);
				observer.lines_processed(&name, seen);
			}
		})?;
		flush_batch(&mut counts, &mut batch, workers);
		if lines == 0 || lines % PROGRESS_INTERVAL != 0 {
			observer.lines_processed(&name, lines);
		}

		Ok((counts, lines))
	}

	/// Extracts filtered tables from one corpus file.
	pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<NgramTables> {
		self.extract_files(std::slice::from_ref(&path))
	}

	/// Extracts filtered tables from several corpus files.
	///
	/// Counts are summed across files before the minimum frequency is
	/// applied, so splitting a corpus into files does not change the result.
	///
	/// # Errors
	/// - `SourceUnavailable` for the first file that cannot be read.
	/// - `EmptyResult` if no n-gram survives filtering.
	pub fn extract_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<NgramTables> {
		let mut total = NgramCounts::new();
		let mut lines = 0;
		for path in paths {
			let (counts, read) = self.count_file(path)?;
			total.merge(&counts);
			lines += read;
		}
		self.finish(total, lines)
	}

	/// Filters counts gathered elsewhere (e.g. loaded partials) into tables.
	///
	/// # Errors
	/// `EmptyResult` if no n-gram survives filtering.
	pub fn finish(&self, counts: NgramCounts, lines: usize) -> Result<NgramTables> {
		let tables = counts.finalize(self.options.min_freq);
		let stats = ExtractionStats {
			lines,
			bigrams: tables.bigram_len(),
			trigrams: tables.trigram_len(),
			min_freq: self.options.min_freq,
		};
		self.observer.extraction_finished(&stats);

		if tables.is_empty() {
			return Err(DictError::EmptyResult(format!(
				"no n-gram reached the minimum frequency of {} in {} lines",
				self.options.min_freq, lines
			)));
		}
		Ok(tables)
	}
}
