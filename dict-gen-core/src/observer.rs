//! Progress hooks for long-running extraction and merge runs.
//!
//! The core never prints. Callers inject an [`Observer`] to receive
//! notifications at stage boundaries: [`SilentObserver`] discards them,
//! [`LogObserver`] forwards them to the `log` facade.

use log::{info, warn};

use crate::error::DictError;
use crate::model::dictionary_store::Entry;
use crate::model::extractor::ExtractionStats;
use crate::model::merge_engine::MergeStats;

/// Receives progress notifications. Every method defaults to a no-op.
pub trait Observer {
	/// Called every [`PROGRESS_INTERVAL`](crate::model::extractor::PROGRESS_INTERVAL)
	/// lines of a corpus, and with the final total.
	fn lines_processed(&self, _source: &str, _lines: usize) {}

	/// A dictionary source was read.
	fn source_loaded(&self, _source: &str, _accepted: usize, _skipped: usize) {}

	/// A dictionary source was readable but rejected as a whole (wrong document shape).
	fn source_rejected(&self, _source: &str, _reason: &str) {}

	/// A source could not be read; the run continues without it when it can.
	fn source_failed(&self, _source: &str, _error: &DictError) {}

	/// A pipeline step did not run.
	fn step_skipped(&self, _step: &str, _reason: &str) {}

	/// N-gram extraction completed (after filtering).
	fn extraction_finished(&self, _stats: &ExtractionStats) {}

	/// A merge completed; `top` holds the highest ranked entries.
	fn merge_finished(&self, _stats: &MergeStats, _top: &[Entry]) {}

	/// An artifact was written.
	fn artifact_written(&self, _path: &std::path::Path) {}
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl Observer for SilentObserver {}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
	fn lines_processed(&self, source: &str, lines: usize) {
		info!("{source}: processed {lines} lines");
	}

	fn source_loaded(&self, source: &str, accepted: usize, skipped: usize) {
		info!("loaded {accepted} entries from {source} ({skipped} malformed records skipped)");
	}

	fn source_rejected(&self, source: &str, reason: &str) {
		warn!("{source}: {reason}, skipping");
	}

	fn source_failed(&self, source: &str, error: &DictError) {
		warn!("{source}: {error}");
	}

	fn step_skipped(&self, step: &str, reason: &str) {
		warn!("{step}: {reason}, skipping");
	}

	fn extraction_finished(&self, stats: &ExtractionStats) {
		info!(
			"processed {} lines, extracted {} bigrams and {} trigrams (min freq {})",
			stats.lines, stats.bigrams, stats.trigrams, stats.min_freq
		);
	}

	fn merge_finished(&self, stats: &MergeStats, top: &[Entry]) {
		info!(
			"merged {} entries: {} unique words, {} duplicates collapsed, {} kept",
			stats.input_entries, stats.groups, stats.duplicates, stats.kept
		);
		for (rank, entry) in top.iter().enumerate() {
			info!("  {}. {} (freq: {})", rank + 1, entry.word, entry.frequency);
		}
	}

	fn artifact_written(&self, path: &std::path::Path) {
		info!("saved {}", path.display());
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use std::cell::RefCell;

	use super::*;

	/// Records notifications as short strings for assertions.
	#[derive(Default)]
	pub(crate) struct RecordingObserver {
		pub(crate) events: RefCell<Vec<String>>,
	}

	impl RecordingObserver {
		pub(crate) fn events(&self) -> Vec<String> {
			self.events.borrow().clone()
		}

		fn push(&self, event: String) {
			self.events.borrow_mut().push(event);
		}
	}

	impl Observer for RecordingObserver {
		fn lines_processed(&self, source: &str, lines: usize) {
			self.push(format!("lines {source} {lines}"));
		}

		fn source_loaded(&self, source: &str, accepted: usize, skipped: usize) {
			self.push(format!("loaded {source} {accepted} {skipped}"));
		}

		fn source_rejected(&self, source: &str, _reason: &str) {
			self.push(format!("rejected {source}"));
		}

		fn source_failed(&self, source: &str, _error: &DictError) {
			self.push(format!("failed {source}"));
		}

		fn step_skipped(&self, step: &str, _reason: &str) {
			self.push(format!("skipped {step}"));
		}

		fn extraction_finished(&self, stats: &ExtractionStats) {
			self.push(format!("extracted {} {}", stats.bigrams, stats.trigrams));
		}

		fn merge_finished(&self, stats: &MergeStats, top: &[Entry]) {
			self.push(format!("merged {} {}", stats.kept, top.len()));
		}
	}
}
