//! Error types shared by every stage of the dictionary pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::merge_engine::SourceFailure;

/// The primary error type for all operations in this crate.
///
/// Malformed records are deliberately absent: a record that fails to parse
/// is skipped and counted by the store that read it, never surfaced here.
#[derive(Debug, Error)]
pub enum DictError {
	/// A corpus or dictionary source could not be opened or read.
	#[error("source unavailable: {}: {source}", path.display())]
	SourceUnavailable {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Nothing was supplied to a merge run.
	#[error("no entries to merge: every source was empty or failed to load")]
	EmptyInput,

	/// Every source of a merge failed to load; the failures are kept.
	#[error("no source could be loaded ({} failed)", .0.len())]
	SourcesFailed(Vec<SourceFailure>),

	/// A run finished without producing anything worth writing.
	#[error("empty result: {0}")]
	EmptyResult(String),

	/// An option was rejected before any processing started.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// An artifact could not be written.
	#[error("failed to write {}: {source}", path.display())]
	Output {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Partial n-gram counts could not be encoded or decoded.
	#[error("partial counts codec error: {0}")]
	Partial(#[from] postcard::Error),

	/// JSON encoding of an output artifact failed.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl DictError {
	pub(crate) fn unavailable<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
		DictError::SourceUnavailable { path: path.into(), source }
	}

	pub(crate) fn output<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
		DictError::Output { path: path.into(), source }
	}

	/// Whether the caller may reasonably retry the operation (e.g. re-attempt a read).
	pub fn is_retryable(&self) -> bool {
		matches!(self, DictError::SourceUnavailable { .. } | DictError::SourcesFailed(_))
	}
}

/// A convenience `Result` type alias using the crate's `DictError` type.
pub type Result<T> = std::result::Result<T, DictError>;
