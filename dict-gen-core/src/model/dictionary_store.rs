use std::fmt;
use std::io::{BufRead, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DictError, Result};
use crate::io;

/// A single dictionary word with its frequency.
///
/// Serialized as `{"w": word, "f": frequency}`; `word` and `frequency` are
/// accepted as input aliases.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
	/// Original casing, as found in the source.
	#[serde(rename = "w", alias = "word")]
	pub word: String,

	#[serde(rename = "f", alias = "frequency")]
	pub frequency: u64,
}

impl Entry {
	pub fn new<W: Into<String>>(word: W, frequency: u64) -> Self {
		Self { word: word.into(), frequency }
	}
}

/// Layout of a dictionary source.
///
/// # Variants
/// - `Json`: a list-shaped document of `{w, f}` records.
/// - `FrequencyList`: `word count` lines, count last (OpenSubtitles style).
/// - `Csv`: `word,count` rows with an optional `word...` header (Wikipedia style).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
	Json,
	#[serde(rename = "list")]
	FrequencyList,
	Csv,
}

impl SourceFormat {
	/// Picks the format from the file extension; anything unknown is a frequency list.
	pub fn detect<P: AsRef<Path>>(path: P) -> Self {
		let extension = path
			.as_ref()
			.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase());
		match extension.as_deref() {
			Some("json") => SourceFormat::Json,
			Some("csv") => SourceFormat::Csv,
			_ => SourceFormat::FrequencyList,
		}
	}
}

impl fmt::Display for SourceFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			SourceFormat::Json => "json",
			SourceFormat::FrequencyList => "list",
			SourceFormat::Csv => "csv",
		})
	}
}

impl FromStr for SourceFormat {
	type Err = DictError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_lowercase().as_str() {
			"json" => Ok(SourceFormat::Json),
			"list" | "txt" => Ok(SourceFormat::FrequencyList),
			"csv" => Ok(SourceFormat::Csv),
			other => Err(DictError::InvalidConfig(format!(
				"unknown source format '{other}', expected json, list or csv"
			))),
		}
	}
}

/// Word/frequency entries loaded from one source.
///
/// # Responsibilities
/// - Parse a source in any supported layout
/// - Silently skip malformed records (counted, never an error)
/// - Truncate to an optional `limit` of accepted records, in source order
///
/// # Invariants
/// - Every entry has a non-blank word
/// - `entries.len() <= limit` when a limit was given
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DictionaryStore {
	name: String,
	entries: Vec<Entry>,
	skipped: usize,
	rejected: Option<String>,
}

impl DictionaryStore {
	/// Loads a dictionary file, detecting its format from the extension.
	pub fn load<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Self> {
		let format = SourceFormat::detect(&path);
		Self::load_as(path, format, limit)
	}

	/// Loads a dictionary file in an explicit format.
	///
	/// # Errors
	/// `SourceUnavailable` if the file cannot be opened or read. Content never
	/// fails a load: bad records are skipped and a document of the wrong
	/// shape yields an empty, rejected store.
	pub fn load_as<P>(path: P, format: SourceFormat, limit: Option<usize>) -> Result<Self>
	where
		P: AsRef<Path>,
	{
		let path = path.as_ref();
		let name = io::source_name(path);
		match format {
			SourceFormat::Json => {
				let bytes = std::fs::read(path).map_err(|e| DictError::unavailable(path, e))?;
				Ok(Self::from_json_slice(name, &bytes, limit))
			}
			SourceFormat::FrequencyList | SourceFormat::Csv => {
				let file = std::fs::File::open(path).map_err(|e| DictError::unavailable(path, e))?;
				Self::from_reader(name, std::io::BufReader::new(file), format, limit)
					.map_err(|e| DictError::unavailable(path, e))
			}
		}
	}

	/// Builds a store from pre-structured entries, skipping blank words.
	pub fn from_entries<N, I>(name: N, entries: I, limit: Option<usize>) -> Self
	where
		N: Into<String>,
		I: IntoIterator<Item = Entry>,
	{
		let mut store = Self::empty(name);
		for entry in entries {
			if store.is_full(limit) {
				break;
			}
			if entry.word.trim().is_empty() {
				store.skipped += 1;
			} else {
				store.entries.push(entry);
			}
		}
		store
	}

	/// Parses a JSON document.
	///
	/// Anything but a list (including invalid JSON) rejects the whole source.
	pub fn from_json_slice<N: Into<String>>(name: N, bytes: &[u8], limit: Option<usize>) -> Self {
		let mut store = Self::empty(name);
		let items = match serde_json::from_slice::<Value>(bytes) {
			Ok(Value::Array(items)) => items,
			Ok(_) => {
				store.rejected = Some("document is not a list".to_owned());
				return store;
			}
			Err(e) => {
				store.rejected = Some(format!("document is not valid JSON: {e}"));
				return store;
			}
		};

		for item in &items {
			if store.is_full(limit) {
				break;
			}
			store.accept(parse_json_record(item));
		}
		store
	}

	/// Parses a line-oriented source (`FrequencyList` or `Csv`).
	///
	/// A `Json` format is read whole and handed to [`from_json_slice`](Self::from_json_slice).
	pub fn from_reader<N, R>(
		name: N,
		mut reader: R,
		format: SourceFormat,
		limit: Option<usize>,
	) -> std::io::Result<Self>
	where
		N: Into<String>,
		R: BufRead,
	{
		if format == SourceFormat::Json {
			let mut bytes = Vec::new();
			reader.read_to_end(&mut bytes)?;
			return Ok(Self::from_json_slice(name, &bytes, limit));
		}

		let mut store = Self::empty(name);
		let mut first = true;
		io::for_each_line_in(reader, |line| {
			let header = first && format == SourceFormat::Csv && line.trim().starts_with("word");
			first = false;
			if header || store.is_full(limit) || line.trim().is_empty() {
				return;
			}
			let record = match format {
				SourceFormat::Csv => parse_csv_line(line),
				_ => parse_frequency_line(line),
			};
			store.accept(record);
		})?;
		Ok(store)
	}

	fn empty<N: Into<String>>(name: N) -> Self {
		Self { name: name.into(), ..Self::default() }
	}

	fn is_full(&self, limit: Option<usize>) -> bool {
		limit.is_some_and(|limit| self.entries.len() >= limit)
	}

	fn accept(&mut self, record: Option<Entry>) {
		match record {
			Some(entry) => self.entries.push(entry),
			None => self.skipped += 1,
		}
	}

	/// Name of the source, usually the file stem.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn entries(&self) -> &[Entry] {
		&self.entries
	}

	pub fn into_entries(self) -> Vec<Entry> {
		self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of malformed records that were skipped.
	pub fn skipped(&self) -> usize {
		self.skipped
	}

	/// Why the whole source was rejected, if it was.
	pub fn rejection(&self) -> Option<&str> {
		self.rejected.as_deref()
	}
}

impl AsRef<[Entry]> for DictionaryStore {
	fn as_ref(&self) -> &[Entry] {
		self.entries()
	}
}

fn field<'a>(record: &'a Value, short: &str, long: &str) -> Option<&'a Value> {
	record.get(short).or_else(|| record.get(long))
}

fn parse_frequency(value: &Value) -> Option<u64> {
	match value {
		Value::Number(n) => n.as_u64(),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

fn parse_json_record(record: &Value) -> Option<Entry> {
	let word = field(record, "w", "word")?.as_str()?;
	if word.trim().is_empty() {
		return None;
	}
	let frequency = parse_frequency(field(record, "f", "frequency")?)?;
	Some(Entry::new(word, frequency))
}

/// `word count`: the count is the last field, the word is everything before it.
fn parse_frequency_line(line: &str) -> Option<Entry> {
	let parts: Vec<&str> = line.split_whitespace().collect();
	let (count, words) = parts.split_last()?;
	if words.is_empty() {
		return None;
	}
	let frequency = count.parse().ok()?;
	Some(Entry::new(words.join(" "), frequency))
}

/// `word,count` (optionally quoted), falling back to whitespace separation.
fn parse_csv_line(line: &str) -> Option<Entry> {
	let line = line.trim();
	let mut parts: Vec<&str> = line.split(',').collect();
	if parts.len() < 2 {
		parts = line.split_whitespace().collect();
	}
	if parts.len() < 2 {
		return None;
	}

	let word = parts[0].trim().trim_matches('"');
	if word.is_empty() {
		return None;
	}
	let frequency = parts[1].trim().trim_matches('"').parse().ok()?;
	Some(Entry::new(word, frequency))
}
