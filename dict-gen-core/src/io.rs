use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{DictError, Result};

/// Streams a text file line by line, calling `f` for each line.
///
/// - Invalid UTF-8 sequences are replaced, never fatal
/// - Trailing `\n` / `\r\n` are stripped
/// - The file handle is released on every exit path
///
/// Returns the number of lines read.
pub(crate) fn for_each_line<P, F>(path: P, f: F) -> Result<usize>
where
	P: AsRef<Path>,
	F: FnMut(&str),
{
	let path = path.as_ref();
	let file = File::open(path).map_err(|e| DictError::unavailable(path, e))?;
	for_each_line_in(BufReader::new(file), f).map_err(|e| DictError::unavailable(path, e))
}

/// Same as [`for_each_line`] over any buffered reader.
pub(crate) fn for_each_line_in<R, F>(mut reader: R, mut f: F) -> io::Result<usize>
where
	R: BufRead,
	F: FnMut(&str),
{
	let mut buffer = Vec::new();
	let mut count = 0;

	loop {
		buffer.clear();
		if reader.read_until(b'\n', &mut buffer)? == 0 {
			break;
		}
		let line = String::from_utf8_lossy(&buffer);
		f(line.trim_end_matches(['\n', '\r']));
		count += 1;
	}

	Ok(count)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `corpora/it_books.txt` + `"bin"` → `corpora/it_books.bin`
pub fn build_output_path<P>(input_path: P, output_extension: &str) -> io::Result<PathBuf>
where
	P: AsRef<Path>,
{
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension, used to name sources in reports.
///
/// Falls back to the full display form when the path has no file name.
pub fn source_name<P: AsRef<Path>>(path: P) -> String {
	let path = path.as_ref();
	match path.file_stem() {
		Some(stem) => stem.to_string_lossy().to_string(),
		None => path.display().to_string(),
	}
}

/// Lists the files of `dir` whose name starts with `prefix` and ends with `.{extension}`.
///
/// Returns full paths, sorted by name so runs are reproducible.
/// Subdirectories are ignored.
pub(crate) fn list_files<P>(dir: P, prefix: &str, extension: &str) -> Result<Vec<PathBuf>>
where
	P: AsRef<Path>,
{
	let dir = dir.as_ref();
	let mut files = Vec::new();

	let entries = fs::read_dir(dir).map_err(|e| DictError::unavailable(dir, e))?;
	for entry in entries {
		let path = entry.map_err(|e| DictError::unavailable(dir, e))?.path();
		if !path.is_file() || path.extension() != Some(std::ffi::OsStr::new(extension)) {
			continue;
		}
		let matches = path
			.file_name()
			.map(|name| name.to_string_lossy().starts_with(prefix))
			.unwrap_or(false);
		if matches {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

/// Writes `bytes` to `path` atomically.
///
/// Parent directories are created; the data lands in a temporary file in the
/// same directory which is then renamed over `path`.
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
	let path = path.as_ref();
	persist_with(path, |writer| writer.write_all(bytes))
}

/// Serializes `value` as pretty-printed JSON and writes it to `path` atomically.
pub(crate) fn write_json<P, T>(path: P, value: &T) -> Result<()>
where
	P: AsRef<Path>,
	T: Serialize + ?Sized,
{
	let path = path.as_ref();
	let bytes = serde_json::to_vec_pretty(value)?;
	persist_with(path, |writer| writer.write_all(&bytes))
}

fn persist_with<F>(path: &Path, write: F) -> Result<()>
where
	F: FnOnce(&mut BufWriter<&NamedTempFile>) -> io::Result<()>,
{
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	fs::create_dir_all(parent).map_err(|e| DictError::output(path, e))?;

	let temp_file = NamedTempFile::new_in(parent).map_err(|e| DictError::output(path, e))?;
	{
		let mut writer = BufWriter::new(&temp_file);
		write(&mut writer).map_err(|e| DictError::output(path, e))?;
		writer.flush().map_err(|e| DictError::output(path, e))?;
	}
	temp_file.persist(path).map_err(|e| DictError::output(path, e.error))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let out = build_output_path("corpora/it_books.txt", "bin").unwrap();
		assert_eq!(out, PathBuf::from("corpora/it_books.bin"));
	}

	#[test]
	fn source_name_strips_directory_and_extension() {
		assert_eq!(source_name("./data/it_base.json"), "it_base");
		assert_eq!(source_name("words"), "words");
	}

	#[test]
	fn lines_are_decoded_lossily() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, b"caf\xe9 latte\r\nsecond line\n\nlast").unwrap();

		let mut lines = Vec::new();
		let count = for_each_line(&path, |line| lines.push(line.to_owned())).unwrap();
		assert_eq!(count, 4);
		assert_eq!(lines[0], "caf\u{FFFD} latte");
		assert_eq!(lines[1], "second line");
		assert_eq!(lines[2], "");
		assert_eq!(lines[3], "last");
	}

	#[test]
	fn missing_file_is_unavailable() {
		let err = for_each_line("/definitely/not/here.txt", |_| {}).unwrap_err();
		assert!(matches!(err, DictError::SourceUnavailable { .. }));
		assert!(err.is_retryable());
	}

	#[test]
	fn list_files_filters_by_prefix_and_extension() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["it_b.txt", "it_a.txt", "en_a.txt", "it_c.json"] {
			fs::write(dir.path().join(name), "x").unwrap();
		}
		let files = list_files(dir.path(), "it_", "txt").unwrap();
		let names: Vec<String> = files.iter().map(|p| source_name(p)).collect();
		assert_eq!(names, vec!["it_a", "it_b"]);
	}

	#[test]
	fn json_write_creates_parent_directories() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested/out/words.json");
		write_json(&path, &vec![1, 2, 3]).unwrap();
		let text = fs::read_to_string(&path).unwrap();
		let back: Vec<u32> = serde_json::from_str(&text).unwrap();
		assert_eq!(back, vec![1, 2, 3]);
	}
}
