/// Folds the accented vowels the dictionaries are known to contain.
///
/// Returns `None` for every other character.
fn fold_accent(c: char) -> Option<char> {
	match c {
		'à' | 'À' => Some('a'),
		'è' | 'é' | 'È' | 'É' => Some('e'),
		'ì' | 'Ì' => Some('i'),
		'ò' | 'ó' | 'Ò' | 'Ó' => Some('o'),
		'ù' | 'Ù' => Some('u'),
		_ => None,
	}
}

/// Maps a raw token or dictionary word to its canonical comparison key.
///
/// Steps:
/// - trim surrounding whitespace
/// - fold the accented vowels (both cases) to their base letter
/// - lowercase
/// - drop every character outside `a..=z`
///
/// Total and pure: any input yields a key, possibly empty. Callers must
/// reject empty keys before using them as table keys.
///
/// # Examples
/// ```
/// use dict_gen_core::model::normalizer::normalize;
///
/// assert_eq!(normalize("  Café! "), "cafe");
/// assert_eq!(normalize("CAFÈ"), normalize("cafe"));
/// assert_eq!(normalize("l'anno"), "lanno");
/// ```
pub fn normalize(token: &str) -> String {
	let mut key = String::with_capacity(token.len());
	for c in token.trim().chars() {
		match fold_accent(c) {
			Some(base) => key.push(base),
			None => key.extend(c.to_lowercase().filter(char::is_ascii_lowercase)),
		}
	}
	key
}

/// Splits a line into its raw tokens: maximal runs of alphanumeric characters.
///
/// No normalization happens here.
pub fn tokens(line: &str) -> impl Iterator<Item = &str> {
	line.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

/// Tokenizes and normalizes a line, keeping only keys longer than one character.
pub fn canonical_tokens(line: &str) -> impl Iterator<Item = String> + '_ {
	tokens(line).map(normalize).filter(|key| key.len() > 1)
}
