//! URL helpers.
//!
//! Everything in here treats malformed input as ordinary data. URLs we receive come straight
//! from the user's browser, so "this is not a URL" is an expected outcome, not a bug.

use std::collections::hash_map::{self, HashMap};

use url::Url;

/// Parses `input` as an absolute URL.
///
/// Surrounding whitespace is ignored. Returns [`None`] for anything that isn't a valid absolute
/// URL.
pub fn parse_url(input: &str) -> Option<Url> {
	Url::parse(input.trim()).ok()
}

/// Returns the raw `&`-separated segments of `url`'s query string, exactly as they were written.
///
/// Empty segments (e.g. from `?a=1&&b=2`) are skipped.
pub fn raw_query_segments(url: &Url) -> impl Iterator<Item = &str> + '_ {
	url.query()
		.unwrap_or_default()
		.split('&')
		.filter(|segment| !segment.is_empty())
}

/// Decoded query parameters of a URL.
///
/// If a key occurs more than once, the first occurrence wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Params {
	/// Decoded key-value pairs.
	inner: HashMap<String, String>,
}

impl Params {
	/// Extracts the query parameters of `url`.
	pub fn from_url(url: &Url) -> Self {
		url.query_pairs().collect()
	}

	/// Returns the value of `key`, if present.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.inner.get(key).map(String::as_str)
	}

	/// Returns the value of `key` if it is present and non-empty.
	pub fn get_non_empty(&self, key: &str) -> Option<&str> {
		self.get(key).filter(|value| !value.is_empty())
	}

	/// Returns whether there are no parameters at all.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Returns the number of distinct parameters.
	pub fn len(&self) -> usize {
		self.inner.len()
	}
}

impl<K, V> FromIterator<(K, V)> for Params
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut inner = HashMap::new();

		for (key, value) in iter {
			if let hash_map::Entry::Vacant(entry) = inner.entry(key.into()) {
				entry.insert(value.into());
			}
		}

		Self { inner }
	}
}
