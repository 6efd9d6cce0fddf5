//! Response nonces.
//!
//! Every OpenID 2.0 assertion carries an `openid.response_nonce`, which starts with the time the
//! provider created the response, followed by arbitrary characters:
//!
//! ```text
//! 2024-06-01T12:00:00ZUNIQUE
//! ```
//!
//! We accept a nonce at most once, and only if its timestamp is close enough to the current
//! time. Accepted nonces are remembered in a [`NonceStore`] until they would be too old to be
//! accepted anyway.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;

use crate::url::Params;
use crate::{Error, Result};

/// The timestamp at the start of a nonce.
///
/// Fractional seconds are captured so that they can be rejected explicitly instead of being
/// silently cut off. Only ASCII digits are accepted.
static TIMESTAMP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]+)?Z)")
		.expect("hard-coded regex should be valid")
});

/// Storage for nonces we have already accepted.
///
/// Every nonce in the store was accepted once and must not be accepted again.
pub trait NonceStore: Send {
	/// Checks whether `nonce` has been accepted before.
	fn contains(&self, nonce: &str) -> bool;

	/// Remembers `nonce` as accepted.
	fn insert(&mut self, nonce: String, timestamp: DateTime<Utc>);

	/// Forgets every nonce whose timestamp is further than `window` away from `now`.
	fn sweep(&mut self, now: DateTime<Utc>, window: TimeDelta);
}

/// A [`NonceStore`] that lives in memory.
///
/// Nothing is persisted; restarting the process forgets every nonce. This is fine as long as
/// the restart takes longer than the nonce window.
#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
	/// nonce -> timestamp
	nonces: HashMap<String, DateTime<Utc>>,
}

impl InMemoryNonceStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// The number of nonces currently remembered.
	pub fn len(&self) -> usize {
		self.nonces.len()
	}

	/// Whether no nonces are remembered.
	pub fn is_empty(&self) -> bool {
		self.nonces.is_empty()
	}
}

impl NonceStore for InMemoryNonceStore {
	fn contains(&self, nonce: &str) -> bool {
		self.nonces.contains_key(nonce)
	}

	fn insert(&mut self, nonce: String, timestamp: DateTime<Utc>) {
		self.nonces.insert(nonce, timestamp);
	}

	fn sweep(&mut self, now: DateTime<Utc>, window: TimeDelta) {
		let before = self.nonces.len();

		self.nonces
			.retain(|_, &mut timestamp| is_within_window(timestamp, now, window));

		if self.nonces.len() != before {
			tracing::trace!(removed = before - self.nonces.len(), "swept expired nonces");
		}
	}
}

/// A parsed response nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce<'a> {
	/// The full nonce, including the timestamp.
	pub token: &'a str,

	/// The time the provider created the nonce.
	pub timestamp: DateTime<Utc>,
}

impl<'a> Nonce<'a> {
	/// Parses the timestamp out of `token`.
	///
	/// The timestamp must be `YYYY-MM-DDTHH:MM:SSZ`; fractional seconds are not allowed.
	pub fn parse(token: &'a str) -> Result<Self> {
		let Some(prefix) = TIMESTAMP_PREFIX
			.captures(token)
			.and_then(|captures| captures.get(1))
			.map(|prefix| prefix.as_str())
		else {
			return Err(Error::InvalidNonceFormat { nonce: token.to_owned() });
		};

		if prefix.contains('.') {
			return Err(Error::InvalidNonceFormat { nonce: token.to_owned() });
		}

		let timestamp = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%SZ")
			.map_err(|_| Error::NonceTimestampUnparsable { timestamp: prefix.to_owned() })?
			.and_utc();

		Ok(Self { token, timestamp })
	}
}

/// Checks whether `timestamp` is at most `window` away from `now`, in either direction.
pub fn is_within_window(timestamp: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> bool {
	(now - timestamp).abs() <= window
}

/// Checks the `openid.response_nonce` in `params` and remembers it in `store`.
///
/// OpenID 1.x responses don't have nonces and are let through without touching the store.
/// `store` is only modified if the nonce is accepted, apart from sweeping out expired entries.
#[tracing::instrument(level = "trace", skip(store, params), err(Debug, level = "debug"))]
pub fn check_nonce<S>(
	store: &mut S,
	params: &Params,
	now: DateTime<Utc>,
	window: TimeDelta,
) -> Result<()>
where
	S: NonceStore + ?Sized,
{
	if params.get("openid.ns").is_some_and(|ns| !ns.contains("2.0")) {
		tracing::trace!("OpenID 1.x response; skipping nonce check");
		return Ok(());
	}

	let token = params.get("openid.response_nonce").ok_or(Error::MissingNonce)?;
	let nonce = Nonce::parse(token)?;

	store.sweep(now, window);

	if !is_within_window(nonce.timestamp, now, window) {
		tracing::debug!(nonce = token, %now, "nonce outside of time window");
		return Err(Error::NonceSkewTooLarge { nonce: token.to_owned() });
	}

	if store.contains(token) {
		tracing::debug!(nonce = token, "nonce replayed");
		return Err(Error::NonceReplayed { nonce: token.to_owned() });
	}

	store.insert(token.to_owned(), nonce.timestamp);

	Ok(())
}

#[cfg(test)]
mod tests {
	use color_eyre::Result;

	use super::*;
	use crate::testing::{self, assert_matches};

	fn params(nonce: &str) -> Params {
		Params::from_iter([
			("openid.ns", "http://specs.openid.net/auth/2.0"),
			("openid.response_nonce", nonce),
		])
	}

	fn window() -> TimeDelta {
		TimeDelta::minutes(5)
	}

	#[test]
	fn parses_timestamp() -> Result<()> {
		let nonce = Nonce::parse("2024-06-01T12:00:00Zabc123")?;

		assert_eq!(nonce.token, "2024-06-01T12:00:00Zabc123");
		assert_eq!(nonce.timestamp, testing::time("2024-06-01T12:00:00Z")?);

		Ok(())
	}

	#[test]
	fn rejects_bad_formats() {
		assert_matches!(Nonce::parse(""), Err(Error::InvalidNonceFormat { .. }));
		assert_matches!(Nonce::parse("abc"), Err(Error::InvalidNonceFormat { .. }));
		assert_matches!(Nonce::parse("2024-06-01 12:00:00Z"), Err(Error::InvalidNonceFormat { .. }));
		assert_matches!(
			Nonce::parse("2024-06-01T12:00:00.123Zabc"),
			Err(Error::InvalidNonceFormat { .. })
		);
	}

	#[test]
	fn rejects_junk_in_timestamp() {
		assert_matches!(
			Nonce::parse("2024-06-01T12:00:00abcZxyz"),
			Err(Error::InvalidNonceFormat { .. })
		);

		assert_matches!(
			Nonce::parse("2024-06-01T12:00:00+01:00Zabc"),
			Err(Error::InvalidNonceFormat { .. })
		);

		assert_matches!(
			Nonce::parse("\u{662}\u{660}\u{662}\u{664}-06-01T12:00:00Zabc"),
			Err(Error::InvalidNonceFormat { .. })
		);
	}

	#[test]
	fn rejects_impossible_dates() {
		assert_matches!(
			Nonce::parse("2024-13-45T12:00:00Zabc"),
			Err(Error::NonceTimestampUnparsable { timestamp }) if timestamp == "2024-13-45T12:00:00Z"
		);
	}

	#[test]
	fn accepts_edge_of_window() -> Result<()> {
		let mut store = InMemoryNonceStore::new();
		let now = testing::time("2024-06-01T12:05:00Z")?;

		check_nonce(&mut store, &params("2024-06-01T12:00:00Zpast"), now, window())?;
		check_nonce(&mut store, &params("2024-06-01T12:10:00Zfuture"), now, window())?;

		assert_eq!(store.len(), 2);

		Ok(())
	}

	#[test]
	fn rejects_just_outside_window() -> Result<()> {
		let mut store = InMemoryNonceStore::new();
		let now = testing::time("2024-06-01T12:05:00Z")? + TimeDelta::microseconds(1);

		assert_matches!(
			check_nonce(&mut store, &params("2024-06-01T12:00:00Zpast"), now, window()),
			Err(Error::NonceSkewTooLarge { .. })
		);

		let now = testing::time("2024-06-01T11:55:00Z")? - TimeDelta::microseconds(1);

		assert_matches!(
			check_nonce(&mut store, &params("2024-06-01T12:00:00Zfuture"), now, window()),
			Err(Error::NonceSkewTooLarge { .. })
		);

		assert!(store.is_empty());

		Ok(())
	}

	#[test]
	fn rejects_replays() -> Result<()> {
		let mut store = InMemoryNonceStore::new();
		let now = testing::time("2024-06-01T12:00:30Z")?;
		let params = params("2024-06-01T12:00:00Zonce");

		check_nonce(&mut store, &params, now, window())?;

		assert_matches!(
			check_nonce(&mut store, &params, now, window()),
			Err(Error::NonceReplayed { nonce }) if nonce == "2024-06-01T12:00:00Zonce"
		);

		Ok(())
	}

	#[test]
	fn sweeps_expired_nonces() -> Result<()> {
		let mut store = InMemoryNonceStore::new();

		check_nonce(
			&mut store,
			&params("2024-06-01T12:00:00Zold"),
			testing::time("2024-06-01T12:00:00Z")?,
			window(),
		)?;

		check_nonce(
			&mut store,
			&params("2024-06-01T12:06:00Znew"),
			testing::time("2024-06-01T12:06:00Z")?,
			window(),
		)?;

		assert_eq!(store.len(), 1);
		assert!(store.contains("2024-06-01T12:06:00Znew"));
		assert!(!store.contains("2024-06-01T12:00:00Zold"));

		Ok(())
	}

	#[test]
	fn skips_openid_1() -> Result<()> {
		let mut store = InMemoryNonceStore::new();
		let params = Params::from_iter([("openid.ns", "http://openid.net/signon/1.1")]);

		check_nonce(&mut store, &params, Utc::now(), window())?;

		assert!(store.is_empty());

		Ok(())
	}

	#[test]
	fn requires_nonce_without_namespace() {
		let mut store = InMemoryNonceStore::new();

		assert_matches!(
			check_nonce(&mut store, &Params::default(), Utc::now(), window()),
			Err(Error::MissingNonce)
		);
	}
}
