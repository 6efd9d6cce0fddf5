//! This module contains helpers for unit tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use url::Url;

use crate::discovery::{DiscoveryError, Provider, ProviderDirectory, StaticDirectory};
use crate::steam;

/// Global constructor that will run before tests.
#[ctor::ctor]
fn ctor() {
	use tracing_subscriber::fmt::format::FmtSpan;
	use tracing_subscriber::EnvFilter;

	color_eyre::install().expect("failed to install color-eyre");
	tracing_subscriber::fmt()
		.compact()
		.with_ansi(true)
		.with_file(true)
		.with_level(true)
		.with_line_number(true)
		.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
		.with_target(true)
		.with_test_writer()
		.with_env_filter(EnvFilter::from_default_env())
		.init();
}

macro_rules! assert_matches {
	($expr:expr, $pat:pat $(if $cond:expr)? $(,)?) => {
		match $expr {
			$pat $(if $cond)? => {}
			ref value => panic!(
				"assertion failed: `{:?}` does not match `{}`",
				value,
				stringify!($pat $(if $cond)?),
			),
		}
	};
}

pub(crate) use assert_matches;

/// Parses an RFC 3339 timestamp.
pub(crate) fn time(timestamp: &str) -> color_eyre::Result<DateTime<Utc>> {
	Ok(timestamp.parse()?)
}

/// Creates a response nonce for `timestamp`.
pub(crate) fn nonce(timestamp: DateTime<Utc>, suffix: &str) -> String {
	format!("{}{suffix}", timestamp.format("%Y-%m-%dT%H:%M:%SZ"))
}

/// Builder for the URL Steam sends users back to after logging in.
#[derive(Debug, Clone)]
pub(crate) struct SteamResponse {
	/// The URL Steam redirects to.
	return_url: String,

	/// `openid.*` query parameters.
	params: Vec<(String, String)>,
}

impl SteamResponse {
	/// A positive assertion for AlphaKeks, as Steam would send it.
	pub(crate) fn new(return_url: &str, nonce: &str) -> Self {
		let params = [
			("openid.ns", "http://specs.openid.net/auth/2.0"),
			("openid.mode", "id_res"),
			("openid.op_endpoint", steam::LOGIN_URL),
			("openid.claimed_id", "https://steamcommunity.com/openid/id/76561198282622073"),
			("openid.identity", "https://steamcommunity.com/openid/id/76561198282622073"),
			("openid.return_to", return_url),
			("openid.response_nonce", nonce),
			("openid.assoc_handle", "1234567890"),
			(
				"openid.signed",
				"signed,op_endpoint,claimed_id,identity,return_to,response_nonce,assoc_handle",
			),
			("openid.sig", "W0u5DRbtHE1GG0ZKXjerUZDUGmc="),
		];

		Self {
			return_url: return_url.to_owned(),
			params: params
				.into_iter()
				.map(|(key, value)| (key.to_owned(), value.to_owned()))
				.collect(),
		}
	}

	/// Sets `key` to `value`, replacing any previous value.
	pub(crate) fn with(mut self, key: &str, value: &str) -> Self {
		match self.params.iter_mut().find(|(k, _)| k == key) {
			Some((_, v)) => value.clone_into(v),
			None => self.params.push((key.to_owned(), value.to_owned())),
		}

		self
	}

	/// Removes `key`.
	pub(crate) fn without(mut self, key: &str) -> Self {
		self.params.retain(|(k, _)| k != key);
		self
	}

	/// Builds the final URL.
	pub(crate) fn to_url(&self) -> String {
		let mut url = Url::parse(&self.return_url).expect("test return URL should be valid");

		url.query_pairs_mut().extend_pairs(&self.params);
		url.into()
	}
}

/// A [`ProviderDirectory`] that remembers which identifiers it was asked about.
#[derive(Debug)]
pub(crate) struct RecordingDirectory {
	/// The directory that actually answers.
	inner: StaticDirectory,

	/// Every identifier passed to `discover()`, in order.
	lookups: Mutex<Vec<String>>,
}

impl RecordingDirectory {
	pub(crate) fn new(inner: StaticDirectory) -> Self {
		Self { inner, lookups: Mutex::default() }
	}

	pub(crate) fn lookups(&self) -> Vec<String> {
		self.lookups.lock().expect("lock should not be poisoned").clone()
	}
}

impl ProviderDirectory for RecordingDirectory {
	async fn discover(&self, identifier: &str) -> Result<Vec<Provider>, DiscoveryError> {
		self.lookups
			.lock()
			.expect("lock should not be poisoned")
			.push(identifier.to_owned());

		self.inner.discover(identifier).await
	}
}
