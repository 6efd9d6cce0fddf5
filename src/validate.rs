//! Validating provider responses.
//!
//! After logging in, the provider sends the user back to our return URL with the result of the
//! login encoded in the query string. Anyone can construct such a URL, so before we believe it
//! we run it through a fixed sequence of [stages]:
//!
//! 1. the response must have been sent to the return URL we asked for
//! 2. the response must be a positive assertion
//! 3. the response nonce must be fresh and unused
//! 4. the claimed identifier must be discoverable, and the response must be signed
//!
//! The first stage that fails aborts validation.
//!
//! The signature itself is not verified. Instead, the claimed identifier is run through
//! discovery a second time, which only confirms that the identifier belongs to a namespace the
//! directory knows about. Whether that is enough depends on the directory: a prefix match such as
//! [`steam::directory()`] accepts any identifier under the prefix, and `openid.op_endpoint` is
//! not compared against the discovered endpoint.
//!
//! [`steam::directory()`]: crate::steam::directory
//!
//! [stages]: Stage

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::discovery::ProviderDirectory;
use crate::nonce::{check_nonce, NonceStore};
use crate::url::{parse_url, raw_query_segments, Params};
use crate::{Error, Result};

/// The result of a successful validation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse {
	/// Whether the user is authenticated.
	pub authenticated: bool,

	/// The identity the user logged in as, exactly as the provider sent it.
	pub claimed_identifier: Option<String>,
}

/// A provider response that is being validated.
///
/// Every [`Stage`] reads from this; the last one fills in [`Assertion::response`].
#[derive(Debug)]
pub struct Assertion<'a> {
	/// The full URL the provider sent the user to, if it was a URL at all.
	pub response_url: Option<Url>,

	/// The query parameters of `response_url`.
	pub params: Params,

	/// The return URL we originally asked the provider to use.
	pub return_url: &'a str,

	/// The time validation started.
	pub now: DateTime<Utc>,

	/// The validated response.
	pub response: ProviderResponse,
}

impl<'a> Assertion<'a> {
	/// Creates a new [`Assertion`] from the URL the provider sent the user to.
	///
	/// An unparsable `response_url` is treated as a URL without any parameters.
	pub fn new(response_url: &str, return_url: &'a str, now: DateTime<Utc>) -> Self {
		let response_url = parse_url(response_url);
		let params = response_url
			.as_ref()
			.map(Params::from_url)
			.unwrap_or_default();

		Self { response_url, params, return_url, now, response: ProviderResponse::default() }
	}
}

/// The validation stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	/// [`check_return_urls_are_valid()`]
	ReturnUrl,

	/// [`check_params()`]
	Params,

	/// [`check_nonce()`]
	Nonce,

	/// [`verify_discovered_information()`]
	Discovery,
}

impl Stage {
	/// Every stage, in the order they run.
	pub const PIPELINE: [Self; 4] = [Self::ReturnUrl, Self::Params, Self::Nonce, Self::Discovery];
}

/// Runs every [`Stage`] in order against `assertion`, stopping at the first failure.
#[tracing::instrument(
	level = "debug",
	skip_all,
	fields(return_url = assertion.return_url),
	err(Debug, level = "debug"),
)]
pub async fn validate<D, S>(
	directory: &D,
	nonces: &Mutex<S>,
	nonce_window: TimeDelta,
	mut assertion: Assertion<'_>,
) -> Result<ProviderResponse>
where
	D: ProviderDirectory + ?Sized,
	S: NonceStore + ?Sized,
{
	for stage in Stage::PIPELINE {
		tracing::trace!(?stage, "running validation stage");

		match stage {
			Stage::ReturnUrl => check_return_urls_are_valid(
				assertion.response_url.as_ref(),
				&assertion.params,
				assertion.return_url,
			)?,
			Stage::Params => check_params(&assertion.params)?,
			Stage::Nonce => {
				check_nonce_exclusive(nonces, &assertion.params, assertion.now, nonce_window)?;
			}
			Stage::Discovery => {
				assertion.response =
					verify_discovered_information(directory, &assertion.params).await?;
			}
		}
	}

	tracing::debug!(claimed_identifier = ?assertion.response.claimed_identifier, "user logged in");

	Ok(assertion.response)
}

/// Checks that the response was sent to the URL we asked the provider to send it to.
///
/// Scheme, host, port, and path of `openid.return_to` must match `return_url` exactly. Every query
/// parameter of `return_url` must appear verbatim somewhere in the response's query string;
/// the provider is free to add its own parameters.
#[tracing::instrument(level = "trace", skip(response_url, params), err(Debug, level = "debug"))]
pub fn check_return_urls_are_valid(
	response_url: Option<&Url>,
	params: &Params,
	return_url: &str,
) -> Result<()> {
	if return_url.is_empty() {
		return Err(Error::EmptyClientReturnUrl);
	}

	let return_to = params.get("openid.return_to").ok_or(Error::MissingReturnToParam)?;
	let return_to_url =
		parse_url(return_to).ok_or_else(|| Error::UnparsableUrl { url: return_to.to_owned() })?;

	let expected =
		parse_url(return_url).ok_or_else(|| Error::UnparsableUrl { url: return_url.to_owned() })?;

	if return_to_url.scheme() != expected.scheme()
		|| return_to_url.host_str() != expected.host_str()
		|| return_to_url.port_or_known_default() != expected.port_or_known_default()
		|| return_to_url.path() != expected.path()
	{
		return Err(Error::ReturnUrlMismatch {
			expected: return_url.to_owned(),
			return_to: return_to.to_owned(),
		});
	}

	let response_query = response_url.and_then(Url::query).unwrap_or_default();

	if let Some(missing) = raw_query_segments(&expected).find(|param| !response_query.contains(param))
	{
		return Err(Error::QueryParamMismatch { param: missing.to_owned() });
	}

	Ok(())
}

/// Checks that the response is a positive assertion.
#[tracing::instrument(level = "trace", skip(params), err(Debug, level = "debug"))]
pub fn check_params(params: &Params) -> Result<()> {
	if params.is_empty() {
		return Err(Error::MalformedAssertion);
	}

	match params.get("openid.mode") {
		None => Err(Error::MalformedAssertion),
		Some("error") => Err(Error::ProviderError {
			message: params.get("openid.error").unwrap_or_default().to_owned(),
		}),
		Some("cancel") => Err(Error::AuthenticationCancelled),
		Some(_) => Ok(()),
	}
}

/// Runs [`check_nonce()`] while holding the lock on `nonces`.
///
/// Sweeping, checking, and inserting happen under a single lock so that two concurrent
/// validations of the same response cannot both succeed.
fn check_nonce_exclusive<S>(
	nonces: &Mutex<S>,
	params: &Params,
	now: DateTime<Utc>,
	window: TimeDelta,
) -> Result<()>
where
	S: NonceStore + ?Sized,
{
	let mut nonces = nonces.lock().unwrap_or_else(PoisonError::into_inner);

	check_nonce(&mut *nonces, params, now, window)
}

/// Strips the fragment off a claimed identifier.
pub fn canonicalize_claimed_id(claimed_id: &str) -> &str {
	claimed_id
		.split_once('#')
		.map_or(claimed_id, |(identifier, _)| identifier)
}

/// Checks that the provider is authoritative for the claimed identifier and that the response
/// is signed.
#[tracing::instrument(level = "trace", skip_all, err(Debug, level = "debug"))]
pub async fn verify_discovered_information<D>(
	directory: &D,
	params: &Params,
) -> Result<ProviderResponse>
where
	D: ProviderDirectory + ?Sized,
{
	let claimed_id = params
		.get("openid.claimed_id")
		.ok_or(Error::MissingClaimedIdentifier)?;

	let canonical_id = canonicalize_claimed_id(claimed_id);
	let providers = directory.discover(canonical_id).await?;

	if providers.is_empty() {
		tracing::debug!(claimed_id, "claimed identifier has no providers");
		return Err(Error::NoProviderForClaimedIdentifier { claimed_id: canonical_id.to_owned() });
	}

	if params.get_non_empty("openid.signed").is_none()
		|| params.get_non_empty("openid.sig").is_none()
	{
		return Err(Error::MissingSignature);
	}

	Ok(ProviderResponse { authenticated: true, claimed_identifier: Some(claimed_id.to_owned()) })
}
