//! Errors that can occur while authenticating users.
//!
//! Every step of the login flow either succeeds completely or fails with one of the variants of
//! [`Error`]. Nothing is retried, and no partial results are ever handed out.
//!
//! This module also exposes a [`Result`] type alias, which sets [`Error`] as the default `E` type
//! parameter.

use thiserror::Error;

use crate::discovery::DiscoveryError;

/// Type alias for a [`Result<T, E>`] with its `E` parameter set to [`Error`].
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The different ways logging in can fail.
#[derive(Debug, Error)]
pub enum Error {
	/// Discovery did not return any providers for the identifier the user wants to log in with.
	#[error("no OpenID providers found for `{identifier}`")]
	NoProvidersFound {
		/// The identifier that was looked up.
		identifier: String,
	},

	/// Discovery did not return any providers for the claimed identifier in a provider response.
	///
	/// A forged response cannot make itself discoverable as authoritative for the identity it
	/// claims, so this is where forgeries are caught.
	#[error("no OpenID providers found for claimed identifier `{claimed_id}`")]
	NoProviderForClaimedIdentifier {
		/// The canonicalized claimed identifier that was looked up.
		claimed_id: String,
	},

	/// A discovered provider has no endpoint we could send the user to.
	#[error("OpenID provider has no endpoint (version {version:?})")]
	MissingEndpoint {
		/// The provider's protocol version, if it advertised one.
		version: Option<String>,
	},

	/// Every discovered provider was unusable.
	#[error("none of the {count} discovered OpenID providers for `{identifier}` are usable")]
	NoUsableProviders {
		/// The identifier that was looked up.
		identifier: String,

		/// How many providers were tried.
		count: usize,
	},

	/// The caller passed an empty return URL.
	#[error("return URL must not be empty")]
	EmptyClientReturnUrl,

	/// The provider response has no `openid.return_to` parameter.
	#[error("provider response is missing `openid.return_to`")]
	MissingReturnToParam,

	/// A URL could not be parsed.
	#[error("`{url}` is not a valid URL")]
	UnparsableUrl {
		/// The offending input.
		url: String,
	},

	/// The `openid.return_to` URL does not point to the same place as our return URL.
	#[error("`openid.return_to` ({return_to}) does not match return URL ({expected})")]
	ReturnUrlMismatch {
		/// The URL we expected the provider to send the user back to.
		expected: String,

		/// The URL the provider claims to have sent the user back to.
		return_to: String,
	},

	/// A query parameter of our return URL is missing from the provider response.
	#[error("query parameter `{param}` of the return URL is missing from the provider response")]
	QueryParamMismatch {
		/// The raw `key=value` segment that could not be found.
		param: String,
	},

	/// The provider response does not look like an OpenID assertion.
	#[error("provider response is not a valid OpenID assertion")]
	MalformedAssertion,

	/// The provider responded with `openid.mode=error`.
	#[error("OpenID provider returned an error: {message}")]
	ProviderError {
		/// The value of `openid.error`.
		message: String,
	},

	/// The user cancelled the login.
	#[error("authentication was cancelled")]
	AuthenticationCancelled,

	/// The provider response has no `openid.response_nonce` parameter.
	#[error("provider response is missing `openid.response_nonce`")]
	MissingNonce,

	/// The nonce does not start with a `YYYY-MM-DDTHH:MM:SSZ` timestamp.
	#[error("nonce `{nonce}` has an invalid format")]
	InvalidNonceFormat {
		/// The offending nonce.
		nonce: String,
	},

	/// The nonce timestamp has the right shape, but is not a valid point in time.
	#[error("nonce timestamp `{timestamp}` is not a valid date")]
	NonceTimestampUnparsable {
		/// The timestamp prefix of the nonce.
		timestamp: String,
	},

	/// The nonce is too old, or too far in the future.
	#[error("nonce `{nonce}` is outside the accepted time window")]
	NonceSkewTooLarge {
		/// The offending nonce.
		nonce: String,
	},

	/// The nonce has been accepted before.
	#[error("nonce `{nonce}` has already been used")]
	NonceReplayed {
		/// The offending nonce.
		nonce: String,
	},

	/// The provider response has no `openid.claimed_id` parameter.
	#[error("provider response is missing `openid.claimed_id`")]
	MissingClaimedIdentifier,

	/// The provider response is not signed.
	#[error("provider response is missing `openid.signed` or `openid.sig`")]
	MissingSignature,

	/// We failed to run discovery.
	#[error("OpenID discovery failed")]
	Discovery(#[from] DiscoveryError),
}
