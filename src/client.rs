//! The relying party.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use url::Url;

use crate::discovery::ProviderDirectory;
use crate::nonce::{InMemoryNonceStore, NonceStore};
use crate::validate::{self, Assertion, ProviderResponse};
use crate::{authenticate, Config, Result};

/// An OpenID 2.0 relying party.
///
/// Owns the [`ProviderDirectory`] used for discovery and the [`NonceStore`] that keeps track of
/// responses we have already accepted. Nonces are only remembered for the lifetime of this
/// value, so there should be one instance per process, shared between requests.
#[derive(Debug)]
pub struct RelyingParty<D, S = InMemoryNonceStore> {
	/// Where providers are discovered.
	directory: D,

	/// Nonces we have already accepted.
	nonces: Mutex<S>,

	/// Configuration.
	config: Config,
}

impl<D> RelyingParty<D>
where
	D: ProviderDirectory,
{
	/// Creates a new [`RelyingParty`] with the default configuration and an empty in-memory
	/// nonce store.
	pub fn new(directory: D) -> Self {
		Self::with_config(directory, Config::default())
	}

	/// Creates a new [`RelyingParty`] with an empty in-memory nonce store.
	pub fn with_config(directory: D, config: Config) -> Self {
		Self::with_nonce_store(directory, InMemoryNonceStore::new(), config)
	}
}

impl<D, S> RelyingParty<D, S>
where
	D: ProviderDirectory,
	S: NonceStore,
{
	/// Creates a new [`RelyingParty`] that stores nonces in `nonces`.
	pub const fn with_nonce_store(directory: D, nonces: S, config: Config) -> Self {
		Self { directory, nonces: Mutex::new(nonces), config }
	}

	/// Returns the configuration.
	pub const fn config(&self) -> &Config {
		&self.config
	}

	/// Returns the [`ProviderDirectory`].
	pub const fn directory(&self) -> &D {
		&self.directory
	}

	/// Runs `f` with exclusive access to the nonce store.
	pub fn with_nonces<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&mut S) -> R,
	{
		let mut nonces = self.nonces.lock().unwrap_or_else(PoisonError::into_inner);

		f(&mut *nonces)
	}

	/// Starts the login process for `identifier`.
	///
	/// The returned URL is where the user should be redirected to. The provider will send them
	/// back to `return_url` afterwards, which should then be passed to
	/// [`RelyingParty::validate_response()`] along with the full URL of that request.
	#[tracing::instrument(level = "debug", name = "RelyingParty::authenticate", skip(self))]
	pub async fn authenticate(&self, identifier: &str, return_url: &str) -> Result<Url> {
		authenticate::authenticate(&self.directory, identifier, return_url).await
	}

	/// Validates the response of a provider.
	///
	/// `response_url` is the full URL the provider sent the user to, including the query
	/// string. `return_url` is the same URL that was passed to
	/// [`RelyingParty::authenticate()`].
	///
	/// Every successful validation consumes the response's nonce; validating the same response
	/// again will fail.
	#[tracing::instrument(level = "debug", name = "RelyingParty::validate_response", skip(self))]
	pub async fn validate_response(
		&self,
		response_url: &str,
		return_url: &str,
	) -> Result<ProviderResponse> {
		self.validate_response_at(response_url, return_url, Utc::now())
			.await
	}

	/// Same as [`RelyingParty::validate_response()`], but with an explicit notion of "now".
	pub async fn validate_response_at(
		&self,
		response_url: &str,
		return_url: &str,
		now: DateTime<Utc>,
	) -> Result<ProviderResponse> {
		let assertion = Assertion::new(response_url, return_url, now);

		validate::validate(&self.directory, &self.nonces, self.config.nonce_window, assertion).await
	}
}
