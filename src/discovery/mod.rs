//! OpenID provider discovery.
//!
//! Discovery turns an identifier (something the user typed in, or a claimed identifier from a
//! provider response) into a list of provider endpoints. The login flow only cares about the
//! [`ProviderDirectory`] trait; how the providers are actually found is up to the
//! implementation:
//!
//! - [`StaticDirectory`] answers from a fixed table
//! - [`XrdsDirectory`] performs Yadis/XRDS discovery over HTTP

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

mod error;
pub use error::DiscoveryError;

mod xrds;
pub use xrds::XrdsDirectory;

/// An OpenID provider returned by discovery.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
	/// The URL users are sent to for logging in.
	pub endpoint: Option<String>,

	/// The OpenID protocol version the provider speaks, e.g. `"2.0"`.
	pub version: Option<String>,
}

impl Provider {
	/// Creates a new OpenID 2.0 provider with the given endpoint.
	pub fn new<E>(endpoint: E) -> Self
	where
		E: Into<String>,
	{
		Self { endpoint: Some(endpoint.into()), version: Some(String::from("2.0")) }
	}
}

/// Resolves identifiers to OpenID providers.
///
/// An empty list means "no providers". Implementations should only return an error if discovery
/// itself failed (e.g. the network is down); errors are never retried.
pub trait ProviderDirectory: Send + Sync {
	/// Returns the providers for `identifier`, most preferred first.
	fn discover(
		&self,
		identifier: &str,
	) -> impl Future<Output = Result<Vec<Provider>, DiscoveryError>> + Send;
}

impl<D> ProviderDirectory for &D
where
	D: ProviderDirectory + ?Sized,
{
	fn discover(
		&self,
		identifier: &str,
	) -> impl Future<Output = Result<Vec<Provider>, DiscoveryError>> + Send {
		D::discover(*self, identifier)
	}
}

impl<D> ProviderDirectory for Arc<D>
where
	D: ProviderDirectory + ?Sized,
{
	fn discover(
		&self,
		identifier: &str,
	) -> impl Future<Output = Result<Vec<Provider>, DiscoveryError>> + Send {
		D::discover(self, identifier)
	}
}

/// A [`ProviderDirectory`] backed by a fixed table.
///
/// Identifiers are matched exactly, unless registered with [`StaticDirectory::with_prefix()`].
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
	/// Exact matches.
	exact: HashMap<String, Vec<Provider>>,

	/// Prefix matches, checked in insertion order after exact matches.
	prefixes: Vec<(String, Vec<Provider>)>,
}

impl StaticDirectory {
	/// Creates an empty directory.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `providers` for `identifier`.
	pub fn with<I>(mut self, identifier: I, providers: Vec<Provider>) -> Self
	where
		I: Into<String>,
	{
		self.exact.insert(identifier.into(), providers);
		self
	}

	/// Registers `providers` for every identifier that starts with `prefix`.
	pub fn with_prefix<P>(mut self, prefix: P, providers: Vec<Provider>) -> Self
	where
		P: Into<String>,
	{
		self.prefixes.push((prefix.into(), providers));
		self
	}

	/// Looks up `identifier` without going through the async trait.
	fn lookup(&self, identifier: &str) -> Vec<Provider> {
		if let Some(providers) = self.exact.get(identifier) {
			return providers.clone();
		}

		self.prefixes
			.iter()
			.find(|(prefix, _)| identifier.starts_with(prefix.as_str()))
			.map(|(_, providers)| providers.clone())
			.unwrap_or_default()
	}
}

impl ProviderDirectory for StaticDirectory {
	#[tracing::instrument(level = "trace", name = "StaticDirectory::discover", skip(self))]
	async fn discover(&self, identifier: &str) -> Result<Vec<Provider>, DiscoveryError> {
		Ok(self.lookup(identifier))
	}
}
