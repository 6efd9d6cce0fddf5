//! Starting the login process.
//!
//! We look up the identifier the user wants to log in with, pick the first provider we can send
//! them to, and build a `checkid_setup` URL for it. The provider will send the user back to our
//! return URL once they are done, which is where [`validate`] takes over.
//!
//! [`validate`]: crate::validate

use serde::Serialize;
use url::Url;

use crate::discovery::{Provider, ProviderDirectory};
use crate::url::parse_url;
use crate::{Error, Result};

/// The OpenID 2.0 namespace.
pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";

/// Tells the provider to let the user pick which identity to log in with.
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Query parameters sent to the provider when redirecting a user for login.
#[derive(Debug, Serialize)]
#[allow(clippy::missing_docs_in_private_items)]
struct LoginForm<'a> {
	#[serde(rename = "openid.mode")]
	mode: &'static str,

	#[serde(rename = "openid.ns")]
	namespace: &'static str,

	#[serde(rename = "openid.claimed_id")]
	claimed_id: &'static str,

	#[serde(rename = "openid.identity")]
	identity: &'static str,

	#[serde(rename = "openid.return_to")]
	return_to: &'a str,
}

impl<'a> LoginForm<'a> {
	/// Creates a new [`LoginForm`] that will send the user back to `return_to`.
	const fn new(return_to: &'a str) -> Self {
		Self {
			mode: "checkid_setup",
			namespace: OPENID_NS,
			claimed_id: IDENTIFIER_SELECT,
			identity: IDENTIFIER_SELECT,
			return_to,
		}
	}
}

/// Builds the URL to send the user to for logging in with `provider`.
///
/// Any query string already present on the provider's endpoint is discarded.
#[tracing::instrument(
	level = "trace",
	skip(provider),
	fields(endpoint = provider.endpoint.as_deref()),
	err(Debug, level = "debug"),
)]
pub fn request_authentication(provider: &Provider, return_url: &str) -> Result<Url> {
	let endpoint = provider
		.endpoint
		.as_deref()
		.ok_or_else(|| Error::MissingEndpoint { version: provider.version.clone() })?;

	let mut url =
		parse_url(endpoint).ok_or_else(|| Error::UnparsableUrl { url: endpoint.to_owned() })?;

	url.set_query(None);

	{
		let mut query = url.query_pairs_mut();
		let serializer = serde_urlencoded::Serializer::new(&mut query);

		LoginForm::new(return_url)
			.serialize(serializer)
			.expect("`LoginForm` should always serialize properly");
	}

	Ok(url)
}

/// Discovers the providers for `identifier` and builds a login URL for the first usable one.
///
/// Providers are tried in the order discovery returned them.
#[tracing::instrument(
	level = "debug",
	skip(directory),
	ret(Display, level = "debug"),
	err(Debug, level = "debug"),
)]
pub async fn authenticate<D>(directory: &D, identifier: &str, return_url: &str) -> Result<Url>
where
	D: ProviderDirectory + ?Sized,
{
	let providers = directory.discover(identifier).await?;

	if providers.is_empty() {
		return Err(Error::NoProvidersFound { identifier: identifier.to_owned() });
	}

	for provider in &providers {
		match request_authentication(provider, return_url) {
			Ok(url) => return Ok(url),
			Err(error) => {
				tracing::debug!(%error, ?provider, "skipping unusable provider");
			}
		}
	}

	Err(Error::NoUsableProviders {
		identifier: identifier.to_owned(),
		count: providers.len(),
	})
}

#[cfg(test)]
mod tests {
	use color_eyre::Result;

	use super::*;
	use crate::discovery::StaticDirectory;
	use crate::steam;
	use crate::testing::assert_matches;

	const RETURN_URL: &str = "https://cs2kz.org/auth/callback?redirect_to=https%3A%2F%2Fcs2kz.org%2F";

	fn query(url: &Url) -> crate::url::Params {
		crate::url::Params::from_url(url)
	}

	#[test]
	fn builds_checkid_setup_url() -> Result<()> {
		let provider = Provider::new("https://steamcommunity.com/openid/login?stale=1");
		let url = request_authentication(&provider, RETURN_URL)?;
		let query = query(&url);

		assert_eq!(url.origin().ascii_serialization(), "https://steamcommunity.com");
		assert_eq!(url.path(), "/openid/login");
		assert_eq!(query.get("stale"), None);
		assert_eq!(query.get("openid.mode"), Some("checkid_setup"));
		assert_eq!(query.get("openid.ns"), Some(OPENID_NS));
		assert_eq!(query.get("openid.claimed_id"), Some(IDENTIFIER_SELECT));
		assert_eq!(query.get("openid.identity"), Some(IDENTIFIER_SELECT));
		assert_eq!(query.get("openid.return_to"), Some(RETURN_URL));
		assert_eq!(query.len(), 5);

		Ok(())
	}

	#[test]
	fn missing_endpoint() {
		assert_matches!(
			request_authentication(&Provider::default(), RETURN_URL),
			Err(Error::MissingEndpoint { version: None })
		);
	}

	#[test]
	fn unparsable_endpoint() {
		assert_matches!(
			request_authentication(&Provider::new("not a url"), RETURN_URL),
			Err(Error::UnparsableUrl { url }) if url == "not a url"
		);
	}

	#[tokio::test]
	async fn skips_providers_without_endpoint() -> Result<()> {
		let directory = StaticDirectory::new().with(steam::IDENTIFIER, vec![
			Provider::default(),
			Provider::new(steam::LOGIN_URL),
		]);

		let url = authenticate(&directory, steam::IDENTIFIER, RETURN_URL).await?;

		assert!(url.as_str().starts_with("https://steamcommunity.com/openid/login?"));
		assert_eq!(query(&url).get("openid.return_to"), Some(RETURN_URL));

		Ok(())
	}

	#[tokio::test]
	async fn no_providers() {
		let directory = StaticDirectory::new();

		assert_matches!(
			authenticate(&directory, steam::IDENTIFIER, RETURN_URL).await,
			Err(Error::NoProvidersFound { .. })
		);
	}

	#[tokio::test]
	async fn no_usable_providers() {
		let directory = StaticDirectory::new()
			.with(steam::IDENTIFIER, vec![Provider::default(), Provider::default()]);

		assert_matches!(
			authenticate(&directory, steam::IDENTIFIER, RETURN_URL).await,
			Err(Error::NoUsableProviders { count: 2, .. })
		);
	}
}
