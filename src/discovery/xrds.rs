//! Yadis/XRDS discovery over HTTP.
//!
//! This is the discovery procedure OpenID 2.0 providers like Steam actually support: fetch the
//! identifier, follow an `X-XRDS-Location` header if there is one, and read the `<Service>`
//! entries out of the XRDS document. HTML-based discovery and XRI resolution are not supported.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{header, Response};
use url::Url;

use super::{DiscoveryError, Provider, ProviderDirectory};
use crate::url::parse_url;
use crate::Config;

/// Content type of XRDS documents.
const XRDS_CONTENT_TYPE: &str = "application/xrds+xml";

/// Header pointing at the XRDS document if the identifier itself isn't one.
const XRDS_LOCATION: &str = "x-xrds-location";

#[allow(clippy::missing_docs_in_private_items)]
static SERVICE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)<(?:[\w-]+:)?Service\b([^>]*)>(.*?)</(?:[\w-]+:)?Service\s*>")
		.expect("hard-coded regex should be valid")
});

#[allow(clippy::missing_docs_in_private_items)]
static TYPE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)<(?:[\w-]+:)?Type\b[^>]*>(.*?)</(?:[\w-]+:)?Type\s*>")
		.expect("hard-coded regex should be valid")
});

#[allow(clippy::missing_docs_in_private_items)]
static URI: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)<(?:[\w-]+:)?URI\b[^>]*>(.*?)</(?:[\w-]+:)?URI\s*>")
		.expect("hard-coded regex should be valid")
});

#[allow(clippy::missing_docs_in_private_items)]
static PRIORITY: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\bpriority\s*=\s*["'](\d+)["']"#).expect("hard-coded regex should be valid")
});

/// A [`ProviderDirectory`] that performs XRDS discovery over HTTP.
#[derive(Debug, Clone)]
pub struct XrdsDirectory {
	/// HTTP client for fetching XRDS documents.
	http_client: reqwest::Client,
}

impl XrdsDirectory {
	/// Creates a new [`XrdsDirectory`] with its own HTTP client.
	///
	/// Requests are bounded by [`Config::http_timeout`].
	pub fn new(config: &Config) -> Result<Self, DiscoveryError> {
		let http_client = reqwest::Client::builder()
			.timeout(config.http_timeout)
			.user_agent(config.user_agent.as_str())
			.build()?;

		Ok(Self { http_client })
	}

	/// Creates a new [`XrdsDirectory`] that uses an existing HTTP client.
	///
	/// Timeouts are whatever `http_client` was configured with.
	pub const fn with_client(http_client: reqwest::Client) -> Self {
		Self { http_client }
	}

	/// Makes a GET request for an XRDS document and checks the status code.
	async fn fetch(&self, url: Url) -> Result<Response, DiscoveryError> {
		let response = self
			.http_client
			.get(url.clone())
			.header(header::ACCEPT, XRDS_CONTENT_TYPE)
			.send()
			.await?;

		let status = response.status();

		if !status.is_success() {
			tracing::debug!(%url, status = status.as_u16(), "discovery request failed");
			return Err(DiscoveryError::BadStatus { url, status });
		}

		Ok(response)
	}
}

impl ProviderDirectory for XrdsDirectory {
	#[tracing::instrument(
		level = "debug",
		name = "XrdsDirectory::discover",
		skip(self),
		err(Debug, level = "debug"),
	)]
	async fn discover(&self, identifier: &str) -> Result<Vec<Provider>, DiscoveryError> {
		let Some(url) = normalize_identifier(identifier) else {
			tracing::debug!("identifier is not a URL");
			return Ok(Vec::new());
		};

		let mut response = self.fetch(url).await?;

		if !is_xrds(&response) {
			let location = response
				.headers()
				.get(XRDS_LOCATION)
				.and_then(|value| value.to_str().ok())
				.and_then(parse_url);

			if let Some(location) = location {
				tracing::trace!(%location, "following XRDS location");
				response = self.fetch(location).await?;
			}
		}

		let document = response.text().await?;
		let providers = parse_xrds(&document);

		tracing::debug!(count = providers.len(), "discovered providers");

		Ok(providers)
	}
}

/// Turns user input into a URL we can run discovery on.
///
/// Identifiers without a scheme are assumed to be `http://` URLs; fragments are dropped.
fn normalize_identifier(identifier: &str) -> Option<Url> {
	let identifier = identifier.trim();
	let mut url = if identifier.starts_with("http://") || identifier.starts_with("https://") {
		parse_url(identifier)?
	} else {
		parse_url(&format!("http://{identifier}"))?
	};

	url.set_fragment(None);

	Some(url)
}

/// Checks whether `response` claims to be an XRDS document.
fn is_xrds(response: &Response) -> bool {
	response
		.headers()
		.get(header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|content_type| content_type.contains(XRDS_CONTENT_TYPE))
}

/// Extracts the OpenID providers from an XRDS document.
///
/// Services that aren't OpenID services are ignored. The result is ordered by the services'
/// `priority` attribute, lowest first; services without a priority come last, and ties keep
/// document order.
fn parse_xrds(document: &str) -> Vec<Provider> {
	let mut services = SERVICE
		.captures_iter(document)
		.filter_map(|service| {
			let attributes = service.get(1)?.as_str();
			let body = service.get(2)?.as_str();
			let version = TYPE
				.captures_iter(body)
				.filter_map(|r#type| r#type.get(1))
				.find_map(|r#type| openid_version(r#type.as_str()))?;

			let priority = PRIORITY
				.captures(attributes)
				.and_then(|priority| priority.get(1))
				.and_then(|priority| priority.as_str().parse::<u32>().ok());

			let endpoint = URI
				.captures(body)
				.and_then(|uri| uri.get(1))
				.map(|uri| decode_entities(uri.as_str().trim()))
				.filter(|uri| !uri.is_empty());

			Some((priority, Provider { endpoint, version: Some(version.to_owned()) }))
		})
		.collect::<Vec<_>>();

	services.sort_by_key(|&(priority, _)| (priority.is_none(), priority));
	services.into_iter().map(|(_, provider)| provider).collect()
}

/// Maps an XRDS service type to the OpenID version it stands for.
fn openid_version(service_type: &str) -> Option<&'static str> {
	match service_type.trim() {
		"http://specs.openid.net/auth/2.0/server" | "http://specs.openid.net/auth/2.0/signon" => {
			Some("2.0")
		}
		"http://openid.net/signon/1.1" => Some("1.1"),
		"http://openid.net/signon/1.0" => Some("1.0"),
		_ => None,
	}
}

/// Decodes the predefined XML entities.
fn decode_entities(text: &str) -> String {
	text.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&apos;", "'")
		.replace("&amp;", "&")
}
