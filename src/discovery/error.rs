//! The errors that can occur while running discovery.

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Discovery itself failed, as opposed to finding no providers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
	/// We failed to make an HTTP request.
	#[error("failed to make http request")]
	Http(#[from] reqwest::Error),

	/// The identifier's host responded with an unsuccessful status code.
	#[error("discovery request to `{url}` returned {status}")]
	BadStatus {
		/// The URL we requested.
		url: Url,

		/// The status code we got back.
		status: StatusCode,
	},
}
