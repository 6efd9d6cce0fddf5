//! Relying party configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;

mod error;
pub use error::{Error, Result};

/// How far a nonce's timestamp may be from the current time, in either direction.
pub const DEFAULT_NONCE_WINDOW: TimeDelta = TimeDelta::minutes(5);

/// How long discovery requests may take.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`RelyingParty`].
///
/// [`RelyingParty`]: crate::RelyingParty
#[derive(Debug, Clone)]
pub struct Config {
	/// How far a nonce's timestamp may be from the current time, in either direction.
	///
	/// Also determines how long accepted nonces are remembered.
	pub nonce_window: TimeDelta,

	/// Timeout for HTTP requests made during discovery.
	pub http_timeout: Duration,

	/// `User-Agent` header for HTTP requests made during discovery.
	pub user_agent: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			nonce_window: DEFAULT_NONCE_WINDOW,
			http_timeout: DEFAULT_HTTP_TIMEOUT,
			user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
		}
	}
}

impl Config {
	/// Creates a new [`Config`] from environment variables.
	///
	/// Every variable is optional and falls back to the [default].
	///
	/// - `OPENID_NONCE_WINDOW_SECS`
	/// - `OPENID_HTTP_TIMEOUT_SECS`
	/// - `OPENID_USER_AGENT`
	///
	/// [default]: Config::default
	pub fn from_env() -> Result<Self> {
		let mut config = Self::default();

		if let Some(secs) = get_env_var::<u32>("OPENID_NONCE_WINDOW_SECS")? {
			config.nonce_window = TimeDelta::seconds(i64::from(secs));
		}

		if let Some(secs) = get_env_var::<u64>("OPENID_HTTP_TIMEOUT_SECS")? {
			config.http_timeout = Duration::from_secs(secs);
		}

		if let Some(user_agent) = get_env_var::<String>("OPENID_USER_AGENT")? {
			config.user_agent = user_agent;
		}

		tracing::debug!(?config, "loaded configuration from environment");

		Ok(config)
	}
}

/// Reads and parses an optional environment variable.
fn get_env_var<T>(var: &'static str) -> Result<Option<T>>
where
	T: FromStr,
	<T as FromStr>::Err: std::error::Error,
{
	let value = match env::var(var) {
		Ok(value) => value,
		Err(env::VarError::NotPresent) => return Ok(None),
		Err(env::VarError::NotUnicode(_)) => return Err(Error::NotUnicode { var }),
	};

	value
		.parse::<T>()
		.map(Some)
		.map_err(|err| Error::Parse { var, message: err.to_string() })
}
