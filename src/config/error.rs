use std::result::Result as StdResult;

use thiserror::Error as ThisError;

/// Result alias for reading the configuration.
pub type Result<T> = StdResult<T, Error>;

/// Any errors that can occurr while reading a [Config] from the environment.
///
/// [Config]: crate::config::Config
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
	/// The variable is set, but its value is not valid UTF-8.
	#[error("environment variable `{var}` is not valid unicode")]
	NotUnicode {
		/// The variable's name.
		var: &'static str,
	},

	/// The variable is set, but its value could not be parsed.
	#[error("failed to parse environment variable `{var}`: {message}")]
	Parse {
		/// The variable's name.
		var: &'static str,

		/// Why parsing failed.
		message: String,
	},
}
