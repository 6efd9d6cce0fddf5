//! Steam as an OpenID 2.0 provider.
//!
//! Steam is the only provider most of our users will ever log in with, and it is a very
//! predictable one: there is a single login endpoint, and every claimed identifier looks like
//! `https://steamcommunity.com/openid/id/<SteamID>`. [`directory()`] answers discovery for
//! Steam without making any HTTP requests.

use crate::discovery::{Provider, StaticDirectory};
use crate::validate::ProviderResponse;

mod steam_id;
pub use steam_id::{ParseSteamIdError, SteamId};

/// Steam URL to redirect users to for login.
pub const LOGIN_URL: &str = "https://steamcommunity.com/openid/login";

/// Steam's OP identifier; this is what users "log in with".
pub const IDENTIFIER: &str = "https://steamcommunity.com/openid";

/// Every claimed identifier Steam hands out starts with this.
pub const CLAIMED_ID_PREFIX: &str = "https://steamcommunity.com/openid/id/";

/// A [`StaticDirectory`] that knows about Steam and nothing else.
pub fn directory() -> StaticDirectory {
	StaticDirectory::new()
		.with(IDENTIFIER, vec![Provider::new(LOGIN_URL)])
		.with_prefix(CLAIMED_ID_PREFIX, vec![Provider::new(LOGIN_URL)])
}

impl ProviderResponse {
	/// Extracts the user's SteamID from the claimed identifier.
	///
	/// Returns [`None`] if the claimed identifier is not a Steam identifier.
	pub fn steam_id(&self) -> Option<SteamId> {
		self.claimed_identifier
			.as_deref()?
			.strip_prefix(CLAIMED_ID_PREFIX)?
			.split(['#', '/', '?'])
			.next()?
			.parse::<SteamId>()
			.ok()
	}
}
