//! A minimal [SteamID][valve-docs] type.
//!
//! Only the 64-bit representation is supported, which is what Steam puts into claimed
//! identifiers.
//!
//! [valve-docs]: https://developer.valvesoftware.com/wiki/SteamID

use std::num::ParseIntError;
use std::str::FromStr;

use derive_more::{Display, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The minimum value for a valid SteamID.
const MIN: u64 = 76561197960265729_u64;

/// The maximum value for a valid SteamID.
const MAX: u64 = 76561202255233023_u64;

/// A 64-bit SteamID.
#[derive(
	Debug, Display, Into, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct SteamId(u64);

impl SteamId {
	/// Creates a new [`SteamId`], if `value` is in range.
	pub const fn new(value: u64) -> Option<Self> {
		match value {
			MIN..=MAX => Some(Self(value)),
			_ => None,
		}
	}

	/// Returns the SteamID in its 64-bit representation.
	pub const fn as_u64(self) -> u64 {
		self.0
	}
}

/// Errors for parsing a [`SteamId`].
#[derive(Debug, Error)]
pub enum ParseSteamIdError {
	/// The input was not an integer.
	#[error("SteamID is not an integer")]
	NotAnInteger(#[from] ParseIntError),

	/// The input was an integer, but not a valid SteamID.
	#[error("SteamID `{0}` is out of range")]
	OutOfRange(u64),
}

impl TryFrom<u64> for SteamId {
	type Error = ParseSteamIdError;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		Self::new(value).ok_or(ParseSteamIdError::OutOfRange(value))
	}
}

impl FromStr for SteamId {
	type Err = ParseSteamIdError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		value.parse::<u64>()?.try_into()
	}
}
