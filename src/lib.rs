#![doc = include_str!("../README.md")]

mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::Config;

pub mod url;
pub mod discovery;
pub mod nonce;
pub mod authenticate;
pub mod validate;
pub mod steam;

mod client;
pub use client::RelyingParty;
pub use discovery::{Provider, ProviderDirectory};
pub use validate::ProviderResponse;

#[cfg(test)]
mod testing;
