#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

//! The two concrete [`primitives::adapter::Adapter`] implementations: a
//! [`dummy::DummyAdapter`] for local development/tests and an
//! [`ethereum::EthereumAdapter`] backed by a keystore-encrypted secp256k1
//! key (spec.md §4.3, §9).

pub use {dummy::DummyAdapter, error::AdapterError, ethereum::EthereumAdapter};

pub mod dummy;
mod error;
pub mod ethereum;
