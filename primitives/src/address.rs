use hex::{FromHex, FromHexError};
use serde::{Deserialize, Serialize, Serializer};
use std::{convert::TryFrom, fmt, str::FromStr};
use thiserror::Error;

use crate::{ToETHChecksum, ToHex};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("Expected length of 40 without or 42 with a `0x` prefix")]
    Length,
    #[error("Invalid hex")]
    Hex(#[from] FromHexError),
}

/// A 20-byte Ethereum-style address. Used both for validator identities and
/// for the publisher keys of a [`crate::BalancesMap`] — in this domain the
/// "publisher identifier (string)" of spec.md §3 is always such an address.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Address(#[serde(deserialize_with = "de::from_bytes_insensitive")] [u8; 20]);

impl Address {
    pub fn to_bytes(&self) -> [u8; 20] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(*bytes)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex_prefixed())
    }
}

impl ToETHChecksum for Address {}

impl From<&[u8; 20]> for Address {
    fn from(bytes: &[u8; 20]) -> Self {
        Self(*bytes)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(from_bytes(s)?))
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Self(from_bytes(value)?))
    }
}

impl TryFrom<&String> for Address {
    type Error = Error;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

mod de {
    use super::from_bytes;
    use serde::{Deserialize, Deserializer};

    pub(super) fn from_bytes_insensitive<'de, D>(deserializer: D) -> Result<[u8; 20], D::Error>
    where
        D: Deserializer<'de>,
    {
        let address = String::deserialize(deserializer)?;

        from_bytes(&address).map_err(serde::de::Error::custom)
    }
}

/// Accepts hex with or without a `0x` prefix.
fn from_bytes<T: AsRef<[u8]>>(from: T) -> Result<[u8; 20], Error> {
    let bytes = from.as_ref();

    match bytes.len() {
        42 => match bytes.split_at(2) {
            (b"0x", hex_bytes) => {
                <[u8; 20] as FromHex>::from_hex(hex_bytes).map_err(Error::Hex)
            }
            _ => Err(Error::Length),
        },
        40 => <[u8; 20] as FromHex>::from_hex(bytes).map_err(Error::Hex),
        _ => Err(Error::Length),
    }
}
