use std::convert::TryFrom;
use std::fmt;

use chrono::{DateTime, Utc};
use hex::FromHex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{Address, BigNum, ValidatorDesc};

/// A 32-byte channel identifier, computed off-chain (by the on-chain
/// contract or the campaign creation flow) and treated here as an opaque
/// handle — the validator worker never derives it itself.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId([u8; 32]);

impl ChannelId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for ChannelId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&str> for ChannelId {
    type Error = ChannelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let hex_value = value.strip_prefix("0x").unwrap_or(value);
        let bytes = <[u8; 32] as FromHex>::from_hex(hex_value)
            .map_err(|_| ChannelError::InvalidId(value.to_string()))?;

        Ok(Self(bytes))
    }
}

impl Serialize for ChannelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        ChannelId::try_from(value.as_str()).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("invalid channel id: {0}")]
    InvalidId(String),
    #[error("sum of validator fees ({fees}) exceeds the channel deposit ({deposit})")]
    FeesExceedDeposit { fees: BigNum, deposit: BigNum },
}

/// The 2-element, order-significant validator set of a channel: index 0 is
/// always the leader, index 1 the follower (spec.md §1, §2).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SpecValidators([ValidatorDesc; 2]);

impl SpecValidators {
    pub fn new(leader: ValidatorDesc, follower: ValidatorDesc) -> Self {
        Self([leader, follower])
    }

    pub fn leader(&self) -> &ValidatorDesc {
        &self.0[0]
    }

    pub fn follower(&self) -> &ValidatorDesc {
        &self.0[1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidatorDesc> {
        self.0.iter()
    }

    pub fn find(&self, id: &crate::ValidatorId) -> Option<&ValidatorDesc> {
        self.0.iter().find(|v| &v.id == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    pub validators: SpecValidators,
}

impl ChannelSpec {
    /// Constructs a spec, enforcing the invariants spec.md §2 requires of
    /// every channel before a tick is ever run against it: exactly two
    /// validators, and their declared fees not exceeding the deposit.
    pub fn new(
        validators: SpecValidators,
        deposit_amount: &BigNum,
    ) -> Result<Self, ChannelError> {
        let total_fees: BigNum = validators.iter().map(|v| &v.fee).sum();
        if &total_fees > deposit_amount {
            return Err(ChannelError::FeesExceedDeposit {
                fees: total_fees,
                deposit: deposit_amount.clone(),
            });
        }

        Ok(Self { validators })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub creator: Address,
    pub deposit_asset: String,
    pub deposit_amount: BigNum,
    pub valid_until: DateTime<Utc>,
    pub spec: ChannelSpec,
}

impl Channel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ChannelId,
        creator: Address,
        deposit_asset: String,
        deposit_amount: BigNum,
        valid_until: DateTime<Utc>,
        validators: SpecValidators,
    ) -> Result<Self, ChannelError> {
        let spec = ChannelSpec::new(validators, &deposit_amount)?;

        Ok(Self {
            id,
            creator,
            deposit_asset,
            deposit_amount,
            valid_until,
            spec,
        })
    }

    pub fn leader(&self) -> &ValidatorDesc {
        self.spec.validators.leader()
    }

    pub fn follower(&self) -> &ValidatorDesc {
        self.spec.validators.follower()
    }
}
