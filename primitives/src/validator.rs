use chrono::{DateTime, Utc};
use hex::FromHex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_hex::{SerHex, StrictPfx};
use std::convert::TryFrom;
use std::fmt;

use crate::{BalancesMap, BigNum, DomainError, ToETHChecksum};

/// The identity of a validator node, a 20-byte Ethereum-style address.
/// Distinct from [`crate::Address`] only in intent (validator identity vs.
/// publisher balance key); both types wrap the same representation because
/// `ValidatorId`s and publisher keys live in the same address space in this
/// protocol.
#[derive(Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ValidatorId(
    #[serde(
        deserialize_with = "validator_id_from_str",
        serialize_with = "SerHex::<StrictPfx>::serialize"
    )]
    [u8; 20],
);

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId({})", self.to_hex_prefix_string())
    }
}

fn validator_id_from_str<'de, D>(deserializer: D) -> Result<[u8; 20], D::Error>
where
    D: Deserializer<'de>,
{
    let validator_id = String::deserialize(deserializer)?;
    if validator_id.len() != 42 {
        return Err(serde::de::Error::custom("invalid validator id length"));
    }

    <[u8; 20] as FromHex>::from_hex(&validator_id[2..]).map_err(serde::de::Error::custom)
}

impl ValidatorId {
    pub fn inner(&self) -> &[u8; 20] {
        &self.0
    }

    /// Hex non-`0x`-prefixed string, **without** checksumming.
    pub fn to_hex_non_prefix_string(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex `0x`-prefixed string, **without** checksumming.
    pub fn to_hex_prefix_string(&self) -> String {
        format!("0x{}", self.to_hex_non_prefix_string())
    }
}

impl ToETHChecksum for ValidatorId {}

impl Serialize for ValidatorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl From<&[u8; 20]> for ValidatorId {
    fn from(bytes: &[u8; 20]) -> Self {
        Self(*bytes)
    }
}

impl From<crate::Address> for ValidatorId {
    fn from(address: crate::Address) -> Self {
        Self(address.to_bytes())
    }
}

impl AsRef<[u8]> for ValidatorId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&str> for ValidatorId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let hex_value = match value.len() {
            42 => &value[2..],
            40 => value,
            _ => {
                return Err(DomainError::InvalidArgument(
                    "invalid validator id length".to_string(),
                ))
            }
        };

        let result = hex::decode(hex_value)
            .map_err(|_| DomainError::InvalidArgument("invalid validator id hex".to_string()))?;

        let id: [u8; 20] = result.as_slice().try_into().map_err(|_| {
            DomainError::InvalidArgument(format!("invalid validator id value {}", value))
        })?;

        Ok(Self(id))
    }
}

impl TryFrom<&String> for ValidatorId {
    type Error = DomainError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        ValidatorId::try_from(value.as_str())
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorDesc {
    pub id: ValidatorId,
    /// Address fees are credited to, if different from `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_addr: Option<ValidatorId>,
    pub url: String,
    pub fee: BigNum,
}

// Validator message wire types (spec.md §3).

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Accounting {
    #[serde(rename = "lastEvAggr")]
    pub last_event_aggregate: DateTime<Utc>,
    pub balances_before_fees: BalancesMap,
    pub balances: BalancesMap,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApproveState {
    pub state_root: String,
    pub signature: String,
    pub is_healthy: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewState {
    pub state_root: String,
    pub signature: String,
    pub balances: BalancesMap,
    pub balances_after_fees: BalancesMap,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RejectState {
    pub reason: String,
    pub state_root: String,
    pub signature: String,
    #[serde(default)]
    pub balances: Option<BalancesMap>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub signature: String,
    pub state_root: String,
    pub timestamp: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(signature: String, state_root: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            signature,
            state_root,
            timestamp,
        }
    }
}

/// The five-variant validator message tagged union (spec.md §3). Parsed
/// into this typed enum before any business logic sees it — the wire
/// discriminator is the `type` field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ValidatorMessage {
    ApproveState(ApproveState),
    NewState(NewState),
    RejectState(RejectState),
    Heartbeat(Heartbeat),
    Accounting(Accounting),
}

impl ValidatorMessage {
    /// The short name used both as the sentry filter query parameter and
    /// in log lines (`"NewState"`, `"ApproveState"`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            ValidatorMessage::ApproveState(_) => "ApproveState",
            ValidatorMessage::NewState(_) => "NewState",
            ValidatorMessage::RejectState(_) => "RejectState",
            ValidatorMessage::Heartbeat(_) => "Heartbeat",
            ValidatorMessage::Accounting(_) => "Accounting",
        }
    }
}

/// A persisted validator message together with its envelope metadata
/// (spec.md §3: `{channelId, from, received, msg}`). `seq` is the
/// monotonic per-`(channel_id, from)` insert-order sequence number used to
/// resolve "latest" deterministically (spec.md §9's recommended
/// replacement for `created`/`_id` tie-breaking).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub from: ValidatorId,
    pub received: DateTime<Utc>,
    pub seq: u64,
    pub msg: ValidatorMessage,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validator_id_is_checksummed_when_serialized() {
        let validator_id_checksum_str = "0xce07CbB7e054514D590a0262C93070D838bFBA2e";

        let validator_id =
            ValidatorId::try_from(validator_id_checksum_str).expect("valid string");
        let actual_json = serde_json::to_string(&validator_id).expect("serializes");
        let expected_json = format!(r#""{}""#, validator_id_checksum_str);
        assert_eq!(expected_json, actual_json);
    }

    #[test]
    fn validator_message_round_trips_through_tagged_json() {
        let msg = ValidatorMessage::Heartbeat(Heartbeat::new(
            "sig".into(),
            "00".repeat(32),
            Utc::now(),
        ));
        let json = serde_json::to_value(&msg).expect("serializes");
        assert_eq!("Heartbeat", json["type"]);

        let back: ValidatorMessage = serde_json::from_value(json).expect("deserializes");
        assert_eq!(msg, back);
    }
}
