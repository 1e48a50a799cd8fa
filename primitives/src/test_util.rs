//! Fixture identities shared by unit and integration tests across the
//! workspace, gated behind the `test-util` feature.

use std::convert::TryFrom;

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use slog::{o, Discard, Drain, Logger};

use crate::{
    Address, BigNum, Channel, ChannelId,
    channel::SpecValidators,
    BalancesMap, ValidatorDesc, ValidatorId,
};

/// A `Logger` that throws every record away, for tests that need to thread
/// one through but don't care about its output.
pub fn discard_logger() -> Logger {
    Logger::root(Discard.fuse(), o!())
}

pub static LEADER: Lazy<ValidatorId> = Lazy::new(|| {
    ValidatorId::try_from("0xce07CbB7e054514D590a0262C93070D838bFBA2e").expect("valid fixture id")
});
pub static FOLLOWER: Lazy<ValidatorId> = Lazy::new(|| {
    ValidatorId::try_from("0xc91763d7f14ac5c5ddfbcd012e0d2a61ab9bded3").expect("valid fixture id")
});

pub static PUBLISHER: Lazy<Address> = Lazy::new(|| {
    Address::try_from("0x80690751969B234697e9059e04ed72195c3507fa").expect("valid fixture address")
});
pub static PUBLISHER_2: Lazy<Address> = Lazy::new(|| {
    Address::try_from("0xf3f583AEC5f7C030722Fe992A5688557e1B86ef7").expect("valid fixture address")
});

pub fn leader_desc(fee: u64) -> ValidatorDesc {
    ValidatorDesc {
        id: *LEADER,
        fee_addr: None,
        url: "https://leader.example".to_string(),
        fee: fee.into(),
    }
}

pub fn follower_desc(fee: u64) -> ValidatorDesc {
    ValidatorDesc {
        id: *FOLLOWER,
        fee_addr: None,
        url: "https://follower.example".to_string(),
        fee: fee.into(),
    }
}

/// A channel with a 1000-unit deposit and 50/50 validator fees, usable as
/// the default fixture wherever a concrete channel is needed.
pub fn dummy_channel(deposit: u64, leader_fee: u64, follower_fee: u64) -> Channel {
    let id = ChannelId::from([0x01; 32]);
    let validators = SpecValidators::new(leader_desc(leader_fee), follower_desc(follower_fee));

    Channel::new(
        id,
        *PUBLISHER,
        "0x0000000000000000000000000000000000000000".to_string(),
        BigNum::from(deposit),
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        validators,
    )
    .expect("valid fixture channel")
}

pub fn balances(pairs: &[(Address, u64)]) -> BalancesMap {
    pairs
        .iter()
        .map(|(address, amount)| (*address, BigNum::from(*amount)))
        .collect()
}
