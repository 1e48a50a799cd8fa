#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

//! The OUTPACE validator tick state machine: balance/fee arithmetic, the
//! follower's validation rules, state-root commitment, the Sentry HTTP
//! client, and the leader/follower/heartbeat ticks that drive a channel
//! toward bilateral agreement.

pub use self::error::Error;
pub use self::sentry_interface::{all_channels, SentryApi};

pub mod channel;
pub mod error;
pub mod follower;
pub mod heartbeat;
pub mod leader;
pub mod producer;
pub mod sentry_interface;
pub mod state_root;
pub mod worker;

pub mod core {
    pub mod events;
    pub mod fees;
    pub mod follower_rules;
}
