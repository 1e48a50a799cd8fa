use primitives::{ChannelId, DomainError};
use thiserror::Error;

/// Top-level error taxonomy for a single channel tick. Every variant is
/// non-fatal to the worker process as a whole — a single channel's error is
/// logged and the scheduler moves on to the next channel/cycle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("channel {0}: tick timed out")]
    TickTimeout(ChannelId),

    #[error("adapter failed to initialize: {0}")]
    AdapterInitFailure(String),

    #[error("channel {channel}: sentry unreachable at {url}: {source}")]
    SentryUnreachable {
        channel: ChannelId,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("channel {channel}: failed to propagate to {validator}: {source}")]
    PropagationFailure {
        channel: ChannelId,
        validator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("channel {0}: invalid balance transition")]
    InvalidTransition(ChannelId),

    #[error("channel {0}: invalid validator fees: {1}")]
    InvalidValidatorFees(ChannelId, DomainError),

    #[error("channel {0}: state root does not match the recomputed balances")]
    InvalidRootHash(ChannelId),

    #[error("channel {0}: signature does not verify against the claimed signer")]
    InvalidSignature(ChannelId),

    #[error("channel {0}: this node is neither the leader nor the follower")]
    ChannelNotOurs(ChannelId),

    #[error("channel {0}: adapter error: {1}")]
    AdapterFailure(ChannelId, String),

    #[error("channel {0}: {1}")]
    AssertionFailure(ChannelId, String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Error {
    /// The wire `RejectState.reason` tag (spec.md §7) for the follower
    /// validation variants. Other variants never reach a rejection path, so
    /// they fall back to a generic tag rather than panicking.
    pub fn wire_reason(&self) -> &'static str {
        match self {
            Error::InvalidTransition(_) => "InvalidTransition",
            Error::InvalidValidatorFees(_, _) => "InvalidValidatorFees",
            Error::InvalidRootHash(_) => "InvalidRootHash",
            Error::InvalidSignature(_) => "InvalidSignature",
            _ => "Error",
        }
    }
}
