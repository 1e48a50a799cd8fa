use thiserror::Error;

/// `AdapterErrorKind` for both [`crate::DummyAdapter`] and
/// [`crate::EthereumAdapter`]: keystore/unlock failures, signing/recovery
/// failures, and configuration mistakes.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("wallet must be unlocked before {0}")]
    LockedWallet(&'static str),
    #[error("failed to unlock wallet: {0}")]
    WalletUnlock(String),
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("signature verification failed: {0}")]
    Verify(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl primitives::adapter::AdapterErrorKind for AdapterError {}
