use std::fmt;

use async_trait::async_trait;

use crate::{DomainError, ValidatorId};

pub type AdapterResult<T, AE> = Result<T, Error<AE>>;

pub trait AdapterErrorKind: fmt::Debug + fmt::Display + Send + Sync {}

#[derive(Debug)]
pub enum Error<AE: AdapterErrorKind> {
    /// Adapter-specific error, boxed so this enum doesn't grow with the
    /// size of whichever backend (`Dummy`, `Ethereum`, ...) produced it.
    Adapter(Box<AE>),
    Domain(DomainError),
    /// `sign`/`whoami` called before `unlock`.
    LockedWallet,
}

impl<AE: AdapterErrorKind> std::error::Error for Error<AE> {}

impl<AE: AdapterErrorKind> From<AE> for Error<AE> {
    fn from(adapter_err: AE) -> Self {
        Self::Adapter(Box::new(adapter_err))
    }
}

impl<AE: AdapterErrorKind> From<DomainError> for Error<AE> {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl<AE: AdapterErrorKind> fmt::Display for Error<AE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Adapter(error) => write!(f, "adapter: {}", *error),
            Error::Domain(error) => write!(f, "domain: {}", error),
            Error::LockedWallet => write!(f, "wallet must be unlocked first"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeystoreOptions {
    pub keystore_file: String,
    pub keystore_pwd: String,
}

/// The signing capability every validator backend (dummy, Ethereum keystore,
/// ...) must provide (spec.md §4.3). Ticks only ever reach the chain or a
/// local keystore through this trait.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug + Clone {
    type AdapterError: AdapterErrorKind + 'static;

    /// Unlocks the underlying key material. Must be called once, before
    /// `whoami`/`sign` are used.
    fn unlock(&mut self) -> AdapterResult<(), Self::AdapterError>;

    /// This node's own validator identity.
    fn whoami(&self) -> &ValidatorId;

    /// Signs a hex-encoded 32-byte state root. Async because a hardware or
    /// remote-keystore backed adapter may block on external I/O.
    async fn sign(&self, state_root: &str) -> AdapterResult<String, Self::AdapterError>;

    /// Verifies that `signature` over `state_root` was produced by `signer`.
    async fn verify(
        &self,
        signer: &ValidatorId,
        state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool, Self::AdapterError>;
}
