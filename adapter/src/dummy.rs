#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use async_trait::async_trait;
use primitives::adapter::{Adapter, AdapterResult};
use primitives::{ToETHChecksum, ValidatorId};

use crate::AdapterError;

/// A non-cryptographic stand-in for local development and tests: `sign`
/// produces a human-readable string embedding the signer's identity,
/// `verify` parses it back out (spec.md §9's dummy adapter).
#[derive(Debug, Clone)]
pub struct DummyAdapter {
    identity: ValidatorId,
    unlocked: bool,
}

impl DummyAdapter {
    pub fn init(identity: ValidatorId) -> Self {
        Self {
            identity,
            unlocked: false,
        }
    }
}

#[async_trait]
impl Adapter for DummyAdapter {
    type AdapterError = AdapterError;

    fn unlock(&mut self) -> AdapterResult<(), Self::AdapterError> {
        self.unlocked = true;
        Ok(())
    }

    fn whoami(&self) -> &ValidatorId {
        &self.identity
    }

    async fn sign(&self, state_root: &str) -> AdapterResult<String, Self::AdapterError> {
        if !self.unlocked {
            return Err(AdapterError::LockedWallet("sign").into());
        }

        Ok(format!(
            "Dummy adapter signature for {} by {}",
            state_root,
            self.whoami()
        ))
    }

    async fn verify(
        &self,
        signer: &ValidatorId,
        _state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool, Self::AdapterError> {
        // the dummy signature format ends in " by <signer>"
        let is_same = match signature.rsplit(' ').next() {
            Some(from) => from == signer.to_checksum(),
            None => false,
        };

        Ok(is_same)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use primitives::ToETHChecksum;
    use std::convert::TryFrom;

    fn adapter() -> DummyAdapter {
        let id = ValidatorId::try_from("0xce07CbB7e054514D590a0262C93070D838bFBA2e").unwrap();
        let mut adapter = DummyAdapter::init(id);
        adapter.unlock().unwrap();
        adapter
    }

    #[tokio::test]
    async fn signs_and_verifies_its_own_signature() {
        let adapter = adapter();
        let state_root = "00".repeat(32);

        let signature = adapter.sign(&state_root).await.unwrap();
        let verified = adapter
            .verify(adapter.whoami(), &state_root, &signature)
            .await
            .unwrap();

        assert!(verified);
    }

    #[tokio::test]
    async fn rejects_a_signature_from_a_different_signer() {
        let adapter = adapter();
        let other = ValidatorId::try_from("0xc91763d7f14ac5c5ddfbcd012e0d2a61ab9bded3").unwrap();
        let state_root = "00".repeat(32);

        let signature = adapter.sign(&state_root).await.unwrap();
        let verified = adapter.verify(&other, &state_root, &signature).await.unwrap();

        assert!(!verified);
    }

    #[tokio::test]
    async fn refuses_to_sign_while_locked() {
        let id = ValidatorId::try_from("0xce07CbB7e054514D590a0262C93070D838bFBA2e").unwrap();
        let adapter = DummyAdapter::init(id);

        assert!(adapter.sign("00".repeat(32).as_str()).await.is_err());
    }
}
