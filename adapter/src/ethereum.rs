#![deny(clippy::all)]
#![deny(rust_2018_idioms)]

use std::fs::File;
use std::path::Path;

use async_trait::async_trait;
use ethsign::Protected;
use primitives::adapter::{Adapter, AdapterResult, KeystoreOptions};
use primitives::ValidatorId;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use tiny_keccak::{Hasher, Keccak};

use crate::AdapterError;

/// Hashes a message the way `eth_sign`/`personal_sign` do: prefixed with
/// `"\x19Ethereum Signed Message:\n" + len`, then Keccak256. Both validator
/// nodes must hash the state root identically for `verify` to agree.
fn hash_message(message: &str) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());

    let mut hasher = Keccak::v256();
    hasher.update(prefix.as_bytes());
    hasher.update(message.as_bytes());

    let mut output = [0_u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Ethereum-style address derived from an uncompressed public key: the
/// low 20 bytes of `keccak256(pubkey)`.
fn address_from_public_key(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.serialize_uncompressed();

    let mut hasher = Keccak::v256();
    hasher.update(&uncompressed[1..]);
    let mut hash = [0_u8; 32];
    hasher.finalize(&mut hash);

    let mut address = [0_u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Keystore-backed adapter: unlocks a V3 JSON keystore file with a
/// password (via `ethsign`'s decryption), then signs/verifies state roots
/// with the recovered secp256k1 key (spec.md §4.3, §6's `--keystoreFile` /
/// `KEYSTORE_PWD`).
#[derive(Clone)]
pub struct EthereumAdapter {
    keystore_file: String,
    keystore_pwd: String,
    identity: ValidatorId,
    secret: Option<SecretKey>,
}

impl std::fmt::Debug for EthereumAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumAdapter")
            .field("identity", &self.identity)
            .field("unlocked", &self.secret.is_some())
            .finish()
    }
}

impl EthereumAdapter {
    pub fn init(options: KeystoreOptions, identity: ValidatorId) -> Self {
        Self {
            keystore_file: options.keystore_file,
            keystore_pwd: options.keystore_pwd,
            identity,
            secret: None,
        }
    }

    fn secret(&self) -> AdapterResult<&SecretKey, AdapterError> {
        self.secret
            .as_ref()
            .ok_or_else(|| AdapterError::LockedWallet("use").into())
    }
}

#[async_trait]
impl Adapter for EthereumAdapter {
    type AdapterError = AdapterError;

    fn unlock(&mut self) -> AdapterResult<(), Self::AdapterError> {
        let file = File::open(Path::new(&self.keystore_file))
            .map_err(|err| AdapterError::Configuration(format!("opening keystore file: {}", err)))?;

        let key_file: ethsign::keyfile::KeyFile = serde_json::from_reader(file)
            .map_err(|err| AdapterError::Configuration(format!("parsing keystore file: {}", err)))?;

        let password: Protected = self.keystore_pwd.clone().into();
        let raw_secret = key_file
            .crypto
            .decrypt(&password)
            .map_err(|_| AdapterError::WalletUnlock("invalid keystore password".to_string()))?;

        let secret = SecretKey::from_slice(&raw_secret)
            .map_err(|err| AdapterError::WalletUnlock(err.to_string()))?;

        let public_key = PublicKey::from_secret_key_global(&secret);
        if address_from_public_key(&public_key) != *self.identity.inner() {
            return Err(AdapterError::Configuration(
                "keystore address does not match configured identity".to_string(),
            )
            .into());
        }

        self.secret = Some(secret);
        Ok(())
    }

    fn whoami(&self) -> &ValidatorId {
        &self.identity
    }

    async fn sign(&self, state_root: &str) -> AdapterResult<String, Self::AdapterError> {
        let secret = self.secret()?;
        let message = Message::from_digest(hash_message(state_root));

        let signature = secp256k1::SECP256K1.sign_ecdsa_recoverable(&message, secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut encoded = Vec::with_capacity(65);
        encoded.extend_from_slice(&compact);
        encoded.push(recovery_id.to_i32() as u8 + 27);

        Ok(format!("0x{}", hex::encode(encoded)))
    }

    async fn verify(
        &self,
        signer: &ValidatorId,
        state_root: &str,
        signature: &str,
    ) -> AdapterResult<bool, Self::AdapterError> {
        let message = Message::from_digest(hash_message(state_root));
        let bytes = hex::decode(signature.trim_start_matches("0x"))
            .map_err(|err| AdapterError::Verify(format!("invalid signature hex: {}", err)))?;

        if bytes.len() != 65 {
            return Err(AdapterError::Verify("expected a 65-byte signature".to_string()).into());
        }

        let v = bytes[64].saturating_sub(27);
        let recovery_id = RecoveryId::from_i32(v as i32)
            .map_err(|err| AdapterError::Verify(format!("invalid recovery id: {}", err)))?;
        let recoverable = RecoverableSignature::from_compact(&bytes[..64], recovery_id)
            .map_err(|err| AdapterError::Verify(format!("invalid signature: {}", err)))?;

        let public_key = secp256k1::SECP256K1
            .recover_ecdsa(&message, &recoverable)
            .map_err(|err| AdapterError::Verify(format!("recovery failed: {}", err)))?;

        Ok(address_from_public_key(&public_key) == *signer.inner())
    }
}
