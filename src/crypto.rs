//! Cryptographic utilities for the reward bot
//!
//! Ed25519 authorities and transaction signing. Secrets are supplied as
//! 32-byte hex strings.

use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
#[cfg(test)]
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::config::ConfigError;
use crate::types::{Authority, SignedTransaction, Transaction};

/// Domain separation prefix for transaction signatures
const DOMAIN_TRANSACTION: &[u8] = b"REWARD_BOT_TRANSACTION_V1:";

/// Create a domain-separated message for signing
#[inline]
fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut separated = Vec::with_capacity(domain.len() + message.len());
    separated.extend_from_slice(domain);
    separated.extend_from_slice(message);
    separated
}

/// Errors raised while signing
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("Failed to encode transaction: {0}")]
    Encode(#[from] bincode::Error),
}

/// The account's two authorities
pub struct AuthorityKeys {
    active: SigningKey,
    posting: SigningKey,
}

impl AuthorityKeys {
    /// Parse both secrets, naming the offending authority on failure
    pub fn from_hex(active: &str, posting: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            active: parse_secret("active", active)?,
            posting: parse_secret("posting", posting)?,
        })
    }

    fn key(&self, authority: Authority) -> &SigningKey {
        match authority {
            Authority::Active => &self.active,
            Authority::Posting => &self.posting,
        }
    }

    /// Public key of an authority
    pub fn public_key(&self, authority: Authority) -> [u8; 32] {
        self.key(authority).verifying_key().to_bytes()
    }

    /// Sign a transaction with the given authority
    pub fn sign_transaction(
        &self,
        transaction: Transaction,
        authority: Authority,
    ) -> Result<SignedTransaction, SigningError> {
        let key = self.key(authority);
        let tx_bytes = bincode::serialize(&transaction)?;
        let message = domain_separate(DOMAIN_TRANSACTION, &tx_bytes);
        let signature = key.sign(&message).to_bytes();

        Ok(SignedTransaction {
            transaction,
            authority,
            signer: key.verifying_key().to_bytes(),
            signature,
        })
    }
}

impl std::fmt::Debug for AuthorityKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityKeys")
            .field("active", &hex::encode(self.public_key(Authority::Active)))
            .field("posting", &hex::encode(self.public_key(Authority::Posting)))
            .finish()
    }
}

fn parse_secret(name: &'static str, value: &str) -> Result<SigningKey, ConfigError> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);

    let bytes = hex::decode(value).map_err(|e| ConfigError::InvalidKey {
        name,
        reason: e.to_string(),
    })?;

    let secret: [u8; SECRET_KEY_LENGTH] =
        bytes.as_slice().try_into().map_err(|_| ConfigError::InvalidKey {
            name,
            reason: format!("expected {} bytes, got {}", SECRET_KEY_LENGTH, bytes.len()),
        })?;

    Ok(SigningKey::from_bytes(&secret))
}

/// Verify a signed transaction against its embedded signer
#[cfg(test)]
pub fn verify_transaction(signed: &SignedTransaction) -> bool {
    let Ok(public_key) = VerifyingKey::from_bytes(&signed.signer) else {
        return false;
    };
    let Ok(tx_bytes) = bincode::serialize(&signed.transaction) else {
        return false;
    };
    let message = domain_separate(DOMAIN_TRANSACTION, &tx_bytes);
    let signature = Signature::from_bytes(&signed.signature);

    public_key.verify(&message, &signature).is_ok()
}

/// Generate a fresh secret, returned as (secret hex, public key hex)
pub fn generate_secret() -> (String, String) {
    let key = SigningKey::generate(&mut OsRng);
    (
        hex::encode(key.to_bytes()),
        hex::encode(key.verifying_key().to_bytes()),
    )
}
