//! secp256k1 ECDSA the way Ethereum uses it: Keccak-256 over the message,
//! recoverable signatures serialized as `r || s || v`.

use std::fmt;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use secrecy::{ExposeSecret, SecretVec};

use crate::crypto::hash::keccak256;
use crate::error::{SignerKind, WalletError, WalletResult};

pub const SECRET_KEY_LEN: usize = 32;
/// SEC1 uncompressed public key, `0x04 || x || y`.
pub const PUBLIC_KEY_LEN: usize = 65;
pub const SIGNATURE_LEN: usize = 65;

/// Classical signature bytes (`r || s || v`, `v` in {0, 1}).
#[derive(Clone, PartialEq, Eq)]
pub struct ClassicalSignature {
    bytes: Vec<u8>,
}

impl ClassicalSignature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for ClassicalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassicalSignature")
            .field("scheme", &"secp256k1")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Deterministic (RFC 6979) ECDSA signer over secp256k1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassicalSigner;

impl ClassicalSigner {
    pub fn sign(&self, message: &[u8], secret_key: &SecretVec<u8>) -> WalletResult<ClassicalSignature> {
        let mut sk = SecretKey::from_slice(secret_key.expose_secret()).map_err(|e| WalletError::Signing {
            signer: SignerKind::Classical,
            reason: format!("invalid secp256k1 secret key: {e}"),
        })?;
        let digest = Message::from_digest(keccak256(message));
        let (recid, compact) = SECP256K1.sign_ecdsa_recoverable(&digest, &sk).serialize_compact();
        sk.non_secure_erase();

        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        bytes.extend_from_slice(&compact);
        // recovery ids from a fresh signature are always 0 or 1
        bytes.push(recid.to_i32() as u8);
        Ok(ClassicalSignature { bytes })
    }

    /// Returns `false` for anything that is not a valid signature by
    /// `public_key` over `message`, including malformed input.
    pub fn verify(&self, message: &[u8], signature: &ClassicalSignature, public_key: &[u8]) -> bool {
        let sig = signature.as_bytes();
        if sig.len() != SIGNATURE_LEN {
            return false;
        }
        let Ok(pk) = PublicKey::from_slice(public_key) else {
            return false;
        };
        let Ok(recid) = RecoveryId::from_i32(i32::from(sig[64])) else {
            return false;
        };
        let Ok(rsig) = RecoverableSignature::from_compact(&sig[..64], recid) else {
            return false;
        };
        let digest = Message::from_digest(keccak256(message));

        if SECP256K1.verify_ecdsa(&digest, &rsig.to_standard(), &pk).is_err() {
            return false;
        }
        matches!(SECP256K1.recover_ecdsa(&digest, &rsig), Ok(recovered) if recovered == pk)
    }
}

/// Uncompressed public key for a 32-byte secret scalar.
pub fn public_key_for(secret_key: &SecretVec<u8>) -> WalletResult<[u8; PUBLIC_KEY_LEN]> {
    let mut sk = SecretKey::from_slice(secret_key.expose_secret())
        .map_err(|e| WalletError::InvalidKey(format!("secp256k1 secret key: {e}")))?;
    let pk = PublicKey::from_secret_key_global(&sk);
    sk.non_secure_erase();
    Ok(pk.serialize_uncompressed())
}

/// Normalize a SEC1 public key (33 or 65 bytes) to the uncompressed form.
pub fn uncompressed(public_key: &[u8]) -> WalletResult<[u8; PUBLIC_KEY_LEN]> {
    PublicKey::from_slice(public_key)
        .map(|pk| pk.serialize_uncompressed())
        .map_err(|e| WalletError::InvalidKey(format!("secp256k1 public key: {e}")))
}

/// Whether `candidate` is a usable secp256k1 scalar (non-zero, below the order).
pub(crate) fn is_valid_secret(candidate: &[u8]) -> bool {
    SecretKey::from_slice(candidate)
        .map(|mut sk| sk.non_secure_erase())
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn key(byte: u8) -> SecretVec<u8> {
        Secret::new(vec![byte; SECRET_KEY_LEN])
    }

    #[test]
    fn sign_is_deterministic_and_verifies() {
        let sk = key(0x11);
        let pk = public_key_for(&sk).unwrap();
        let a = ClassicalSigner.sign(b"hello", &sk).unwrap();
        let b = ClassicalSigner.sign(b"hello", &sk).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes().len(), SIGNATURE_LEN);
        assert!(a.as_bytes()[64] <= 1);
        assert!(ClassicalSigner.verify(b"hello", &a, &pk));
    }

    #[test]
    fn verify_accepts_compressed_key() {
        let sk = key(0x22);
        let full = public_key_for(&sk).unwrap();
        let compressed = PublicKey::from_slice(&full).unwrap().serialize();
        let sig = ClassicalSigner.sign(b"m", &sk).unwrap();
        assert!(ClassicalSigner.verify(b"m", &sig, &compressed));
    }

    #[test]
    fn wrong_key_and_tampered_message_fail() {
        let sig = ClassicalSigner.sign(b"original", &key(0x33)).unwrap();
        let other = public_key_for(&key(0x44)).unwrap();
        assert!(!ClassicalSigner.verify(b"original", &sig, &other));

        let own = public_key_for(&key(0x33)).unwrap();
        assert!(!ClassicalSigner.verify(b"tampered", &sig, &own));
    }

    #[test]
    fn malformed_input_is_false_not_panic() {
        let pk = public_key_for(&key(0x55)).unwrap();
        let short = ClassicalSignature::from_bytes(vec![0u8; 10]);
        assert!(!ClassicalSigner.verify(b"m", &short, &pk));

        let mut bad_v = ClassicalSigner.sign(b"m", &key(0x55)).unwrap().into_bytes();
        bad_v[64] = 9;
        assert!(!ClassicalSigner.verify(b"m", &ClassicalSignature::from_bytes(bad_v), &pk));

        let sig = ClassicalSigner.sign(b"m", &key(0x55)).unwrap();
        assert!(!ClassicalSigner.verify(b"m", &sig, &[1, 2, 3]));
    }

    #[test]
    fn zero_scalar_is_rejected() {
        assert!(!is_valid_secret(&[0u8; 32]));
        assert!(ClassicalSigner.sign(b"m", &Secret::new(vec![0u8; 32])).is_err());
    }
}
