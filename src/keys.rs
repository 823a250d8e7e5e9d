//! Key material and Ethereum addressing.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use secrecy::{ExposeSecret, Secret, SecretVec};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::classical::{self, PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use crate::crypto::hash::{fingerprint, keccak256};
use crate::crypto::pq::{PqKeyPair, PqScheme, PqSigner};
use crate::error::{WalletError, WalletResult};

pub const ADDRESS_LEN: usize = 20;

/// Draws per classical key before the random source is declared broken.
const MAX_SCALAR_DRAWS: usize = 64;

/// 20-byte account address: the last 20 bytes of Keccak-256 over the
/// uncompressed public key without its `0x04` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> WalletResult<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            WalletError::InvalidRecipient(format!(
                "expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// EIP-55 mixed-case hex with `0x` prefix.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Parses `0x`-prefixed (or bare) hex. Case is not checked against EIP-55.
impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| WalletError::InvalidRecipient(format!("bad hex in {s:?}: {e}")))?;
        Self::from_slice(&bytes)
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_checksum()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

/// Derive the address for a secp256k1 public key (33 or 65 byte SEC1 form).
pub fn derive_address(classical_public: &[u8]) -> WalletResult<Address> {
    let full = classical::uncompressed(classical_public)?;
    let hash = keccak256(&full[1..]);
    Address::from_slice(&hash[12..])
}

/// Shareable half of a [`KeyPair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    pub pq_scheme: PqScheme,
    pub classical: Vec<u8>,
    pub pq: Vec<u8>,
}

impl PublicKeys {
    pub fn address(&self) -> WalletResult<Address> {
        derive_address(&self.classical)
    }

    pub fn classical_fingerprint(&self) -> String {
        fingerprint(&self.classical)
    }

    pub fn pq_fingerprint(&self) -> String {
        fingerprint(&self.pq)
    }
}

/// Hybrid key material. Secret halves are zeroized on drop and never
/// appear in `Debug` output. Not `Clone`.
pub struct KeyPair {
    classical_secret: SecretVec<u8>,
    classical_public: [u8; PUBLIC_KEY_LEN],
    pq: PqKeyPair,
}

impl KeyPair {
    /// Reassemble a keypair from stored parts, checking that they belong together.
    pub(crate) fn from_parts(
        classical_secret: SecretVec<u8>,
        pq_scheme: PqScheme,
        pq_public: Vec<u8>,
        pq_secret: SecretVec<u8>,
    ) -> WalletResult<Self> {
        if classical_secret.expose_secret().len() != SECRET_KEY_LEN {
            return Err(WalletError::InvalidKey("classical secret key length".into()));
        }
        let classical_public = classical::public_key_for(&classical_secret)?;
        if pq_public.len() != pq_scheme.public_key_len()
            || pq_secret.expose_secret().len() != pq_scheme.secret_key_len()
        {
            return Err(WalletError::InvalidKey(format!(
                "{pq_scheme} key lengths do not match the parameter set"
            )));
        }
        Ok(Self {
            classical_secret,
            classical_public,
            pq: PqKeyPair {
                scheme: pq_scheme,
                public_key: pq_public,
                secret_key: pq_secret,
            },
        })
    }

    pub fn pq_scheme(&self) -> PqScheme {
        self.pq.scheme
    }

    pub fn classical_public(&self) -> &[u8] {
        &self.classical_public
    }

    pub fn pq_public(&self) -> &[u8] {
        &self.pq.public_key
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            pq_scheme: self.pq.scheme,
            classical: self.classical_public.to_vec(),
            pq: self.pq.public_key.clone(),
        }
    }

    pub fn address(&self) -> Address {
        let hash = keccak256(&self.classical_public[1..]);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&hash[12..]);
        Address(out)
    }

    pub(crate) fn classical_secret(&self) -> &SecretVec<u8> {
        &self.classical_secret
    }

    pub(crate) fn pq_secret(&self) -> &SecretVec<u8> {
        &self.pq.secret_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .field("pq_scheme", &self.pq.scheme)
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}

/// Generates hybrid keypairs from an injected secure random source.
///
/// Each store is an ordinary value; nothing here is process-global. Both
/// the classical scalar and the PQ key seed are drawn from `rng`, so a
/// seeded `rng` reproduces the whole keypair.
pub struct KeyStore<R> {
    rng: R,
    pq: PqSigner,
}

impl KeyStore<OsRng> {
    pub fn from_os_rng(scheme: PqScheme) -> Self {
        Self::new(OsRng, scheme)
    }
}

impl<R: RngCore + CryptoRng> KeyStore<R> {
    pub fn new(rng: R, scheme: PqScheme) -> Self {
        Self {
            rng,
            pq: PqSigner::new(scheme),
        }
    }

    pub fn pq_scheme(&self) -> PqScheme {
        self.pq.scheme()
    }

    /// Generate fresh, independent classical and PQ key material.
    pub fn generate(&mut self) -> WalletResult<KeyPair> {
        let classical_secret = self.draw_scalar()?;
        let classical_public = classical::public_key_for(&classical_secret)?;
        let pq = self.pq.generate(&mut self.rng)?;

        let keypair = KeyPair {
            classical_secret,
            classical_public,
            pq,
        };
        debug!(address = %keypair.address(), pq_scheme = %keypair.pq_scheme(), "generated hybrid keypair");
        Ok(keypair)
    }

    /// 32 bytes of fresh randomness, e.g. for commitment blinding.
    pub fn fresh_randomness(&mut self) -> WalletResult<Zeroizing<[u8; 32]>> {
        let mut out = Zeroizing::new([0u8; 32]);
        self.rng
            .try_fill_bytes(&mut out[..])
            .map_err(|e| WalletError::Entropy(e.to_string()))?;
        Ok(out)
    }

    fn draw_scalar(&mut self) -> WalletResult<SecretVec<u8>> {
        let mut buf = Zeroizing::new([0u8; SECRET_KEY_LEN]);
        for _ in 0..MAX_SCALAR_DRAWS {
            self.rng
                .try_fill_bytes(&mut buf[..])
                .map_err(|e| WalletError::Entropy(e.to_string()))?;
            if classical::is_valid_secret(&buf[..]) {
                return Ok(Secret::new(buf.to_vec()));
            }
        }
        Err(WalletError::Entropy(format!(
            "no valid secp256k1 scalar after {MAX_SCALAR_DRAWS} draws"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn checksum_matches_eip55_vectors() {
        for s in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let a: Address = s.parse().unwrap();
            assert_eq!(a.to_checksum(), s);
        }
    }

    #[test]
    fn parse_rejects_wrong_length_and_bad_hex() {
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(WalletError::InvalidRecipient(_))
        ));
        assert!(matches!(
            "0xzz2d35Cc6634C0532925a3b8D7D7e4e6403a1B04".parse::<Address>(),
            Err(WalletError::InvalidRecipient(_))
        ));
    }

    #[test]
    fn address_serde_uses_checksum_string() {
        let a: Address = "0x742d35Cc6634C0532925a3b8D7D7e4e6403a1B04".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{}\"", a.to_checksum()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn keypair_address_matches_derive_address() {
        let mut store = KeyStore::new(StdRng::seed_from_u64(1), PqScheme::Dilithium2);
        let kp = store.generate().unwrap();
        assert_eq!(kp.address(), derive_address(kp.classical_public()).unwrap());
        assert_eq!(kp.public_keys().address().unwrap(), kp.address());
    }

    #[test]
    fn derive_address_is_stable_across_encodings() {
        let mut store = KeyStore::new(StdRng::seed_from_u64(3), PqScheme::Dilithium2);
        let kp = store.generate().unwrap();
        let uncompressed = kp.classical_public().to_vec();
        let compressed = secp256k1::PublicKey::from_slice(&uncompressed)
            .unwrap()
            .serialize();

        let first = derive_address(&uncompressed).unwrap();
        let from_compressed = derive_address(&compressed).unwrap();
        assert_eq!(derive_address(&uncompressed).unwrap(), first);
        assert_eq!(derive_address(&compressed).unwrap(), from_compressed);
        assert_eq!(from_compressed, first);
        assert_eq!(first, kp.address());
    }

    #[test]
    fn derive_address_of_generator_point() {
        // secret key 1
        let g = hex::decode(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .unwrap();
        let expected: Address = "0x7E5F4552091A69125d5DfCd7b8C2659029395Bdf".parse().unwrap();
        assert_eq!(derive_address(&g).unwrap(), expected);
        let full = classical::uncompressed(&g).unwrap();
        assert_eq!(derive_address(&full).unwrap(), expected);
    }

    #[test]
    fn debug_output_is_redacted() {
        let mut store = KeyStore::new(StdRng::seed_from_u64(2), PqScheme::Dilithium2);
        let kp = store.generate().unwrap();
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains(&hex::encode(kp.classical_secret().expose_secret())));
    }
}
