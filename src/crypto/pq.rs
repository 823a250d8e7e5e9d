//! Lattice-based signatures (ML-DSA, the FIPS 204 form of CRYSTALS-Dilithium).
//!
//! Keys and signatures are kilobytes long and their sizes depend on the
//! parameter set, so everything here is carried as length-checked byte
//! vectors tagged with the [`PqScheme`] that produced them.

use std::fmt;

use ml_dsa::signature::{Keypair as _, Signer as _, Verifier as _};
use ml_dsa::{
    EncodedSigningKey, EncodedVerifyingKey, KeyGen as _, MlDsa44, MlDsa65, MlDsa87, Signature,
    SigningKey, VerifyingKey,
};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use secrecy::{ExposeSecret, Secret, SecretVec};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{SignerKind, WalletError, WalletResult};

/// Runs `$body` with `$p` bound to the ML-DSA parameter type of `$scheme`.
macro_rules! with_params {
    ($scheme:expr, $p:ident => $body:expr) => {
        match $scheme {
            PqScheme::Dilithium2 => {
                type $p = MlDsa44;
                $body
            }
            PqScheme::Dilithium3 => {
                type $p = MlDsa65;
                $body
            }
            PqScheme::Dilithium5 => {
                type $p = MlDsa87;
                $body
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PqScheme {
    /// ML-DSA-44 (Dilithium2)
    Dilithium2,
    /// ML-DSA-65 (Dilithium3)
    Dilithium3,
    /// ML-DSA-87 (Dilithium5)
    Dilithium5,
}

impl PqScheme {
    pub fn public_key_len(self) -> usize {
        match self {
            PqScheme::Dilithium2 => 1312,
            PqScheme::Dilithium3 => 1952,
            PqScheme::Dilithium5 => 2592,
        }
    }

    pub fn secret_key_len(self) -> usize {
        match self {
            PqScheme::Dilithium2 => 2560,
            PqScheme::Dilithium3 => 4032,
            PqScheme::Dilithium5 => 4896,
        }
    }

    pub fn signature_len(self) -> usize {
        match self {
            PqScheme::Dilithium2 => 2420,
            PqScheme::Dilithium3 => 3309,
            PqScheme::Dilithium5 => 4627,
        }
    }
}

impl fmt::Display for PqScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PqScheme::Dilithium2 => "Dilithium2",
            PqScheme::Dilithium3 => "Dilithium3",
            PqScheme::Dilithium5 => "Dilithium5",
        };
        f.write_str(name)
    }
}

/// Freshly generated PQ key material. The secret half is zeroized on drop.
pub struct PqKeyPair {
    pub scheme: PqScheme,
    pub public_key: Vec<u8>,
    pub secret_key: SecretVec<u8>,
}

/// Detached PQ signature bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct PqSignature {
    scheme: PqScheme,
    bytes: Vec<u8>,
}

impl PqSignature {
    pub fn new(scheme: PqScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    pub fn scheme(&self) -> PqScheme {
        self.scheme
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for PqSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PqSignature")
            .field("scheme", &self.scheme)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Sign/verify with one Dilithium parameter set.
///
/// Signing uses the deterministic FIPS 204 variant with an empty context,
/// so the same key and message always give the same bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PqSigner {
    scheme: PqScheme,
}

impl PqSigner {
    pub fn new(scheme: PqScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> PqScheme {
        self.scheme
    }

    /// Generate a keypair from a 32-byte seed drawn from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(&self, rng: &mut R) -> WalletResult<PqKeyPair> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.try_fill_bytes(&mut seed[..])
            .map_err(|e| WalletError::Entropy(e.to_string()))?;
        Ok(self.generate_from_seed(&seed))
    }

    /// Same seed, same keypair.
    pub fn generate_from_seed(&self, seed: &[u8; 32]) -> PqKeyPair {
        let mut rng = ChaCha20Rng::from_seed(*seed);
        let (public_key, secret_key) = with_params!(self.scheme, P => {
            let kp = P::key_gen(&mut rng);
            (
                kp.verifying_key().encode().as_slice().to_vec(),
                kp.signing_key().encode().as_slice().to_vec(),
            )
        });
        PqKeyPair {
            scheme: self.scheme,
            public_key,
            secret_key: Secret::new(secret_key),
        }
    }

    /// Sign a message with a secret key of this signer's parameter set.
    pub fn sign(&self, message: &[u8], secret_key: &SecretVec<u8>) -> WalletResult<PqSignature> {
        let sk = secret_key.expose_secret();
        let bytes = with_params!(self.scheme, P => {
            let enc = EncodedSigningKey::<P>::try_from(sk.as_slice())
                .map_err(|_| bad_secret(self.scheme, sk.len()))?;
            SigningKey::<P>::decode(&enc).sign(message).encode().as_slice().to_vec()
        });
        Ok(PqSignature::new(self.scheme, bytes))
    }

    /// Verify a detached signature. Malformed keys or signatures, and
    /// signatures from another parameter set, yield `false`.
    pub fn verify(&self, message: &[u8], signature: &PqSignature, public_key: &[u8]) -> bool {
        if signature.scheme != self.scheme {
            return false;
        }
        let sig = signature.as_bytes();
        with_params!(self.scheme, P => {
            match (
                EncodedVerifyingKey::<P>::try_from(public_key),
                Signature::<P>::try_from(sig),
            ) {
                (Ok(pk), Ok(sig)) => VerifyingKey::<P>::decode(&pk).verify(message, &sig).is_ok(),
                _ => false,
            }
        })
    }
}

fn bad_secret(scheme: PqScheme, len: usize) -> WalletError {
    WalletError::Signing {
        signer: SignerKind::PostQuantum,
        reason: format!(
            "invalid {scheme} secret key: {len} bytes, expected {}",
            scheme.secret_key_len()
        ),
    }
}
