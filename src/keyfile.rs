//! Password-encrypted wallet files.
//!
//! File format v1:
//!
//! ```text
//! [0..4)   magic "EPQW"
//! [4]      version (1)
//! [5]      kdf_id (1 = Argon2id)
//! [6..10)  m_cost_kib (u32 LE)
//! [10..14) t_cost (u32 LE)
//! [14..18) p_cost (u32 LE)
//! [18..34) salt (16B)
//! [34..46) nonce (12B)
//! [46..]   ciphertext (AES-256-GCM, AAD = header[0..34])
//! ```
//!
//! The AES key is HKDF-SHA256(salt, Argon2id(password, salt)). The plaintext
//! is JSON holding the hex-encoded key material.

use std::fs;
#[cfg(unix)]
use std::fs::OpenOptions;
#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::config::KdfParams;
use crate::crypto::pq::PqScheme;
use crate::error::{WalletError, WalletResult};
use crate::keys::KeyPair;

const MAGIC: &[u8; 4] = b"EPQW";
const VERSION: u8 = 1;
const KDF_ID_ARGON2ID: u8 = 1;
const HKDF_INFO_V1: &[u8] = b"epqw-wallet-file v1";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 18 + SALT_LEN;
const MIN_FILE_LEN: usize = HEADER_LEN + NONCE_LEN;
/// 1 GiB; anything larger in a file header is treated as hostile.
const MAX_M_COST_KIB: u32 = 1 << 20;
const MAX_T_COST: u32 = 64;

pub const WALLET_FILE_NAME: &str = "wallet.epqw";

#[derive(Serialize, Deserialize)]
struct WalletFile {
    pq_scheme: PqScheme,
    classical_secret: String,
    pq_public: String,
    pq_secret: String,
}

impl Drop for WalletFile {
    fn drop(&mut self) {
        self.classical_secret.zeroize();
        self.pq_secret.zeroize();
    }
}

fn keyfile_err(msg: impl Into<String>) -> WalletError {
    WalletError::Keyfile(msg.into())
}

fn derive_key(
    password: &SecretString,
    salt: &[u8],
    kdf: &KdfParams,
) -> WalletResult<Zeroizing<[u8; 32]>> {
    if kdf.m_cost_kib > MAX_M_COST_KIB {
        return Err(keyfile_err(format!("argon2 memory cost {} KiB too large", kdf.m_cost_kib)));
    }
    if kdf.t_cost > MAX_T_COST {
        return Err(keyfile_err(format!("argon2 time cost {} too large", kdf.t_cost)));
    }
    let params = Params::new(kdf.m_cost_kib, kdf.t_cost, kdf.p_cost, None)
        .map_err(|e| keyfile_err(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut mk = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut mk[..])
        .map_err(|e| keyfile_err(format!("argon2 derivation failed: {e}")))?;

    let hk = Hkdf::<Sha256>::new(Some(salt), &mk[..]);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO_V1, &mut key[..])
        .map_err(|_| keyfile_err("HKDF expand failed"))?;
    Ok(key)
}

/// Encrypt a keypair under `password`.
pub fn seal<R: RngCore + CryptoRng>(
    keypair: &KeyPair,
    password: &SecretString,
    kdf: &KdfParams,
    rng: &mut R,
) -> WalletResult<Vec<u8>> {
    let wallet = WalletFile {
        pq_scheme: keypair.pq_scheme(),
        classical_secret: hex::encode(keypair.classical_secret().expose_secret()),
        pq_public: hex::encode(keypair.pq_public()),
        pq_secret: hex::encode(keypair.pq_secret().expose_secret()),
    };
    let plaintext = Zeroizing::new(
        serde_json::to_vec(&wallet).map_err(|e| keyfile_err(format!("serialize: {e}")))?,
    );
    drop(wallet);

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut salt)
        .and_then(|_| rng.try_fill_bytes(&mut nonce))
        .map_err(|e| WalletError::Entropy(e.to_string()))?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.push(VERSION);
    header.push(KDF_ID_ARGON2ID);
    header.extend_from_slice(&kdf.m_cost_kib.to_le_bytes());
    header.extend_from_slice(&kdf.t_cost.to_le_bytes());
    header.extend_from_slice(&kdf.p_cost.to_le_bytes());
    header.extend_from_slice(&salt);

    let key = derive_key(password, &salt, kdf)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| keyfile_err("bad AES key length"))?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &plaintext,
                aad: &header,
            },
        )
        .map_err(|_| keyfile_err("encryption failed"))?;

    let mut out = Vec::with_capacity(header.len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Decrypt a wallet file. A wrong password and a corrupted file both
/// fail authentication and report `Keyfile`.
pub fn open(data: &[u8], password: &SecretString) -> WalletResult<KeyPair> {
    if data.len() < MIN_FILE_LEN {
        return Err(keyfile_err("file too short or corrupted"));
    }
    if &data[0..4] != MAGIC {
        return Err(keyfile_err("wrong magic"));
    }
    if data[4] != VERSION {
        return Err(keyfile_err(format!("unsupported version: {}", data[4])));
    }
    if data[5] != KDF_ID_ARGON2ID {
        return Err(keyfile_err(format!("unsupported KDF id: {}", data[5])));
    }
    let kdf = KdfParams {
        m_cost_kib: le_u32(&data[6..10]),
        t_cost: le_u32(&data[10..14]),
        p_cost: le_u32(&data[14..18]),
    };
    let salt = &data[18..HEADER_LEN];
    let nonce = &data[HEADER_LEN..MIN_FILE_LEN];
    let ciphertext = &data[MIN_FILE_LEN..];

    let key = derive_key(password, salt, &kdf)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| keyfile_err("bad AES key length"))?;
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &data[..HEADER_LEN],
                },
            )
            .map_err(|_| keyfile_err("decryption failed (bad password or corrupted file)"))?,
    );

    let wallet: WalletFile = serde_json::from_slice(&plaintext)
        .map_err(|_| keyfile_err("corrupted plaintext after decryption"))?;
    let decode = |field: &str, s: &str| {
        hex::decode(s).map_err(|_| keyfile_err(format!("bad hex in {field}")))
    };
    let keypair = KeyPair::from_parts(
        Secret::new(decode("classical_secret", &wallet.classical_secret)?),
        wallet.pq_scheme,
        decode("pq_public", &wallet.pq_public)?,
        Secret::new(decode("pq_secret", &wallet.pq_secret)?),
    )?;
    debug!(address = %keypair.address(), "opened wallet file");
    Ok(keypair)
}

/// `~/wallets/<name>/wallet.epqw`
pub fn wallet_path(name: &str) -> WalletResult<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(keyfile_err(format!("invalid wallet name {name:?}")));
    }
    let home = dirs::home_dir().ok_or_else(|| keyfile_err("could not determine home directory"))?;
    Ok(home.join("wallets").join(name).join(WALLET_FILE_NAME))
}

/// Write a sealed wallet, creating parent directories. Mode 0o600 on Unix.
pub fn save(path: &Path, sealed: &[u8]) -> WalletResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| keyfile_err(format!("{}: {e}", dir.display())))?;
    }
    #[cfg(unix)]
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| keyfile_err(format!("{}: {e}", path.display())))?;
        f.write_all(sealed)
            .map_err(|e| keyfile_err(format!("{}: {e}", path.display())))?;
    }
    #[cfg(not(unix))]
    {
        fs::write(path, sealed).map_err(|e| keyfile_err(format!("{}: {e}", path.display())))?;
    }
    Ok(())
}

pub fn load(path: &Path, password: &SecretString) -> WalletResult<KeyPair> {
    let data = fs::read(path).map_err(|e| keyfile_err(format!("{}: {e}", path.display())))?;
    open(&data, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fast_kdf() -> KdfParams {
        KdfParams {
            m_cost_kib: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    #[test]
    fn header_layout() {
        let mut rng = StdRng::seed_from_u64(11);
        let kp = KeyStore::new(StdRng::seed_from_u64(12), PqScheme::Dilithium2)
            .generate()
            .unwrap();
        let pw = SecretString::new("pw".into());
        let sealed = seal(&kp, &pw, &fast_kdf(), &mut rng).unwrap();
        assert_eq!(&sealed[..4], MAGIC);
        assert_eq!(sealed[4], VERSION);
        assert_eq!(sealed[5], KDF_ID_ARGON2ID);
        assert_eq!(le_u32(&sealed[6..10]), 256);
        assert!(sealed.len() > MIN_FILE_LEN + 16);
    }

    #[test]
    fn tampered_header_fails_authentication() {
        let mut rng = StdRng::seed_from_u64(13);
        let kp = KeyStore::new(StdRng::seed_from_u64(14), PqScheme::Dilithium2)
            .generate()
            .unwrap();
        let pw = SecretString::new("pw".into());
        let mut sealed = seal(&kp, &pw, &fast_kdf(), &mut rng).unwrap();
        sealed[20] ^= 0x01;
        assert!(matches!(open(&sealed, &pw), Err(WalletError::Keyfile(_))));
    }

    #[test]
    fn short_and_foreign_files_are_rejected() {
        let pw = SecretString::new("pw".into());
        assert!(open(b"EPQW", &pw).is_err());
        assert!(open(&[0u8; 64], &pw).is_err());
    }

    #[test]
    fn oversized_costs_in_header_are_rejected() {
        let mut rng = StdRng::seed_from_u64(15);
        let kp = KeyStore::new(StdRng::seed_from_u64(16), PqScheme::Dilithium2)
            .generate()
            .unwrap();
        let pw = SecretString::new("pw".into());
        let sealed = seal(&kp, &pw, &fast_kdf(), &mut rng).unwrap();

        let mut slow = sealed.clone();
        slow[10..14].copy_from_slice(&u32::MAX.to_le_bytes());
        match open(&slow, &pw) {
            Err(WalletError::Keyfile(msg)) => assert!(msg.contains("time cost"), "{msg}"),
            other => panic!("expected time cost rejection, got {:?}", other.map(|_| ())),
        }

        let mut huge = sealed;
        huge[6..10].copy_from_slice(&(MAX_M_COST_KIB + 1).to_le_bytes());
        match open(&huge, &pw) {
            Err(WalletError::Keyfile(msg)) => assert!(msg.contains("memory cost"), "{msg}"),
            other => panic!("expected memory cost rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn wallet_names_cannot_escape() {
        assert!(wallet_path("../x").is_err());
        assert!(wallet_path("").is_err());
        assert!(wallet_path("..").is_err());
    }
}
