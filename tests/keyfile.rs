use epqw::config::KdfParams;
use epqw::crypto::PqScheme;
use epqw::envelope::{verify_composite, EnvelopeVersion};
use epqw::{keyfile, KeyStore, TransactionBuilder, WalletError};
use rand::rngs::OsRng;
use secrecy::SecretString;

fn fast_kdf() -> KdfParams {
    KdfParams {
        m_cost_kib: 1024,
        t_cost: 1,
        p_cost: 1,
    }
}

#[test]
fn keyfile_roundtrip_preserves_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alice").join(keyfile::WALLET_FILE_NAME);
    let password = SecretString::new("correct horse battery staple".into());

    let original = KeyStore::from_os_rng(PqScheme::Dilithium3).generate().unwrap();
    let sealed = keyfile::seal(&original, &password, &fast_kdf(), &mut OsRng).unwrap();
    keyfile::save(&path, &sealed).unwrap();

    let loaded = keyfile::load(&path, &password).unwrap();
    assert_eq!(loaded.address(), original.address());
    assert_eq!(loaded.public_keys(), original.public_keys());

    // the restored secrets still sign for the original public keys
    let builder = TransactionBuilder::new(EnvelopeVersion::V2);
    let env = builder.sign_message(b"after reload", &loaded).unwrap();
    assert!(verify_composite(
        b"after reload",
        &env,
        original.classical_public(),
        original.pq_public()
    ));
}

#[test]
fn wrong_password_is_a_keyfile_error() {
    let kp = KeyStore::from_os_rng(PqScheme::Dilithium2).generate().unwrap();
    let sealed = keyfile::seal(&kp, &SecretString::new("right".into()), &fast_kdf(), &mut OsRng).unwrap();
    assert!(matches!(
        keyfile::open(&sealed, &SecretString::new("wrong".into())),
        Err(WalletError::Keyfile(_))
    ));
}

#[test]
fn sealing_twice_uses_fresh_salt_and_nonce() {
    let kp = KeyStore::from_os_rng(PqScheme::Dilithium2).generate().unwrap();
    let pw = SecretString::new("pw".into());
    let a = keyfile::seal(&kp, &pw, &fast_kdf(), &mut OsRng).unwrap();
    let b = keyfile::seal(&kp, &pw, &fast_kdf(), &mut OsRng).unwrap();
    assert_ne!(a, b);
    assert_eq!(a.len(), b.len());
}

#[test]
fn corrupted_ciphertext_is_rejected() {
    let kp = KeyStore::from_os_rng(PqScheme::Dilithium2).generate().unwrap();
    let pw = SecretString::new("pw".into());
    let mut sealed = keyfile::seal(&kp, &pw, &fast_kdf(), &mut OsRng).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x80;
    assert!(matches!(keyfile::open(&sealed, &pw), Err(WalletError::Keyfile(_))));
}

#[test]
fn missing_file_is_a_keyfile_error() {
    let dir = tempfile::tempdir().unwrap();
    let pw = SecretString::new("pw".into());
    assert!(matches!(
        keyfile::load(&dir.path().join("nope.epqw"), &pw),
        Err(WalletError::Keyfile(_))
    ));
}

#[cfg(unix)]
#[test]
fn saved_wallet_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(keyfile::WALLET_FILE_NAME);
    keyfile::save(&path, b"sealed bytes").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
