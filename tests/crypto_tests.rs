use epqw::config::WalletConfig;
use epqw::crypto::classical;
use epqw::crypto::{ClassicalSignature, ClassicalSigner, PqScheme, PqSignature, PqSigner};
use epqw::envelope::{decode, encode, verify_composite, EnvelopeVersion};
use epqw::{KeyStore, TransactionBuilder};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;

fn store(seed: u64, scheme: PqScheme) -> KeyStore<StdRng> {
    KeyStore::new(StdRng::seed_from_u64(seed), scheme)
}

#[test]
fn test_dilithium_signature_valid_for_every_scheme() {
    for scheme in [PqScheme::Dilithium2, PqScheme::Dilithium3, PqScheme::Dilithium5] {
        let signer = PqSigner::new(scheme);
        let keypair = signer.generate(&mut OsRng).unwrap();
        let message = b"Quantum-secure wallet test message";
        let signature = signer.sign(message, &keypair.secret_key).unwrap();
        assert_eq!(signature.as_bytes().len(), scheme.signature_len());
        assert!(signer.verify(message, &signature, &keypair.public_key));
    }
}

#[test]
fn test_dilithium5_signature_invalid_message() {
    let signer = PqSigner::new(PqScheme::Dilithium5);
    let keypair = signer.generate(&mut OsRng).unwrap();
    let signature = signer.sign(b"Original message", &keypair.secret_key).unwrap();
    assert!(!signer.verify(b"Tampered message", &signature, &keypair.public_key));
}

#[test]
fn property_test_signature_determinism() {
    let signer = PqSigner::new(PqScheme::Dilithium5);
    let keypair = signer.generate(&mut OsRng).unwrap();
    let message = b"Deterministic signature test";
    let sig1 = signer.sign(message, &keypair.secret_key).unwrap();
    let sig2 = signer.sign(message, &keypair.secret_key).unwrap();
    assert_eq!(sig1.as_bytes(), sig2.as_bytes());
}

#[test]
fn test_secp256k1_signature_recovers_signer() {
    let kp = store(7, PqScheme::Dilithium2).generate().unwrap();
    let tx = TransactionBuilder::new(EnvelopeVersion::V3);
    let envelope = tx.sign_message(b"hello", &kp).unwrap();
    let sig = envelope.classical();
    assert_eq!(sig.as_bytes().len(), classical::SIGNATURE_LEN);
    assert!(sig.as_bytes()[64] <= 1);
    assert!(ClassicalSigner.verify(b"hello", sig, kp.classical_public()));
    assert!(!ClassicalSigner.verify(b"hellp", sig, kp.classical_public()));
}

#[test]
fn test_hybrid_envelope_roundtrip_and_verify() {
    let kp = store(8, PqScheme::Dilithium3).generate().unwrap();
    let builder = TransactionBuilder::new(EnvelopeVersion::V2);
    let message = b"Exploring quantum-safe cryptography on Ethereum";
    let envelope = builder.sign_message(message, &kp).unwrap();

    let bytes = encode(envelope.classical(), envelope.pq(), EnvelopeVersion::V2);
    assert_eq!(bytes, envelope.to_bytes());
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded, envelope);
    assert!(verify_composite(message, &decoded, kp.classical_public(), kp.pq_public()));
}

#[test]
fn test_hybrid_fails_if_either_half_is_foreign() {
    let alice = store(9, PqScheme::Dilithium2).generate().unwrap();
    let bob = store(10, PqScheme::Dilithium2).generate().unwrap();
    let builder = TransactionBuilder::new(EnvelopeVersion::V3);
    let message = b"pay bob";
    let a = builder.sign_message(message, &alice).unwrap();
    let b = builder.sign_message(message, &bob).unwrap();

    // alice's classical half glued to bob's PQ half
    let mixed = decode(&encode(
        &ClassicalSignature::from_bytes(a.classical().as_bytes().to_vec()),
        &PqSignature::new(PqScheme::Dilithium2, b.pq().as_bytes().to_vec()),
        EnvelopeVersion::V3,
    ))
    .unwrap();
    assert!(!verify_composite(message, &mixed, alice.classical_public(), alice.pq_public()));
    assert!(!verify_composite(message, &mixed, bob.classical_public(), bob.pq_public()));
    assert!(verify_composite(message, &a, alice.classical_public(), alice.pq_public()));
}

#[test]
fn test_switch_toggle_roundtrip() {
    let mut cfg = WalletConfig::default();
    let original = cfg.envelope_version;
    cfg.switch_pq();
    assert_ne!(cfg.envelope_version, original);
    assert_eq!(cfg.pq_scheme(), PqScheme::Dilithium3);
    cfg.switch_pq();
    cfg.switch_pq();
    assert_eq!(cfg.envelope_version, original);
}
