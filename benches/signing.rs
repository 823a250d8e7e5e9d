use criterion::{black_box, criterion_group, criterion_main, Criterion};
use epqw::crypto::{ClassicalSigner, PqScheme, PqSigner};
use epqw::envelope::{decode, verify_composite, EnvelopeVersion};
use epqw::{KeyStore, TransactionBuilder};
use rand::rngs::OsRng;
use secrecy::Secret;

const MESSAGE: &[u8] = b"Exploring quantum-safe cryptography on Ethereum";

fn bench_classical(c: &mut Criterion) {
    let secret = Secret::new(vec![0x11u8; 32]);
    let sig = ClassicalSigner.sign(MESSAGE, &secret).unwrap();
    let public = epqw::crypto::classical::public_key_for(&secret).unwrap();

    c.bench_function("secp256k1_sign", |b| {
        b.iter(|| ClassicalSigner.sign(black_box(MESSAGE), &secret))
    });
    c.bench_function("secp256k1_verify", |b| {
        b.iter(|| ClassicalSigner.verify(black_box(MESSAGE), &sig, &public))
    });
}

fn bench_pq(c: &mut Criterion) {
    for scheme in [PqScheme::Dilithium2, PqScheme::Dilithium3, PqScheme::Dilithium5] {
        let signer = PqSigner::new(scheme);
        let kp = signer.generate(&mut OsRng).unwrap();
        let sig = signer.sign(MESSAGE, &kp.secret_key).unwrap();

        c.bench_function(&format!("{scheme}_sign"), |b| {
            b.iter(|| signer.sign(black_box(MESSAGE), &kp.secret_key))
        });
        c.bench_function(&format!("{scheme}_verify"), |b| {
            b.iter(|| signer.verify(black_box(MESSAGE), &sig, &kp.public_key))
        });
    }
}

fn bench_hybrid(c: &mut Criterion) {
    let keypair = KeyStore::from_os_rng(PqScheme::Dilithium5).generate().unwrap();
    let builder = TransactionBuilder::new(EnvelopeVersion::V1);
    let envelope = builder.sign_message(MESSAGE, &keypair).unwrap();
    let bytes = envelope.to_bytes();

    c.bench_function("hybrid_sign_v1", |b| {
        b.iter(|| builder.sign_message(black_box(MESSAGE), &keypair))
    });
    c.bench_function("hybrid_decode_verify_v1", |b| {
        b.iter(|| {
            let env = decode(black_box(&bytes)).unwrap();
            verify_composite(MESSAGE, &env, keypair.classical_public(), keypair.pq_public())
        })
    });
}

criterion_group!(benches, bench_classical, bench_pq, bench_hybrid);
criterion_main!(benches);
