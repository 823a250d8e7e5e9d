use std::time::Instant;

use anyhow::{Context, Result};
use epqw::config::WalletConfig;
use epqw::crypto::{ClassicalSigner, PqSigner};
use epqw::envelope::verify_composite_with;
use epqw::logging;
use epqw::proof::{transaction_commitment, HashCommitmentEngine, ProofEngine};
use epqw::{Address, DryRunSubmitter, KeyStore, TransactionBuilder};

const DEMO_RECIPIENT: &str = "0x742d35Cc6634C0532925a3b8D7D7e4e6403a1B04";
const DEMO_VALUE_WEI: i128 = 1_000_000_000_000_000;
const DEMO_MESSAGE: &[u8] = b"Exploring quantum-safe cryptography on Ethereum";
const BENCH_ROUNDS: u32 = 20;

fn main() -> Result<()> {
    logging::init();
    let config = WalletConfig::from_env().context("failed to load wallet config")?;
    let builder = TransactionBuilder::from_config(&config);

    println!("=== Creating hybrid wallet ({}) ===", config.pq_scheme());
    let mut store = KeyStore::from_os_rng(config.pq_scheme());
    let keypair = store.generate().context("key generation failed")?;
    let public = keypair.public_keys();
    println!("Address          : {}", keypair.address());
    println!("Classical pk fp  : {}…", public.classical_fingerprint());
    println!("PQ pk fp         : {}… ({} bytes)", public.pq_fingerprint(), public.pq.len());

    println!("\n=== Building transaction ===");
    let recipient: Address = DEMO_RECIPIENT.parse()?;
    let unsigned = builder.build_unsigned(
        recipient.as_bytes(),
        DEMO_VALUE_WEI,
        0,
        config.chain.params(),
    )?;
    println!("To               : {}", unsigned.recipient());
    println!("Value            : {} wei", unsigned.value());
    println!("Tx hash          : 0x{}", hex::encode(unsigned.hash()));

    let signed = builder.sign(&unsigned, &keypair)?;
    let ok = signed.verify(&public, config.verification);
    println!(
        "Envelope         : v{} {} bytes, verify {}",
        u8::from(signed.envelope().version()),
        signed.envelope().to_bytes().len(),
        if ok { "OK" } else { "FAIL" }
    );
    let receipt = signed.submit(&DryRunSubmitter)?;
    println!("✅ Broadcast (dry run) id: {}", receipt.transaction_id);

    println!("\n=== Hybrid message signature ===");
    let envelope = builder.sign_message(DEMO_MESSAGE, &keypair)?;
    println!("Classical sig    : {}…", &hex::encode(envelope.classical().as_bytes())[..32]);
    println!("PQ sig           : {}…", &hex::encode(envelope.pq().as_bytes())[..32]);
    let valid = verify_composite_with(
        config.verification,
        DEMO_MESSAGE,
        &envelope,
        &public.classical,
        &public.pq,
    );
    println!("Verify           : {}", if valid { "OK" } else { "FAIL" });

    println!("\n=== Commitment proof ===");
    let randomness = store.fresh_randomness()?;
    let commitment = transaction_commitment(&unsigned.hash(), &randomness);
    let engine = HashCommitmentEngine;
    let proof = engine.prove(&commitment, &randomness[..])?;
    println!("Commitment       : 0x{}", hex::encode(commitment));
    println!("Root             : 0x{}", hex::encode(proof.commitment_root));
    println!("Valid            : {}", proof.valid);

    println!("\n=== Signing benchmark ({BENCH_ROUNDS} rounds) ===");
    bench("hybrid sign", || {
        let _ = builder.sign_message(DEMO_MESSAGE, &keypair);
    });
    let pq = PqSigner::new(config.pq_scheme());
    let classical = ClassicalSigner;
    bench("verify classical", || {
        let _ = classical.verify(DEMO_MESSAGE, envelope.classical(), &public.classical);
    });
    bench("verify pq", || {
        let _ = pq.verify(DEMO_MESSAGE, envelope.pq(), &public.pq);
    });

    Ok(())
}

fn bench(label: &str, mut f: impl FnMut()) {
    let start = Instant::now();
    for _ in 0..BENCH_ROUNDS {
        f();
    }
    let per_op = start.elapsed() / BENCH_ROUNDS;
    println!("{label:17}: {:.3} ms/op", per_op.as_secs_f64() * 1e3);
}
