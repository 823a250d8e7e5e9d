//! epqw
//!
//! Hybrid classical + post-quantum Ethereum wallet signing core.
//! This crate provides:
//! - secp256k1 and Dilithium key material behind one `KeyStore`
//! - Versioned hybrid signature envelopes that verify only when both halves do
//! - Canonical transaction building and concurrent hybrid signing
//! - Password-encrypted wallet files
//! - Pluggable submission and proof-engine collaborators

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keyfile;
pub mod keys;
pub mod logging;
pub mod proof;
pub mod submit;
pub mod transaction;

pub use config::WalletConfig;
pub use envelope::{decode, encode, verify_composite, EnvelopeVersion, HybridEnvelope, VerificationMode};
pub use error::{EnvelopeError, SignerKind, WalletError, WalletResult};
pub use keys::{Address, KeyPair, KeyStore, PublicKeys};
pub use submit::{DryRunSubmitter, SubmissionError, Submitter, TransactionReceipt};
pub use transaction::{ChainParams, SignedTransaction, TransactionBuilder, UnsignedTransaction};
