//! Crypto module
//!
//! The two signature families a hybrid envelope combines, plus the hashes
//! Ethereum addressing relies on.

pub mod classical;
pub mod hash;
pub mod pq;

pub use classical::{ClassicalSignature, ClassicalSigner};
pub use hash::{fingerprint, keccak256, sha256};
pub use pq::{PqKeyPair, PqScheme, PqSignature, PqSigner};
