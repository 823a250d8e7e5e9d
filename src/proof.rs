//! Proof-engine collaborator.
//!
//! The wallet only derives the commitment (transaction hash plus secret
//! randomness) and hands it over as opaque bytes; what the engine proves and
//! how is its own business.

use crate::crypto::hash::{keccak256, sha256};
use crate::error::{WalletError, WalletResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOutput {
    pub proof: Vec<u8>,
    pub valid: bool,
    pub commitment_root: [u8; 32],
}

pub trait ProofEngine {
    fn prove(&self, commitment: &[u8], witness: &[u8]) -> WalletResult<ProofOutput>;
}

/// `keccak256(tx_hash || randomness)`
pub fn transaction_commitment(tx_hash: &[u8; 32], randomness: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(tx_hash);
    buf[32..].copy_from_slice(randomness);
    keccak256(&buf)
}

/// Two-leaf SHA-256 Merkle commitment over the commitment and the witness.
///
/// Binding but not zero-knowledge: the proof is the witness leaf hash, which
/// lets anyone holding the commitment recompute the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashCommitmentEngine;

impl HashCommitmentEngine {
    fn node(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut buf = [0u8; 65];
        buf[0] = 0x01;
        buf[1..33].copy_from_slice(left);
        buf[33..].copy_from_slice(right);
        sha256(&buf)
    }

    fn leaf(data: &[u8]) -> [u8; 32] {
        let mut buf = Vec::with_capacity(1 + data.len());
        buf.push(0x00);
        buf.extend_from_slice(data);
        sha256(&buf)
    }

    pub fn verify(&self, commitment: &[u8], output: &ProofOutput) -> bool {
        let Ok(sibling) = <[u8; 32]>::try_from(output.proof.as_slice()) else {
            return false;
        };
        Self::node(&Self::leaf(commitment), &sibling) == output.commitment_root
    }
}

impl ProofEngine for HashCommitmentEngine {
    fn prove(&self, commitment: &[u8], witness: &[u8]) -> WalletResult<ProofOutput> {
        if commitment.is_empty() {
            return Err(WalletError::Proof("empty commitment".into()));
        }
        let witness_leaf = Self::leaf(witness);
        let commitment_root = Self::node(&Self::leaf(commitment), &witness_leaf);
        let mut output = ProofOutput {
            proof: witness_leaf.to_vec(),
            valid: false,
            commitment_root,
        };
        output.valid = self.verify(commitment, &output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_verifies_for_its_commitment_only() {
        let commitment = transaction_commitment(&[1u8; 32], &[2u8; 32]);
        let out = HashCommitmentEngine.prove(&commitment, b"secret witness").unwrap();
        assert!(out.valid);
        assert!(HashCommitmentEngine.verify(&commitment, &out));

        let other = transaction_commitment(&[1u8; 32], &[3u8; 32]);
        assert!(!HashCommitmentEngine.verify(&other, &out));
    }

    #[test]
    fn commitment_depends_on_randomness() {
        let a = transaction_commitment(&[9u8; 32], &[0u8; 32]);
        let b = transaction_commitment(&[9u8; 32], &[1u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_commitment_is_rejected() {
        assert!(matches!(
            HashCommitmentEngine.prove(&[], b"w"),
            Err(WalletError::Proof(_))
        ));
    }
}
