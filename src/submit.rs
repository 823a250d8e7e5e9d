//! Hand-off to whatever puts signed transactions on the network.
//!
//! This crate never broadcasts by itself. Retries and timeouts belong to the
//! caller; errors from the collaborator are forwarded untouched.

use thiserror::Error;
use tracing::info;

use crate::crypto::hash::keccak256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Identifier assigned by the submitting side, hex with `0x` prefix.
    pub transaction_id: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("nonce conflict")]
    NonceConflict,

    #[error("rejected by node: {0}")]
    Rejected(String),

    #[error("transport: {0}")]
    Transport(String),
}

pub trait Submitter {
    fn submit(&self, signed_tx: &[u8]) -> Result<TransactionReceipt, SubmissionError>;
}

/// Accepts everything and reports `keccak256(bytes)` as the transaction id.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSubmitter;

impl Submitter for DryRunSubmitter {
    fn submit(&self, signed_tx: &[u8]) -> Result<TransactionReceipt, SubmissionError> {
        let transaction_id = format!("0x{}", hex::encode(keccak256(signed_tx)));
        info!(%transaction_id, bytes = signed_tx.len(), "dry-run submission");
        Ok(TransactionReceipt { transaction_id })
    }
}
