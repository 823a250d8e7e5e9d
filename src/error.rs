use std::fmt;

use thiserror::Error;

use crate::submit::SubmissionError;

/// Which half of a hybrid signature an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    Classical,
    PostQuantum,
}

impl fmt::Display for SignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerKind::Classical => f.write_str("classical"),
            SignerKind::PostQuantum => f.write_str("post-quantum"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("{signer} signer failed: {reason}")]
    Signing { signer: SignerKind, reason: String },

    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("wallet file: {0}")]
    Keyfile(String),

    #[error("config: {0}")]
    Config(String),

    #[error("proof engine: {0}")]
    Proof(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Structural violations found while decoding an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("empty buffer")]
    Empty,

    #[error("unknown version 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("truncated length prefix for {0}")]
    TruncatedLength(&'static str),

    #[error("length prefix for {0} overflows 64 bits")]
    LengthOverflow(&'static str),

    #[error("non-minimal length prefix for {0}")]
    NonCanonicalLength(&'static str),

    #[error("{field} declares {declared} bytes but only {remaining} remain")]
    Overrun {
        field: &'static str,
        declared: u64,
        remaining: usize,
    },

    #[error("{0} is empty")]
    EmptyField(&'static str),

    #[error("{field} must be {expected} bytes, got {actual}")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),
}
