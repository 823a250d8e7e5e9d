//! Hybrid signature envelope.
//!
//! Wire format (all lengths unsigned LEB128, minimally encoded):
//!
//! ```text
//! [version:1][classical_len:varint][classical_sig][pq_len:varint][pq_sig]
//! ```
//!
//! The version byte selects the scheme pair and therefore the exact size each
//! field must have. Lengths are still carried explicitly so a verifier that
//! does not know a version can skip over it instead of misparsing.

use std::hint::black_box;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::classical::{self, ClassicalSignature, ClassicalSigner};
use crate::crypto::pq::{PqScheme, PqSignature, PqSigner};
use crate::error::EnvelopeError;

const CLASSICAL_FIELD: &str = "classical signature";
const PQ_FIELD: &str = "pq signature";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EnvelopeVersion {
    /// secp256k1 + Dilithium5
    #[default]
    V1 = 0x01,
    /// secp256k1 + Dilithium3
    V2 = 0x02,
    /// secp256k1 + Dilithium2
    V3 = 0x03,
}

impl EnvelopeVersion {
    pub fn pq_scheme(self) -> PqScheme {
        match self {
            EnvelopeVersion::V1 => PqScheme::Dilithium5,
            EnvelopeVersion::V2 => PqScheme::Dilithium3,
            EnvelopeVersion::V3 => PqScheme::Dilithium2,
        }
    }

    pub fn for_scheme(scheme: PqScheme) -> Self {
        match scheme {
            PqScheme::Dilithium5 => EnvelopeVersion::V1,
            PqScheme::Dilithium3 => EnvelopeVersion::V2,
            PqScheme::Dilithium2 => EnvelopeVersion::V3,
        }
    }

    pub fn classical_len(self) -> usize {
        classical::SIGNATURE_LEN
    }

    pub fn pq_len(self) -> usize {
        self.pq_scheme().signature_len()
    }
}

impl TryFrom<u8> for EnvelopeVersion {
    type Error = EnvelopeError;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        match b {
            0x01 => Ok(EnvelopeVersion::V1),
            0x02 => Ok(EnvelopeVersion::V2),
            0x03 => Ok(EnvelopeVersion::V3),
            other => Err(EnvelopeError::UnknownVersion(other)),
        }
    }
}

impl From<EnvelopeVersion> for u8 {
    fn from(v: EnvelopeVersion) -> Self {
        v as u8
    }
}

/// How `verify_composite` treats the two sub-checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    /// Both checks always run; the caller cannot tell from timing which one failed.
    #[default]
    Exhaustive,
    /// Stop at the first failing check.
    ShortCircuit,
}

/// A classical and a PQ signature over the same message.
///
/// Construction validates field sizes against the version, so every value of
/// this type is well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridEnvelope {
    version: EnvelopeVersion,
    classical: ClassicalSignature,
    pq: PqSignature,
}

impl HybridEnvelope {
    pub fn new(
        version: EnvelopeVersion,
        classical: ClassicalSignature,
        pq: PqSignature,
    ) -> Result<Self, EnvelopeError> {
        check_field(CLASSICAL_FIELD, classical.as_bytes().len(), version.classical_len())?;
        check_field(PQ_FIELD, pq.as_bytes().len(), version.pq_len())?;
        if pq.scheme() != version.pq_scheme() {
            return Err(EnvelopeError::SizeMismatch {
                field: PQ_FIELD,
                expected: version.pq_len(),
                actual: pq.scheme().signature_len(),
            });
        }
        Ok(Self {
            version,
            classical,
            pq,
        })
    }

    pub fn version(&self) -> EnvelopeVersion {
        self.version
    }

    pub fn classical(&self) -> &ClassicalSignature {
        &self.classical
    }

    pub fn pq(&self) -> &PqSignature {
        &self.pq
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.classical, &self.pq, self.version)
    }
}

fn check_field(field: &'static str, actual: usize, expected: usize) -> Result<(), EnvelopeError> {
    if actual == 0 {
        return Err(EnvelopeError::EmptyField(field));
    }
    if actual != expected {
        return Err(EnvelopeError::SizeMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Serialize two sub-signatures under `version`. Pure; does not validate.
pub fn encode(classical: &ClassicalSignature, pq: &PqSignature, version: EnvelopeVersion) -> Vec<u8> {
    let c = classical.as_bytes();
    let p = pq.as_bytes();
    let mut out = Vec::with_capacity(1 + 10 + c.len() + 10 + p.len());
    out.push(version.into());
    write_varint(&mut out, c.len() as u64);
    out.extend_from_slice(c);
    write_varint(&mut out, p.len() as u64);
    out.extend_from_slice(p);
    out
}

/// Parse an envelope. Either the whole buffer is a valid envelope or this fails.
pub fn decode(bytes: &[u8]) -> Result<HybridEnvelope, EnvelopeError> {
    let result = decode_inner(bytes);
    if let Err(e) = &result {
        warn!(error = %e, len = bytes.len(), "rejected envelope");
    }
    result
}

fn decode_inner(bytes: &[u8]) -> Result<HybridEnvelope, EnvelopeError> {
    let (&version, mut rest) = bytes.split_first().ok_or(EnvelopeError::Empty)?;
    let version = EnvelopeVersion::try_from(version)?;

    let classical = take_field(&mut rest, CLASSICAL_FIELD)?;
    let pq = take_field(&mut rest, PQ_FIELD)?;
    if !rest.is_empty() {
        return Err(EnvelopeError::TrailingBytes(rest.len()));
    }

    HybridEnvelope::new(
        version,
        ClassicalSignature::from_bytes(classical.to_vec()),
        PqSignature::new(version.pq_scheme(), pq.to_vec()),
    )
}

fn take_field<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], EnvelopeError> {
    let declared = read_varint(buf, field)?;
    if declared > buf.len() as u64 {
        return Err(EnvelopeError::Overrun {
            field,
            declared,
            remaining: buf.len(),
        });
    }
    let (head, tail) = buf.split_at(declared as usize);
    *buf = tail;
    Ok(head)
}

pub(crate) fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

pub(crate) fn read_varint(buf: &mut &[u8], field: &'static str) -> Result<u64, EnvelopeError> {
    let mut value = 0u64;
    for i in 0..10 {
        let (&byte, tail) = buf
            .split_first()
            .ok_or(EnvelopeError::TruncatedLength(field))?;
        *buf = tail;
        // the tenth byte may only carry bit 63
        if i == 9 && byte > 0x01 {
            return Err(EnvelopeError::LengthOverflow(field));
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(EnvelopeError::NonCanonicalLength(field));
            }
            return Ok(value);
        }
    }
    Err(EnvelopeError::LengthOverflow(field))
}

/// Valid iff the classical **and** the PQ signature verify, using the
/// default [`VerificationMode`].
pub fn verify_composite(
    message: &[u8],
    envelope: &HybridEnvelope,
    classical_public: &[u8],
    pq_public: &[u8],
) -> bool {
    verify_composite_with(
        VerificationMode::default(),
        message,
        envelope,
        classical_public,
        pq_public,
    )
}

pub fn verify_composite_with(
    mode: VerificationMode,
    message: &[u8],
    envelope: &HybridEnvelope,
    classical_public: &[u8],
    pq_public: &[u8],
) -> bool {
    let pq_signer = PqSigner::new(envelope.version.pq_scheme());
    let valid = match mode {
        VerificationMode::ShortCircuit => {
            ClassicalSigner.verify(message, &envelope.classical, classical_public)
                && pq_signer.verify(message, &envelope.pq, pq_public)
        }
        VerificationMode::Exhaustive => {
            let classical_ok = ClassicalSigner.verify(message, &envelope.classical, classical_public);
            let pq_ok = pq_signer.verify(message, &envelope.pq, pq_public);
            black_box(classical_ok) & black_box(pq_ok)
        }
    };
    debug!(version = ?envelope.version, ?mode, valid, "composite verification");
    valid
}

/// One independent verification job for [`verify_batch`].
#[derive(Debug, Clone, Copy)]
pub struct BatchItem<'a> {
    pub message: &'a [u8],
    pub envelope: &'a HybridEnvelope,
    pub classical_public: &'a [u8],
    pub pq_public: &'a [u8],
}

/// Verify many envelopes across scoped worker threads. Output order matches input.
pub fn verify_batch(items: &[BatchItem<'_>], mode: VerificationMode) -> Vec<bool> {
    if items.is_empty() {
        return Vec::new();
    }
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(items.len());
    let chunks: Vec<&[BatchItem<'_>]> = items.chunks(items.len().div_ceil(workers)).collect();

    thread::scope(|s| {
        let handles: Vec<_> = chunks
            .iter()
            .map(|&chunk| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|it| {
                            verify_composite_with(
                                mode,
                                it.message,
                                it.envelope,
                                it.classical_public,
                                it.pq_public,
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(&chunks)
            .flat_map(|(h, chunk)| h.join().unwrap_or_else(|_| vec![false; chunk.len()]))
            .collect()
    })
}
