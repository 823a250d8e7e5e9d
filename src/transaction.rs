//! Transaction construction and hybrid signing.

use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::WalletConfig;
use crate::crypto::classical::ClassicalSigner;
use crate::crypto::hash::keccak256;
use crate::crypto::pq::PqSigner;
use crate::envelope::{
    self, read_varint, verify_composite_with, write_varint, EnvelopeVersion, HybridEnvelope,
    VerificationMode,
};
use crate::error::{SignerKind, WalletError, WalletResult};
use crate::keys::{Address, KeyPair, PublicKeys, ADDRESS_LEN};
use crate::submit::{Submitter, TransactionReceipt};

/// Domain tag that starts every canonical transaction encoding.
pub const TX_DOMAIN: &[u8; 8] = b"EPQW-TX\x01";

const CANONICAL_LEN: usize = TX_DOMAIN.len() + 8 + 8 + 16 + 8 + ADDRESS_LEN + 16;

/// Sepolia testnet.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

fn take<const N: usize>(bytes: &[u8]) -> WalletResult<(&[u8; N], &[u8])> {
    bytes
        .split_first_chunk::<N>()
        .ok_or_else(|| WalletError::MalformedTransaction("truncated canonical transaction".into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain_id: u64,
    pub gas_price_wei: u128,
    pub gas_limit: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            gas_price_wei: 20_000_000_000,
            gas_limit: 21_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    recipient: Address,
    value: u128,
    nonce: u64,
    chain: ChainParams,
}

impl UnsignedTransaction {
    pub fn recipient(&self) -> Address {
        self.recipient
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn chain(&self) -> ChainParams {
        self.chain
    }

    /// The exact bytes both signers sign.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CANONICAL_LEN);
        out.extend_from_slice(TX_DOMAIN);
        out.extend_from_slice(&self.chain.chain_id.to_be_bytes());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.chain.gas_price_wei.to_be_bytes());
        out.extend_from_slice(&self.chain.gas_limit.to_be_bytes());
        out.extend_from_slice(self.recipient.as_bytes());
        out.extend_from_slice(&self.value.to_be_bytes());
        out
    }

    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.canonical_bytes())
    }

    pub fn from_canonical(bytes: &[u8]) -> WalletResult<Self> {
        if bytes.len() != CANONICAL_LEN {
            return Err(WalletError::MalformedTransaction(format!(
                "expected {CANONICAL_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let (domain, rest) = take::<8>(bytes)?;
        if domain != TX_DOMAIN {
            return Err(WalletError::MalformedTransaction("unknown domain tag".into()));
        }
        let (chain_id, rest) = take::<8>(rest)?;
        let (nonce, rest) = take::<8>(rest)?;
        let (gas_price, rest) = take::<16>(rest)?;
        let (gas_limit, rest) = take::<8>(rest)?;
        let (recipient, rest) = take::<ADDRESS_LEN>(rest)?;
        let (value, _) = take::<16>(rest)?;
        Ok(Self {
            recipient: Address::from_slice(recipient)?,
            value: u128::from_be_bytes(*value),
            nonce: u64::from_be_bytes(*nonce),
            chain: ChainParams {
                chain_id: u64::from_be_bytes(*chain_id),
                gas_price_wei: u128::from_be_bytes(*gas_price),
                gas_limit: u64::from_be_bytes(*gas_limit),
            },
        })
    }
}

/// A transaction together with a complete hybrid envelope over its
/// canonical encoding. Only [`TransactionBuilder::sign`] and
/// [`SignedTransaction::from_bytes`] create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    unsigned: UnsignedTransaction,
    envelope: HybridEnvelope,
}

impl SignedTransaction {
    pub fn unsigned(&self) -> &UnsignedTransaction {
        &self.unsigned
    }

    pub fn envelope(&self) -> &HybridEnvelope {
        &self.envelope
    }

    /// `[unsigned_len:varint][canonical unsigned tx][envelope]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let unsigned = self.unsigned.canonical_bytes();
        let envelope = self.envelope.to_bytes();
        let mut out = Vec::with_capacity(2 + unsigned.len() + envelope.len());
        write_varint(&mut out, unsigned.len() as u64);
        out.extend_from_slice(&unsigned);
        out.extend_from_slice(&envelope);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        let mut rest = bytes;
        let declared = read_varint(&mut rest, "unsigned transaction")?;
        if declared > rest.len() as u64 {
            return Err(WalletError::MalformedTransaction(format!(
                "declares {declared} bytes but only {} remain",
                rest.len()
            )));
        }
        let (unsigned, envelope) = rest.split_at(declared as usize);
        Ok(Self {
            unsigned: UnsignedTransaction::from_canonical(unsigned)?,
            envelope: envelope::decode(envelope)?,
        })
    }

    /// Transaction id: Keccak-256 over [`SignedTransaction::to_bytes`].
    pub fn hash(&self) -> [u8; 32] {
        keccak256(&self.to_bytes())
    }

    pub fn verify(&self, keys: &PublicKeys, mode: VerificationMode) -> bool {
        if keys.pq_scheme != self.envelope.version().pq_scheme() {
            return false;
        }
        verify_composite_with(
            mode,
            &self.unsigned.canonical_bytes(),
            &self.envelope,
            &keys.classical,
            &keys.pq,
        )
    }

    pub fn submit(&self, submitter: &dyn Submitter) -> WalletResult<TransactionReceipt> {
        Ok(submitter.submit(&self.to_bytes())?)
    }
}

/// Builds canonical transactions and signs them with both schemes.
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
    version: EnvelopeVersion,
    max_value_wei: u128,
    classical: ClassicalSigner,
    pq: PqSigner,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new(EnvelopeVersion::default())
    }
}

impl TransactionBuilder {
    pub fn new(version: EnvelopeVersion) -> Self {
        Self {
            version,
            max_value_wei: u128::MAX,
            classical: ClassicalSigner,
            pq: PqSigner::new(version.pq_scheme()),
        }
    }

    pub fn from_config(config: &WalletConfig) -> Self {
        let mut builder = Self::new(config.envelope_version);
        if let Some(cap) = config.chain.max_value_wei {
            builder = builder.with_max_value(cap);
        }
        builder
    }

    /// Upper bound for `value`, for chains whose value field is narrower than 128 bits.
    pub fn with_max_value(mut self, max_value_wei: u128) -> Self {
        self.max_value_wei = max_value_wei;
        self
    }

    pub fn version(&self) -> EnvelopeVersion {
        self.version
    }

    /// `value` is signed so that a negative amount coming from untrusted
    /// input is reported instead of wrapping.
    pub fn build_unsigned(
        &self,
        recipient: &[u8],
        value: i128,
        nonce: u64,
        chain: ChainParams,
    ) -> WalletResult<UnsignedTransaction> {
        let recipient = Address::from_slice(recipient)?;
        let value = u128::try_from(value)
            .map_err(|_| WalletError::InvalidValue(format!("negative amount {value}")))?;
        if value > self.max_value_wei {
            return Err(WalletError::InvalidValue(format!(
                "{value} wei exceeds the chain limit of {}",
                self.max_value_wei
            )));
        }
        Ok(UnsignedTransaction {
            recipient,
            value,
            nonce,
            chain,
        })
    }

    /// Sign arbitrary bytes with both schemes in parallel and wrap the pair
    /// in an envelope. Fails as a whole if either signer fails.
    pub fn sign_message(&self, message: &[u8], keypair: &KeyPair) -> WalletResult<HybridEnvelope> {
        let (classical, pq) = thread::scope(|s| {
            let pq_worker = s.spawn(|| self.pq.sign(message, keypair.pq_secret()));
            let classical = self.classical.sign(message, keypair.classical_secret());
            let pq = pq_worker.join().unwrap_or_else(|_| {
                Err(WalletError::Signing {
                    signer: SignerKind::PostQuantum,
                    reason: "signing worker panicked".into(),
                })
            });
            (classical, pq)
        });
        let classical = classical?;
        let pq = pq?;
        Ok(HybridEnvelope::new(self.version, classical, pq)?)
    }

    pub fn sign(&self, tx: &UnsignedTransaction, keypair: &KeyPair) -> WalletResult<SignedTransaction> {
        let envelope = self.sign_message(&tx.canonical_bytes(), keypair)?;
        debug!(
            tx_hash = %hex::encode(tx.hash()),
            version = ?self.version,
            "signed transaction"
        );
        info!(to = %tx.recipient, value = tx.value, nonce = tx.nonce, "transaction ready for submission");
        Ok(SignedTransaction {
            unsigned: tx.clone(),
            envelope,
        })
    }
}
