//! Wallet configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) gives a
//! working Sepolia setup with Dilithium5 envelopes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::pq::PqScheme;
use crate::envelope::{EnvelopeVersion, VerificationMode};
use crate::error::{WalletError, WalletResult};
use crate::transaction::{ChainParams, DEFAULT_CHAIN_ID};

/// Environment variable naming the config file the binaries load.
pub const CONFIG_ENV: &str = "EPQW_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub envelope_version: EnvelopeVersion,
    pub verification: VerificationMode,
    pub chain: ChainConfig,
    pub kdf: KdfParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(with = "wei")]
    pub gas_price_wei: u128,
    pub gas_limit: u64,
    /// Largest transferable amount; `None` means the full 128-bit range.
    #[serde(with = "wei::option", skip_serializing_if = "Option::is_none")]
    pub max_value_wei: Option<u128>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let params = ChainParams::default();
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            gas_price_wei: params.gas_price_wei,
            gas_limit: params.gas_limit,
            max_value_wei: None,
        }
    }
}

impl ChainConfig {
    pub fn params(&self) -> ChainParams {
        ChainParams {
            chain_id: self.chain_id,
            gas_price_wei: self.gas_price_wei,
            gas_limit: self.gas_limit,
        }
    }
}

/// Wei amounts in TOML.
///
/// TOML integers are 64-bit signed, so amounts are written as integers when
/// they fit and as decimal strings otherwise; both forms are accepted back.
mod wei {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(*value) {
            Ok(v) => s.serialize_i64(v),
            Err(_) => s.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        d.deserialize_any(WeiVisitor)
    }

    struct WeiVisitor;

    impl<'de> Visitor<'de> for WeiVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative wei amount as an integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
            Ok(u128::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
            u128::try_from(v).map_err(|_| E::custom(format!("negative wei amount {v}")))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::custom(format!("invalid wei amount {v:?}")))
        }
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<u128>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => super::serialize(v, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u128>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapped(#[serde(with = "super")] u128);

            Ok(Option::<Wrapped>::deserialize(d)?.map(|Wrapped(v)| v))
        }
    }
}

/// Argon2id cost parameters for wallet files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 64 MiB, 3 passes
        Self {
            m_cost_kib: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl WalletConfig {
    pub fn from_toml_str(s: &str) -> WalletResult<Self> {
        toml::from_str(s).map_err(|e| WalletError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> WalletResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Load from `$EPQW_CONFIG` when set, defaults otherwise.
    pub fn from_env() -> WalletResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn pq_scheme(&self) -> PqScheme {
        self.envelope_version.pq_scheme()
    }

    /// Fall back to the next smaller Dilithium parameter set, wrapping
    /// around to Dilithium5 after Dilithium2.
    pub fn switch_pq(&mut self) {
        self.envelope_version = match self.envelope_version {
            EnvelopeVersion::V1 => EnvelopeVersion::V2,
            EnvelopeVersion::V2 => EnvelopeVersion::V3,
            EnvelopeVersion::V3 => EnvelopeVersion::V1,
        };
    }
}
