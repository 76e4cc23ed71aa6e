use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size of the fixed validator set. Valid validator indices are `0..VALIDATOR_COUNT`.
pub const VALIDATOR_COUNT: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    Evm,
    Chia,
}

impl ChainType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChainType::Evm => "evm",
            ChainType::Chia => "chia",
        }
    }
}

/// Per-period nonce the validators sign over. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub week: u32,
    /// 32 bytes, lowercase hex, no `0x` prefix.
    pub challenge: String,
    pub time_proof: String,
    /// Unix seconds, as a string.
    pub created_at: String,
}

impl Challenge {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs: i64 = self.created_at.parse().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// A validator's signed proof of key custody for one period.
///
/// At most one attestation exists per `(week, validator_index, chain_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub attestation_id: String,
    pub validator_index: u8,
    pub chain_type: ChainType,
    /// Hex signature without `0x`: 65 bytes for EVM, 96 bytes (compressed G2) for Chia.
    pub signature: String,
    pub week: u32,
    pub created_at: String,
}

/// One challenge period together with the attestations submitted against it.
///
/// `challenge_info` is `None` until the period's challenge has been issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekInfo {
    pub week_name: String,
    pub challenge_info: Option<Challenge>,
    pub attestations: Vec<Attestation>,
}

impl WeekInfo {
    pub fn find_attestation(&self, validator_index: u8, chain_type: ChainType) -> Option<&Attestation> {
        self.attestations
            .iter()
            .find(|a| a.validator_index == validator_index && a.chain_type == chain_type)
    }
}

/// Read-only snapshot of the service state, as served by the overview endpoint.
///
/// The address tables are indexed by validator index; an attestation whose
/// index falls outside them cannot be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewSnapshot {
    pub week_infos: Vec<WeekInfo>,
    /// EVM wallet addresses (`0x`-prefixed), one per validator.
    pub eth_addresses: Vec<String>,
    /// Compressed BLS12-381 public keys (48 bytes, hex), one per validator.
    pub xch_pubkeys: Vec<String>,
}
