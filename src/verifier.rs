//! Verification orchestrator: every period x validator x chain, one report.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chia::{ChiaVerifier, SetupError};
use crate::codec;
use crate::evm;
use crate::models::{Challenge, ChainType, OverviewSnapshot, WeekInfo, VALIDATOR_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    /// The attestation string could not be decoded (bad or out-of-range index).
    Malformed,
    /// Byte lengths, hex, group membership, or the address table are wrong.
    Format,
    /// A well-formed signature that does not validate.
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub week: u32,
    pub validator_index: u8,
    pub chain_type: ChainType,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Sorted by week, then validator index, then EVM before Chia.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    pub fn is_fully_verified(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Verifies a full [`OverviewSnapshot`] against both chains' schemes.
///
/// One logical run at a time: callers must not issue concurrent
/// [`AttestationVerifier::verify_all`] calls on the same instance. The
/// verifier keeps no state across runs besides the one-shot pairing setup,
/// so repeated runs over the same snapshot produce identical reports.
#[derive(Debug, Default)]
pub struct AttestationVerifier {
    chia: ChiaVerifier,
}

impl AttestationVerifier {
    pub fn new() -> Self {
        Self {
            chia: ChiaVerifier::new(),
        }
    }

    /// Verify every attestation in the snapshot and collect the failures.
    ///
    /// Periods without a challenge are skipped entirely; an absent
    /// attestation is not a failure. All EVM checks run first, then the
    /// pairing setup (only if any Chia attestation needs it), then the Chia
    /// checks. A [`SetupError`] aborts the run with no partial report.
    pub async fn verify_all(
        &self,
        snapshot: &OverviewSnapshot,
    ) -> Result<VerificationReport, SetupError> {
        let mut periods: Vec<(&Challenge, &WeekInfo)> = snapshot
            .week_infos
            .iter()
            .filter_map(|info| info.challenge_info.as_ref().map(|c| (c, info)))
            .collect();
        periods.sort_by_key(|(challenge, _)| challenge.week);

        let skipped = snapshot.week_infos.len() - periods.len();
        if skipped > 0 {
            debug!(skipped, "periods without a challenge are not verified");
        }

        let mut failures = Vec::new();

        info!(periods = periods.len(), "verifying evm attestations");
        for &(challenge, info) in &periods {
            check_period_chain(
                &self.chia,
                challenge,
                info,
                ChainType::Evm,
                &snapshot.eth_addresses,
                &mut failures,
            );
        }

        let needs_chia = periods.iter().any(|(_, info)| {
            info.attestations
                .iter()
                .any(|a| a.chain_type == ChainType::Chia)
        });
        if needs_chia {
            self.chia.ensure_ready().await?;
            info!(periods = periods.len(), "verifying chia attestations");
            for &(challenge, info) in &periods {
                check_period_chain(
                    &self.chia,
                    challenge,
                    info,
                    ChainType::Chia,
                    &snapshot.xch_pubkeys,
                    &mut failures,
                );
            }
        }

        failures.sort_by_key(|f| (f.week, f.validator_index, f.chain_type));
        info!(failures = failures.len(), "verification complete");
        Ok(VerificationReport { failures })
    }
}

fn check_period_chain(
    chia: &ChiaVerifier,
    challenge: &Challenge,
    info: &WeekInfo,
    chain_type: ChainType,
    key_table: &[String],
    failures: &mut Vec<VerificationFailure>,
) {
    let week = challenge.week;

    // Attestations the per-index loop below can never reach: their encoded
    // form does not decode to a valid validator index.
    for attestation in info.attestations.iter().filter(|a| a.chain_type == chain_type) {
        let encoded = codec::encode(attestation.validator_index, &attestation.signature);
        if let Err(e) = codec::decode(&encoded) {
            warn!(week, validator_index = attestation.validator_index, %e, "malformed attestation");
            failures.push(VerificationFailure {
                week,
                validator_index: attestation.validator_index,
                chain_type,
                reason: FailureReason::Malformed,
            });
        }
    }

    for validator_index in 0..VALIDATOR_COUNT as u8 {
        let Some(attestation) = info.find_attestation(validator_index, chain_type) else {
            continue;
        };
        let Some(expected_key) = key_table
            .get(usize::from(validator_index))
            .filter(|key| !key.is_empty())
        else {
            warn!(week, validator_index, chain = chain_type.as_str(), "no key on file, cannot verify");
            failures.push(VerificationFailure {
                week,
                validator_index,
                chain_type,
                reason: FailureReason::Format,
            });
            continue;
        };

        let outcome = match chain_type {
            ChainType::Evm => evm::verify(
                &challenge.challenge,
                validator_index,
                &attestation.signature,
                expected_key,
            )
            .map_err(|e| e.to_string()),
            ChainType::Chia => chia
                .verify(
                    &challenge.challenge,
                    validator_index,
                    &attestation.signature,
                    expected_key,
                )
                .map_err(|e| e.to_string()),
        };

        match outcome {
            Ok(true) => {}
            Ok(false) => {
                warn!(week, validator_index, chain = chain_type.as_str(), "signature mismatch");
                failures.push(VerificationFailure {
                    week,
                    validator_index,
                    chain_type,
                    reason: FailureReason::Mismatch,
                });
            }
            Err(e) => {
                warn!(week, validator_index, chain = chain_type.as_str(), error = %e, "unverifiable attestation");
                failures.push(VerificationFailure {
                    week,
                    validator_index,
                    chain_type,
                    reason: FailureReason::Format,
                });
            }
        }
    }
}
