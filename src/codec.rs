//! The compact `"<validatorIndex>-<hexSignature>"` attestation string used for
//! submission and for matching a validator's attestation within a period.

use crate::models::VALIDATOR_COUNT;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed attestation string: {0}")]
    MalformedAttestation(String),
}

/// Produce `"<validator_index>-<signature>"`, stripping any `0x` prefix from
/// the signature first.
pub fn encode(validator_index: u8, signature: &str) -> String {
    let signature = signature.strip_prefix("0x").unwrap_or(signature);
    format!("{validator_index}-{signature}")
}

/// Split an encoded attestation on its first `-`.
///
/// Only the first separator is significant; hex signatures never contain `-`,
/// so anything after it is returned untouched. The prefix must parse as a
/// validator index in `0..VALIDATOR_COUNT`.
pub fn decode(raw: &str) -> Result<(u8, &str), CodecError> {
    let (prefix, signature) = raw
        .split_once('-')
        .ok_or_else(|| CodecError::MalformedAttestation(format!("no '-' separator in {raw:?}")))?;
    let validator_index: u8 = prefix.parse().map_err(|_| {
        CodecError::MalformedAttestation(format!("validator index prefix {prefix:?} is not an integer"))
    })?;
    if usize::from(validator_index) >= VALIDATOR_COUNT {
        return Err(CodecError::MalformedAttestation(format!(
            "validator index {validator_index} outside 0..{VALIDATOR_COUNT}"
        )));
    }
    Ok((validator_index, signature))
}
