//! EVM-side attestation verification.
//!
//! A validator proves custody of their hot wallet key by signing the EIP-712
//! structure below over the period's challenge. Verification recomputes the
//! typed-data digest and recovers the signer, so it needs nothing but the
//! snapshot itself: no RPC, no wallet.

use std::str::FromStr;

use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct};
use thiserror::Error;

sol! {
    /// Structured data signed by a validator's hot wallet.
    struct AttestationMessage {
        bytes32 challenge;
        uint8 validatorIndex;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvmVerifyError {
    #[error("invalid challenge: {0}")]
    InvalidChallenge(String),
    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),
    #[error("invalid expected address: {0}")]
    InvalidAddress(String),
}

/// The fixed signing domain. No chain id: an attestation is valid regardless
/// of which EVM chain the wallet happens to be connected to.
pub fn attestation_domain() -> Eip712Domain {
    eip712_domain! {
        name: "warp.green Validator Attestations",
        version: "1",
    }
}

/// EIP-712 signing hash for `(challenge, validator_index)`.
///
/// Signers and the verifier below must build this identically; it is the
/// single definition of the digest for both paths.
pub fn signing_hash(challenge: B256, validator_index: u8) -> B256 {
    let message = AttestationMessage {
        challenge,
        validatorIndex: validator_index,
    };
    message.eip712_signing_hash(&attestation_domain())
}

/// Parse the challenge as stored by the service: 32 bytes of hex, with or
/// without a `0x` prefix.
pub fn parse_challenge(challenge_hex: &str) -> Result<B256, EvmVerifyError> {
    let stripped = challenge_hex.strip_prefix("0x").unwrap_or(challenge_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| EvmVerifyError::InvalidChallenge(format!("not hex: {e}")))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| EvmVerifyError::InvalidChallenge(format!("{} bytes, expected 32", stripped.len() / 2)))?;
    Ok(B256::from(bytes))
}

/// Check that `signature_hex` is a signature over `(challenge, validator_index)`
/// by the key controlling `expected_address`.
///
/// A well-formed signature that recovers to a different address (or fails to
/// recover at all) is `Ok(false)`; only malformed inputs are errors.
pub fn verify(
    challenge_hex: &str,
    validator_index: u8,
    signature_hex: &str,
    expected_address: &str,
) -> Result<bool, EvmVerifyError> {
    let challenge = parse_challenge(challenge_hex)?;
    let expected = Address::from_str(expected_address)
        .map_err(|e| EvmVerifyError::InvalidAddress(format!("{expected_address:?}: {e}")))?;
    let signature = parse_signature(signature_hex)?;

    let digest = signing_hash(challenge, validator_index);
    match signature.recover_address_from_prehash(&digest) {
        Ok(recovered) => Ok(recovered == expected),
        Err(_) => Ok(false),
    }
}

/// Parse a 65-byte `r || s || v` signature; `v` may be 0/1 or 27/28.
fn parse_signature(signature_hex: &str) -> Result<PrimitiveSignature, EvmVerifyError> {
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| EvmVerifyError::InvalidSignatureFormat(format!("not hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(EvmVerifyError::InvalidSignatureFormat(format!(
            "{} bytes, expected 65",
            bytes.len()
        )));
    }
    let y_parity = match bytes[64] {
        0 | 27 => false,
        1 | 28 => true,
        v => {
            return Err(EvmVerifyError::InvalidSignatureFormat(format!(
                "recovery byte {v} is not 0/1/27/28"
            )))
        }
    };
    let r = U256::from_be_slice(&bytes[..32]);
    let s = U256::from_be_slice(&bytes[32..64]);
    Ok(PrimitiveSignature::new(r, s, y_parity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    fn challenge_hex() -> String {
        "ab".repeat(32)
    }

    fn sign(signer: &PrivateKeySigner, challenge_hex: &str, validator_index: u8) -> String {
        let challenge = parse_challenge(challenge_hex).expect("test challenge");
        let digest = signing_hash(challenge, validator_index);
        let signature = signer.sign_hash_sync(&digest).expect("sign");
        hex::encode(signature.as_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let signer = PrivateKeySigner::random();
        let challenge = challenge_hex();
        let signature = sign(&signer, &challenge, 2);
        let verified = verify(&challenge, 2, &signature, &signer.address().to_string()).expect("verify");
        assert!(verified);
    }

    #[test]
    fn tampered_signature_byte_fails_verification() {
        let signer = PrivateKeySigner::random();
        let challenge = challenge_hex();
        let signature = sign(&signer, &challenge, 2);

        // Flip the first byte of r.
        let mut bytes = hex::decode(&signature).expect("hex");
        bytes[0] ^= 0xff;
        let tampered = hex::encode(bytes);

        let verified = verify(&challenge, 2, &tampered, &signer.address().to_string()).expect("verify");
        assert!(!verified);
    }

    #[test]
    fn different_validator_index_fails_verification() {
        let signer = PrivateKeySigner::random();
        let challenge = challenge_hex();
        let signature = sign(&signer, &challenge, 2);
        let verified = verify(&challenge, 3, &signature, &signer.address().to_string()).expect("verify");
        assert!(!verified);
    }

    #[test]
    fn wrong_address_fails_verification() {
        let signer = PrivateKeySigner::random();
        let other = PrivateKeySigner::random();
        let challenge = challenge_hex();
        let signature = sign(&signer, &challenge, 2);
        let verified = verify(&challenge, 2, &signature, &other.address().to_string()).expect("verify");
        assert!(!verified);
    }

    #[test]
    fn truncated_signature_is_a_format_error() {
        let challenge = challenge_hex();
        let err = verify(&challenge, 2, &"ab".repeat(64), &Address::ZERO.to_string()).unwrap_err();
        assert!(matches!(err, EvmVerifyError::InvalidSignatureFormat(_)));
    }

    #[test]
    fn short_challenge_is_rejected() {
        let err = verify(&"ab".repeat(16), 2, &"ab".repeat(65), &Address::ZERO.to_string()).unwrap_err();
        assert!(matches!(err, EvmVerifyError::InvalidChallenge(_)));
    }

    #[test]
    fn garbage_address_is_rejected() {
        let err = verify(&challenge_hex(), 2, &"ab".repeat(65), "not-an-address").unwrap_err();
        assert!(matches!(err, EvmVerifyError::InvalidAddress(_)));
    }

    #[test]
    fn challenge_accepts_optional_0x_prefix() {
        let bare = parse_challenge(&challenge_hex()).expect("bare");
        let prefixed = parse_challenge(&format!("0x{}", challenge_hex())).expect("prefixed");
        assert_eq!(bare, prefixed);
    }
}
