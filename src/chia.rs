//! Chia-side attestation verification.
//!
//! A validator proves custody of their cold key by signing a fixed English
//! message containing the period's challenge. The message is hashed the way
//! the chain hashes serialized programs (a CLVM tree hash, not a plain
//! SHA-256 of the bytes) and signed under the augmented BLS12-381 scheme,
//! which mixes the public key into the message domain so aggregate
//! signatures cannot be forged with rogue keys.

use blst::min_pk::{PublicKey, Signature};
use blst::BLST_ERROR;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Domain separation tag of the augmented min-pk scheme (48-byte public keys,
/// 96-byte signatures), as used by the chain.
pub const AUG_SCHEME_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_AUG_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChiaVerifyError {
    #[error("invalid group element: {0}")]
    InvalidGroupElement(String),
}

/// Pairing-backend initialization failure. Fatal for the whole verification
/// run; the documented remediation is restarting the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pairing backend setup failed: {0}")]
pub struct SetupError(pub String);

/// The literal string a validator signs. The challenge is embedded as the
/// unprefixed hex it is stored as, not as raw bytes.
pub fn attestation_message(validator_index: u8, challenge: &str) -> String {
    format!(
        "Validator #{validator_index} attests having access to their cold private XCH key \
         by signing this message with the following challenge: {challenge}"
    )
}

/// A minimal S-expression in the chain's serialization convention.
///
/// Only what the tree hash needs: atoms and pairs. The attestation message is
/// a single atom, but the hash is defined over the whole shape so it matches
/// the chain for any program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    Atom(Vec<u8>),
    Pair(Box<SExp>, Box<SExp>),
}

impl SExp {
    /// Canonical tree hash: `sha256(0x01 || atom)` for leaves,
    /// `sha256(0x02 || left || right)` for pairs.
    pub fn tree_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        match self {
            SExp::Atom(atom) => {
                hasher.update([1u8]);
                hasher.update(atom);
            }
            SExp::Pair(left, right) => {
                hasher.update([2u8]);
                hasher.update(left.tree_hash());
                hasher.update(right.tree_hash());
            }
        }
        hasher.finalize().into()
    }
}

/// Tree hash of the attestation message for `(validator_index, challenge)`.
///
/// This is the exact digest the cold-key CLI signs; the verifier must
/// reconstruct it byte for byte.
pub fn attestation_digest(validator_index: u8, challenge: &str) -> [u8; 32] {
    SExp::Atom(attestation_message(validator_index, challenge).into_bytes()).tree_hash()
}

/// Verifier for cold-key attestations.
///
/// Holds the one-shot pairing-backend setup gate: [`ChiaVerifier::ensure_ready`]
/// must complete once before the first [`ChiaVerifier::verify`] call, and its
/// outcome is shared by every later call on the same instance.
#[derive(Debug, Default)]
pub struct ChiaVerifier {
    ready: OnceCell<()>,
}

impl ChiaVerifier {
    pub fn new() -> Self {
        Self { ready: OnceCell::new() }
    }

    /// Run the pairing backend's setup at most once for this instance.
    ///
    /// Subsequent calls return the memoized outcome without re-running the
    /// check. On `Err` the caller must abandon the run; there is no partial
    /// recovery short of a process restart.
    pub async fn ensure_ready(&self) -> Result<(), SetupError> {
        self.ready
            .get_or_try_init(|| async { pairing_self_check() })
            .await
            .map(|_| ())
    }

    /// Check that `signature_hex` is an augmented-scheme signature over the
    /// attestation message by the holder of `pubkey_hex`.
    ///
    /// Group elements that fail to deserialize or validate are errors; a
    /// well-formed signature that simply does not verify is `Ok(false)`.
    pub fn verify(
        &self,
        challenge: &str,
        validator_index: u8,
        signature_hex: &str,
        pubkey_hex: &str,
    ) -> Result<bool, ChiaVerifyError> {
        let public_key = parse_public_key(pubkey_hex)?;
        let signature = parse_signature(signature_hex)?;

        let digest = attestation_digest(validator_index, challenge);
        let aug = public_key.compress();
        let outcome = signature.verify(false, &digest, AUG_SCHEME_DST, &aug, &public_key, false);
        Ok(outcome == BLST_ERROR::BLST_SUCCESS)
    }
}

fn parse_public_key(pubkey_hex: &str) -> Result<PublicKey, ChiaVerifyError> {
    let stripped = pubkey_hex.strip_prefix("0x").unwrap_or(pubkey_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("public key is not hex: {e}")))?;
    let public_key = PublicKey::from_bytes(&bytes)
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("public key: {e:?}")))?;
    public_key
        .validate()
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("public key: {e:?}")))?;
    Ok(public_key)
}

fn parse_signature(signature_hex: &str) -> Result<Signature, ChiaVerifyError> {
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("signature is not hex: {e}")))?;
    let signature = Signature::from_bytes(&bytes)
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("signature: {e:?}")))?;
    signature
        .validate(false)
        .map_err(|e| ChiaVerifyError::InvalidGroupElement(format!("signature: {e:?}")))?;
    Ok(signature)
}

/// Known-answer check over a throwaway key. Catches a miscompiled or
/// misconfigured pairing backend before any attestation gets blamed for it.
fn pairing_self_check() -> Result<(), SetupError> {
    let secret_key = blst::min_pk::SecretKey::key_gen(&[7u8; 32], &[])
        .map_err(|e| SetupError(format!("key generation: {e:?}")))?;
    let public_key = secret_key.sk_to_pk();
    let digest = SExp::Atom(b"warp.green pairing self-check".to_vec()).tree_hash();
    let aug = public_key.compress();
    let signature = secret_key.sign(&digest, AUG_SCHEME_DST, &aug);
    match signature.verify(false, &digest, AUG_SCHEME_DST, &aug, &public_key, true) {
        BLST_ERROR::BLST_SUCCESS => Ok(()),
        e => Err(SetupError(format!("self check did not verify: {e:?}"))),
    }
}
