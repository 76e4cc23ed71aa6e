//! Data model, signature codec, and local verification for warp.green
//! validator key-custody attestations, plus a thin client for the service's
//! HTTP API.

pub mod api;
pub mod chia;
pub mod codec;
pub mod evm;
pub mod models;
pub mod verifier;

pub use chia::{ChiaVerifier, SetupError};
pub use models::{Attestation, ChainType, Challenge, OverviewSnapshot, WeekInfo, VALIDATOR_COUNT};
pub use verifier::{AttestationVerifier, FailureReason, VerificationFailure, VerificationReport};
