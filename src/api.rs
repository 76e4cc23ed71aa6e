//! Thin client for the attestations service.
//!
//! Two endpoints matter: `overview` (the full snapshot) and `attestation`
//! (submission). The client does no caching, polling, or retrying; callers
//! own their refresh schedule.

use serde_json::Value;
use thiserror::Error;

use crate::codec;
use crate::models::{ChainType, OverviewSnapshot};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered, but not with an attestation id. The body is
    /// passed through verbatim so the operator can see the service's reason.
    #[error("attestation rejected by service: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct AttestationApi {
    base_url: String,
    client: reqwest::Client,
}

impl AttestationApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_overview(&self) -> Result<OverviewSnapshot, ApiError> {
        let url = format!("{}overview", self.base_url);
        let snapshot = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(snapshot)
    }

    /// Submit a signature for the current period as
    /// `{ chain_type, attestation: "<index>-<sig>" }`.
    ///
    /// Returns the attestation id the service assigned.
    pub async fn submit(
        &self,
        chain_type: ChainType,
        validator_index: u8,
        signature: &str,
    ) -> Result<String, ApiError> {
        let url = format!("{}attestation", self.base_url);
        let body = serde_json::json!({
            "chain_type": chain_type,
            "attestation": codec::encode(validator_index, signature),
        });
        let response: Value = self.client.post(&url).json(&body).send().await?.json().await?;
        match response.get("attestation_id").and_then(Value::as_str) {
            Some(attestation_id) => Ok(attestation_id.to_string()),
            None => Err(ApiError::Rejected(response.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_always_gets_a_trailing_slash() {
        let api = AttestationApi::new("https://api.example.org");
        assert_eq!(api.base_url, "https://api.example.org/");
        let api = AttestationApi::new("https://api.example.org/");
        assert_eq!(api.base_url, "https://api.example.org/");
    }

    #[test]
    fn submission_body_uses_the_encoded_attestation() {
        let body = serde_json::json!({
            "chain_type": ChainType::Chia,
            "attestation": codec::encode(4, "0xabcdef"),
        });
        assert_eq!(
            body,
            serde_json::json!({ "chain_type": "chia", "attestation": "4-abcdef" })
        );
    }
}
