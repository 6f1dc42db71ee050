//! Signed accept/decline capabilities embedded in invitation links.
//!
//! Tokens are `base64url(json payload) "." base64url(hmac-sha256)`. They carry
//! their own expiry, so a stale link stops verifying without any background
//! sweep.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::domain::{ClaimId, ContractorId};

type HmacSha256 = Hmac<Sha256>;

/// What the link holder is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    Accept,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub claim_id: ClaimId,
    pub contractor_id: ContractorId,
    pub action: TokenAction,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenPayload {
    pub fn new(
        claim_id: ClaimId,
        contractor_id: ContractorId,
        action: TokenAction,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            claim_id,
            contractor_id,
            action,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("token could not be encoded: {0}")]
    Encoding(String),
}

/// Issues and verifies invitation tokens.
pub trait TokenService: Send + Sync {
    fn issue(&self, payload: &TokenPayload) -> Result<String, TokenError>;
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenPayload, TokenError>;
}

/// HMAC-SHA256 signer keyed by a shared secret.
pub struct HmacTokenService {
    secret: Vec<u8>,
}

impl HmacTokenService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| TokenError::Encoding(err.to_string()))
    }
}

impl std::fmt::Debug for HmacTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenService")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenService for HmacTokenService {
    fn issue(&self, payload: &TokenPayload) -> Result<String, TokenError> {
        let body =
            serde_json::to_vec(payload).map_err(|err| TokenError::Encoding(err.to_string()))?;
        let encoded = URL_SAFE_NO_PAD.encode(body);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{encoded}.{signature}"))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenPayload, TokenError> {
        let (encoded, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed)?;
        let payload: TokenPayload =
            serde_json::from_slice(&body).map_err(|_| TokenError::Malformed)?;

        if payload.is_expired_at(now) {
            return Err(TokenError::Expired(payload.expires_at));
        }

        Ok(payload)
    }
}
