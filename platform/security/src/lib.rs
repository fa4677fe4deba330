//! Bearer token verification and tenant-claim extraction.
//!
//! Token *issuance* lives in `identity-auth` and is an external collaborator
//! per the spec (authentication is an interface-only contract). This crate
//! only verifies a token already issued and extracts its `tenant_id` claim,
//! mirroring the `AccessClaims` shape in `identity-auth`'s `auth::jwt` module
//! (`sub`, `tenant_id`, `iss`, `aud`, `iat`, `exp`, `jti`) without the minting
//! half.

use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tenant_registry::TenantContext;
use uuid::Uuid;

pub mod public_link;

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("missing or malformed Authorization header")]
    MissingToken,
    #[error("token verification failed: {0}")]
    InvalidToken(String),
    #[error("missing X-Integration-Key header")]
    MissingIntegrationKey,
    #[error("integration key is not recognized")]
    UnknownIntegrationKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub tenant_id: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_rsa_pem(public_key_pem: &[u8], issuer: &str, audience: &str) -> Result<Self, SecurityError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| SecurityError::InvalidToken(e.to_string()))?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verifies a raw bearer token and returns its claims, including the
    /// tenant id callers fold into a [`TenantContext`].
    pub fn verify(&self, bearer_token: &str) -> Result<AccessClaims, SecurityError> {
        let data: TokenData<AccessClaims> =
            decode(bearer_token, &self.decoding_key, &self.validation)
                .map_err(|e| SecurityError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }

    pub fn verify_to_tenant_context(&self, bearer_token: &str) -> Result<TenantContext, SecurityError> {
        let claims = self.verify(bearer_token)?;
        Ok(TenantContext::new(claims.tenant_id))
    }
}

/// Strips a leading `Bearer ` prefix from an `Authorization` header value.
pub fn extract_bearer_token(header_value: &str) -> Result<&str, SecurityError> {
    header_value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or(SecurityError::MissingToken)
}

/// Validates an `X-Integration-Key` header against the set of keys
/// provisioned for external-system integrations (C9's POS import caller),
/// a simpler check than full JWT verification since integrations authenticate
/// with a static shared secret rather than a per-user token.
pub fn validate_integration_key(
    provided: Option<&str>,
    known_keys: &[String],
) -> Result<(), SecurityError> {
    let provided = provided.ok_or(SecurityError::MissingIntegrationKey)?;
    if known_keys.iter().any(|k| k == provided) {
        Ok(())
    } else {
        Err(SecurityError::UnknownIntegrationKey)
    }
}
