//! Signed, expiring tokens for the anonymous invoice share link (spec §6
//! `POST .../invoices/{id}/public-link` / `GET /public/invoices/{token}`).
//!
//! This is a narrower problem than the bearer-token verification above: the
//! token is minted by the service itself (not by `identity-auth`), carries
//! no user identity, and only needs to prove "this tenant's invoice id,
//! unexpired" — so it's an HMAC-signed payload rather than a second RS256
//! keypair to manage.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::SecurityError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicLinkClaims {
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub exp: i64,
}

/// Mints `{base64(claims_json)}.{base64(hmac)}`, valid until `now + ttl`.
pub fn mint_public_link_token(secret: &[u8], tenant_id: Uuid, invoice_id: Uuid, ttl: Duration) -> String {
    let exp = (Utc::now() + ttl).timestamp();
    let claims = PublicLinkClaims { tenant_id, invoice_id, exp };
    let payload = serde_json::to_vec(&claims).expect("claims always serialize");
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{payload_b64}.{signature_b64}")
}

/// Verifies the signature and expiry, returning the embedded claims.
pub fn verify_public_link_token(secret: &[u8], token: &str) -> Result<PublicLinkClaims, SecurityError> {
    let (payload_b64, signature_b64) = token
        .split_once('.')
        .ok_or_else(|| SecurityError::InvalidToken("malformed public link token".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SecurityError::InvalidToken("malformed public link token".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SecurityError::InvalidToken("public link signature mismatch".to_string()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SecurityError::InvalidToken("malformed public link token".to_string()))?;
    let claims: PublicLinkClaims = serde_json::from_slice(&payload)
        .map_err(|_| SecurityError::InvalidToken("malformed public link token".to_string()))?;

    let exp: DateTime<Utc> = DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| SecurityError::InvalidToken("malformed public link token".to_string()))?;
    if exp < Utc::now() {
        return Err(SecurityError::InvalidToken("public link has expired".to_string()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_freshly_minted_token() {
        let secret = b"test-secret";
        let tenant_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();
        let token = mint_public_link_token(secret, tenant_id, invoice_id, Duration::hours(1));

        let claims = verify_public_link_token(secret, &token).expect("token should verify");
        assert_eq!(claims.tenant_id, tenant_id);
        assert_eq!(claims.invoice_id, invoice_id);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let tenant_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();
        let token = mint_public_link_token(b"secret-a", tenant_id, invoice_id, Duration::hours(1));

        assert!(verify_public_link_token(b"secret-b", &token).is_err());
    }

    #[test]
    fn rejects_an_expired_token() {
        let secret = b"test-secret";
        let token = mint_public_link_token(secret, Uuid::new_v4(), Uuid::new_v4(), Duration::seconds(-1));

        assert!(verify_public_link_token(secret, &token).is_err());
    }
}
