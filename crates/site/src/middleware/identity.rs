//! Signed identity capability.
//!
//! The edge interceptor resolves who is making a request and stamps the
//! answer onto the forwarded request as `x-opal-identity`. Downstream code
//! trusts the header only if its HMAC verifies, and the interceptor strips
//! any copy a client sent, so the header cannot be forged from outside.
//!
//! Format: `base64url(json(identity)) "." hex(hmac_sha256(payload))`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::models::Identity;

/// Header carrying the signed identity on forwarded requests.
pub const IDENTITY_HEADER: &str = "x-opal-identity";

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies identity capabilities.
#[derive(Clone)]
pub struct IdentitySigner {
    keyed: HmacSha256,
}

impl IdentitySigner {
    /// Key a signer from the session secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` if the HMAC implementation rejects the key.
    pub fn new(key: &SecretString) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(key.expose_secret().as_bytes())?,
        })
    }

    fn mac(&self) -> HmacSha256 {
        self.keyed.clone()
    }

    /// Encode and sign an identity.
    #[must_use]
    pub fn sign(&self, identity: &Identity) -> String {
        let json = serde_json::to_vec(identity).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let tag = hex::encode(mac.finalize().into_bytes());

        format!("{payload}.{tag}")
    }

    /// The identity in a capability, if its signature verifies.
    #[must_use]
    pub fn verify(&self, value: &str) -> Option<Identity> {
        let (payload, tag) = value.split_once('.')?;
        let tag = hex::decode(tag).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        if mac.verify_slice(&tag).is_err() {
            tracing::warn!("Rejected identity capability with a bad signature");
            return None;
        }

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use opal_core::UserId;

    use super::*;

    fn signer(key: &str) -> IdentitySigner {
        IdentitySigner::new(&SecretString::from(key)).unwrap()
    }

    fn identity() -> Identity {
        Identity {
            user_id: UserId::generate(),
            email: "ada@opal.studio".to_string(),
        }
    }

    #[test]
    fn test_sign_then_verify() {
        let signer = signer("k3y-material-for-signing-identities");
        let identity = identity();
        let header = signer.sign(&identity);
        assert_eq!(signer.verify(&header), Some(identity));
    }

    #[test]
    fn test_forged_payload_is_rejected() {
        let signer = signer("k3y-material-for-signing-identities");
        let header = signer.sign(&identity());
        let (_, tag) = header.split_once('.').unwrap();

        let forged_identity = identity();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_identity).unwrap());
        assert_eq!(signer.verify(&format!("{forged_payload}.{tag}")), None);
    }

    #[test]
    fn test_other_key_is_rejected() {
        let header = signer("first-key-first-key-first-key-01").sign(&identity());
        assert_eq!(signer("second-key-second-key-second-02").verify(&header), None);
    }

    #[test]
    fn test_malformed_values() {
        let signer = signer("k3y-material-for-signing-identities");
        assert_eq!(signer.verify(""), None);
        assert_eq!(signer.verify("no-dot"), None);
        assert_eq!(signer.verify("abc.not-hex"), None);
    }
}
