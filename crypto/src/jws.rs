//! Compact JWS (RFC 7515) with EdDSA over Ed25519.
//!
//! Identity providers sign group blobs and per-member details as compact JWS
//! tokens. Only the `EdDSA` algorithm is accepted; the `kid` header selects
//! the verification key from a [`SigningKeySet`].

use crate::error::CryptoError;
use crate::sign::{sign_message, verify_signature};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use roster_types::{PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const ALGORITHM: &str = "EdDSA";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// A single key of a JSON Web Key Set.
#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    x: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

/// The provider's current verification keys, by key id.
///
/// Read-only while in use; shared across parallel reconciliations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningKeySet {
    keys: HashMap<String, PublicKey>,
}

impl SigningKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: PublicKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    pub fn get(&self, kid: &str) -> Option<&PublicKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a JWKS document, keeping only `OKP`/`Ed25519` keys with a `kid`.
    /// Other key types are skipped rather than rejected.
    pub fn from_jwks_json(json: &str) -> Result<Self, CryptoError> {
        let jwks: Jwks =
            serde_json::from_str(json).map_err(|e| CryptoError::MalformedJws(e.to_string()))?;
        let mut set = Self::new();
        for jwk in jwks.keys {
            if jwk.kty != "OKP" || jwk.crv.as_deref() != Some("Ed25519") {
                continue;
            }
            let (Some(kid), Some(x)) = (jwk.kid, jwk.x) else {
                continue;
            };
            let bytes = URL_SAFE_NO_PAD
                .decode(x.as_bytes())
                .map_err(|e| CryptoError::MalformedJws(format!("jwk x: {e}")))?;
            let key: [u8; 32] = bytes
                .try_into()
                .map_err(|_| CryptoError::MalformedJws(format!("jwk {kid}: key is not 32 bytes")))?;
            set.keys.insert(kid, PublicKey(key));
        }
        Ok(set)
    }
}

/// Produce a compact JWS over `payload`.
pub fn sign_compact_jws(kid: &str, payload: &[u8], key: &PrivateKey) -> String {
    let header = Header {
        alg: ALGORITHM.to_string(),
        kid: Some(kid.to_string()),
    };
    // A struct of two strings always serializes.
    let header_json = serde_json::to_vec(&header).unwrap_or_default();
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature = sign_message(signing_input.as_bytes(), key);
    format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature.as_bytes()))
}

/// Verify a compact JWS against `keys` and return its decoded payload.
pub fn verify_compact_jws(token: &str, keys: &SigningKeySet) -> Result<Vec<u8>, CryptoError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::MalformedJws("expected three segments".into()));
    };

    let header_bytes = decode_segment("header", header_b64)?;
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::MalformedJws(format!("header: {e}")))?;
    if header.alg != ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(header.alg));
    }
    let kid = header
        .kid
        .ok_or_else(|| CryptoError::MalformedJws("missing kid".into()))?;
    let key = keys
        .get(&kid)
        .ok_or_else(|| CryptoError::UnknownKeyId(kid.clone()))?;

    let sig_bytes = decode_segment("signature", sig_b64)?;
    let sig: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::MalformedJws("signature is not 64 bytes".into()))?;

    let signing_input_len = header_b64.len() + 1 + payload_b64.len();
    let signing_input = &token.as_bytes()[..signing_input_len];
    if !verify_signature(signing_input, &Signature(sig), key) {
        return Err(CryptoError::BadSignature);
    }
    decode_segment("payload", payload_b64)
}

fn decode_segment(what: &str, segment: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(segment.as_bytes())
        .map_err(|e| CryptoError::MalformedJws(format!("{what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    fn provider() -> (roster_types::KeyPair, SigningKeySet) {
        let kp = keypair_from_seed(&[11; 32]);
        let set = SigningKeySet::new().with_key("k1", kp.public);
        (kp, set)
    }

    #[test]
    fn sign_then_verify() {
        let (kp, set) = provider();
        let token = sign_compact_jws("k1", br#"{"hello":"group"}"#, &kp.private);
        assert_eq!(token.matches('.').count(), 2);
        assert_eq!(verify_compact_jws(&token, &set).unwrap(), br#"{"hello":"group"}"#);
    }

    #[test]
    fn unknown_kid_rejected() {
        let (kp, set) = provider();
        let token = sign_compact_jws("k2", b"{}", &kp.private);
        assert_eq!(
            verify_compact_jws(&token, &set),
            Err(CryptoError::UnknownKeyId("k2".into()))
        );
    }

    #[test]
    fn tampered_payload_rejected() {
        let (kp, set) = provider();
        let token = sign_compact_jws("k1", b"{\"a\":1}", &kp.private);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(b"{\"a\":2}"), parts[2]);
        assert_eq!(verify_compact_jws(&forged, &set), Err(CryptoError::BadSignature));
    }

    #[test]
    fn wrong_signer_rejected() {
        let (_, set) = provider();
        let imposter = keypair_from_seed(&[12; 32]);
        let token = sign_compact_jws("k1", b"{}", &imposter.private);
        assert_eq!(verify_compact_jws(&token, &set), Err(CryptoError::BadSignature));
    }

    #[test]
    fn other_algorithms_rejected() {
        let (_, set) = provider();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","kid":"k1"}"#);
        let token = format!("{header}.{}.", URL_SAFE_NO_PAD.encode(b"{}"));
        assert_eq!(
            verify_compact_jws(&token, &set),
            Err(CryptoError::UnsupportedAlgorithm("none".into()))
        );
    }

    #[test]
    fn malformed_tokens_rejected() {
        let (_, set) = provider();
        assert!(matches!(verify_compact_jws("a.b", &set), Err(CryptoError::MalformedJws(_))));
        assert!(matches!(verify_compact_jws("a.b.c.d", &set), Err(CryptoError::MalformedJws(_))));
        assert!(matches!(verify_compact_jws("!!.b.c", &set), Err(CryptoError::MalformedJws(_))));
    }

    #[test]
    fn jwks_parsing_keeps_ed25519_keys() {
        let kp = keypair_from_seed(&[13; 32]);
        let json = format!(
            r#"{{"keys":[
                {{"kty":"RSA","kid":"rsa","n":"abc","e":"AQAB"}},
                {{"kty":"OKP","crv":"Ed25519","kid":"ed","x":"{}"}}
            ]}}"#,
            URL_SAFE_NO_PAD.encode(kp.public.as_bytes())
        );
        let set = SigningKeySet::from_jwks_json(&json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("ed"), Some(&kp.public));
    }
}
