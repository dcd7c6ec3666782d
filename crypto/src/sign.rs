//! Raw Ed25519 signatures. Group code signs [`Challenge`](crate::Challenge)s,
//! never arbitrary bytes; these are the primitives underneath.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use roster_types::{PrivateKey, PublicKey, Signature};

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    Signature(SigningKey::from_bytes(&private_key.0).sign(message).to_bytes())
}

/// Strict verification: small-order and non-canonical keys are rejected, as
/// is any key that does not decode to a curve point.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    match VerifyingKey::from_bytes(&public_key.0) {
        Ok(key) => key
            .verify_strict(message, &ed25519_dalek::Signature::from_bytes(&signature.0))
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn signature_binds_message_and_key() {
        let alice = keypair_from_seed(&[1; 32]);
        let bob = keypair_from_seed(&[2; 32]);
        let sig = sign_message(b"member list v3", &alice.private);
        assert!(verify_signature(b"member list v3", &sig, &alice.public));
        assert!(!verify_signature(b"member list v4", &sig, &alice.public));
        assert!(!verify_signature(b"member list v3", &sig, &bob.public));
    }

    #[test]
    fn undecodable_key_fails_closed() {
        let kp = keypair_from_seed(&[3; 32]);
        let sig = sign_message(b"x", &kp.private);
        assert!(!verify_signature(b"x", &sig, &PublicKey([0xFF; 32])));
    }
}
