//! Identity and admin-authentication key pairs.

use crate::random::Prng;
use ed25519_dalek::SigningKey;
use roster_types::{CryptoIdentity, KeyPair, PrivateKey, PublicKey};

/// Draw a fresh key pair. Group admin authentication keys are minted this way
/// at group creation.
pub fn generate_keypair(prng: &dyn Prng) -> KeyPair {
    keypair_from_private(PrivateKey(prng.gen_32()))
}

pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(&private.0).verifying_key().to_bytes())
}

pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    KeyPair {
        public: public_from_private(&private),
        private,
    }
}

/// Deterministic key pair, for fixtures and reproducible identities.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// The identity controlled by `private`.
pub fn identity_of(private: &PrivateKey) -> CryptoIdentity {
    CryptoIdentity::from_public_key(&public_from_private(private))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::OsPrng;

    #[test]
    fn fresh_keys_differ() {
        let a = generate_keypair(&OsPrng);
        let b = generate_keypair(&OsPrng);
        assert_ne!(a.public, b.public);
        assert_eq!(public_from_private(&a.private), a.public);
    }

    #[test]
    fn identity_wraps_public_key() {
        let kp = keypair_from_seed(&[42; 32]);
        assert_eq!(identity_of(&kp.private).public_key(), kp.public);
        assert_eq!(keypair_from_seed(&[42; 32]).public, kp.public);
    }
}
