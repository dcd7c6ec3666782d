//! Randomness source abstraction.
//!
//! Everything that draws fresh seeds, nonces or genesis hashes takes a `&dyn Prng`
//! so tests can substitute a deterministic generator.

use rand::rngs::OsRng;
use rand::RngCore;
use roster_types::{InvitationNonce, Seed, INVITATION_NONCE_LEN, SEED_LEN};

pub trait Prng: Send + Sync {
    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);

    fn gen_32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.fill_bytes(&mut out);
        out
    }

    fn gen_seed(&self) -> Seed {
        let mut out = [0u8; SEED_LEN];
        self.fill_bytes(&mut out);
        Seed::new(out)
    }

    fn gen_invitation_nonce(&self) -> InvitationNonce {
        let mut out = [0u8; INVITATION_NONCE_LEN];
        self.fill_bytes(&mut out);
        InvitationNonce::from_array(out)
    }
}

/// Operating-system randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPrng;

impl Prng for OsPrng {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_prng_produces_distinct_values() {
        let prng = OsPrng;
        assert_ne!(prng.gen_32(), prng.gen_32());
        assert_eq!(prng.gen_invitation_nonce().as_bytes().len(), INVITATION_NONCE_LEN);
    }
}
