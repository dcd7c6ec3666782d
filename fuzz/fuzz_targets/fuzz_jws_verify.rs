#![no_main]

use libfuzzer_sys::fuzz_target;
use roster_crypto::{keypair_from_seed, verify_compact_jws, SigningKeySet};
use roster_groups::KeycloakAdapter;
use roster_nullables::NullClock;

// Provider tokens and JWKS documents come off the network.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = SigningKeySet::from_jwks_json(text);

    let keys = SigningKeySet::new().with_key("kc", keypair_from_seed(&[9; 32]).public);
    let _ = verify_compact_jws(text, &keys);

    let clock = NullClock::new(1_700_000_000_000);
    let adapter = KeycloakAdapter::new(&keys, &clock);
    let _ = adapter.convert(text, "https://idp.example");
});
