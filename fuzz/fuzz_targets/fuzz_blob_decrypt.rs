#![no_main]

use libfuzzer_sys::fuzz_target;
use roster_crypto::{derive_blob_key, open, unpad};
use roster_groups::{AdministratorsChain, BlobKeys, ServerBlob};
use roster_types::{GroupCategory, GroupIdentifier, GroupUid, Seed};

// Relay ciphertext is attacker-controlled: decryption, unpadding and the
// chain checks must reject garbage without panicking.
fuzz_target!(|data: &[u8]| {
    let keys = BlobKeys::new(Seed::new([3; 32]), Seed::new([4; 32]), None);
    let uid = GroupUid::new([5; 32]);
    let Ok(identifier) = GroupIdentifier::new(uid, "https://relay.example", GroupCategory::RelayBacked)
    else {
        return;
    };

    let _ = ServerBlob::decrypt_and_verify(data, &keys, &identifier);
    let _ = AdministratorsChain::decrypt_and_check(data, &keys.main_seed, &uid);
    let _ = unpad(data);

    // A sealed box that opens must still unpad cleanly or be rejected.
    if let Ok(plaintext) = open(&derive_blob_key(&keys.main_seed, &keys.version_seed), data) {
        let _ = unpad(&plaintext);
    }
});
