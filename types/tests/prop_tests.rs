use proptest::prelude::*;

use roster_types::{CryptoIdentity, GroupUid, Permission, PermissionSet, Timestamp};

fn permission_strategy() -> impl Strategy<Value = Permission> {
    prop::sample::select(Permission::ALL.to_vec())
}

proptest! {
    /// Identity ordering agrees with byte ordering.
    #[test]
    fn identity_ordering_matches_bytes(
        a in prop::array::uniform32(0u8..),
        b in prop::array::uniform32(0u8..),
    ) {
        let ia = CryptoIdentity::new(a);
        let ib = CryptoIdentity::new(b);
        prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
    }

    /// Hex display parses back to the same identity.
    #[test]
    fn identity_hex_parses_back(bytes in prop::array::uniform32(0u8..)) {
        let id = CryptoIdentity::new(bytes);
        prop_assert_eq!(CryptoIdentity::from_hex(&id.to_string()).unwrap(), id);
    }

    /// GroupUid survives bincode.
    #[test]
    fn group_uid_bincode(bytes in prop::array::uniform32(0u8..)) {
        let uid = GroupUid::new(bytes);
        let encoded = bincode::serialize(&uid).unwrap();
        let decoded: GroupUid = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, uid);
    }

    /// The raw permission form is canonical: insertion order and duplicates
    /// never change it, and parsing it back yields an equal set.
    #[test]
    fn permission_raw_is_canonical(perms in prop::collection::vec(permission_strategy(), 0..12)) {
        let forward: PermissionSet = perms.iter().copied().collect();
        let backward: PermissionSet = perms.iter().rev().copied().collect();
        prop_assert_eq!(forward.to_raw(), backward.to_raw());
        prop_assert_eq!(PermissionSet::from_raw(&forward.to_raw()).unwrap(), forward.clone());

        let raw = forward.to_raw();
        let mut sorted: Vec<&str> = raw.split('|').filter(|c| !c.is_empty()).collect();
        let original = sorted.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted, original);
    }

    /// is_admin reflects exactly the presence of the group admin code.
    #[test]
    fn admin_flag(perms in prop::collection::vec(permission_strategy(), 0..6)) {
        let set: PermissionSet = perms.iter().copied().collect();
        prop_assert_eq!(set.is_admin(), perms.contains(&Permission::GroupAdmin));
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }
}
