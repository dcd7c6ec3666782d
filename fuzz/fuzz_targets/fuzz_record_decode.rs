#![no_main]

use libfuzzer_sys::fuzz_target;
use roster_groups::GroupState;
use roster_store::GroupRecord;

// A corrupt stored record must surface as an error, never a panic or an
// invalid in-memory group.
fuzz_target!(|data: &[u8]| {
    let Ok(record) = bincode::deserialize::<GroupRecord>(data) else {
        return;
    };
    if let Ok(state) = GroupState::from_record(record) {
        assert!(state.validate().is_ok(), "decoded record must satisfy invariants");
        let rebuilt = GroupState::from_record(state.to_record());
        assert_eq!(rebuilt.ok().as_ref(), Some(&state));
    }
});
