//! Parallel reconciliation of independent groups.
//!
//! Distinct (owner, group) pairs share no mutable state, so after a reconnect
//! their snapshots can be applied concurrently. Each group must appear at most
//! once per batch.

use crate::blob::BlobKeys;
use crate::delta::Reconciliation;
use crate::error::GroupError;
use crate::reconcile::UpdateOrigin;
use crate::snapshot::ConsolidatedSnapshot;
use crate::state::GroupState;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// One group and the snapshot to apply to it.
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub state: GroupState,
    pub snapshot: ConsolidatedSnapshot,
    pub keys: Option<BlobKeys>,
    pub origin: UpdateOrigin,
}

/// Apply every item's snapshot in parallel. Results come back in input
/// order; one group's rejection does not affect the others.
///
/// `max_parallelism == 0` runs on the global rayon pool.
pub fn reconcile_batch(
    items: Vec<BatchItem>,
    max_parallelism: usize,
) -> Result<Vec<Result<Reconciliation, GroupError>>, GroupError> {
    let mut seen = BTreeSet::new();
    for item in &items {
        if !seen.insert((item.state.owner(), item.state.identifier())) {
            return Err(GroupError::DuplicateBatchEntry(
                item.state.identifier().to_string(),
            ));
        }
    }
    debug!(groups = items.len(), max_parallelism, "reconciling batch");

    let run = move || -> Vec<Result<Reconciliation, GroupError>> {
        items
            .into_par_iter()
            .map(|item| {
                item.state
                    .apply_snapshot(item.snapshot, item.keys, item.origin)
            })
            .collect()
    };
    if max_parallelism == 0 {
        return Ok(run());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallelism)
        .build()
        .map_err(|e| GroupError::Config(format!("batch thread pool: {e}")))?;
    Ok(pool.install(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::SnapshotMember;
    use crate::snapshot::SnapshotSource;
    use roster_types::{
        CryptoIdentity, GroupCategory, GroupIdentifier, GroupUid, InvitationNonce, PermissionSet,
        Timestamp,
    };

    fn member(identity: CryptoIdentity) -> SnapshotMember {
        SnapshotMember {
            identity,
            permissions: PermissionSet::default_member(),
            invitation_nonce: InvitationNonce::from_array([1; 16]),
            serialized_details: vec![],
        }
    }

    fn snapshot(owner: CryptoIdentity, at: u64, others: &[CryptoIdentity]) -> ConsolidatedSnapshot {
        let members = std::iter::once(owner).chain(others.iter().copied()).map(member);
        ConsolidatedSnapshot {
            version: 0,
            source: SnapshotSource::IdentityProvider {
                timestamp: Timestamp::new(at),
                push_topic: None,
            },
            members: ConsolidatedSnapshot::index_members(members).unwrap(),
            serialized_core_details: vec![],
            photo: None,
        }
    }

    fn group(owner: CryptoIdentity, uid: u8) -> GroupState {
        let identifier = GroupIdentifier::new(
            GroupUid::new([uid; 32]),
            "https://idp.example",
            GroupCategory::IdentityProviderManaged,
        )
        .unwrap();
        GroupState::create_managed(owner, identifier, snapshot(owner, 10, &[]))
            .unwrap()
            .state
    }

    fn item(state: GroupState, snapshot: ConsolidatedSnapshot) -> BatchItem {
        BatchItem {
            state,
            snapshot,
            keys: None,
            origin: UpdateOrigin::Remote,
        }
    }

    #[test]
    fn results_keep_input_order() {
        let owner = CryptoIdentity::new([1; 32]);
        let items: Vec<BatchItem> = (0..16u8)
            .map(|uid| {
                let other = CryptoIdentity::new([100 + uid; 32]);
                item(group(owner, uid), snapshot(owner, 20, &[other]))
            })
            .collect();
        let results = reconcile_batch(items, 4).unwrap();
        assert_eq!(results.len(), 16);
        for (uid, result) in results.into_iter().enumerate() {
            let r = result.unwrap();
            assert_eq!(r.state.identifier().uid, GroupUid::new([uid as u8; 32]));
            assert_eq!(r.touched(), [CryptoIdentity::new([100 + uid as u8; 32])].into());
        }
    }

    #[test]
    fn one_rejection_does_not_spoil_the_batch() {
        let owner = CryptoIdentity::new([1; 32]);
        let items = vec![
            item(group(owner, 1), snapshot(owner, 5, &[])),
            item(group(owner, 2), snapshot(owner, 20, &[])),
        ];
        let results = reconcile_batch(items, 0).unwrap();
        assert!(matches!(results[0], Err(GroupError::TimestampRegression { .. })));
        assert!(results[1].is_ok());
    }

    #[test]
    fn duplicate_group_rejected_up_front() {
        let owner = CryptoIdentity::new([1; 32]);
        let items = vec![
            item(group(owner, 1), snapshot(owner, 20, &[])),
            item(group(owner, 1), snapshot(owner, 30, &[])),
        ];
        assert!(matches!(
            reconcile_batch(items, 0),
            Err(GroupError::DuplicateBatchEntry(_))
        ));
    }

    #[test]
    fn same_group_for_different_owners_is_fine() {
        let a = CryptoIdentity::new([1; 32]);
        let b = CryptoIdentity::new([2; 32]);
        let items = vec![
            item(group(a, 1), snapshot(a, 20, &[])),
            item(group(b, 1), snapshot(b, 20, &[])),
        ];
        assert!(reconcile_batch(items, 2).unwrap().iter().all(Result::is_ok));
    }
}
