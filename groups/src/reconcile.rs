//! The version-gated reconciliation engine.
//!
//! [`GroupState::apply_snapshot`] computes the next state of a group from a
//! consolidated snapshot. It never mutates the receiver: the result is a
//! [`Reconciliation`] carrying the new state, the delta, and the events to
//! dispatch after persistence. A rejected snapshot leaves nothing behind.

use crate::blob::BlobKeys;
use crate::delta::{DetailsChange, GroupDelta, PhotoAction, Reconciliation};
use crate::details::GroupDetails;
use crate::error::GroupError;
use crate::events::GroupEvent;
use crate::member::{Membership, SnapshotMember};
use crate::snapshot::{ConsolidatedSnapshot, SnapshotSource};
use crate::state::{GroupKind, GroupState};
use roster_types::{CryptoIdentity, PhotoDescriptor};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Who authored the snapshot being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// The owner's own upload; its details are trusted directly.
    Local,
    /// Downloaded from the relay or the identity provider.
    Remote,
}

/// How far a snapshot may move the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Newer version or timestamp: full reconciliation.
    Advance,
    /// Same version or timestamp: removals only.
    DeletionOnly,
}

impl Gate {
    fn forbid(self, version: u64, reason: impl FnOnce() -> String) -> Result<(), GroupError> {
        match self {
            Gate::Advance => Ok(()),
            Gate::DeletionOnly => Err(GroupError::NotDeletionOnly {
                version,
                reason: reason(),
            }),
        }
    }
}

impl GroupState {
    /// Reconcile this group against `snapshot`.
    ///
    /// `keys` carries the blob keys of the snapshot's version for a
    /// relay-backed group; `None` keeps the current ones.
    pub fn apply_snapshot(
        &self,
        snapshot: ConsolidatedSnapshot,
        keys: Option<BlobKeys>,
        origin: UpdateOrigin,
    ) -> Result<Reconciliation, GroupError> {
        let result = self.reconcile(snapshot, keys, origin);
        if let Err(e) = &result {
            warn!(group = %self.identifier, version = self.version, error = %e, "snapshot rejected");
        }
        result
    }

    fn reconcile(
        &self,
        snapshot: ConsolidatedSnapshot,
        keys: Option<BlobKeys>,
        origin: UpdateOrigin,
    ) -> Result<Reconciliation, GroupError> {
        let ConsolidatedSnapshot {
            version,
            source,
            mut members,
            serialized_core_details,
            photo,
        } = snapshot;
        let mut next = self.clone();
        let mut delta = GroupDelta::default();

        let gate = next.adopt_source(source, version, keys)?;
        next.adopt_own_standing(&mut members, gate)?;
        next.reconcile_details(serialized_core_details, photo, origin, gate, &mut delta)?;
        next.reconcile_members(&members, gate, &mut delta)?;
        next.drop_duplicates(&mut delta);

        if gate == Gate::DeletionOnly && delta.removed.is_empty() {
            return Err(GroupError::DuplicateSnapshot(next.version));
        }
        next.validate()?;

        let mut events = vec![next.updated_event()];
        if delta.details == DetailsChange::Published {
            events.push(GroupEvent::PublishedDetailsAvailable {
                owner: next.owner,
                identifier: next.identifier.clone(),
            });
        }
        info!(
            group = %next.identifier,
            version = next.version,
            inserted = delta.inserted.len(),
            removed = delta.removed.len(),
            touched = delta.touched().len(),
            "snapshot applied"
        );
        Ok(Reconciliation {
            state: next,
            delta,
            events,
        })
    }

    /// Version or timestamp gate, administrators chain extension and key
    /// rollover.
    fn adopt_source(
        &mut self,
        source: SnapshotSource,
        version: u64,
        keys: Option<BlobKeys>,
    ) -> Result<Gate, GroupError> {
        let current_version = self.version;
        match (&mut self.kind, source) {
            (
                GroupKind::RelayBacked {
                    keys: current_keys,
                    administrators_chain,
                },
                SnapshotSource::Relay {
                    administrators_chain: received,
                },
            ) => {
                if version < current_version {
                    return Err(GroupError::VersionRegression {
                        current: current_version,
                        received: version,
                    });
                }
                let gate = if version == current_version {
                    Gate::DeletionOnly
                } else {
                    Gate::Advance
                };
                let received = if received.is_integrity_checked() {
                    received
                } else {
                    received.with_checked_integrity(&self.identifier.uid)?
                };
                if received.group_uid() != &self.identifier.uid {
                    return Err(GroupError::ChainRejected(format!(
                        "chain of group {} offered to group {}",
                        received.group_uid(),
                        self.identifier.uid
                    )));
                }
                if !administrators_chain.is_prefix_of(&received) {
                    return Err(GroupError::ChainNotExtension);
                }
                if received != *administrators_chain {
                    gate.forbid(version, || "administrators chain changed".into())?;
                }
                if received.len() > administrators_chain.len() {
                    debug!(group = %self.identifier, from = administrators_chain.len(), to = received.len(), rule = "chain-extension", "administrators chain extended");
                }
                *administrators_chain = received;

                if let Some(keys) = keys {
                    if keys != *current_keys {
                        gate.forbid(version, || "blob keys changed".into())?;
                        debug!(group = %self.identifier, version, rule = "key-rollover", "adopted new blob keys");
                        *current_keys = keys;
                    }
                }
                self.version = version;
                Ok(gate)
            }
            (
                GroupKind::IdentityProviderManaged {
                    push_topic,
                    last_modification,
                },
                SnapshotSource::IdentityProvider {
                    timestamp,
                    push_topic: received_topic,
                },
            ) => {
                if keys.is_some() {
                    return Err(GroupError::SourceMismatch(
                        "blob keys offered to a managed group".into(),
                    ));
                }
                if version != 0 {
                    return Err(GroupError::SourceMismatch(format!(
                        "managed snapshot at version {version}"
                    )));
                }
                if timestamp < *last_modification {
                    return Err(GroupError::TimestampRegression {
                        current: *last_modification,
                        received: timestamp,
                    });
                }
                let gate = if timestamp == *last_modification {
                    Gate::DeletionOnly
                } else {
                    Gate::Advance
                };
                if received_topic != *push_topic {
                    gate.forbid(version, || "push topic changed".into())?;
                    *push_topic = received_topic;
                }
                *last_modification = timestamp;
                Ok(gate)
            }
            (kind, _) => Err(GroupError::SourceMismatch(format!("{:?}", kind.category()))),
        }
    }

    /// Require the owner in the snapshot and take over its permissions and
    /// nonce. Removes the owner's entry from `members`.
    fn adopt_own_standing(
        &mut self,
        members: &mut BTreeMap<CryptoIdentity, SnapshotMember>,
        gate: Gate,
    ) -> Result<(), GroupError> {
        let own = members
            .remove(&self.owner)
            .ok_or(GroupError::OwnIdentityAbsent)?;
        if let GroupKind::RelayBacked { keys, .. } = &self.kind {
            if own.permissions.is_admin() && keys.admin_auth_key.is_none() {
                return Err(GroupError::AdminWithoutKey);
            }
        }
        if own.permissions != self.own_permissions
            || own.invitation_nonce != self.own_invitation_nonce
        {
            gate.forbid(self.version, || "own standing changed".into())?;
            debug!(group = %self.identifier, permissions = %own.permissions, rule = "own-standing", "adopted own permissions and nonce");
            self.own_permissions = own.permissions;
            self.own_invitation_nonce = own.invitation_nonce;
        }
        Ok(())
    }

    fn reconcile_details(
        &mut self,
        serialized_core_details: Vec<u8>,
        photo: Option<PhotoDescriptor>,
        origin: UpdateOrigin,
        gate: Gate,
        delta: &mut GroupDelta,
    ) -> Result<(), GroupError> {
        if self.trusted_details.has_content(&serialized_core_details, photo.as_ref()) {
            if self.published_details.take().is_some() {
                gate.forbid(self.version, || "published details discarded".into())?;
                debug!(group = %self.identifier, rule = "details-match-trusted", "discarded stale published details");
                delta.details = DetailsChange::PublishedDiscarded;
            }
            return Ok(());
        }

        // A re-delivery of details still awaiting acceptance is no change.
        let already_published = self
            .published_details
            .as_ref()
            .is_some_and(|p| p.has_content(&serialized_core_details, photo.as_ref()));
        if already_published && origin == UpdateOrigin::Remote {
            debug!(group = %self.identifier, rule = "details-already-published", "published details unchanged");
            return Ok(());
        }

        gate.forbid(self.version, || "details changed".into())?;

        let mut details = GroupDetails::new(serialized_core_details, photo);
        delta.photo = match &details.photo {
            None => PhotoAction::Cleared,
            Some(descriptor) => match self.downloaded_path_for(descriptor) {
                Some(path) => {
                    details.photo_path = Some(path);
                    PhotoAction::Reusable
                }
                None => PhotoAction::Fetch(descriptor.clone()),
            },
        };

        match origin {
            UpdateOrigin::Local => {
                debug!(group = %self.identifier, rule = "local-details-trusted", "replaced trusted details");
                self.trusted_details = details;
                self.published_details = None;
                delta.details = DetailsChange::TrustedReplaced;
            }
            UpdateOrigin::Remote => {
                debug!(group = %self.identifier, rule = "remote-details-published", "stored published details");
                self.published_details = Some(details);
                delta.details = DetailsChange::Published;
            }
        }
        Ok(())
    }

    /// Local file already downloaded for `descriptor`, if any details
    /// record holds it.
    fn downloaded_path_for(&self, descriptor: &PhotoDescriptor) -> Option<std::path::PathBuf> {
        std::iter::once(&self.trusted_details)
            .chain(self.published_details.iter())
            .filter(|d| d.photo.as_ref() == Some(descriptor))
            .find_map(|d| d.photo_path.clone())
    }

    fn reconcile_members(
        &mut self,
        members: &BTreeMap<CryptoIdentity, SnapshotMember>,
        gate: Gate,
        delta: &mut GroupDelta,
    ) -> Result<(), GroupError> {
        let version = self.version;

        let departed: Vec<CryptoIdentity> = self
            .all_other_members()
            .into_iter()
            .filter(|id| !members.contains_key(id))
            .collect();
        for identity in departed {
            self.members.remove(&identity);
            self.pending_members.remove(&identity);
            debug!(group = %self.identifier, %identity, rule = "absent-from-snapshot", "removed");
            delta.removed.insert(identity);
        }

        for (identity, entry) in members {
            if let Some(member) = self.members.get_mut(identity) {
                update_survivor(member, entry, gate, version, delta)?;
            } else if let Some(pending) = self.pending_members.get_mut(identity) {
                update_survivor(pending, entry, gate, version, delta)?;
            } else {
                gate.forbid(version, || format!("{identity} inserted"))?;
                debug!(group = %self.identifier, %identity, rule = "new-in-snapshot", "inserted as pending");
                self.pending_members
                    .insert(*identity, Membership::from(entry.clone()));
                delta.inserted.insert(*identity);
            }
        }
        Ok(())
    }

    fn drop_duplicates(&mut self, delta: &mut GroupDelta) {
        let duplicates: Vec<CryptoIdentity> = self
            .members
            .keys()
            .filter(|id| self.pending_members.contains_key(id))
            .copied()
            .collect();
        for identity in duplicates {
            error!(group = %self.identifier, %identity, "identity both member and pending; dropped from pending");
            self.pending_members.remove(&identity);
            delta.duplicates_dropped.insert(identity);
        }
    }
}

fn update_survivor<S>(
    record: &mut Membership<S>,
    entry: &SnapshotMember,
    gate: Gate,
    version: u64,
    delta: &mut GroupDelta,
) -> Result<(), GroupError> {
    let changes = record.changes_from(entry);
    if !changes.any() {
        return Ok(());
    }
    gate.forbid(version, || format!("{} updated", entry.identity))?;
    record.update_from(entry);
    if changes.nonce {
        debug!(identity = %entry.identity, rule = "nonce-rotated", "invitation nonce updated");
        delta.nonce_updated.insert(entry.identity);
    }
    if changes.silent() {
        debug!(identity = %entry.identity, permissions = changes.permissions, details = changes.details, rule = "silent-update", "fields updated");
        delta.silently_updated.insert(entry.identity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin_chain::AdministratorsChain;
    use crate::state::NewMember;
    use roster_crypto::{keypair_from_seed, LocalKeyring, OsPrng};
    use roster_types::{
        GroupCategory, GroupIdentifier, GroupUid, InvitationNonce, PermissionSet, Seed, Timestamp,
    };
    use std::path::PathBuf;

    struct Fixture {
        keyring: LocalKeyring,
        owner: CryptoIdentity,
        alice: CryptoIdentity,
        bob: CryptoIdentity,
        state: GroupState,
    }

    fn fixture() -> Fixture {
        let keyring = LocalKeyring::new();
        let owner = keyring.insert(keypair_from_seed(&[1; 32]).private);
        let alice = keyring.insert(keypair_from_seed(&[2; 32]).private);
        let bob = keyring.insert(keypair_from_seed(&[3; 32]).private);
        let (created, _) = GroupState::create_administrated(
            owner,
            "https://relay.example",
            b"core".to_vec(),
            None,
            PermissionSet::empty(),
            vec![],
            &keyring,
            &OsPrng,
        )
        .unwrap();
        Fixture {
            keyring,
            owner,
            alice,
            bob,
            state: created.state,
        }
    }

    fn entry(identity: CryptoIdentity, nonce: u8) -> SnapshotMember {
        SnapshotMember {
            identity,
            permissions: PermissionSet::default_member(),
            invitation_nonce: InvitationNonce::from_array([nonce; 16]),
            serialized_details: Vec::new(),
        }
    }

    /// The group as the relay would serve it, with `extra` members and a
    /// given version.
    fn snapshot(state: &GroupState, version: u64, extra: Vec<SnapshotMember>) -> ConsolidatedSnapshot {
        let mut blob = state.server_blob(b"").unwrap();
        blob.members.retain(|m| &m.identity == state.owner());
        blob.members.extend(extra);
        blob.version = version;
        blob.into_snapshot().unwrap()
    }

    fn apply(state: &GroupState, snapshot: ConsolidatedSnapshot) -> Result<Reconciliation, GroupError> {
        state.apply_snapshot(snapshot, None, UpdateOrigin::Remote)
    }

    #[test]
    fn newer_snapshot_inserts_pending_and_touches() {
        let f = fixture();
        let r = apply(&f.state, snapshot(&f.state, 1, vec![entry(f.alice, 1), entry(f.bob, 2)])).unwrap();
        assert_eq!(r.state.version(), 1);
        assert_eq!(r.touched(), [f.alice, f.bob].into());
        assert!(r.state.members().is_empty());
        assert_eq!(r.state.pending_members().len(), 2);
        assert_eq!(r.events, vec![r.state.updated_event()]);
    }

    #[test]
    fn older_snapshot_rejected() {
        let f = fixture();
        let s1 = apply(&f.state, snapshot(&f.state, 5, vec![])).unwrap().state;
        let err = apply(&s1, snapshot(&s1, 4, vec![])).unwrap_err();
        assert!(matches!(err, GroupError::VersionRegression { current: 5, received: 4 }));
    }

    #[test]
    fn equal_version_allows_deletions_only() {
        let f = fixture();
        let s1 = apply(&f.state, snapshot(&f.state, 1, vec![entry(f.alice, 1), entry(f.bob, 2)]))
            .unwrap()
            .state;

        let r = apply(&s1, snapshot(&s1, 1, vec![entry(f.alice, 1)])).unwrap();
        assert_eq!(r.delta.removed, [f.bob].into());
        assert!(r.touched().is_empty());

        let err = apply(&s1, snapshot(&s1, 1, vec![entry(f.alice, 9)])).unwrap_err();
        assert!(matches!(err, GroupError::NotDeletionOnly { .. }));

        let err = apply(&s1, snapshot(&s1, 1, vec![entry(f.alice, 1), entry(f.bob, 2)])).unwrap_err();
        assert!(matches!(err, GroupError::DuplicateSnapshot(1)));
    }

    #[test]
    fn equal_version_deletion_keeps_pending_published_details() {
        let f = fixture();
        let mut s = snapshot(&f.state, 1, vec![entry(f.alice, 1), entry(f.bob, 2)]);
        s.serialized_core_details = b"renamed".to_vec();
        let s1 = apply(&f.state, s).unwrap().state;
        assert!(s1.published_details().is_some());

        // Rebuilt from s1, so it carries the published details.
        let consolidated = snapshot(&s1, 1, vec![entry(f.alice, 1)]);
        assert_eq!(consolidated.serialized_core_details, b"renamed");
        let r = apply(&s1, consolidated).unwrap();
        assert_eq!(r.delta.removed, [f.bob].into());
        assert_eq!(r.delta.details, DetailsChange::Unchanged);
        assert_eq!(r.state.published_details(), s1.published_details());
        assert_eq!(r.state.trusted_details().serialized_core_details, b"core");

        let mut other = snapshot(&s1, 1, vec![entry(f.alice, 1)]);
        other.serialized_core_details = b"renamed again".to_vec();
        assert!(matches!(
            apply(&s1, other).unwrap_err(),
            GroupError::NotDeletionOnly { .. }
        ));
    }

    #[test]
    fn nonce_change_touches_but_permission_change_is_silent() {
        let f = fixture();
        let s1 = apply(&f.state, snapshot(&f.state, 1, vec![entry(f.alice, 1), entry(f.bob, 2)]))
            .unwrap()
            .state;
        let mut bob = entry(f.bob, 2);
        bob.permissions = PermissionSet::empty();
        let r = apply(&s1, snapshot(&s1, 2, vec![entry(f.alice, 7), bob])).unwrap();
        assert_eq!(r.touched(), [f.alice].into());
        assert_eq!(r.delta.silently_updated, [f.bob].into());
        assert!(r.state.pending_members()[&f.bob].permissions.is_empty());
    }

    #[test]
    fn forked_chain_rejected() {
        let f = fixture();
        let base = f.state.administrators_chain().unwrap().clone();
        let trusted = base.add_block(&f.owner, &[f.alice], &f.keyring).unwrap();
        let fork = base.add_block(&f.owner, &[f.bob], &f.keyring).unwrap();

        let mut s1 = f.state.clone();
        if let GroupKind::RelayBacked { administrators_chain, .. } = &mut s1.kind {
            *administrators_chain = trusted;
        }
        let mut forked = snapshot(&s1, 3, vec![]);
        forked.source = SnapshotSource::Relay { administrators_chain: fork };
        assert!(matches!(apply(&s1, forked).unwrap_err(), GroupError::ChainNotExtension));
    }

    #[test]
    fn foreign_chain_rejected() {
        let f = fixture();
        let foreign = AdministratorsChain::start_new(&f.owner, &[], &f.keyring, &OsPrng).unwrap();
        let mut s = snapshot(&f.state, 1, vec![]);
        s.source = SnapshotSource::Relay { administrators_chain: foreign };
        assert!(matches!(apply(&f.state, s).unwrap_err(), GroupError::ChainRejected(_)));
    }

    #[test]
    fn own_identity_must_be_listed() {
        let f = fixture();
        let mut s = snapshot(&f.state, 1, vec![entry(f.alice, 1)]);
        s.members.remove(&f.owner);
        assert!(matches!(apply(&f.state, s).unwrap_err(), GroupError::OwnIdentityAbsent));
    }

    #[test]
    fn admin_without_key_rejected() {
        let f = fixture();
        let keys = BlobKeys::new(Seed::new([1; 32]), Seed::new([2; 32]), None);
        let s = snapshot(&f.state, 1, vec![]);
        let err = f.state.apply_snapshot(s, Some(keys), UpdateOrigin::Remote).unwrap_err();
        assert!(matches!(err, GroupError::AdminWithoutKey));
    }

    #[test]
    fn remote_details_are_published_local_are_trusted() {
        let f = fixture();
        let mut s = snapshot(&f.state, 1, vec![]);
        s.serialized_core_details = b"renamed".to_vec();

        let remote = apply(&f.state, s.clone()).unwrap();
        assert_eq!(remote.delta.details, DetailsChange::Published);
        assert_eq!(remote.state.trusted_details().serialized_core_details, b"core");
        assert_eq!(remote.state.published_details().unwrap().serialized_core_details, b"renamed");
        assert!(matches!(remote.events[1], GroupEvent::PublishedDetailsAvailable { .. }));

        let local = f.state.apply_snapshot(s, None, UpdateOrigin::Local).unwrap();
        assert_eq!(local.delta.details, DetailsChange::TrustedReplaced);
        assert_eq!(local.state.trusted_details().serialized_core_details, b"renamed");
        assert!(local.state.published_details().is_none());
    }

    #[test]
    fn unchanged_photo_is_reused() {
        let f = fixture();
        let descriptor = PhotoDescriptor {
            uploader: None,
            label: [4; 32],
            key: [4; 32],
        };
        let mut s0 = f.state.clone();
        s0.trusted_details = GroupDetails::new(b"core".to_vec(), Some(descriptor.clone()));
        s0.trusted_details.photo_path = Some(PathBuf::from("/photos/a"));

        let mut s = snapshot(&s0, 1, vec![]);
        s.serialized_core_details = b"renamed".to_vec();
        let r = apply(&s0, s).unwrap();
        assert_eq!(r.delta.photo, PhotoAction::Reusable);
        assert_eq!(
            r.state.published_details().unwrap().photo_path,
            Some(PathBuf::from("/photos/a"))
        );

        let mut s = snapshot(&s0, 1, vec![]);
        s.photo = Some(PhotoDescriptor {
            label: [5; 32],
            ..descriptor
        });
        let r = apply(&s0, s).unwrap();
        assert!(matches!(r.delta.photo, PhotoAction::Fetch(_)));
    }

    #[test]
    fn rejection_leaves_state_untouched() {
        let f = fixture();
        let before = f.state.clone();
        let mut s = snapshot(&f.state, 1, vec![]);
        s.members.remove(&f.owner);
        let _ = apply(&f.state, s);
        assert_eq!(f.state, before);
    }

    fn managed(owner: CryptoIdentity, at: u64, members: Vec<SnapshotMember>) -> (GroupIdentifier, ConsolidatedSnapshot) {
        let identifier = GroupIdentifier::new(
            GroupUid::new([8; 32]),
            "https://idp.example",
            GroupCategory::IdentityProviderManaged,
        )
        .unwrap();
        let mut all = vec![entry(owner, 0)];
        all.extend(members);
        let snapshot = ConsolidatedSnapshot {
            version: 0,
            source: SnapshotSource::IdentityProvider {
                timestamp: Timestamp::new(at),
                push_topic: None,
            },
            members: ConsolidatedSnapshot::index_members(all).unwrap(),
            serialized_core_details: Vec::new(),
            photo: None,
        };
        (identifier, snapshot)
    }

    #[test]
    fn managed_groups_gate_on_timestamp() {
        let f = fixture();
        let (identifier, first) = managed(f.owner, 100, vec![entry(f.alice, 1)]);
        let state = GroupState::create_managed(f.owner, identifier, first).unwrap().state;

        let (_, older) = managed(f.owner, 99, vec![]);
        assert!(matches!(
            apply(&state, older).unwrap_err(),
            GroupError::TimestampRegression { .. }
        ));

        let (_, same_time_removal) = managed(f.owner, 100, vec![]);
        let r = apply(&state, same_time_removal).unwrap();
        assert_eq!(r.delta.removed, [f.alice].into());

        let (_, newer) = managed(f.owner, 101, vec![entry(f.alice, 1), entry(f.bob, 2)]);
        let r = apply(&state, newer).unwrap();
        assert_eq!(r.touched(), [f.bob].into());
        assert_eq!(r.state.last_modification(), Some(Timestamp::new(101)));
    }

    #[test]
    fn source_must_match_category() {
        let f = fixture();
        let (_, managed_snapshot) = managed(f.owner, 1, vec![]);
        assert!(matches!(
            apply(&f.state, managed_snapshot).unwrap_err(),
            GroupError::SourceMismatch(_)
        ));
    }

    #[test]
    fn invited_members_become_pending_at_creation_then_survive() {
        let f = fixture();
        let (created, _) = GroupState::create_administrated(
            f.owner,
            "https://relay.example",
            vec![],
            None,
            PermissionSet::empty(),
            vec![NewMember {
                identity: f.alice,
                permissions: PermissionSet::default_member(),
                serialized_details: vec![],
            }],
            &f.keyring,
            &OsPrng,
        )
        .unwrap();
        let blob = created.state.server_blob(b"").unwrap();
        let mut s = blob.into_snapshot().unwrap();
        s.version = 1;
        let r = apply(&created.state, s).unwrap();
        assert!(r.touched().is_empty());
        assert!(r.state.is_pending(&f.alice));
    }
}
