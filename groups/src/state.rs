//! The group state aggregate.
//!
//! One `GroupState` exists per (owner, identifier). Category-specific data
//! lives in [`GroupKind`], so a relay-backed group always carries its keys and
//! administrators chain and a managed group never does. Every mutation goes
//! through [`GroupState::validate`] before it is committed.

use crate::admin_chain::AdministratorsChain;
use crate::blob::{BlobKeys, ServerBlob};
use crate::delta::{GroupDelta, PhotoAction, Reconciliation};
use crate::details::GroupDetails;
use crate::error::GroupError;
use crate::events::GroupEvent;
use crate::member::{Member, Membership, PendingMember, SnapshotMember};
use crate::snapshot::{ConsolidatedSnapshot, SnapshotSource};
use roster_crypto::{generate_keypair, ChallengeSolver, Prng};
use roster_store::{GroupKindRecord, GroupRecord, MemberRow};
use roster_types::{
    CryptoIdentity, GroupCategory, GroupIdentifier, GroupInitiator, InvitationNonce, Permission,
    PermissionSet, PhotoDescriptor, PublicKey, Timestamp,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Category-specific part of a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupKind {
    RelayBacked {
        keys: BlobKeys,
        administrators_chain: AdministratorsChain,
    },
    IdentityProviderManaged {
        push_topic: Option<String>,
        last_modification: Timestamp,
    },
}

impl GroupKind {
    pub fn category(&self) -> GroupCategory {
        match self {
            GroupKind::RelayBacked { .. } => GroupCategory::RelayBacked,
            GroupKind::IdentityProviderManaged { .. } => GroupCategory::IdentityProviderManaged,
        }
    }
}

/// A member to invite when creating a group.
#[derive(Clone, Debug)]
pub struct NewMember {
    pub identity: CryptoIdentity,
    pub permissions: PermissionSet,
    pub serialized_details: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupState {
    pub(crate) owner: CryptoIdentity,
    pub(crate) identifier: GroupIdentifier,
    pub(crate) version: u64,
    pub(crate) own_permissions: PermissionSet,
    pub(crate) own_invitation_nonce: InvitationNonce,
    pub(crate) kind: GroupKind,
    pub(crate) frozen: bool,
    pub(crate) initiator: GroupInitiator,
    pub(crate) trusted_details: GroupDetails,
    pub(crate) published_details: Option<GroupDetails>,
    pub(crate) members: BTreeMap<CryptoIdentity, Member>,
    pub(crate) pending_members: BTreeMap<CryptoIdentity, PendingMember>,
}

// ── Creation ───────────────────────────────────────────────────────────

impl GroupState {
    /// Create a relay-backed group administered by `owner`.
    ///
    /// The owner always gets the admin permission. Everyone else starts
    /// pending with a fresh invitation nonce. The group is frozen until the
    /// relay confirms the first upload. Also returns the public half of the
    /// new admin authentication key, which the relay needs.
    #[allow(clippy::too_many_arguments)]
    pub fn create_administrated(
        owner: CryptoIdentity,
        server_url: &str,
        serialized_core_details: Vec<u8>,
        photo: Option<PhotoDescriptor>,
        own_permissions: PermissionSet,
        others: Vec<NewMember>,
        solver: &dyn ChallengeSolver,
        prng: &dyn Prng,
    ) -> Result<(Reconciliation, PublicKey), GroupError> {
        let mut seen = BTreeSet::from([owner]);
        for other in &others {
            if !seen.insert(other.identity) {
                return Err(GroupError::InvariantViolation(format!(
                    "{} listed twice or is the owner",
                    other.identity
                )));
            }
        }

        let other_admins: Vec<CryptoIdentity> = others
            .iter()
            .filter(|m| m.permissions.is_admin())
            .map(|m| m.identity)
            .collect();
        let administrators_chain =
            AdministratorsChain::start_new(&owner, &other_admins, solver, prng)?;
        let identifier = GroupIdentifier::new(
            *administrators_chain.group_uid(),
            server_url,
            GroupCategory::RelayBacked,
        )?;

        let admin_key = generate_keypair(prng);
        let admin_public = admin_key.public;
        let keys = BlobKeys::new(prng.gen_seed(), prng.gen_seed(), Some(admin_key.private));

        let pending_members: BTreeMap<_, _> = others
            .into_iter()
            .map(|m| {
                let pending = PendingMember::new(
                    m.identity,
                    m.permissions,
                    prng.gen_invitation_nonce(),
                    m.serialized_details,
                );
                (m.identity, pending)
            })
            .collect();

        let state = GroupState {
            owner,
            identifier,
            version: 0,
            own_permissions: own_permissions.with(Permission::GroupAdmin),
            own_invitation_nonce: prng.gen_invitation_nonce(),
            kind: GroupKind::RelayBacked {
                keys,
                administrators_chain,
            },
            frozen: true,
            initiator: GroupInitiator::CreatedByMe,
            trusted_details: GroupDetails::new(serialized_core_details, photo),
            published_details: None,
            members: BTreeMap::new(),
            pending_members,
        };
        state.validate()?;
        info!(group = %state.identifier, pending = state.pending_members.len(), "created group");
        Ok((state.creation(), admin_public))
    }

    /// Create the local state of a relay-backed group the owner was invited
    /// to, from a verified blob and the keys received with the invitation.
    pub fn create_joined(
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        blob: ServerBlob,
        keys: BlobKeys,
    ) -> Result<Reconciliation, GroupError> {
        if identifier.category != GroupCategory::RelayBacked {
            return Err(GroupError::SourceMismatch(format!("{:?}", identifier.category)));
        }
        let snapshot = blob.into_snapshot()?;
        let SnapshotSource::Relay {
            administrators_chain,
        } = snapshot.source
        else {
            return Err(GroupError::SourceMismatch("relay blob without chain".into()));
        };
        let administrators_chain = if administrators_chain.is_integrity_checked() {
            administrators_chain
        } else {
            administrators_chain.with_checked_integrity(&identifier.uid)?
        };
        let kind = GroupKind::RelayBacked {
            keys,
            administrators_chain,
        };
        Self::from_first_snapshot(
            owner,
            identifier,
            snapshot.version,
            kind,
            GroupInitiator::JoinedByInvitation,
            snapshot.members,
            GroupDetails::new(snapshot.serialized_core_details, snapshot.photo),
        )
    }

    /// Create an identity-provider managed group from its first snapshot.
    pub fn create_managed(
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        snapshot: ConsolidatedSnapshot,
    ) -> Result<Reconciliation, GroupError> {
        if identifier.category != GroupCategory::IdentityProviderManaged {
            return Err(GroupError::SourceMismatch(format!("{:?}", identifier.category)));
        }
        let SnapshotSource::IdentityProvider {
            timestamp,
            push_topic,
        } = snapshot.source
        else {
            return Err(GroupError::SourceMismatch("managed group fed by relay".into()));
        };
        Self::from_first_snapshot(
            owner,
            identifier,
            0,
            GroupKind::IdentityProviderManaged {
                push_topic,
                last_modification: timestamp,
            },
            GroupInitiator::ProvisionedByIdentityProvider,
            snapshot.members,
            GroupDetails::new(snapshot.serialized_core_details, snapshot.photo),
        )
    }

    fn from_first_snapshot(
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        version: u64,
        kind: GroupKind,
        initiator: GroupInitiator,
        mut members: BTreeMap<CryptoIdentity, SnapshotMember>,
        details: GroupDetails,
    ) -> Result<Reconciliation, GroupError> {
        let own = members.remove(&owner).ok_or(GroupError::OwnIdentityAbsent)?;
        let state = GroupState {
            owner,
            identifier,
            version,
            own_permissions: own.permissions,
            own_invitation_nonce: own.invitation_nonce,
            kind,
            frozen: false,
            initiator,
            trusted_details: details,
            published_details: None,
            members: BTreeMap::new(),
            pending_members: members
                .into_iter()
                .map(|(id, m)| (id, PendingMember::from(m)))
                .collect(),
        };
        state.validate()?;
        info!(group = %state.identifier, pending = state.pending_members.len(), "joined group");
        Ok(state.creation())
    }

    fn creation(self) -> Reconciliation {
        let delta = GroupDelta {
            inserted: self.pending_members.keys().copied().collect(),
            photo: match &self.trusted_details.photo {
                Some(descriptor) if self.trusted_details.photo_path.is_none() => {
                    PhotoAction::Fetch(descriptor.clone())
                }
                _ => PhotoAction::Unchanged,
            },
            ..Default::default()
        };
        let events = vec![GroupEvent::Created {
            owner: self.owner,
            identifier: self.identifier.clone(),
        }];
        Reconciliation {
            state: self,
            delta,
            events,
        }
    }
}

// ── Invariants ─────────────────────────────────────────────────────────

impl GroupState {
    /// Check every structural invariant of the group.
    pub fn validate(&self) -> Result<(), GroupError> {
        if self.kind.category() != self.identifier.category {
            return Err(GroupError::InvariantViolation(format!(
                "kind {:?} under identifier category {:?}",
                self.kind.category(),
                self.identifier.category
            )));
        }
        match &self.kind {
            GroupKind::RelayBacked {
                keys,
                administrators_chain,
            } => {
                if administrators_chain.group_uid() != &self.identifier.uid {
                    return Err(GroupError::InvariantViolation(
                        "administrators chain belongs to another group".into(),
                    ));
                }
                if !administrators_chain.is_integrity_checked() {
                    return Err(GroupError::InvariantViolation(
                        "administrators chain not integrity checked".into(),
                    ));
                }
                if self.own_permissions.is_admin() && keys.admin_auth_key.is_none() {
                    return Err(GroupError::AdminWithoutKey);
                }
            }
            GroupKind::IdentityProviderManaged { .. } => {
                if self.version != 0 {
                    return Err(GroupError::InvariantViolation(format!(
                        "managed group at version {}",
                        self.version
                    )));
                }
            }
        }
        if self.members.contains_key(&self.owner) || self.pending_members.contains_key(&self.owner) {
            return Err(GroupError::InvariantViolation(
                "owner listed among its own group's members".into(),
            ));
        }
        if let Some(both) = self
            .members
            .keys()
            .find(|id| self.pending_members.contains_key(id))
        {
            return Err(GroupError::InvariantViolation(format!(
                "{both} is both member and pending member"
            )));
        }
        let mismatched_member = self.members.iter().any(|(id, m)| id != &m.identity);
        let mismatched_pending = self.pending_members.iter().any(|(id, m)| id != &m.identity);
        if mismatched_member || mismatched_pending {
            return Err(GroupError::InvariantViolation("member keyed under another identity".into()));
        }
        Ok(())
    }

    /// Apply `mutate` to a copy and commit it only if the result is valid.
    pub(crate) fn transact<T>(
        &mut self,
        mutate: impl FnOnce(&mut GroupState) -> Result<T, GroupError>,
    ) -> Result<T, GroupError> {
        let mut next = self.clone();
        let out = mutate(&mut next)?;
        next.validate()?;
        *self = next;
        Ok(out)
    }

    pub(crate) fn updated_event(&self) -> GroupEvent {
        GroupEvent::Updated {
            owner: self.owner,
            identifier: self.identifier.clone(),
            version: self.version,
        }
    }
}

// ── Queries ────────────────────────────────────────────────────────────

impl GroupState {
    pub fn owner(&self) -> &CryptoIdentity {
        &self.owner
    }

    pub fn identifier(&self) -> &GroupIdentifier {
        &self.identifier
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn own_permissions(&self) -> &PermissionSet {
        &self.own_permissions
    }

    pub fn own_invitation_nonce(&self) -> &InvitationNonce {
        &self.own_invitation_nonce
    }

    pub fn kind(&self) -> &GroupKind {
        &self.kind
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn initiator(&self) -> GroupInitiator {
        self.initiator
    }

    pub fn trusted_details(&self) -> &GroupDetails {
        &self.trusted_details
    }

    pub fn published_details(&self) -> Option<&GroupDetails> {
        self.published_details.as_ref()
    }

    pub fn members(&self) -> &BTreeMap<CryptoIdentity, Member> {
        &self.members
    }

    pub fn pending_members(&self) -> &BTreeMap<CryptoIdentity, PendingMember> {
        &self.pending_members
    }

    pub fn is_member(&self, identity: &CryptoIdentity) -> bool {
        self.members.contains_key(identity)
    }

    pub fn is_pending(&self, identity: &CryptoIdentity) -> bool {
        self.pending_members.contains_key(identity)
    }

    pub fn administrators_chain(&self) -> Option<&AdministratorsChain> {
        match &self.kind {
            GroupKind::RelayBacked {
                administrators_chain,
                ..
            } => Some(administrators_chain),
            GroupKind::IdentityProviderManaged { .. } => None,
        }
    }

    pub fn blob_keys(&self) -> Option<&BlobKeys> {
        match &self.kind {
            GroupKind::RelayBacked { keys, .. } => Some(keys),
            GroupKind::IdentityProviderManaged { .. } => None,
        }
    }

    pub fn push_topic(&self) -> Option<&str> {
        match &self.kind {
            GroupKind::IdentityProviderManaged { push_topic, .. } => push_topic.as_deref(),
            GroupKind::RelayBacked { .. } => None,
        }
    }

    pub fn last_modification(&self) -> Option<Timestamp> {
        match &self.kind {
            GroupKind::IdentityProviderManaged {
                last_modification, ..
            } => Some(*last_modification),
            GroupKind::RelayBacked { .. } => None,
        }
    }

    /// Members and pending members, excluding the owner.
    pub fn all_other_members(&self) -> BTreeSet<CryptoIdentity> {
        self.members
            .keys()
            .chain(self.pending_members.keys())
            .copied()
            .collect()
    }

    /// Confirmed members holding the admin permission.
    pub fn non_pending_administrators(&self) -> BTreeSet<CryptoIdentity> {
        self.members
            .values()
            .filter(|m| m.permissions.is_admin())
            .map(|m| m.identity)
            .collect()
    }

    /// Members or pending members whose current invitation nonce is `nonce`.
    pub fn members_with_nonce(&self, nonce: &InvitationNonce) -> Vec<CryptoIdentity> {
        let members = self
            .members
            .values()
            .filter(|m| &m.invitation_nonce == nonce)
            .map(|m| m.identity);
        let pending = self
            .pending_members
            .values()
            .filter(|m| &m.invitation_nonce == nonce)
            .map(|m| m.identity);
        members.chain(pending).collect()
    }

    pub fn identity_is_known(&self, identity: &CryptoIdentity) -> bool {
        identity == &self.owner || self.is_member(identity) || self.is_pending(identity)
    }

    /// Rebuild the server blob from local state, for an administrator about
    /// to upload a new version. Published details take precedence over
    /// trusted ones and the owner is listed as a member.
    pub fn server_blob(&self, own_serialized_details: &[u8]) -> Result<ServerBlob, GroupError> {
        let Some(administrators_chain) = self.administrators_chain() else {
            return Err(GroupError::NotRelayBacked);
        };
        let details = self.published_details.as_ref().unwrap_or(&self.trusted_details);
        let own = SnapshotMember {
            identity: self.owner,
            permissions: self.own_permissions.clone(),
            invitation_nonce: self.own_invitation_nonce.clone(),
            serialized_details: own_serialized_details.to_vec(),
        };
        let members = std::iter::once(own)
            .chain(self.members.values().map(Member::to_snapshot_member))
            .chain(self.pending_members.values().map(PendingMember::to_snapshot_member))
            .collect();
        Ok(ServerBlob {
            administrators_chain: administrators_chain.clone(),
            members,
            version: self.version,
            serialized_core_details: details.serialized_core_details.clone(),
            photo: details.photo.clone(),
        })
    }

    /// Whether any details record references `descriptor` without a local file.
    pub fn photo_needs_download(&self, descriptor: &PhotoDescriptor) -> bool {
        self.details_records()
            .any(|d| d.photo.as_ref() == Some(descriptor) && d.photo_path.is_none())
    }

    /// Descriptors of photos this group holds a local file for.
    pub fn held_photos(&self) -> Vec<PhotoDescriptor> {
        let mut held: Vec<PhotoDescriptor> = Vec::new();
        for details in self.details_records() {
            if let (Some(photo), Some(_)) = (&details.photo, &details.photo_path) {
                if !held.contains(photo) {
                    held.push(photo.clone());
                }
            }
        }
        held
    }

    fn details_records(&self) -> impl Iterator<Item = &GroupDetails> {
        std::iter::once(&self.trusted_details).chain(self.published_details.iter())
    }
}

// ── Details and freeze lifecycle ───────────────────────────────────────

impl GroupState {
    /// Record a downloaded photo on every details record that references it.
    ///
    /// If the published details then differ from the trusted ones only by
    /// their photo, they are accepted automatically.
    pub fn attach_photo(
        &mut self,
        descriptor: &PhotoDescriptor,
        path: PathBuf,
    ) -> Result<Vec<GroupEvent>, GroupError> {
        self.transact(|state| {
            let mut attached = false;
            for details in std::iter::once(&mut state.trusted_details)
                .chain(state.published_details.iter_mut())
            {
                if details.photo.as_ref() == Some(descriptor) {
                    details.photo_path = Some(path.clone());
                    attached = true;
                }
            }
            if !attached {
                debug!(group = %state.identifier, "downloaded photo matches no details");
                return Ok(Vec::new());
            }
            let photo_only = state
                .published_details
                .as_ref()
                .is_some_and(|p| p.differs_only_by_photo(&state.trusted_details));
            if photo_only {
                if let Some(published) = state.published_details.take() {
                    debug!(group = %state.identifier, "published details differ only by photo; accepted");
                    state.trusted_details = published;
                }
            }
            Ok(vec![state.updated_event()])
        })
    }

    /// Replace the trusted details by the published ones.
    pub fn accept_published_details(&mut self) -> Result<Vec<GroupEvent>, GroupError> {
        self.transact(|state| {
            let published = state
                .published_details
                .take()
                .ok_or(GroupError::NoPublishedDetails)?;
            state.trusted_details = published;
            Ok(vec![state.updated_event()])
        })
    }

    /// An update is outstanding with the relay.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// The relay confirmed receipt of the latest upload.
    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }
}

// ── Persistence mapping ────────────────────────────────────────────────

impl GroupState {
    pub fn to_record(&self) -> GroupRecord {
        let kind = match &self.kind {
            GroupKind::RelayBacked {
                keys,
                administrators_chain,
            } => GroupKindRecord::RelayBacked {
                main_seed: keys.main_seed.clone(),
                version_seed: keys.version_seed.clone(),
                admin_auth_key: keys.admin_auth_key.clone(),
                administrators_chain: administrators_chain.to_rows(),
            },
            GroupKind::IdentityProviderManaged {
                push_topic,
                last_modification,
            } => GroupKindRecord::IdentityProviderManaged {
                push_topic: push_topic.clone(),
                last_modification: *last_modification,
            },
        };
        GroupRecord {
            owner: self.owner,
            identifier: self.identifier.clone(),
            version: self.version,
            own_permissions: self.own_permissions.to_raw(),
            own_invitation_nonce: self.own_invitation_nonce.clone(),
            frozen: self.frozen,
            initiator: self.initiator,
            kind,
            trusted_details: self.trusted_details.to_row(),
            published_details: self.published_details.as_ref().map(GroupDetails::to_row),
            members: self.members.values().map(Member::to_row).collect(),
            pending_members: self.pending_members.values().map(PendingMember::to_row).collect(),
        }
    }

    /// Rebuild a state from its record, re-checking the administrators chain
    /// and every invariant. A corrupt record fails closed.
    pub fn from_record(record: GroupRecord) -> Result<Self, GroupError> {
        let corrupt = |e: GroupError| GroupError::CorruptRecord(e.to_string());
        let kind = match record.kind {
            GroupKindRecord::RelayBacked {
                main_seed,
                version_seed,
                admin_auth_key,
                administrators_chain,
            } => GroupKind::RelayBacked {
                keys: BlobKeys::new(main_seed, version_seed, admin_auth_key),
                administrators_chain: AdministratorsChain::from_rows(administrators_chain)
                    .and_then(|chain| chain.with_checked_integrity(&record.identifier.uid))
                    .map_err(corrupt)?,
            },
            GroupKindRecord::IdentityProviderManaged {
                push_topic,
                last_modification,
            } => GroupKind::IdentityProviderManaged {
                push_topic,
                last_modification,
            },
        };
        let state = GroupState {
            owner: record.owner,
            identifier: record.identifier,
            version: record.version,
            own_permissions: PermissionSet::from_raw(&record.own_permissions)
                .map_err(|e| corrupt(e.into()))?,
            own_invitation_nonce: record.own_invitation_nonce,
            kind,
            frozen: record.frozen,
            initiator: record.initiator,
            trusted_details: GroupDetails::from_row(record.trusted_details),
            published_details: record.published_details.map(GroupDetails::from_row),
            members: index_rows(record.members).map_err(corrupt)?,
            pending_members: index_rows(record.pending_members).map_err(corrupt)?,
        };
        state.validate().map_err(corrupt)?;
        Ok(state)
    }
}

fn index_rows<S>(
    rows: Vec<MemberRow>,
) -> Result<BTreeMap<CryptoIdentity, Membership<S>>, GroupError> {
    let mut out = BTreeMap::new();
    for row in rows {
        let record = Membership::<S>::from_row(row)?;
        let identity = record.identity;
        if out.insert(identity, record).is_some() {
            return Err(GroupError::InvariantViolation(format!("{identity} stored twice")));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_crypto::{keypair_from_seed, LocalKeyring, OsPrng};

    struct Fixture {
        keyring: LocalKeyring,
        owner: CryptoIdentity,
        alice: CryptoIdentity,
        bob: CryptoIdentity,
    }

    fn fixture() -> Fixture {
        let keyring = LocalKeyring::new();
        let owner = keyring.insert(keypair_from_seed(&[1; 32]).private);
        let alice = keyring.insert(keypair_from_seed(&[2; 32]).private);
        let bob = keyring.insert(keypair_from_seed(&[3; 32]).private);
        Fixture {
            keyring,
            owner,
            alice,
            bob,
        }
    }

    fn invite(identity: CryptoIdentity, admin: bool) -> NewMember {
        let permissions = if admin {
            PermissionSet::all()
        } else {
            PermissionSet::default_member()
        };
        NewMember {
            identity,
            permissions,
            serialized_details: identity.to_hex().into_bytes(),
        }
    }

    fn photo() -> PhotoDescriptor {
        PhotoDescriptor {
            uploader: None,
            label: [5; 32],
            key: [6; 32],
        }
    }

    fn created(f: &Fixture) -> GroupState {
        let (reconciliation, _) = GroupState::create_administrated(
            f.owner,
            "https://relay.example",
            b"core".to_vec(),
            None,
            PermissionSet::default_member(),
            vec![invite(f.alice, true), invite(f.bob, false)],
            &f.keyring,
            &OsPrng,
        )
        .unwrap();
        reconciliation.state
    }

    #[test]
    fn administrated_group_shape() {
        let f = fixture();
        let (reconciliation, admin_public) = GroupState::create_administrated(
            f.owner,
            "https://relay.example",
            b"core".to_vec(),
            None,
            PermissionSet::empty(),
            vec![invite(f.alice, true), invite(f.bob, false)],
            &f.keyring,
            &OsPrng,
        )
        .unwrap();
        let state = &reconciliation.state;
        assert!(state.is_frozen());
        assert!(state.own_permissions().is_admin());
        assert_eq!(state.initiator(), GroupInitiator::CreatedByMe);
        assert_eq!(state.version(), 0);
        assert!(state.members().is_empty());
        assert_eq!(state.pending_members().len(), 2);
        assert_eq!(reconciliation.touched(), [f.alice, f.bob].into());
        assert_eq!(
            state.blob_keys().unwrap().admin_public_key(),
            Some(admin_public)
        );
        let chain = state.administrators_chain().unwrap();
        assert_eq!(chain.group_uid(), &state.identifier().uid);
        assert_eq!(chain.current_administrators(), &[f.owner, f.alice]);
        assert!(matches!(reconciliation.events[0], GroupEvent::Created { .. }));
    }

    #[test]
    fn owner_cannot_invite_itself() {
        let f = fixture();
        let err = GroupState::create_administrated(
            f.owner,
            "https://relay.example",
            vec![],
            None,
            PermissionSet::empty(),
            vec![invite(f.owner, false)],
            &f.keyring,
            &OsPrng,
        )
        .unwrap_err();
        assert!(matches!(err, GroupError::InvariantViolation(_)));
    }

    #[test]
    fn record_roundtrip() {
        let f = fixture();
        let state = created(&f);
        let restored = GroupState::from_record(state.to_record()).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn corrupt_record_fails_closed() {
        let f = fixture();
        let state = created(&f);
        let mut record = state.to_record();
        let pending = record.pending_members[0].clone();
        record.members.push(pending);
        assert!(matches!(
            GroupState::from_record(record),
            Err(GroupError::CorruptRecord(_))
        ));

        let mut record = state.to_record();
        record.identifier.category = GroupCategory::IdentityProviderManaged;
        assert!(matches!(
            GroupState::from_record(record),
            Err(GroupError::CorruptRecord(_))
        ));
    }

    #[test]
    fn server_blob_lists_owner_and_everyone() {
        let f = fixture();
        let state = created(&f);
        let blob = state.server_blob(b"me").unwrap();
        assert_eq!(blob.members.len(), 3);
        assert_eq!(blob.member(&f.owner).unwrap().serialized_details, b"me");
        assert_eq!(blob.version, 0);
    }

    #[test]
    fn queries() {
        let f = fixture();
        let state = created(&f);
        assert!(state.identity_is_known(&f.owner));
        assert!(state.identity_is_known(&f.alice));
        assert!(!state.identity_is_known(&CryptoIdentity::new([9; 32])));
        assert_eq!(state.all_other_members(), [f.alice, f.bob].into());
        assert!(state.non_pending_administrators().is_empty());
        let nonce = state.pending_members()[&f.bob].invitation_nonce.clone();
        assert_eq!(state.members_with_nonce(&nonce), vec![f.bob]);
    }

    #[test]
    fn attaching_photo_accepts_photo_only_update() {
        let f = fixture();
        let mut state = created(&f);
        state.published_details = Some(GroupDetails::new(b"core".to_vec(), Some(photo())));
        assert!(state.photo_needs_download(&photo()));

        let events = state.attach_photo(&photo(), PathBuf::from("/photos/p")).unwrap();
        assert_eq!(events.len(), 1);
        assert!(state.published_details().is_none());
        assert_eq!(state.trusted_details().photo, Some(photo()));
        assert!(!state.photo_needs_download(&photo()));
        assert_eq!(state.held_photos(), vec![photo()]);
    }

    #[test]
    fn accepting_without_published_details_fails() {
        let f = fixture();
        let mut state = created(&f);
        let before = state.clone();
        assert!(matches!(
            state.accept_published_details(),
            Err(GroupError::NoPublishedDetails)
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn freeze_lifecycle() {
        let f = fixture();
        let mut state = created(&f);
        state.unfreeze();
        assert!(!state.is_frozen());
        state.freeze();
        assert!(state.is_frozen());
    }
}
