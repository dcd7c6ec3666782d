//! Pending ⇄ member transitions and bulk removal.

use crate::delta::{GroupDelta, Reconciliation};
use crate::error::GroupError;
use crate::events::GroupEvent;
use crate::state::{GroupKind, GroupState};
use roster_store::{ContactDirectory, TrustOrigin};
use roster_types::CryptoIdentity;
use std::collections::BTreeSet;
use tracing::{debug, info};

impl GroupState {
    /// Promote a pending member once its invitation is acknowledged.
    ///
    /// The identity is made a trusted contact of the owner first, with this
    /// group as trust origin. Promoting an existing member is a no-op.
    pub fn promote_pending_to_member(
        &self,
        identity: &CryptoIdentity,
        contacts: &dyn ContactDirectory,
    ) -> Result<Reconciliation, GroupError> {
        let mut next = self.clone();
        let Some(pending) = next.pending_members.remove(identity) else {
            if next.members.contains_key(identity) {
                debug!(group = %self.identifier, %identity, "already a member");
                return Ok(next.unchanged());
            }
            return Err(GroupError::NotPending(identity.to_hex()));
        };
        if next.members.contains_key(identity) {
            debug!(group = %self.identifier, %identity, "dropped stale pending record of a member");
            next.validate()?;
            return Ok(next.unchanged());
        }

        contacts.add_or_reinforce_contact(
            &self.owner,
            identity,
            &pending.serialized_details,
            TrustOrigin::GroupMembership {
                identifier: self.identifier.clone(),
            },
        )?;
        next.members.insert(*identity, pending.promote());
        next.validate()?;
        info!(group = %self.identifier, %identity, "pending member promoted");

        let events = vec![GroupEvent::PendingMemberPromoted {
            owner: self.owner,
            identifier: self.identifier.clone(),
            identity: *identity,
        }];
        Ok(Reconciliation {
            state: next,
            delta: GroupDelta::default(),
            events,
        })
    }

    /// Move a member back to pending when its identity provider stops
    /// vouching for it. Only valid for managed groups.
    pub fn demote_member_to_pending(
        &self,
        identity: &CryptoIdentity,
    ) -> Result<Reconciliation, GroupError> {
        self.require_managed()?;
        if self.pending_members.contains_key(identity) && !self.members.contains_key(identity) {
            return Ok(self.clone().unchanged());
        }
        if !self.members.contains_key(identity) {
            return Err(GroupError::NotMember(identity.to_hex()));
        }
        self.revoke_identities(&BTreeSet::from([*identity]))
    }

    /// Demote every listed member of a managed group. Identities that are not
    /// members are ignored.
    pub fn revoke_identities(
        &self,
        revoked: &BTreeSet<CryptoIdentity>,
    ) -> Result<Reconciliation, GroupError> {
        self.require_managed()?;
        let mut next = self.clone();
        let mut demoted = 0usize;
        for identity in revoked {
            if let Some(member) = next.members.remove(identity) {
                debug!(group = %self.identifier, %identity, rule = "revoked", "demoted to pending");
                next.pending_members.insert(*identity, member.demote());
                demoted += 1;
            }
        }
        if demoted == 0 {
            return Ok(next.unchanged());
        }
        next.validate()?;
        info!(group = %self.identifier, demoted, "revoked members");
        let events = vec![next.updated_event()];
        Ok(Reconciliation {
            state: next,
            delta: GroupDelta::default(),
            events,
        })
    }

    /// Remove identities from both members and pending members. Fails if
    /// the owner is among them.
    pub fn remove_identities(
        &self,
        to_remove: &BTreeSet<CryptoIdentity>,
    ) -> Result<Reconciliation, GroupError> {
        if to_remove.contains(&self.owner) {
            return Err(GroupError::OwnIdentityRemoval);
        }
        let mut next = self.clone();
        let mut delta = GroupDelta::default();
        for identity in to_remove {
            let was_member = next.members.remove(identity).is_some();
            let was_pending = next.pending_members.remove(identity).is_some();
            if was_member || was_pending {
                debug!(group = %self.identifier, %identity, rule = "explicit-removal", "removed");
                delta.removed.insert(*identity);
            }
        }
        if delta.removed.is_empty() {
            return Ok(next.unchanged());
        }
        next.validate()?;
        let events = vec![next.updated_event()];
        Ok(Reconciliation {
            state: next,
            delta,
            events,
        })
    }

    fn require_managed(&self) -> Result<(), GroupError> {
        match self.kind {
            GroupKind::IdentityProviderManaged { .. } => Ok(()),
            GroupKind::RelayBacked { .. } => Err(GroupError::DemotionNotAllowed),
        }
    }

    fn unchanged(self) -> Reconciliation {
        Reconciliation {
            state: self,
            delta: GroupDelta::default(),
            events: Vec::new(),
        }
    }
}
