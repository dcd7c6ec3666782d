//! Member and pending member records.
//!
//! Both carry the same fields; the standing is part of the type so a pending
//! record can only become a member through an explicit promotion.

use crate::error::GroupError;
use roster_store::MemberRow;
use roster_types::{CryptoIdentity, InvitationNonce, PermissionSet};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// A member as listed in a snapshot or server blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMember {
    pub identity: CryptoIdentity,
    pub permissions: PermissionSet,
    pub invitation_nonce: InvitationNonce,
    pub serialized_details: Vec<u8>,
}

/// Mutual awareness with the owner is confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmed {}

/// Included by an administrator or identity provider, not acknowledged yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pending {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership<S> {
    pub identity: CryptoIdentity,
    pub permissions: PermissionSet,
    pub invitation_nonce: InvitationNonce,
    pub serialized_details: Vec<u8>,
    standing: PhantomData<S>,
}

pub type Member = Membership<Confirmed>;
pub type PendingMember = Membership<Pending>;

/// Field-level comparison of a stored record against its snapshot entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldChanges {
    pub nonce: bool,
    pub permissions: bool,
    pub details: bool,
}

impl FieldChanges {
    pub fn silent(&self) -> bool {
        self.permissions || self.details
    }

    pub fn any(&self) -> bool {
        self.nonce || self.silent()
    }
}

impl<S> Membership<S> {
    pub fn new(
        identity: CryptoIdentity,
        permissions: PermissionSet,
        invitation_nonce: InvitationNonce,
        serialized_details: Vec<u8>,
    ) -> Self {
        Self {
            identity,
            permissions,
            invitation_nonce,
            serialized_details,
            standing: PhantomData,
        }
    }

    fn into_standing<T>(self) -> Membership<T> {
        Membership::new(
            self.identity,
            self.permissions,
            self.invitation_nonce,
            self.serialized_details,
        )
    }

    pub(crate) fn changes_from(&self, entry: &SnapshotMember) -> FieldChanges {
        FieldChanges {
            nonce: self.invitation_nonce != entry.invitation_nonce,
            permissions: self.permissions != entry.permissions,
            details: self.serialized_details != entry.serialized_details,
        }
    }

    pub(crate) fn update_from(&mut self, entry: &SnapshotMember) {
        self.permissions = entry.permissions.clone();
        self.invitation_nonce = entry.invitation_nonce.clone();
        self.serialized_details = entry.serialized_details.clone();
    }

    pub fn to_row(&self) -> MemberRow {
        MemberRow {
            identity: self.identity,
            permissions: self.permissions.to_raw(),
            invitation_nonce: self.invitation_nonce.clone(),
            serialized_details: self.serialized_details.clone(),
        }
    }

    pub fn from_row(row: MemberRow) -> Result<Self, GroupError> {
        Ok(Self::new(
            row.identity,
            PermissionSet::from_raw(&row.permissions)?,
            row.invitation_nonce,
            row.serialized_details,
        ))
    }

    pub fn to_snapshot_member(&self) -> SnapshotMember {
        SnapshotMember {
            identity: self.identity,
            permissions: self.permissions.clone(),
            invitation_nonce: self.invitation_nonce.clone(),
            serialized_details: self.serialized_details.clone(),
        }
    }
}

impl PendingMember {
    /// Permissions, nonce and details carry over unchanged.
    pub fn promote(self) -> Member {
        self.into_standing()
    }
}

impl Member {
    pub fn demote(self) -> PendingMember {
        self.into_standing()
    }
}

impl<S> From<SnapshotMember> for Membership<S> {
    fn from(entry: SnapshotMember) -> Self {
        Self::new(
            entry.identity,
            entry.permissions,
            entry.invitation_nonce,
            entry.serialized_details,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_types::Permission;

    fn entry() -> SnapshotMember {
        SnapshotMember {
            identity: CryptoIdentity::new([1; 32]),
            permissions: PermissionSet::default_member(),
            invitation_nonce: InvitationNonce::from_array([1; 16]),
            serialized_details: b"alice".to_vec(),
        }
    }

    #[test]
    fn change_detection() {
        let pending = PendingMember::from(entry());
        assert!(!pending.changes_from(&entry()).any());

        let mut rotated = entry();
        rotated.invitation_nonce = InvitationNonce::from_array([2; 16]);
        let changes = pending.changes_from(&rotated);
        assert!(changes.nonce);
        assert!(!changes.silent());

        let mut promoted = entry();
        promoted.permissions = promoted.permissions.with(Permission::GroupAdmin);
        let changes = pending.changes_from(&promoted);
        assert!(!changes.nonce);
        assert!(changes.silent());
    }

    #[test]
    fn promotion_keeps_fields() {
        let pending = PendingMember::from(entry());
        let member = pending.clone().promote();
        assert_eq!(member.invitation_nonce, pending.invitation_nonce);
        assert_eq!(member.permissions, pending.permissions);
        assert_eq!(member.demote(), pending);
    }

    #[test]
    fn row_roundtrip_uses_raw_permissions() {
        let member = Member::from(entry());
        let row = member.to_row();
        assert_eq!(row.permissions, "eo|sm");
        assert_eq!(Member::from_row(row).unwrap(), member);
    }
}
