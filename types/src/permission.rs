//! Group permissions.
//!
//! A closed vocabulary of capabilities, persisted as a sorted, deduplicated
//! `|`-separated string of short codes.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const SEPARATOR: char = '|';

/// A single group capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// May change the member list and extend the administrators chain.
    GroupAdmin,
    RemoteDeleteAnything,
    EditOrRemoteDeleteOwnMessages,
    ChangeSettings,
    SendMessage,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::GroupAdmin,
        Permission::RemoteDeleteAnything,
        Permission::EditOrRemoteDeleteOwnMessages,
        Permission::ChangeSettings,
        Permission::SendMessage,
    ];

    /// Short code used on the wire and in storage.
    pub fn code(self) -> &'static str {
        match self {
            Permission::GroupAdmin => "ga",
            Permission::RemoteDeleteAnything => "rd",
            Permission::EditOrRemoteDeleteOwnMessages => "eo",
            Permission::ChangeSettings => "cs",
            Permission::SendMessage => "sm",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

/// A set of permissions.
///
/// Unknown codes received from peers are preserved so that a newer client's
/// permissions survive a round trip through an older one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every known permission, as granted to a group creator.
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// The permissions an ordinary invited member gets by default.
    pub fn default_member() -> Self {
        [
            Permission::EditOrRemoteDeleteOwnMessages,
            Permission::SendMessage,
        ]
        .into_iter()
        .collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(permission.code())
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Permission::GroupAdmin)
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission.code().to_string());
    }

    pub fn remove(&mut self, permission: Permission) {
        self.0.remove(permission.code());
    }

    pub fn with(mut self, permission: Permission) -> Self {
        self.insert(permission);
        self
    }

    /// Known permissions in this set; unknown codes are skipped.
    pub fn known(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().filter_map(|c| Permission::from_code(c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted, `|`-joined storage form.
    pub fn to_raw(&self) -> String {
        let codes: Vec<&str> = self.0.iter().map(String::as_str).collect();
        codes.join(&SEPARATOR.to_string())
    }

    /// Parse the storage form. Empty segments are ignored; a code containing
    /// whitespace is rejected.
    pub fn from_raw(raw: &str) -> Result<Self, TypesError> {
        let mut set = BTreeSet::new();
        for code in raw.split(SEPARATOR).filter(|c| !c.is_empty()) {
            if code.chars().any(char::is_whitespace) {
                return Err(TypesError::InvalidPermission(raw.to_string()));
            }
            set.insert(code.to_string());
        }
        Ok(Self(set))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().map(|p| p.code().to_string()).collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_raw())
    }
}
