//! Identity-provider (Keycloak) group blobs.
//!
//! The provider signs the whole group blob as a compact JWS, and each member
//! entry carries its own signed user details. The adapter turns a verified
//! blob into a [`ConsolidatedSnapshot`] fed to the same reconciliation
//! engine as relay-backed groups.

use crate::error::GroupError;
use crate::member::SnapshotMember;
use crate::snapshot::{ConsolidatedSnapshot, SnapshotSource};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use roster_crypto::{verify_compact_jws, SigningKeySet};
use roster_types::{
    CryptoIdentity, GroupCategory, GroupIdentifier, GroupUid, InvitationNonce, PermissionSet,
    PhotoDescriptor, Timestamp,
};
use roster_utils::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Sixty days.
pub const DEFAULT_SIGNATURE_VALIDITY_MS: u64 = 60 * 24 * 3600 * 1000;

/// Payload of the provider-signed group blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakGroupBlob {
    /// Hex-encoded group uid.
    pub group_uid: String,
    pub serialized_group_core_details: String,
    #[serde(default)]
    pub photo: Option<KeycloakPhoto>,
    pub members: Vec<KeycloakGroupMember>,
    #[serde(default)]
    pub push_topic: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycloakPhoto {
    /// Base64url, 32 bytes.
    pub label: String,
    /// Base64url, 32 bytes.
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakGroupMember {
    /// Compact JWS over a [`SignedUserDetails`] payload.
    pub signed_user_details: String,
    pub permissions: Vec<String>,
    /// Base64url.
    pub invitation_nonce: String,
}

/// Payload of a member's signed user details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUserDetails {
    /// Hex-encoded identity.
    pub identity: String,
    pub details: String,
    /// Expiry in milliseconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<u64>,
}

/// Converts provider-signed group blobs into snapshots.
pub struct KeycloakAdapter<'a> {
    keys: &'a SigningKeySet,
    clock: &'a dyn Clock,
    signature_validity_ms: u64,
}

impl<'a> KeycloakAdapter<'a> {
    pub fn new(keys: &'a SigningKeySet, clock: &'a dyn Clock) -> Self {
        Self {
            keys,
            clock,
            signature_validity_ms: DEFAULT_SIGNATURE_VALIDITY_MS,
        }
    }

    pub fn with_signature_validity(mut self, millis: u64) -> Self {
        self.signature_validity_ms = millis;
        self
    }

    /// Verify the outer JWS and decode its payload. Any failure here rejects
    /// the whole blob.
    pub fn verify_group_blob(&self, token: &str) -> Result<KeycloakGroupBlob, GroupError> {
        let payload = verify_compact_jws(token, self.keys)
            .map_err(|e| GroupError::BadSignature(format!("group blob: {e}")))?;
        let blob: KeycloakGroupBlob = serde_json::from_slice(&payload)
            .map_err(|e| GroupError::BlobRejected(format!("group blob payload: {e}")))?;

        let oldest = self
            .clock
            .now()
            .as_millis()
            .saturating_sub(self.signature_validity_ms);
        if blob.timestamp <= oldest {
            return Err(GroupError::BlobRejected(format!(
                "group blob signed at {} is older than the signature validity",
                Timestamp::new(blob.timestamp)
            )));
        }
        Ok(blob)
    }

    /// Verify `token` and convert it into the identifier and snapshot of the
    /// group it describes on `server_url`.
    pub fn convert(
        &self,
        token: &str,
        server_url: &str,
    ) -> Result<(GroupIdentifier, ConsolidatedSnapshot), GroupError> {
        let blob = self.verify_group_blob(token)?;
        let identifier = GroupIdentifier::new(
            GroupUid::from_hex(&blob.group_uid)?,
            server_url,
            GroupCategory::IdentityProviderManaged,
        )?;
        Ok((identifier, self.to_snapshot(blob)?))
    }

    /// Build a snapshot from a verified blob. Members whose signed details do
    /// not verify, are expired or are malformed are dropped.
    pub fn to_snapshot(&self, blob: KeycloakGroupBlob) -> Result<ConsolidatedSnapshot, GroupError> {
        let photo = blob.photo.as_ref().map(decode_photo).transpose()?;
        let total = blob.members.len();
        let members: Vec<SnapshotMember> = blob
            .members
            .iter()
            .filter_map(|member| match self.verify_member(member) {
                Ok(verified) => Some(verified),
                Err(reason) => {
                    warn!(group_uid = %blob.group_uid, %reason, "dropped member from provider blob");
                    None
                }
            })
            .collect();
        let members = drop_duplicated(&blob.group_uid, members);
        debug!(group_uid = %blob.group_uid, kept = members.len(), total, "converted provider blob");

        Ok(ConsolidatedSnapshot {
            version: 0,
            source: SnapshotSource::IdentityProvider {
                timestamp: Timestamp::new(blob.timestamp),
                push_topic: blob.push_topic,
            },
            members: ConsolidatedSnapshot::index_members(members)?,
            serialized_core_details: blob.serialized_group_core_details.into_bytes(),
            photo,
        })
    }

    fn verify_member(&self, member: &KeycloakGroupMember) -> Result<SnapshotMember, String> {
        let payload = verify_compact_jws(&member.signed_user_details, self.keys)
            .map_err(|e| format!("signed details: {e}"))?;
        let details: SignedUserDetails =
            serde_json::from_slice(&payload).map_err(|e| format!("details payload: {e}"))?;
        let identity = CryptoIdentity::from_hex(&details.identity).map_err(|e| e.to_string())?;
        if let Some(exp) = details.exp {
            if exp <= self.clock.now().as_millis() {
                return Err(format!("signed details of {identity} expired"));
            }
        }
        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(&member.invitation_nonce)
            .map_err(|e| format!("invitation nonce: {e}"))?;
        let invitation_nonce = InvitationNonce::new(nonce_bytes).map_err(|e| e.to_string())?;
        let permissions =
            PermissionSet::from_raw(&member.permissions.join("|")).map_err(|e| e.to_string())?;
        Ok(SnapshotMember {
            identity,
            permissions,
            invitation_nonce,
            serialized_details: details.details.into_bytes(),
        })
    }
}

/// Identities listed more than once are dropped entirely.
fn drop_duplicated(group_uid: &str, members: Vec<SnapshotMember>) -> Vec<SnapshotMember> {
    let mut counts: BTreeMap<CryptoIdentity, usize> = BTreeMap::new();
    for m in &members {
        *counts.entry(m.identity).or_default() += 1;
    }
    members
        .into_iter()
        .filter(|m| {
            let unique = counts.get(&m.identity) == Some(&1);
            if !unique {
                warn!(
                    group_uid,
                    identity = %m.identity,
                    "dropped member listed twice in provider blob"
                );
            }
            unique
        })
        .collect()
}

fn decode_photo(photo: &KeycloakPhoto) -> Result<PhotoDescriptor, GroupError> {
    let field = |name: &str, value: &str| -> Result<[u8; 32], GroupError> {
        URL_SAFE_NO_PAD
            .decode(value)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| GroupError::BlobRejected(format!("photo {name} is not 32 base64url bytes")))
    };
    Ok(PhotoDescriptor {
        uploader: None,
        label: field("label", &photo.label)?,
        key: field("key", &photo.key)?,
    })
}
