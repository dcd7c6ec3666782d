//! Orchestration of group operations over the collaborators.
//!
//! The [`GroupManager`] loads a group from the store, runs a pure state
//! transition, settles its side effects (photos, automatic acceptance),
//! persists the result and only then dispatches the events.

use crate::batch::{reconcile_batch, BatchItem};
use crate::blob::{BlobKeys, ServerBlob};
use crate::config::GroupsConfig;
use crate::delta::{PhotoAction, Reconciliation};
use crate::error::GroupError;
use crate::events::{EventBus, GroupEvent};
use crate::keycloak::KeycloakAdapter;
use crate::reconcile::UpdateOrigin;
use crate::snapshot::ConsolidatedSnapshot;
use crate::state::{GroupState, NewMember};
use roster_crypto::{ChallengeSolver, Prng, SigningKeySet};
use roster_store::{ContactDirectory, GroupRecord, GroupStore, PhotoStore, StoreError};
use roster_types::{
    CryptoIdentity, GroupIdentifier, PermissionSet, PhotoDescriptor, PublicKey, Signature,
};
use roster_utils::Clock;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct GroupManager<S, C, P> {
    store: S,
    contacts: C,
    photos: P,
    config: GroupsConfig,
    events: EventBus,
}

impl<S, C, P> GroupManager<S, C, P>
where
    S: GroupStore,
    C: ContactDirectory,
    P: PhotoStore,
{
    pub fn new(store: S, contacts: C, photos: P, config: GroupsConfig) -> Self {
        Self {
            store,
            contacts,
            photos,
            config,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GroupEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    pub fn config(&self) -> &GroupsConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn contacts(&self) -> &C {
        &self.contacts
    }

    pub fn photos(&self) -> &P {
        &self.photos
    }

    // ── Creation ───────────────────────────────────────────────────────

    /// Create a relay-backed group administered by `owner`. Returns the new
    /// group and the admin authentication public key to register with the
    /// relay.
    #[allow(clippy::too_many_arguments)]
    pub fn create_administrated(
        &self,
        owner: CryptoIdentity,
        server_url: &str,
        serialized_core_details: Vec<u8>,
        photo_bytes: Option<&[u8]>,
        own_permissions: PermissionSet,
        others: Vec<NewMember>,
        solver: &dyn ChallengeSolver,
        prng: &dyn Prng,
    ) -> Result<(Reconciliation, PublicKey), GroupError> {
        let photo = match photo_bytes {
            Some(bytes) => {
                let descriptor = self.photos.store_photo(Some(owner), bytes)?;
                let path = self.photos.resolve_photo(&descriptor)?;
                Some((descriptor, path))
            }
            None => None,
        };
        let (mut reconciliation, admin_public) = GroupState::create_administrated(
            owner,
            server_url,
            serialized_core_details,
            photo.as_ref().map(|(descriptor, _)| descriptor.clone()),
            own_permissions,
            others,
            solver,
            prng,
        )?;
        if let Some((descriptor, Some(path))) = photo {
            reconciliation.state.attach_photo(&descriptor, path)?;
            reconciliation.delta.photo = PhotoAction::Reusable;
        }
        let reconciliation = self.settle(None, reconciliation)?;
        Ok((reconciliation, admin_public))
    }

    /// Join a relay-backed group from the blob downloaded with the keys
    /// received in an invitation.
    pub fn join(
        &self,
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        ciphertext: &[u8],
        log_entries: &[Signature],
        keys: BlobKeys,
    ) -> Result<Reconciliation, GroupError> {
        self.ensure_absent(&owner, &identifier)?;
        let blob = ServerBlob::decrypt_and_verify(ciphertext, &keys, &identifier)?;
        let (blob, _) = blob.consolidate_with_log_entries(&identifier, log_entries);
        let reconciliation = GroupState::create_joined(owner, identifier, blob, keys)?;
        self.settle(None, reconciliation)
    }

    pub fn create_managed(
        &self,
        owner: CryptoIdentity,
        identifier: GroupIdentifier,
        snapshot: ConsolidatedSnapshot,
    ) -> Result<Reconciliation, GroupError> {
        self.ensure_absent(&owner, &identifier)?;
        let reconciliation = GroupState::create_managed(owner, identifier, snapshot)?;
        self.settle(None, reconciliation)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn get(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupState, GroupError> {
        let record = self
            .store
            .get_group(owner, identifier)
            .map_err(|e| match e {
                StoreError::NotFound(_) => GroupError::NotFound(identifier.to_string()),
                other => GroupError::Store(other),
            })?;
        GroupState::from_record(record)
    }

    pub fn groups_of_owner(&self, owner: &CryptoIdentity) -> Result<Vec<GroupState>, GroupError> {
        self.store
            .groups_of_owner(owner)?
            .into_iter()
            .map(GroupState::from_record)
            .collect()
    }

    /// Groups of `owner` listing `identity` as member or pending member.
    pub fn groups_with_member(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
    ) -> Result<Vec<GroupIdentifier>, GroupError> {
        Ok(self.store.groups_with_member(owner, identity)?)
    }

    // ── Reconciliation ─────────────────────────────────────────────────

    /// Decrypt, verify and consolidate a relay blob, then reconcile the
    /// group against it.
    pub fn apply_relay_blob(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        ciphertext: &[u8],
        log_entries: &[Signature],
        keys: BlobKeys,
        origin: UpdateOrigin,
    ) -> Result<Reconciliation, GroupError> {
        let current = self.get(owner, identifier)?;
        let blob = ServerBlob::decrypt_and_verify(ciphertext, &keys, identifier)?;
        let (blob, _) = blob.consolidate_with_log_entries(identifier, log_entries);
        let reconciliation = current.apply_snapshot(blob.into_snapshot()?, Some(keys), origin)?;
        self.settle(Some(&current), reconciliation)
    }

    pub fn apply_snapshot(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        snapshot: ConsolidatedSnapshot,
        keys: Option<BlobKeys>,
        origin: UpdateOrigin,
    ) -> Result<Reconciliation, GroupError> {
        let current = self.get(owner, identifier)?;
        let reconciliation = current.apply_snapshot(snapshot, keys, origin)?;
        self.settle(Some(&current), reconciliation)
    }

    /// Verify a provider-signed group blob and create or update the managed
    /// group it describes.
    pub fn apply_keycloak_blob(
        &self,
        owner: CryptoIdentity,
        server_url: &str,
        token: &str,
        signing_keys: &SigningKeySet,
        clock: &dyn Clock,
    ) -> Result<Reconciliation, GroupError> {
        let adapter = KeycloakAdapter::new(signing_keys, clock)
            .with_signature_validity(self.config.signature_validity_ms);
        let (identifier, snapshot) = adapter.convert(token, server_url)?;
        if self.store.group_exists(&owner, &identifier)? {
            self.apply_snapshot(&owner, &identifier, snapshot, None, UpdateOrigin::Remote)
        } else {
            self.create_managed(owner, identifier, snapshot)
        }
    }

    /// Reconcile several groups of possibly several owners in parallel.
    /// Successful results are persisted one by one; results keep the input
    /// order. A group that cannot be loaded fails only its own entry.
    pub fn apply_snapshots(
        &self,
        updates: Vec<(CryptoIdentity, GroupIdentifier, ConsolidatedSnapshot, Option<BlobKeys>)>,
    ) -> Result<Vec<Result<Reconciliation, GroupError>>, GroupError> {
        let mut slots: Vec<Option<Result<Reconciliation, GroupError>>> =
            Vec::with_capacity(updates.len());
        let mut currents = Vec::new();
        let mut items = Vec::new();
        for (owner, identifier, snapshot, keys) in updates {
            match self.get(&owner, &identifier) {
                Ok(state) => {
                    currents.push((slots.len(), state.clone()));
                    items.push(BatchItem {
                        state,
                        snapshot,
                        keys,
                        origin: UpdateOrigin::Remote,
                    });
                    slots.push(None);
                }
                Err(e) => {
                    warn!(group = %identifier, error = %e, "batch entry not loaded");
                    slots.push(Some(Err(e)));
                }
            }
        }
        let results = reconcile_batch(items, self.config.max_batch_parallelism)?;
        for (result, (slot, current)) in results.into_iter().zip(currents.iter()) {
            slots[*slot] = Some(result.and_then(|r| self.settle(Some(current), r)));
        }
        Ok(slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(GroupError::InvariantViolation("batch result missing".into())))
            })
            .collect())
    }

    // ── Transitions ────────────────────────────────────────────────────

    pub fn promote_pending(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        identity: &CryptoIdentity,
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| {
            state.promote_pending_to_member(identity, &self.contacts)
        })
    }

    pub fn demote_member(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        identity: &CryptoIdentity,
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| state.demote_member_to_pending(identity))
    }

    pub fn remove_identities(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        to_remove: &BTreeSet<CryptoIdentity>,
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| state.remove_identities(to_remove))
    }

    pub fn revoke_identities(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        revoked: &BTreeSet<CryptoIdentity>,
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| state.revoke_identities(revoked))
    }

    // ── Details, photos and uploads ────────────────────────────────────

    /// Store a downloaded photo and attach it to the details referencing it.
    /// Bytes for a photo the group no longer needs are ignored.
    pub fn attach_downloaded_photo(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        descriptor: &PhotoDescriptor,
        bytes: &[u8],
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| {
            let mut next = state.clone();
            if !next.photo_needs_download(descriptor) {
                debug!(group = %identifier, "photo no longer needed");
                return Ok(Reconciliation {
                    state: next,
                    delta: Default::default(),
                    events: Vec::new(),
                });
            }
            let path = self.photos.save_downloaded(descriptor, bytes)?;
            let events = next.attach_photo(descriptor, path)?;
            Ok(Reconciliation {
                state: next,
                delta: Default::default(),
                events,
            })
        })
    }

    pub fn accept_published_details(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<Reconciliation, GroupError> {
        self.transition(owner, identifier, |state| {
            let mut next = state.clone();
            let events = next.accept_published_details()?;
            Ok(Reconciliation {
                state: next,
                delta: Default::default(),
                events,
            })
        })
    }

    /// Sign and encrypt the group's current blob for upload and freeze the
    /// group until the relay confirms it.
    pub fn prepare_blob_upload(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        own_serialized_details: &[u8],
        solver: &dyn ChallengeSolver,
        prng: &dyn Prng,
    ) -> Result<Vec<u8>, GroupError> {
        let current = self.get(owner, identifier)?;
        let keys = current.blob_keys().ok_or(GroupError::NotRelayBacked)?;
        if !current.own_permissions().is_admin() {
            return Err(GroupError::NotAdministrator(owner.to_hex()));
        }
        let blob = current.server_blob(own_serialized_details)?;
        let ciphertext =
            blob.sign_then_encrypt(owner, solver, keys, self.config.blob_padding, prng)?;
        if !current.is_frozen() {
            let mut frozen = current.clone();
            frozen.freeze();
            self.store.put_group(&frozen.to_record())?;
        }
        Ok(ciphertext)
    }

    /// The relay acknowledged the latest upload.
    pub fn confirm_upload(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupState, GroupError> {
        let mut state = self.get(owner, identifier)?;
        if state.is_frozen() {
            state.unfreeze();
            self.store.put_group(&state.to_record())?;
        }
        Ok(state)
    }

    /// Delete a group with its members and details, releasing its photos.
    pub fn delete(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<(), GroupError> {
        let record = self
            .store
            .delete_group(owner, identifier)
            .map_err(|e| match e {
                StoreError::NotFound(_) => GroupError::NotFound(identifier.to_string()),
                other => GroupError::Store(other),
            })?;
        for descriptor in held_by_record(&record) {
            self.release(&descriptor);
        }
        info!(group = %identifier, "group deleted");
        self.events.emit(&GroupEvent::Deleted {
            owner: *owner,
            identifier: identifier.clone(),
        });
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn ensure_absent(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<(), GroupError> {
        if self.store.group_exists(owner, identifier)? {
            return Err(GroupError::AlreadyExists(identifier.to_string()));
        }
        Ok(())
    }

    fn transition(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
        step: impl FnOnce(&GroupState) -> Result<Reconciliation, GroupError>,
    ) -> Result<Reconciliation, GroupError> {
        let current = self.get(owner, identifier)?;
        let reconciliation = step(&current)?;
        self.settle(Some(&current), reconciliation)
    }

    /// Resolve photo actions, apply automatic acceptance, persist, release
    /// photos the group stopped holding, then dispatch events.
    fn settle(
        &self,
        previous: Option<&GroupState>,
        reconciliation: Reconciliation,
    ) -> Result<Reconciliation, GroupError> {
        let Reconciliation {
            mut state,
            delta,
            mut events,
        } = reconciliation;

        let mut retained = None;
        if let PhotoAction::Fetch(descriptor) = &delta.photo {
            match self.photos.retain_photo(descriptor)? {
                Some(path) => {
                    events.extend(state.attach_photo(descriptor, path)?);
                    retained = Some(descriptor.clone());
                }
                None if self.config.fetch_photos => {
                    events.push(GroupEvent::PhotoNeedsDownload {
                        owner: *state.owner(),
                        identifier: state.identifier().clone(),
                        descriptor: descriptor.clone(),
                    });
                }
                None => {}
            }
        }
        if self.config.auto_accept_published_details && state.published_details().is_some() {
            debug!(group = %state.identifier(), "auto-accepting published details");
            events.extend(state.accept_published_details()?);
        }

        if previous != Some(&state) {
            let record = state.to_record();
            let persisted = match previous {
                None => self.store.insert_group(&record).map_err(|e| match e {
                    StoreError::Duplicate(_) => {
                        GroupError::AlreadyExists(state.identifier().to_string())
                    }
                    other => GroupError::Store(other),
                }),
                Some(_) => self.store.put_group(&record).map_err(GroupError::from),
            };
            if let Err(e) = persisted {
                if let Some(descriptor) = retained {
                    self.release(&descriptor);
                }
                return Err(e);
            }
        }

        if let Some(previous) = previous {
            let still_held = state.held_photos();
            for descriptor in previous.held_photos() {
                if !still_held.contains(&descriptor) {
                    self.release(&descriptor);
                }
            }
        }

        events.dedup();
        self.events.emit_all(&events);
        Ok(Reconciliation {
            state,
            delta,
            events,
        })
    }

    fn release(&self, descriptor: &PhotoDescriptor) {
        if let Err(e) = self.photos.release_photo(descriptor) {
            warn!(error = %e, "failed to release group photo");
        }
    }
}

/// Distinct photos a stored group holds a local file for.
fn held_by_record(record: &GroupRecord) -> Vec<PhotoDescriptor> {
    let mut held: Vec<PhotoDescriptor> = Vec::new();
    for details in std::iter::once(&record.trusted_details).chain(record.published_details.iter()) {
        if let (Some(photo), Some(_)) = (&details.photo, &details.photo_path) {
            if !held.contains(photo) {
                held.push(photo.clone());
            }
        }
    }
    held
}
