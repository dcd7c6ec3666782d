//! Nullable contact directory.

use roster_store::{Contact, ContactDirectory, StoreError, TrustOrigin};
use roster_types::CryptoIdentity;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory contacts, keyed by (owner, contact identity).
pub struct NullContactDirectory {
    contacts: Mutex<HashMap<(CryptoIdentity, CryptoIdentity), Contact>>,
}

impl NullContactDirectory {
    pub fn new() -> Self {
        Self {
            contacts: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, owner: &CryptoIdentity, identity: &CryptoIdentity) -> Option<Contact> {
        self.contacts
            .lock()
            .unwrap()
            .get(&(*owner, *identity))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.contacts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NullContactDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactDirectory for NullContactDirectory {
    fn add_or_reinforce_contact(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
        serialized_core_details: &[u8],
        origin: TrustOrigin,
    ) -> Result<Contact, StoreError> {
        let mut contacts = self.contacts.lock().unwrap();
        let contact = contacts.entry((*owner, *identity)).or_insert_with(|| Contact {
            identity: *identity,
            serialized_core_details: serialized_core_details.to_vec(),
            origins: Vec::new(),
        });
        if !contact.origins.contains(&origin) {
            contact.origins.push(origin);
        }
        Ok(contact.clone())
    }

    fn is_trusted_contact(
        &self,
        owner: &CryptoIdentity,
        identity: &CryptoIdentity,
    ) -> Result<bool, StoreError> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .get(&(*owner, *identity))
            .is_some_and(|c| !c.origins.is_empty()))
    }
}
