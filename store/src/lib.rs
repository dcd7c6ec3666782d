//! Collaborator traits for roster.
//!
//! Group persistence, the contact/trust subsystem and photo storage are all
//! external to the group core. Every backend (on-disk database, in-memory for
//! testing) implements these traits; the core depends only on the traits.

pub mod contact;
pub mod error;
pub mod group;
pub mod photo;

pub use contact::{Contact, ContactDirectory, TrustOrigin};
pub use error::StoreError;
pub use group::{ChainBlockRow, DetailsRow, GroupKindRecord, GroupRecord, GroupStore, MemberRow};
pub use photo::PhotoStore;
