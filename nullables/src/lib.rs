//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the group core (clock, persistence, contact
//! directory, photo storage, randomness) is abstracted behind a trait. This
//! crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled and inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod contacts;
pub mod photos;
pub mod random;
pub mod store;

pub use clock::NullClock;
pub use contacts::NullContactDirectory;
pub use photos::NullPhotoStore;
pub use random::NullPrng;
pub use store::NullGroupStore;
