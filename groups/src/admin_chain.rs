//! The administrators chain.
//!
//! An append-only list of signed blocks. Each block names the administrators
//! of the group (its author first) and links to the previous block by digest.
//! A block is only valid if signed by an administrator listed in the block
//! before it; the genesis block is signed by its own first administrator.
//! The group uid is the digest of the genesis block, which binds the group's
//! identity to its founding administrators.

use crate::error::{encoding, GroupError};
use roster_crypto::{
    blake2b_256_multi, check_response, derive_chain_key, open, seal, Challenge, ChallengeSolver,
    Prng,
};
use roster_store::ChainBlockRow;
use roster_types::{CryptoIdentity, GroupUid, Seed, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct InnerData {
    previous_block_hash: [u8; 32],
    administrators: Vec<CryptoIdentity>,
}

/// One signed block of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainBlock {
    encoded_inner_data: Vec<u8>,
    signature: Signature,
    inner: InnerData,
}

impl ChainBlock {
    fn decode(encoded_inner_data: Vec<u8>, signature: Signature) -> Result<Self, GroupError> {
        let inner: InnerData = bincode::deserialize(&encoded_inner_data)
            .map_err(|e| GroupError::ChainRejected(format!("undecodable block: {e}")))?;
        Ok(Self {
            encoded_inner_data,
            signature,
            inner,
        })
    }

    fn sign(
        inner: InnerData,
        author: &CryptoIdentity,
        solver: &dyn ChallengeSolver,
    ) -> Result<Self, GroupError> {
        let encoded_inner_data = bincode::serialize(&inner).map_err(encoding)?;
        let signature = solver.solve(
            &Challenge::AdministratorsChainBlock {
                inner_data: &encoded_inner_data,
            },
            author,
        )?;
        Ok(Self {
            encoded_inner_data,
            signature,
            inner,
        })
    }

    fn digest(&self) -> [u8; 32] {
        blake2b_256_multi(&[&self.encoded_inner_data, self.signature.as_bytes()])
    }

    fn signed_by_one_of(&self, administrators: &[CryptoIdentity]) -> bool {
        let challenge = Challenge::AdministratorsChainBlock {
            inner_data: &self.encoded_inner_data,
        };
        administrators
            .iter()
            .any(|admin| check_response(&challenge, &self.signature, admin))
    }

    pub fn administrators(&self) -> &[CryptoIdentity] {
        &self.inner.administrators
    }
}

impl From<&ChainBlock> for ChainBlockRow {
    fn from(block: &ChainBlock) -> Self {
        ChainBlockRow {
            encoded_inner_data: block.encoded_inner_data.clone(),
            signature: block.signature.clone(),
        }
    }
}

/// Hash-linked, signed log of administrator sets.
///
/// Chains built locally or passed through [`with_checked_integrity`] are
/// marked as checked; a deserialized chain is unchecked until verified and
/// must not be trusted before that.
///
/// [`with_checked_integrity`]: AdministratorsChain::with_checked_integrity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChainBlockRow>", into = "Vec<ChainBlockRow>")]
pub struct AdministratorsChain {
    group_uid: GroupUid,
    blocks: Vec<ChainBlock>,
    integrity_checked: bool,
}

impl PartialEq for AdministratorsChain {
    fn eq(&self, other: &Self) -> bool {
        self.group_uid == other.group_uid && self.blocks == other.blocks
    }
}

impl Eq for AdministratorsChain {}

impl TryFrom<Vec<ChainBlockRow>> for AdministratorsChain {
    type Error = GroupError;

    fn try_from(rows: Vec<ChainBlockRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<AdministratorsChain> for Vec<ChainBlockRow> {
    fn from(chain: AdministratorsChain) -> Self {
        chain.to_rows()
    }
}

impl AdministratorsChain {
    /// Create the genesis block for a new group founded by `owner`.
    pub fn start_new(
        owner: &CryptoIdentity,
        other_admins: &[CryptoIdentity],
        solver: &dyn ChallengeSolver,
        prng: &dyn Prng,
    ) -> Result<Self, GroupError> {
        let inner = InnerData {
            previous_block_hash: prng.gen_32(),
            administrators: author_first(owner, other_admins),
        };
        let genesis = ChainBlock::sign(inner, owner, solver)?;
        let group_uid = GroupUid::new(genesis.digest());
        debug!(group_uid = %group_uid, admins = genesis.administrators().len(), "started administrators chain");
        Ok(Self {
            group_uid,
            blocks: vec![genesis],
            integrity_checked: true,
        })
    }

    /// Rebuild an unchecked chain from stored or received blocks.
    pub fn from_rows(rows: Vec<ChainBlockRow>) -> Result<Self, GroupError> {
        let blocks = rows
            .into_iter()
            .map(|row| ChainBlock::decode(row.encoded_inner_data, row.signature))
            .collect::<Result<Vec<_>, _>>()?;
        let genesis = blocks
            .first()
            .ok_or_else(|| GroupError::ChainRejected("empty chain".into()))?;
        Ok(Self {
            group_uid: GroupUid::new(genesis.digest()),
            blocks,
            integrity_checked: false,
        })
    }

    pub fn to_rows(&self) -> Vec<ChainBlockRow> {
        self.blocks.iter().map(ChainBlockRow::from).collect()
    }

    /// Verify uid, digest links and signatures, returning the chain marked as
    /// checked.
    pub fn with_checked_integrity(mut self, expected_uid: &GroupUid) -> Result<Self, GroupError> {
        if &self.group_uid != expected_uid {
            return Err(GroupError::ChainRejected(format!(
                "genesis digest {} does not match group uid {}",
                self.group_uid, expected_uid
            )));
        }
        let mut previous: Option<&ChainBlock> = None;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.inner.administrators.is_empty() {
                return Err(GroupError::ChainRejected(format!("block {index} has no administrators")));
            }
            let signers = match previous {
                None => block.administrators(),
                Some(prev) => {
                    if block.inner.previous_block_hash != prev.digest() {
                        return Err(GroupError::ChainRejected(format!("block {index} is not linked to its predecessor")));
                    }
                    prev.administrators()
                }
            };
            if !block.signed_by_one_of(signers) {
                return Err(GroupError::ChainRejected(format!(
                    "block {index} is not signed by an administrator of the previous block"
                )));
            }
            previous = Some(block);
        }
        self.integrity_checked = true;
        Ok(self)
    }

    /// Append a block naming a new administrator set. Only a current
    /// administrator may extend the chain.
    pub fn add_block(
        &self,
        author: &CryptoIdentity,
        other_admins: &[CryptoIdentity],
        solver: &dyn ChallengeSolver,
    ) -> Result<Self, GroupError> {
        if !self.integrity_checked {
            return Err(GroupError::ChainRejected("cannot extend an unchecked chain".into()));
        }
        if !self.current_administrators().contains(author) {
            return Err(GroupError::NotAdministrator(author.to_hex()));
        }
        let inner = InnerData {
            previous_block_hash: self.last_block().digest(),
            administrators: author_first(author, other_admins),
        };
        let block = ChainBlock::sign(inner, author, solver)?;
        let mut extended = self.clone();
        extended.blocks.push(block);
        Ok(extended)
    }

    pub fn group_uid(&self) -> &GroupUid {
        &self.group_uid
    }

    pub fn is_integrity_checked(&self) -> bool {
        self.integrity_checked
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn last_block(&self) -> &ChainBlock {
        // Construction guarantees at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn current_administrators(&self) -> &[CryptoIdentity] {
        self.last_block().administrators()
    }

    pub fn blocks(&self) -> &[ChainBlock] {
        &self.blocks
    }

    /// True iff `other` starts with exactly this chain's blocks. A chain is a
    /// prefix of itself.
    pub fn is_prefix_of(&self, other: &AdministratorsChain) -> bool {
        self.group_uid == other.group_uid
            && self.blocks.len() <= other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(other.blocks.iter())
                .all(|(a, b)| a.encoded_inner_data == b.encoded_inner_data)
    }

    /// Whether the last block removed someone who was an administrator in
    /// the block before it.
    pub fn an_administrator_was_demoted(&self) -> bool {
        let [.., before, last] = self.blocks.as_slice() else {
            return false;
        };
        let current: BTreeSet<_> = last.administrators().iter().collect();
        before
            .administrators()
            .iter()
            .any(|admin| !current.contains(admin))
    }

    /// Encrypt the chain under a key derived from the group's main seed.
    pub fn encrypt(&self, main_seed: &Seed, prng: &dyn Prng) -> Result<Vec<u8>, GroupError> {
        let encoded = bincode::serialize(&self.to_rows()).map_err(encoding)?;
        Ok(seal(&derive_chain_key(main_seed), &encoded, prng))
    }

    /// Decrypt a chain produced by [`encrypt`](Self::encrypt) and verify it.
    pub fn decrypt_and_check(
        ciphertext: &[u8],
        main_seed: &Seed,
        expected_uid: &GroupUid,
    ) -> Result<Self, GroupError> {
        let plaintext = open(&derive_chain_key(main_seed), ciphertext)?;
        let rows: Vec<ChainBlockRow> = bincode::deserialize(&plaintext)
            .map_err(|e| GroupError::ChainRejected(format!("undecodable chain: {e}")))?;
        Self::from_rows(rows)?.with_checked_integrity(expected_uid)
    }
}

fn author_first(author: &CryptoIdentity, others: &[CryptoIdentity]) -> Vec<CryptoIdentity> {
    let mut admins = vec![*author];
    for other in others {
        if !admins.contains(other) {
            admins.push(*other);
        }
    }
    admins
}
