//! Core data model shared by every component of the handler (§3 of the design doc).

use ethereum_types::{H256, U256};

/// Identifies a remote peer. In the reference client this is the peer's
/// node id; we reuse the same representation here.
pub type PeerId = H256;

/// A (number, hash) pair identifying a block without carrying its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockIdentifier {
    pub number: u64,
    pub hash: H256,
}

impl BlockIdentifier {
    pub fn new(number: u64, hash: H256) -> Self {
        Self { number, hash }
    }
}

/// A block header. Identity is by `hash`, not by structural equality of the
/// other fields — two headers with the same hash are the same header.
///
/// `body_commitment` stands in for the real header fields that commit to a
/// body (transactions root, ommers hash, withdrawals root, ...); encoding
/// and hashing of headers is out of scope for this crate, so it is carried
/// as an explicit field rather than computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub body_commitment: H256,
}

impl BlockHeader {
    pub fn id(&self) -> BlockIdentifier {
        BlockIdentifier::new(self.number, self.hash)
    }
}

/// A header paired with the id of the peer that supplied it, so that a
/// different peer is never penalized for a missing body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeaderWrapper {
    pub header: BlockHeader,
    pub sent_by: PeerId,
}

/// An opaque block body payload. The wire encoding is out of scope; all the
/// handler needs is something that can be merged with a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBody {
    pub commitment: H256,
    pub payload: Vec<u8>,
}

/// A header merged with its body. Only constructible through
/// [`Block::try_merge`], which is the one place body/header consistency is
/// checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    /// Builds a block out of a header and a body, failing if the body does
    /// not correspond to this particular header.
    pub fn try_merge(header: BlockHeader, body: BlockBody) -> Result<Self, BodyMismatch> {
        if header.body_commitment != body.commitment {
            return Err(BodyMismatch);
        }
        Ok(Self { header, body })
    }

    pub fn hash(&self) -> H256 {
        self.header.hash
    }
}

/// The body did not correspond to the header it was merged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("block body does not match header commitment")]
pub struct BodyMismatch;

/// Either a block number or a block hash identifies the start of a headers
/// request — exactly one of the two, never both (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    Number(u64),
    Hash(H256),
}

/// A `GET_BLOCK_HEADERS` request, also used to correlate the response that
/// answers it (§4.2, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetHeadersRequest {
    pub start: StartAt,
    pub max: u64,
    pub skip: u64,
    pub reverse: bool,
}

/// The peer's self-reported chain status, exchanged during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    pub protocol_version: u32,
    pub network_id: u64,
    pub total_difficulty: U256,
    pub best_hash: H256,
    pub genesis_hash: H256,
}
