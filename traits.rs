//! The typed seams this crate talks through (§6). Concrete implementations —
//! the chain database, the shared download queue, transport sockets, the
//! global sync listener — live outside this crate and are out of scope; only
//! the fakes under [`crate::testing`] implement them here.

use async_trait::async_trait;
use ethereum_types::{H256, U256};

use crate::error::{QueueError, TransportError};
use crate::message::{DisconnectReason, Message};
use crate::types::{Block, BlockBody, BlockHeader, BlockHeaderWrapper, BlockIdentifier, PeerId, StartAt};

/// Read-only access to the local chain database.
pub trait ChainReader: Send + Sync {
    fn best_block(&self) -> BlockIdentifier;
    fn best_total_difficulty(&self) -> U256;
    fn genesis_hash(&self) -> H256;
    fn is_block_exist(&self, hash: &H256) -> bool;
    fn total_difficulty_for_hash(&self, parent_hash: &H256) -> Option<U256>;
    /// Serves `GET_BLOCK_HEADERS`/internal lookups from local storage.
    fn list_headers_from(&self, start: StartAt, skip: u64, max: u64, reverse: bool) -> Vec<BlockHeader>;
    fn list_bodies_by_hashes(&self, hashes: &[H256]) -> Vec<Option<BlockBody>>;
}

/// The shared, cross-handler download queue (§3, §6).
#[async_trait]
pub trait DownloadQueue: Send + Sync {
    /// Drains up to one batch of headers awaiting a body fetch. `None` means
    /// the queue is currently empty.
    async fn poll_headers(&self) -> Option<Vec<BlockHeaderWrapper>>;
    /// Returns unfetched headers to the queue, e.g. on disconnect.
    async fn return_headers(&self, headers: Vec<BlockHeaderWrapper>);
    async fn validate_and_add_headers(
        &self,
        headers: Vec<BlockHeader>,
        peer_id: PeerId,
    ) -> Result<(), QueueError>;
    async fn add_list(&self, blocks: Vec<Block>, peer_id: PeerId) -> Result<(), QueueError>;
    async fn validate_and_add_new_block(&self, block: Block, peer_id: PeerId) -> Result<(), QueueError>;
    async fn last_header(&self) -> Option<BlockIdentifier>;
    async fn size(&self) -> usize;
    /// Drops every header attributed to `peer_id` (§5, on a bad-peer disconnect).
    async fn drop_headers(&self, peer_id: PeerId);
    /// Drops every block attributed to `peer_id`.
    async fn drop_blocks(&self, peer_id: PeerId);
}

/// Notified of sync-relevant events that other subsystems (RPC, metrics,
/// peer scoring) care about; out of scope to implement beyond the fake.
#[async_trait]
pub trait SyncListener: Send + Sync {
    async fn on_eth_status_updated(&self, peer_id: PeerId, status: crate::types::StatusRecord);
    async fn on_new_block_number(&self, number: u64);
}

/// Sends frames to the remote peer and can terminate the connection. The
/// real implementation wraps a framed socket; see the reference client's
/// `PeerConnection` for the shape this abstracts over.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), TransportError>;
    async fn disconnect(&self, reason: Option<DisconnectReason>) -> Result<(), TransportError>;
}
