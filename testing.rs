//! In-memory fakes for the collaborator traits (§6, §8), used by this
//! crate's own test suite. Mirrors the reference client's habit of shipping
//! a lightweight in-memory `Store`/`Blockchain` alongside the real trait for
//! dependent crates to test against.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex as SyncMutex;

use async_trait::async_trait;
use ethereum_types::{H256, U256};
use tokio::sync::Mutex;

use crate::error::{QueueError, TransportError};
use crate::message::{DisconnectReason, Message};
use crate::traits::{ChainReader, DownloadQueue, PeerTransport, SyncListener};
use crate::types::{
    Block, BlockBody, BlockHeader, BlockHeaderWrapper, BlockIdentifier, PeerId, StartAt,
    StatusRecord,
};

/// A local chain backed by plain in-memory maps.
#[derive(Default)]
pub struct FakeChain {
    best: SyncMutex<BlockIdentifier>,
    best_total_difficulty: SyncMutex<U256>,
    genesis_hash: SyncMutex<H256>,
    headers_by_number: SyncMutex<BTreeMap<u64, BlockHeader>>,
    bodies_by_hash: SyncMutex<HashMap<H256, BlockBody>>,
    total_difficulties: SyncMutex<HashMap<H256, U256>>,
}

impl FakeChain {
    pub fn new(genesis_hash: H256) -> Self {
        Self {
            genesis_hash: SyncMutex::new(genesis_hash),
            ..Default::default()
        }
    }

    pub fn set_best(&self, best: BlockIdentifier, total_difficulty: U256) {
        *self.best.lock().expect("lock poisoned") = best;
        *self.best_total_difficulty.lock().expect("lock poisoned") = total_difficulty;
    }

    pub fn insert_header(&self, header: BlockHeader) {
        self.headers_by_number
            .lock()
            .expect("lock poisoned")
            .insert(header.number, header);
    }

    pub fn insert_body(&self, hash: H256, body: BlockBody) {
        self.bodies_by_hash
            .lock()
            .expect("lock poisoned")
            .insert(hash, body);
    }

    pub fn set_total_difficulty(&self, hash: H256, total_difficulty: U256) {
        self.total_difficulties
            .lock()
            .expect("lock poisoned")
            .insert(hash, total_difficulty);
    }
}

impl ChainReader for FakeChain {
    fn best_block(&self) -> BlockIdentifier {
        *self.best.lock().expect("lock poisoned")
    }

    fn best_total_difficulty(&self) -> U256 {
        *self.best_total_difficulty.lock().expect("lock poisoned")
    }

    fn genesis_hash(&self) -> H256 {
        *self.genesis_hash.lock().expect("lock poisoned")
    }

    fn is_block_exist(&self, hash: &H256) -> bool {
        self.headers_by_number
            .lock()
            .expect("lock poisoned")
            .values()
            .any(|header| header.hash == *hash)
    }

    fn total_difficulty_for_hash(&self, parent_hash: &H256) -> Option<U256> {
        self.total_difficulties
            .lock()
            .expect("lock poisoned")
            .get(parent_hash)
            .copied()
    }

    fn list_headers_from(&self, start: StartAt, skip: u64, max: u64, reverse: bool) -> Vec<BlockHeader> {
        let headers = self.headers_by_number.lock().expect("lock poisoned");
        let start_number = match start {
            StartAt::Number(number) => number,
            StartAt::Hash(hash) => match headers.values().find(|header| header.hash == hash) {
                Some(header) => header.number,
                None => return Vec::new(),
            },
        };

        let mut out = Vec::new();
        let step = (skip + 1).max(1);
        let mut cursor = start_number;
        while out.len() < max as usize {
            match headers.get(&cursor) {
                Some(header) => out.push(*header),
                None => break,
            }
            cursor = if reverse {
                match cursor.checked_sub(step) {
                    Some(next) => next,
                    None => break,
                }
            } else {
                cursor + step
            };
        }
        out
    }

    fn list_bodies_by_hashes(&self, hashes: &[H256]) -> Vec<Option<BlockBody>> {
        let bodies = self.bodies_by_hash.lock().expect("lock poisoned");
        hashes.iter().map(|hash| bodies.get(hash).cloned()).collect()
    }
}

/// The shared download queue, backed by plain in-memory collections.
#[derive(Default)]
pub struct FakeQueue {
    pending: Mutex<std::collections::VecDeque<BlockHeaderWrapper>>,
    headers: Mutex<Vec<(BlockHeader, PeerId)>>,
    blocks: Mutex<Vec<(Block, PeerId)>>,
    new_blocks: Mutex<Vec<(Block, PeerId)>>,
    last_header: Mutex<Option<BlockIdentifier>>,
    dropped_headers: Mutex<Vec<PeerId>>,
    dropped_blocks: Mutex<Vec<PeerId>>,
    reject_headers_from: SyncMutex<HashSet<PeerId>>,
    reject_blocks_from: SyncMutex<HashSet<PeerId>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_pending(&self, wrapper: BlockHeaderWrapper) {
        self.pending.lock().await.push_back(wrapper);
    }

    pub fn reject_headers_from(&self, peer_id: PeerId) {
        self.reject_headers_from.lock().expect("lock poisoned").insert(peer_id);
    }

    pub fn reject_blocks_from(&self, peer_id: PeerId) {
        self.reject_blocks_from.lock().expect("lock poisoned").insert(peer_id);
    }

    pub async fn accepted_headers(&self) -> Vec<(BlockHeader, PeerId)> {
        self.headers.lock().await.clone()
    }

    pub async fn accepted_blocks(&self) -> Vec<(Block, PeerId)> {
        self.blocks.lock().await.clone()
    }

    pub async fn dropped_headers_from(&self) -> Vec<PeerId> {
        self.dropped_headers.lock().await.clone()
    }

    pub async fn dropped_blocks_from(&self) -> Vec<PeerId> {
        self.dropped_blocks.lock().await.clone()
    }

    pub async fn returned_headers_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[async_trait]
impl DownloadQueue for FakeQueue {
    async fn poll_headers(&self) -> Option<Vec<BlockHeaderWrapper>> {
        let mut guard = self.pending.lock().await;
        if guard.is_empty() {
            None
        } else {
            Some(guard.drain(..).collect())
        }
    }

    async fn return_headers(&self, headers: Vec<BlockHeaderWrapper>) {
        self.pending.lock().await.extend(headers);
    }

    async fn validate_and_add_headers(
        &self,
        headers: Vec<BlockHeader>,
        peer_id: PeerId,
    ) -> Result<(), QueueError> {
        if self.reject_headers_from.lock().expect("lock poisoned").contains(&peer_id) {
            return Err(QueueError::RejectedHeaders(peer_id));
        }
        if let Some(last) = headers.last() {
            *self.last_header.lock().await = Some(last.id());
        }
        self.pending.lock().await.extend(
            headers
                .iter()
                .map(|header| BlockHeaderWrapper { header: *header, sent_by: peer_id }),
        );
        self.headers
            .lock()
            .await
            .extend(headers.into_iter().map(|header| (header, peer_id)));
        Ok(())
    }

    async fn add_list(&self, blocks: Vec<Block>, peer_id: PeerId) -> Result<(), QueueError> {
        if self.reject_blocks_from.lock().expect("lock poisoned").contains(&peer_id) {
            return Err(QueueError::RejectedBlocks(peer_id));
        }
        self.blocks
            .lock()
            .await
            .extend(blocks.into_iter().map(|block| (block, peer_id)));
        Ok(())
    }

    async fn validate_and_add_new_block(&self, block: Block, peer_id: PeerId) -> Result<(), QueueError> {
        if self.reject_blocks_from.lock().expect("lock poisoned").contains(&peer_id) {
            return Err(QueueError::RejectedBlocks(peer_id));
        }
        self.new_blocks.lock().await.push((block, peer_id));
        Ok(())
    }

    async fn last_header(&self) -> Option<BlockIdentifier> {
        *self.last_header.lock().await
    }

    async fn size(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn drop_headers(&self, peer_id: PeerId) {
        self.dropped_headers.lock().await.push(peer_id);
    }

    async fn drop_blocks(&self, peer_id: PeerId) {
        self.dropped_blocks.lock().await.push(peer_id);
    }
}

/// Records every status update and new-block-number notification it
/// receives.
#[derive(Default)]
pub struct FakeListener {
    statuses: Mutex<Vec<(PeerId, StatusRecord)>>,
    block_numbers: Mutex<Vec<u64>>,
}

impl FakeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn statuses(&self) -> Vec<(PeerId, StatusRecord)> {
        self.statuses.lock().await.clone()
    }

    pub async fn block_numbers(&self) -> Vec<u64> {
        self.block_numbers.lock().await.clone()
    }
}

#[async_trait]
impl SyncListener for FakeListener {
    async fn on_eth_status_updated(&self, peer_id: PeerId, status: StatusRecord) {
        self.statuses.lock().await.push((peer_id, status));
    }

    async fn on_new_block_number(&self, number: u64) {
        self.block_numbers.lock().await.push(number);
    }
}

/// Records every outbound message and disconnect instead of touching a real
/// socket.
#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<Message>>,
    disconnected_with: Mutex<Option<Option<DisconnectReason>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent_messages(&self) -> Vec<Message> {
        self.sent.lock().await.clone()
    }

    pub async fn disconnect_reason(&self) -> Option<Option<DisconnectReason>> {
        *self.disconnected_with.lock().await
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn send(&self, message: Message) -> Result<(), TransportError> {
        self.sent.lock().await.push(message);
        Ok(())
    }

    async fn disconnect(&self, reason: Option<DisconnectReason>) -> Result<(), TransportError> {
        *self.disconnected_with.lock().await = Some(reason);
        Ok(())
    }
}
