//! Response router (§4.3): dispatches an inbound message by command and,
//! for sync-relevant commands, by the handler's current phase/state.

use tracing::trace;

use crate::config::MAX_HEADER_REPLY;
use crate::error::{PeerHandlerError, ProtocolViolation};
use crate::handler::PeerHandler;
use crate::message::{Message, Transaction};
use crate::state::{HandshakePhase, SyncState};
use crate::types::{Block, BlockBody, BlockHeader, BlockIdentifier};

impl PeerHandler {
    pub(crate) async fn route_message(&mut self, message: Message) -> Result<(), PeerHandlerError> {
        match message {
            Message::Status(status) => self.handle_status(status).await,
            Message::NewBlockHashes(ids) => self.handle_new_block_hashes(ids).await,
            Message::Transactions(txs) => self.handle_transactions(txs).await,
            Message::GetBlockHeaders(request) => self.handle_get_headers(request).await,
            Message::GetBlockBodies(hashes) => self.handle_get_bodies(hashes).await,
            Message::BlockHeaders(headers) => self.handle_block_headers(headers).await,
            Message::BlockBodies(bodies) => self.handle_block_bodies(bodies).await,
            Message::NewBlock {
                header,
                body,
                announced_total_difficulty,
            } => {
                self.handle_new_block(header, body, announced_total_difficulty)
                    .await
            }
        }
    }

    async fn handle_new_block_hashes(
        &mut self,
        ids: Vec<BlockIdentifier>,
    ) -> Result<(), PeerHandlerError> {
        let bounds = ids
            .iter()
            .min_by_key(|id| id.number)
            .copied()
            .zip(ids.iter().max_by_key(|id| id.number).copied());

        let Some((first, last)) = bounds else {
            return Ok(());
        };
        self.advance_best_known_block(last);
        self.listener.on_new_block_number(last.number).await;

        if self.sync_done && self.sync_state != SyncState::HashRetrieving {
            self.send_get_headers_by_number(first.number, last.number - first.number + 1)
                .await?;
        }
        Ok(())
    }

    async fn handle_transactions(&self, txs: Vec<Transaction>) -> Result<(), PeerHandlerError> {
        if self.process_transactions {
            trace!(peer = %self.peer_id, count = txs.len(), "received transactions");
        } else {
            trace!(peer = %self.peer_id, "discarding transactions, forwarding disabled");
        }
        Ok(())
    }

    async fn handle_get_headers(
        &self,
        request: crate::types::GetHeadersRequest,
    ) -> Result<(), PeerHandlerError> {
        let max = request.max.min(MAX_HEADER_REPLY);
        let headers = self
            .chain
            .list_headers_from(request.start, request.skip, max, request.reverse);
        self.transport.send(Message::BlockHeaders(headers)).await?;
        Ok(())
    }

    async fn handle_get_bodies(&self, hashes: Vec<ethereum_types::H256>) -> Result<(), PeerHandlerError> {
        let bodies = self
            .chain
            .list_bodies_by_hashes(&hashes)
            .into_iter()
            .flatten()
            .collect();
        self.transport.send(Message::BlockBodies(bodies)).await?;
        Ok(())
    }

    /// §4.5 BLOCK_HEADERS dispatch table.
    async fn handle_block_headers(&mut self, headers: Vec<BlockHeader>) -> Result<(), PeerHandlerError> {
        let request = self
            .outstanding_headers_request
            .take()
            .ok_or(ProtocolViolation::UnsolicitedHeaders)?;
        self.validate_block_headers(&request, &headers)?;

        if self.handshake_phase == HandshakePhase::Init {
            if let Some(first) = headers.first() {
                self.advance_best_known_block(first.id());
            }
            self.handshake_phase = HandshakePhase::StatusSucceeded;
            return Ok(());
        }

        if !self.sync_done {
            return self.process_header_retrieving(headers).await;
        }
        if self.sync_state != SyncState::HashRetrieving {
            return self.process_new_block_headers(headers).await;
        }
        if !self.common_ancestor_found {
            return self.process_fork_coverage(headers).await;
        }
        self.process_gap_recovery(headers).await
    }

    /// §4.4/§4.3 BLOCK_BODIES handling: validate, merge, queue, pipeline.
    async fn handle_block_bodies(&mut self, bodies: Vec<BlockBody>) -> Result<(), PeerHandlerError> {
        self.validate_block_bodies_len(bodies.len()).await?;
        let blocks = self.merge_bodies_with_sent_headers(bodies).await?;

        if !blocks.is_empty() {
            self.queue
                .add_list(blocks, self.peer_id)
                .await
                .map_err(|_| ProtocolViolation::QueueRejectedBlocks)?;
        }

        if self.sync_state == SyncState::BlockRetrieving {
            self.send_get_bodies().await?;
        }
        Ok(())
    }

    async fn handle_new_block(
        &mut self,
        header: BlockHeader,
        body: BlockBody,
        announced_total_difficulty: ethereum_types::U256,
    ) -> Result<(), PeerHandlerError> {
        if announced_total_difficulty < self.chain.best_total_difficulty() {
            trace!(peer = %self.peer_id, "ignoring low-difficulty new block announcement");
            return Ok(());
        }
        self.advance_best_known_block(header.id());

        if self.sync_done {
            let block = Block::try_merge(header, body)
                .map_err(|_| ProtocolViolation::BodyHeaderMismatch)?;
            self.queue
                .validate_and_add_new_block(block, self.peer_id)
                .await
                .map_err(|_| ProtocolViolation::QueueRejectedBlocks)?;
        }
        Ok(())
    }
}
