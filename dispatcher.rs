//! Request dispatcher (§4.2): emits protocol requests and remembers enough
//! about each one for the validator to check the eventual response against.

use tracing::trace;

use crate::error::PeerHandlerError;
use crate::handler::PeerHandler;
use crate::message::Message;
use crate::state::SyncState;
use crate::types::{GetHeadersRequest, StartAt};

impl PeerHandler {
    pub(crate) async fn send_get_headers_by_number(
        &mut self,
        start_number: u64,
        max: u64,
    ) -> Result<(), PeerHandlerError> {
        self.send_get_headers(GetHeadersRequest {
            start: StartAt::Number(start_number),
            max,
            skip: 0,
            reverse: false,
        })
        .await
    }

    pub(crate) async fn send_get_headers_by_hash(
        &mut self,
        start_hash: ethereum_types::H256,
        max: u64,
        skip: u64,
        reverse: bool,
    ) -> Result<(), PeerHandlerError> {
        self.send_get_headers(GetHeadersRequest {
            start: StartAt::Hash(start_hash),
            max,
            skip,
            reverse,
        })
        .await
    }

    async fn send_get_headers(&mut self, request: GetHeadersRequest) -> Result<(), PeerHandlerError> {
        trace!(peer = %self.peer_id, ?request, "sending get_block_headers");
        self.outstanding_headers_request = Some(request);
        self.transport
            .send(Message::GetBlockHeaders(request))
            .await?;
        Ok(())
    }

    /// Drains up to one batch of headers awaiting bodies from the shared
    /// queue. An empty queue collapses the handler back to `Idle` rather
    /// than leaving it waiting on a request that was never sent (§4.2,
    /// §4.5, §7 kind 4).
    pub(crate) async fn send_get_bodies(&mut self) -> Result<bool, PeerHandlerError> {
        let Some(batch) = self.queue.poll_headers().await else {
            self.sync_state = SyncState::Idle;
            return Ok(false);
        };
        let hashes = batch.iter().map(|wrapper| wrapper.header.hash).collect();
        self.sent_headers.reserve(batch).await;
        trace!(peer = %self.peer_id, "sending get_block_bodies");
        self.transport.send(Message::GetBlockBodies(hashes)).await?;
        Ok(true)
    }
}
