//! Handshake phase and sync-phase enums, plus the sync state machine
//! (§3, §4.5, §9).

use tracing::debug;

use crate::error::PeerHandlerError;
use crate::handler::PeerHandler;
use crate::types::BlockHeader;

/// Handshake phase (§3 invariant): no sync request may be issued while
/// `Init`, except the initial best-block probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Init,
    StatusSucceeded,
    StatusFailed,
}

/// The peer's sync phase. Transitions are driven either externally (the
/// orchestrator calling `changeState`) or internally (response processing);
/// see §4.5 for the full transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    HashRetrieving,
    DoneHashRetrieving,
    BlockRetrieving,
}

impl PeerHandler {
    /// Externally driven transition (§4.5). Idempotent on equal input: no
    /// stats reset, no request emission (§8 universal property).
    pub async fn change_state(&mut self, new: SyncState) -> Result<(), PeerHandlerError> {
        if self.sync_state == new {
            return Ok(());
        }
        debug!(peer = %self.peer_id, ?new, "sync state transition");
        self.sync_state = new;
        match new {
            SyncState::HashRetrieving => self.start_header_retrieving().await,
            SyncState::BlockRetrieving => {
                self.send_get_bodies().await?;
                Ok(())
            }
            SyncState::Idle | SyncState::DoneHashRetrieving => Ok(()),
        }
    }

    /// §4.5: entering `HashRetrieving` resets the fork-recovery bookkeeping
    /// and starts a forward request from whichever of the queue's or the
    /// local chain's tip is higher.
    async fn start_header_retrieving(&mut self) -> Result<(), PeerHandlerError> {
        self.last_hash_to_ask = None;
        self.common_ancestor_found = true;

        let local_best = self.chain.best_block();
        let reference = match self.queue.last_header().await {
            Some(queued) if queued.number > local_best.number => queued,
            _ => local_best,
        };
        self.eldest_hash = Some(reference.hash);
        self.send_get_headers_by_number(reference.number + 1, self.config.max_hashes_ask)
            .await
    }

    /// §4.5 BLOCK_HEADERS dispatch, `syncDone=false` branch.
    pub(crate) async fn process_header_retrieving(
        &mut self,
        headers: Vec<BlockHeader>,
    ) -> Result<(), PeerHandlerError> {
        if headers.is_empty() {
            self.sync_state = SyncState::DoneHashRetrieving;
            return Ok(());
        }

        self.queue
            .validate_and_add_headers(headers.clone(), self.peer_id)
            .await
            .map_err(|_| crate::error::ProtocolViolation::QueueRejectedHeaders)?;

        if self.sync_state == SyncState::HashRetrieving {
            let last = headers
                .last()
                .expect("checked non-empty above");
            self.eldest_hash = Some(last.hash);
            self.send_get_headers_by_number(last.number + 1, self.config.max_hashes_ask)
                .await?;
        }
        Ok(())
    }

    /// §4.5 BLOCK_HEADERS dispatch, `syncState != HashRetrieving` branch:
    /// headers volunteered outside of long sync are appended with no
    /// follow-up request.
    pub(crate) async fn process_new_block_headers(
        &mut self,
        headers: Vec<BlockHeader>,
    ) -> Result<(), PeerHandlerError> {
        self.queue
            .validate_and_add_headers(headers, self.peer_id)
            .await
            .map_err(|_| crate::error::ProtocolViolation::QueueRejectedHeaders)?;
        Ok(())
    }
}
