//! Fork-recovery planner (§4.6): locates a common ancestor with a peer
//! whose advertised chain diverges from ours, or walks a positive gap
//! forward until normal header sync can resume.

use tracing::debug;

use crate::config::FORK_COVERAGE_BATCH;
use crate::error::{PeerHandlerError, ProtocolViolation};
use crate::handler::PeerHandler;
use crate::state::SyncState;
use crate::types::{BlockHeader, BlockIdentifier};

impl PeerHandler {
    /// Entered whenever the sync orchestrator learns of a block it cannot
    /// place on top of this peer's current chain of requests (§4.6). The
    /// orchestrator, not this crate, decides when a gap exists; this is the
    /// entrypoint it calls once it has.
    pub async fn recover_gap(&mut self, block: BlockIdentifier) -> Result<(), PeerHandlerError> {
        self.sync_state = SyncState::HashRetrieving;
        self.start_gap_recovery(block).await
    }

    async fn start_gap_recovery(&mut self, block: BlockIdentifier) -> Result<(), PeerHandlerError> {
        self.gap_block = Some(block);
        self.last_hash_to_ask = Some(block.hash);
        self.common_ancestor_found = false;
        self.eldest_hash = None;

        let local_best = self.chain.best_block();
        if self.is_negative_gap(block, local_best) {
            debug!(peer = %self.peer_id, gap = block.number, "negative gap, requesting fork coverage backwards");
            self.send_get_headers_by_hash(block.hash, FORK_COVERAGE_BATCH, 0, true)
                .await
        } else {
            let start = local_best.number.saturating_sub(FORK_COVERAGE_BATCH - 1);
            let max = FORK_COVERAGE_BATCH.min(local_best.number - start + 1);
            debug!(peer = %self.peer_id, start, max, "positive gap, requesting fork coverage forward");
            self.send_get_headers_by_number(start, max).await
        }
    }

    fn is_negative_gap(&self, gap_block: BlockIdentifier, local_best: BlockIdentifier) -> bool {
        gap_block.number <= local_best.number
    }

    /// §4.6 `processForkCoverage`.
    pub(crate) async fn process_fork_coverage(
        &mut self,
        mut headers: Vec<BlockHeader>,
    ) -> Result<(), PeerHandlerError> {
        let negative_gap = self
            .gap_block
            .map(|gap| self.is_negative_gap(gap, self.chain.best_block()))
            .unwrap_or(false);

        if !negative_gap {
            headers.reverse();
        } else if let Some(gap) = self.gap_block {
            match headers.first() {
                Some(first) if first.hash == gap.hash => {}
                _ => return Err(ProtocolViolation::ForkCoverageMissingGapBlock.into()),
            }
        }

        let mut accumulated = Vec::with_capacity(headers.len());
        let mut ancestor_found = false;
        for header in headers {
            if self.chain.is_block_exist(&header.hash) {
                ancestor_found = true;
                break;
            }
            accumulated.push(header);
        }

        if !ancestor_found {
            return Err(ProtocolViolation::NoCommonAncestorFound.into());
        }
        self.common_ancestor_found = true;

        if !accumulated.is_empty() {
            self.queue
                .validate_and_add_headers(accumulated, self.peer_id)
                .await
                .map_err(|_| ProtocolViolation::QueueRejectedHeaders)?;
        }

        if negative_gap {
            self.sync_state = SyncState::BlockRetrieving;
            self.send_get_bodies().await?;
        } else {
            let local_best = self.chain.best_block();
            self.send_get_headers_by_number(local_best.number + 1, self.config.max_hashes_ask)
                .await?;
        }
        Ok(())
    }

    /// §4.6 `processGapRecovery`: continues a forward walk until
    /// `lastHashToAsk` is reached, then hands off to block retrieval.
    pub(crate) async fn process_gap_recovery(
        &mut self,
        headers: Vec<BlockHeader>,
    ) -> Result<(), PeerHandlerError> {
        let reached_target = headers
            .iter()
            .any(|header| Some(header.hash) == self.last_hash_to_ask);

        if !headers.is_empty() {
            self.queue
                .validate_and_add_headers(headers.clone(), self.peer_id)
                .await
                .map_err(|_| ProtocolViolation::QueueRejectedHeaders)?;
        }

        if reached_target {
            self.sync_state = SyncState::BlockRetrieving;
            self.send_get_bodies().await?;
            return Ok(());
        }

        if let Some(last) = headers.last() {
            self.eldest_hash = Some(last.hash);
            self.send_get_headers_by_number(last.number + 1, self.config.max_hashes_ask)
                .await?;
        }
        Ok(())
    }
}
