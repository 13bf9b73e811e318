//! Response validator (§4.4): checks every header/body response against the
//! exact request that solicited it before any state transition or queue
//! hand-off is allowed to happen.

use crate::error::ProtocolViolation;
use crate::handler::PeerHandler;
use crate::state::SyncState;
use crate::types::{Block, BlockBody, BlockHeader, GetHeadersRequest, StartAt};

impl PeerHandler {
    pub(crate) fn validate_block_headers(
        &self,
        request: &GetHeadersRequest,
        headers: &[BlockHeader],
    ) -> Result<(), ProtocolViolation> {
        if headers.len() as u64 > request.max {
            return Err(ProtocolViolation::TooManyHeaders);
        }

        if headers.is_empty() {
            let withheld_known_data = match (self.best_known_block, request.start) {
                (None, _) => true,
                (Some(best), StartAt::Number(start_number)) => start_number <= best.number,
                _ => false,
            };
            if withheld_known_data {
                return Err(ProtocolViolation::EmptyInitialProbe);
            }
            return Ok(());
        }

        match request.start {
            StartAt::Hash(start_hash) if request.skip == 0 => {
                if headers[0].hash != start_hash {
                    return Err(ProtocolViolation::StartHashMismatch);
                }
            }
            StartAt::Number(start_number) => {
                if headers[0].number != start_number + request.skip {
                    return Err(ProtocolViolation::StartNumberMismatch);
                }
            }
            StartAt::Hash(_) => {}
        }

        if !self.sync_done {
            if let (Some(eldest), StartAt::Number(_)) = (self.eldest_hash, request.start) {
                if headers[0].parent_hash != eldest {
                    return Err(ProtocolViolation::NotDescendedFromEldest);
                }
            }
        }

        if self.sync_state == SyncState::HashRetrieving {
            for window in headers.windows(2) {
                let (previous, current) = (window[0], window[1]);
                let chained = if request.reverse {
                    current.number == previous.number - 1 && previous.parent_hash == current.hash
                } else {
                    current.number == previous.number + 1 && current.parent_hash == previous.hash
                };
                if !chained {
                    return Err(ProtocolViolation::HeadersNotChained);
                }
            }
        }

        Ok(())
    }

    /// §4.4 BLOCK_BODIES validation: computes `expectedCount` against
    /// `bestKnownBlock` in long sync, and separately rejects a short
    /// response when the missing slot was supplied by this very peer.
    pub(crate) async fn validate_block_bodies_len(&self, body_count: usize) -> Result<(), ProtocolViolation> {
        let sent = self.sent_headers.snapshot().await;

        if !self.sync_done {
            let best_number = self.best_known_block.map(|b| b.number);
            let expected_count = sent
                .iter()
                .take_while(|wrapper| Some(wrapper.header.number) <= best_number)
                .count();
            if body_count < expected_count {
                return Err(ProtocolViolation::TooFewBodies);
            }
        }

        if body_count < sent.len() {
            if let Some(missing) = sent.get(body_count) {
                if missing.sent_by == self.peer_id {
                    return Err(ProtocolViolation::OwesOwnBodies);
                }
            }
        }

        Ok(())
    }

    /// Walks bodies and outstanding headers in lockstep, merging pairs into
    /// `Block`s and dropping the matched prefix of `sentHeaders` on success
    /// (§4.4 Merge).
    pub(crate) async fn merge_bodies_with_sent_headers(
        &self,
        bodies: Vec<BlockBody>,
    ) -> Result<Vec<Block>, ProtocolViolation> {
        let sent = self.sent_headers.snapshot().await;
        let mut merged = Vec::with_capacity(bodies.len());
        for (wrapper, body) in sent.iter().zip(bodies) {
            let block = Block::try_merge(wrapper.header, body)
                .map_err(|_| ProtocolViolation::BodyHeaderMismatch)?;
            merged.push(block);
        }
        self.sent_headers.remove_front(merged.len()).await;
        Ok(merged)
    }
}
