//! The `PeerHandler`: one instance per peer connection (§3). The struct
//! itself and its lifecycle (construction, the top-level event loop,
//! disconnect/shutdown) live here; the six components described in §2 are
//! implemented as `impl PeerHandler` blocks spread across sibling modules so
//! each can be read (and changed) independently, the way the reference
//! client splits a connection actor's handshake, codec and message handling
//! into separate files around one `Established` state.

use std::sync::Arc;

use ethereum_types::H256;
use tracing::{debug, info, warn};

use crate::config::HandlerConfig;
use crate::error::{PeerHandlerError, ProtocolViolation};
use crate::message::{DisconnectReason, InboundEvent};
use crate::sent_headers::SentHeaders;
use crate::state::{HandshakePhase, SyncState};
use crate::traits::{ChainReader, DownloadQueue, PeerTransport, SyncListener};
use crate::types::{BlockIdentifier, GetHeadersRequest, PeerId};

pub struct PeerHandler {
    pub(crate) peer_id: PeerId,
    pub(crate) config: HandlerConfig,
    pub(crate) chain: Arc<dyn ChainReader>,
    pub(crate) queue: Arc<dyn DownloadQueue>,
    pub(crate) listener: Arc<dyn SyncListener>,
    pub(crate) transport: Arc<dyn PeerTransport>,

    pub(crate) sent_headers: SentHeaders,

    pub(crate) handshake_phase: HandshakePhase,
    pub(crate) sync_state: SyncState,
    pub(crate) sync_done: bool,
    pub(crate) process_transactions: bool,

    pub(crate) outstanding_headers_request: Option<GetHeadersRequest>,
    pub(crate) best_known_block: Option<BlockIdentifier>,
    pub(crate) eldest_hash: Option<H256>,
    pub(crate) last_hash_to_ask: Option<H256>,
    pub(crate) common_ancestor_found: bool,
    pub(crate) gap_block: Option<BlockIdentifier>,

    /// Set once a drop has been decided, so a handler is never torn down
    /// twice and never keeps routing messages after being dropped.
    pub(crate) detached: bool,
}

impl PeerHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer_id: PeerId,
        config: HandlerConfig,
        chain: Arc<dyn ChainReader>,
        queue: Arc<dyn DownloadQueue>,
        listener: Arc<dyn SyncListener>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            peer_id,
            config,
            chain,
            queue,
            listener,
            transport,
            sent_headers: SentHeaders::new(),
            handshake_phase: HandshakePhase::Init,
            sync_state: SyncState::Idle,
            sync_done: false,
            process_transactions: true,
            outstanding_headers_request: None,
            best_known_block: None,
            eldest_hash: None,
            last_hash_to_ask: None,
            common_ancestor_found: true,
            gap_block: None,
            detached: false,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn handshake_phase(&self) -> HandshakePhase {
        self.handshake_phase
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn best_known_block(&self) -> Option<BlockIdentifier> {
        self.best_known_block
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn sync_done(&self) -> bool {
        self.sync_done
    }

    /// Set by the sync orchestrator once the local chain has caught up to
    /// its peers; gates the long-sync-only checks in §4.4/§4.5.
    pub fn set_sync_done(&mut self, done: bool) {
        self.sync_done = done;
    }

    pub fn set_process_transactions(&mut self, enabled: bool) {
        self.process_transactions = enabled;
    }

    /// `bestKnownBlock` only ever advances (§3 invariant).
    pub(crate) fn advance_best_known_block(&mut self, candidate: BlockIdentifier) {
        let should_replace = match self.best_known_block {
            Some(current) => candidate.number > current.number,
            None => true,
        };
        if should_replace {
            self.best_known_block = Some(candidate);
        }
    }

    /// Called once on connection activation: sends our `STATUS` and leaves
    /// the handshake phase at `Init` until the peer's `STATUS` arrives
    /// (§4.1).
    pub async fn activate(&mut self) -> Result<(), PeerHandlerError> {
        self.send_status().await
    }

    /// The single entrypoint a transport-driving loop calls for every event
    /// it receives for this connection. Messages are processed one at a time
    /// and in receive order (§5); protocol violations are absorbed here and
    /// turned into a disconnect rather than bubbled to the caller.
    pub async fn handle_event(&mut self, event: InboundEvent) -> Result<(), PeerHandlerError> {
        if self.detached {
            debug!(peer = %self.peer_id, "handler already detached, ignoring event");
            return Ok(());
        }
        match event {
            InboundEvent::Message(message) => match self.route_message(message).await {
                Ok(()) => Ok(()),
                Err(PeerHandlerError::Protocol(violation)) => {
                    self.drop_connection(violation).await
                }
                Err(other) => Err(other),
            },
            InboundEvent::PeerDisconnected => {
                info!(peer = %self.peer_id, "peer disconnected");
                self.shutdown(false).await;
                Ok(())
            }
        }
    }

    /// §7 error kind 2: any validator rejection or queue rejection drops the
    /// connection, reclaims `sentHeaders`, and tells the queue to drop this
    /// peer's contributions.
    pub(crate) async fn drop_connection(
        &mut self,
        violation: ProtocolViolation,
    ) -> Result<(), PeerHandlerError> {
        warn!(peer = %self.peer_id, reason = %violation, "dropping peer connection");
        self.shutdown(true).await;
        self.transport
            .disconnect(Some(DisconnectReason::UselessPeer))
            .await?;
        Ok(())
    }

    /// §5 cancellation: on any disconnect (peer-initiated, protocol drop, or
    /// supervisor shutdown) sync state collapses to `Idle` and every
    /// outstanding header is returned to the shared queue. When the peer was
    /// judged bad, the queue additionally drops headers/blocks attributed to
    /// it.
    pub async fn shutdown(&mut self, peer_was_bad: bool) {
        if self.detached {
            return;
        }
        self.detached = true;
        self.sync_state = SyncState::Idle;
        let returned = self.sent_headers.drain().await;
        if !returned.is_empty() {
            self.queue.return_headers(returned).await;
        }
        if peer_was_bad {
            self.queue.drop_headers(self.peer_id).await;
            self.queue.drop_blocks(self.peer_id).await;
        }
    }
}
