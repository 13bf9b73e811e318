//! Handshake controller (§4.1): negotiates protocol version, network id and
//! genesis before any sync request is allowed to leave the handler.

use tracing::{info, trace};

use crate::config::PeerDiscoveryMode;
use crate::error::PeerHandlerError;
use crate::handler::PeerHandler;
use crate::message::{DisconnectReason, Message};
use crate::state::HandshakePhase;
use crate::types::{GetHeadersRequest, StartAt, StatusRecord};

impl PeerHandler {
    pub(crate) async fn send_status(&self) -> Result<(), PeerHandlerError> {
        let status = StatusRecord {
            protocol_version: self.config.protocol_version,
            network_id: self.config.network_id,
            total_difficulty: self.chain.best_total_difficulty(),
            best_hash: self.chain.best_block().hash,
            genesis_hash: self.chain.genesis_hash(),
        };
        trace!(peer = %self.peer_id, "sending status");
        self.transport.send(Message::Status(status)).await?;
        Ok(())
    }

    pub(crate) async fn handle_status(
        &mut self,
        status: StatusRecord,
    ) -> Result<(), PeerHandlerError> {
        if status.genesis_hash != self.config.genesis_hash
            || status.protocol_version != self.config.protocol_version
        {
            self.handshake_phase = HandshakePhase::StatusFailed;
            info!(peer = %self.peer_id, "incompatible protocol, disconnecting");
            self.shutdown(false).await;
            self.transport
                .disconnect(Some(DisconnectReason::IncompatibleProtocol))
                .await?;
            return Ok(());
        }

        if status.network_id != self.config.network_id {
            self.handshake_phase = HandshakePhase::StatusFailed;
            info!(peer = %self.peer_id, "network id mismatch, disconnecting");
            self.shutdown(false).await;
            self.transport
                .disconnect(Some(DisconnectReason::NullIdentity))
                .await?;
            return Ok(());
        }

        if self.config.peer_discovery_mode == PeerDiscoveryMode::DiscoveryOnly {
            info!(peer = %self.peer_id, "discovery-only mode, disconnecting");
            self.shutdown(false).await;
            self.transport
                .disconnect(Some(DisconnectReason::Requested))
                .await?;
            return Ok(());
        }

        self.listener
            .on_eth_status_updated(self.peer_id, status)
            .await;

        let probe = GetHeadersRequest {
            start: StartAt::Hash(status.best_hash),
            max: 1,
            skip: 0,
            reverse: false,
        };
        self.outstanding_headers_request = Some(probe);
        self.transport
            .send(Message::GetBlockHeaders(probe))
            .await?;
        Ok(())
    }
}
