//! Per-peer protocol handler for an Ethereum-style chain synchronization
//! subsystem: handshake negotiation, request dispatch, response validation
//! and routing, the sync state machine, and fork recovery.
//!
//! The six cooperating parts live in their own modules; all of them are
//! `impl` blocks on the single [`handler::PeerHandler`] type so a reader can
//! open any one file and see exactly one responsibility.

pub mod config;
pub mod error;
pub mod message;
pub mod sent_headers;
pub mod state;
pub mod traits;
pub mod types;

pub mod handler;

mod dispatcher;
mod fork;
mod handshake;
mod router;
mod validator;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{HandlerConfig, PeerDiscoveryMode};
pub use error::{PeerHandlerError, ProtocolViolation, QueueError, TransportError};
pub use handler::PeerHandler;
pub use message::{DisconnectReason, InboundEvent, Message, Transaction};
pub use state::{HandshakePhase, SyncState};
pub use traits::{ChainReader, DownloadQueue, PeerTransport, SyncListener};
pub use types::{
    Block, BlockBody, BlockHeader, BlockHeaderWrapper, BlockIdentifier, BodyMismatch,
    GetHeadersRequest, PeerId, StartAt, StatusRecord,
};
