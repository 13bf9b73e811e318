use crate::types::PeerId;

/// Failures raised by a [`crate::traits::PeerTransport`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to send message to peer: {0}")]
    Send(String),
    #[error("peer connection already closed")]
    AlreadyClosed,
}

/// Failures raised by a [`crate::traits::DownloadQueue`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue rejected headers from peer {0}")]
    RejectedHeaders(PeerId),
    #[error("queue rejected blocks from peer {0}")]
    RejectedBlocks(PeerId),
}

/// A validator or state-machine rejection that must drop the connection.
///
/// This is kept separate from [`PeerHandlerError`] so that call sites can
/// tell "this peer broke the protocol" apart from "the transport/queue is
/// unavailable" without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("peer genesis hash does not match ours")]
    GenesisMismatch,
    #[error("peer protocol version is not supported")]
    VersionMismatch,
    #[error("peer network id does not match ours")]
    NetworkIdMismatch,
    #[error("received more headers than requested")]
    TooManyHeaders,
    #[error("received headers with no outstanding request")]
    UnsolicitedHeaders,
    #[error("initial probe returned an empty response")]
    EmptyInitialProbe,
    #[error("peer withheld headers it is known to have")]
    WithheldHeaders,
    #[error("first returned header does not match the requested start hash")]
    StartHashMismatch,
    #[error("first returned header does not match the requested start number")]
    StartNumberMismatch,
    #[error("first returned header does not descend from the last header we hold")]
    NotDescendedFromEldest,
    #[error("returned headers are not chained to one another")]
    HeadersNotChained,
    #[error("peer returned fewer bodies than the sync phase required")]
    TooFewBodies,
    #[error("peer owes bodies for headers it supplied itself")]
    OwesOwnBodies,
    #[error("a header/body pair could not be merged into a block")]
    BodyHeaderMismatch,
    #[error("fork-coverage response does not start at the gap block")]
    ForkCoverageMissingGapBlock,
    #[error("fork-coverage response never reached a known ancestor")]
    NoCommonAncestorFound,
    #[error("queue rejected validated headers")]
    QueueRejectedHeaders,
    #[error("queue rejected validated blocks")]
    QueueRejectedBlocks,
}

/// Top-level error for the peer handler.
///
/// Protocol violations ([`ProtocolViolation`]) are always handled internally
/// by dropping the connection — they are surfaced here only so the
/// supervising loop can log what happened and decide to stop processing.
/// Transport/queue errors represent genuine infrastructure failures and may
/// warrant a different response from the supervisor (e.g. reconnect).
#[derive(Debug, thiserror::Error)]
pub enum PeerHandlerError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
