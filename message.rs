//! Wire protocol messages (§6). Encoding/decoding is out of scope: messages
//! are treated as typed records that already arrived framed and decoded.

use ethereum_types::{H256, U256};

use crate::types::{BlockBody, BlockHeader, BlockIdentifier, GetHeadersRequest, StatusRecord};

/// An opaque transaction payload; transaction content and validation are out
/// of scope for this crate.
pub type Transaction = Vec<u8>;

/// Reasons carried on the wire by a `Disconnect` frame. Only the reasons the
/// handler itself produces or reacts to are modeled (§6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    IncompatibleProtocol,
    NullIdentity,
    Requested,
    UselessPeer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Status(StatusRecord),
    NewBlockHashes(Vec<BlockIdentifier>),
    Transactions(Vec<Transaction>),
    GetBlockHeaders(GetHeadersRequest),
    BlockHeaders(Vec<BlockHeader>),
    GetBlockBodies(Vec<H256>),
    BlockBodies(Vec<BlockBody>),
    NewBlock {
        header: BlockHeader,
        body: BlockBody,
        announced_total_difficulty: U256,
    },
}

/// An event delivered by the transport layer. Besides decoded protocol
/// messages, the transport also reports the peer hanging up, which is the
/// one cancellation primitive this crate recognizes (§5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(Message),
    PeerDisconnected,
}
