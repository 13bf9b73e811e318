//! Configuration surface consumed by the handler (§6). Loading this from a
//! file or environment is the orchestrator's job and out of scope here.

use ethereum_types::H256;

/// Whether a node only wants to be discovered by other peers, without
/// actually driving chain sync against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerDiscoveryMode {
    Full,
    DiscoveryOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Our own protocol version; incompatible peers are disconnected (§4.1).
    pub protocol_version: u32,
    pub network_id: u64,
    pub genesis_hash: H256,
    /// How many headers to ask for in a single forward-sync request (§4.5).
    pub max_hashes_ask: u64,
    pub peer_discovery_mode: PeerDiscoveryMode,
}

/// Server-side reply cap for `GET_BLOCK_HEADERS` (§6).
pub const MAX_HEADER_REPLY: u64 = 65_536;

/// Size of a fork-recovery coverage batch (§4.6).
pub const FORK_COVERAGE_BATCH: u64 = 192;
