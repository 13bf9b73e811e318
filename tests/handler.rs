//! End-to-end scenarios driven entirely through `PeerHandler`'s public API
//! against the in-memory fakes, mirroring the scenario table this handler
//! is specified against.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use ethereum_types::{H256, U256};

use eth_peer_sync::testing::{FakeChain, FakeListener, FakeQueue, FakeTransport};
use eth_peer_sync::{
    Block, BlockBody, BlockHeader, BlockHeaderWrapper, BlockIdentifier, ChainReader,
    DisconnectReason, GetHeadersRequest, HandlerConfig, HandshakePhase, InboundEvent, Message,
    PeerDiscoveryMode, PeerHandler, StartAt, StatusRecord, SyncState,
};

fn hash(byte: u8) -> H256 {
    H256::from_low_u64_be(byte as u64)
}

fn hash64(n: u64) -> H256 {
    H256::from_low_u64_be(n)
}

fn config(genesis_hash: H256) -> HandlerConfig {
    HandlerConfig {
        protocol_version: 68,
        network_id: 1,
        genesis_hash,
        max_hashes_ask: 3,
        peer_discovery_mode: PeerDiscoveryMode::Full,
    }
}

#[allow(dead_code)]
struct Harness {
    handler: PeerHandler,
    chain: Arc<FakeChain>,
    queue: Arc<FakeQueue>,
    listener: Arc<FakeListener>,
    transport: Arc<FakeTransport>,
}

fn build_harness(genesis_hash: H256, peer_id: H256) -> Harness {
    let chain = Arc::new(FakeChain::new(genesis_hash));
    let queue = Arc::new(FakeQueue::new());
    let listener = Arc::new(FakeListener::new());
    let transport = Arc::new(FakeTransport::new());
    let handler = PeerHandler::new(
        peer_id,
        config(genesis_hash),
        chain.clone(),
        queue.clone(),
        listener.clone(),
        transport.clone(),
    );
    Harness {
        handler,
        chain,
        queue,
        listener,
        transport,
    }
}

fn header(number: u64, hash: H256, parent_hash: H256) -> BlockHeader {
    BlockHeader {
        number,
        hash,
        parent_hash,
        body_commitment: hash,
    }
}

#[tokio::test]
async fn scenario_1_handshake_mismatch_disconnects() {
    let mut h = build_harness(hash(0xBB), hash(1));
    h.handler.activate().await.unwrap();

    let peer_status = StatusRecord {
        protocol_version: 68,
        network_id: 1,
        total_difficulty: U256::from(10),
        best_hash: hash(0xCC),
        genesis_hash: hash(0xAA),
    };
    h.handler
        .handle_event(InboundEvent::Message(Message::Status(peer_status)))
        .await
        .unwrap();

    assert_eq!(
        h.transport.disconnect_reason().await,
        Some(Some(DisconnectReason::IncompatibleProtocol))
    );
    assert!(h.handler.is_detached());
}

#[tokio::test]
async fn scenario_2_initial_probe_sets_best_known_block_and_completes_handshake() {
    let genesis = hash(0xAA);
    let mut h = build_harness(genesis, hash(1));
    h.chain.set_best(BlockIdentifier::new(100, hash(10)), U256::from(100));
    h.handler.activate().await.unwrap();

    let peer_status = StatusRecord {
        protocol_version: 68,
        network_id: 1,
        total_difficulty: U256::from(200),
        best_hash: hash(0xCC),
        genesis_hash: genesis,
    };
    h.handler
        .handle_event(InboundEvent::Message(Message::Status(peer_status)))
        .await
        .unwrap();

    let sent = h.transport.sent_messages().await;
    assert!(matches!(
        sent.last(),
        Some(Message::GetBlockHeaders(GetHeadersRequest {
            start: StartAt::Hash(h),
            max: 1,
            skip: 0,
            reverse: false,
        })) if *h == hash(0xCC)
    ));

    let probe_reply = header(1000, hash(0xCC), hash(0xCB));
    h.handler
        .handle_event(InboundEvent::Message(Message::BlockHeaders(vec![
            probe_reply,
        ])))
        .await
        .unwrap();

    assert_eq!(h.handler.handshake_phase(), HandshakePhase::StatusSucceeded);
    assert_eq!(
        h.handler.best_known_block(),
        Some(BlockIdentifier::new(1000, hash(0xCC)))
    );
}

async fn complete_handshake(h: &mut Harness) {
    h.handler.activate().await.unwrap();
    let peer_status = StatusRecord {
        protocol_version: 68,
        network_id: 1,
        total_difficulty: U256::from(1),
        best_hash: hash(0xEE),
        genesis_hash: h.chain.genesis_hash(),
    };
    h.handler
        .handle_event(InboundEvent::Message(Message::Status(peer_status)))
        .await
        .unwrap();
    let probe_reply = header(1, hash(0xEE), hash(0xED));
    h.handler
        .handle_event(InboundEvent::Message(Message::BlockHeaders(vec![
            probe_reply,
        ])))
        .await
        .unwrap();
    assert_eq!(h.handler.handshake_phase(), HandshakePhase::StatusSucceeded);
}

#[tokio::test]
async fn scenario_3_forward_header_sync_chains_and_pipelines_next_request() {
    let genesis = hash(0xAA);
    let h0 = hash(100);
    let mut h = build_harness(genesis, hash(1));
    h.chain.set_best(BlockIdentifier::new(100, h0), U256::from(100));
    complete_handshake(&mut h).await;

    h.handler.change_state(SyncState::HashRetrieving).await.unwrap();
    let sent = h.transport.sent_messages().await;
    assert!(matches!(
        sent.last(),
        Some(Message::GetBlockHeaders(GetHeadersRequest {
            start: StartAt::Number(101),
            max: 3,
            ..
        }))
    ));

    let h1 = header(101, hash(101), h0);
    let h2 = header(102, hash(102), hash(101));
    let h3 = header(103, hash(103), hash(102));
    h.handler
        .handle_event(InboundEvent::Message(Message::BlockHeaders(vec![
            h1, h2, h3,
        ])))
        .await
        .unwrap();

    assert_eq!(h.queue.accepted_headers().await.len(), 3);
    let sent = h.transport.sent_messages().await;
    assert!(matches!(
        sent.last(),
        Some(Message::GetBlockHeaders(GetHeadersRequest {
            start: StartAt::Number(104),
            max: 3,
            ..
        }))
    ));
    assert!(!h.handler.is_detached());
}

#[tokio::test]
async fn scenario_4_bad_chaining_drops_connection() {
    let genesis = hash(0xAA);
    let h0 = hash(100);
    let peer_id = hash(1);
    let mut h = build_harness(genesis, peer_id);
    h.chain.set_best(BlockIdentifier::new(100, h0), U256::from(100));
    complete_handshake(&mut h).await;
    h.handler.change_state(SyncState::HashRetrieving).await.unwrap();

    let h1 = header(101, hash(101), h0);
    let h2 = header(102, hash(102), hash(0xFF)); // wrong parent
    let h3 = header(103, hash(103), hash(102));
    h.handler
        .handle_event(InboundEvent::Message(Message::BlockHeaders(vec![
            h1, h2, h3,
        ])))
        .await
        .unwrap();

    assert!(h.handler.is_detached());
    assert_eq!(
        h.transport.disconnect_reason().await,
        Some(Some(DisconnectReason::UselessPeer))
    );
    assert_eq!(h.queue.dropped_headers_from().await, vec![peer_id]);
    assert_eq!(h.queue.dropped_blocks_from().await, vec![peer_id]);
}

#[tokio::test]
async fn scenario_5_negative_gap_fork_recovery_finds_common_ancestor() {
    let genesis = hash(0xAA);
    let peer_id = hash(1);
    let mut h = build_harness(genesis, peer_id);
    h.chain.set_best(BlockIdentifier::new(500, hash64(200)), U256::from(500));
    complete_handshake(&mut h).await;
    h.handler.set_sync_done(true);

    // Local chain already has the header at number 480.
    let ancestor = header(480, hash64(480), hash64(479));
    h.chain.insert_header(ancestor);

    let gap_block = BlockIdentifier::new(490, hash64(490));
    h.handler.recover_gap(gap_block).await.unwrap();

    let sent = h.transport.sent_messages().await;
    assert!(matches!(
        sent.last(),
        Some(Message::GetBlockHeaders(GetHeadersRequest {
            start: StartAt::Hash(start),
            max: 192,
            skip: 0,
            reverse: true,
        })) if *start == hash64(490)
    ));

    // 490 down to 480, descending, chained in reverse.
    let mut response = Vec::new();
    for number in (481..=490u64).rev() {
        response.push(header(number, hash64(number), hash64(number - 1)));
    }
    response.push(ancestor);

    h.handler
        .handle_event(InboundEvent::Message(Message::BlockHeaders(response)))
        .await
        .unwrap();

    assert_eq!(h.queue.accepted_headers().await.len(), 10);
    assert_eq!(h.handler.sync_state(), SyncState::BlockRetrieving);
    assert!(!h.handler.is_detached());
}

#[tokio::test]
async fn scenario_6_bodies_partial_response_rejected_when_peer_owes_its_own_body() {
    let genesis = hash(0xAA);
    let peer_id = hash(1);
    let mut h = build_harness(genesis, peer_id);
    h.handler.set_sync_done(true);

    for number in 1..=5u64 {
        let wrapper = BlockHeaderWrapper {
            header: header(number, hash(number as u8), hash((number - 1) as u8)),
            sent_by: peer_id,
        };
        h.queue.push_pending(wrapper).await;
    }

    h.handler.change_state(SyncState::BlockRetrieving).await.unwrap();
    assert_eq!(h.handler.sync_state(), SyncState::BlockRetrieving);

    let bodies: Vec<BlockBody> = (1..=3u64)
        .map(|n| BlockBody {
            commitment: hash(n as u8),
            payload: vec![n as u8],
        })
        .collect();

    h.handler
        .handle_event(InboundEvent::Message(Message::BlockBodies(bodies)))
        .await
        .unwrap();

    assert!(h.handler.is_detached());
    assert_eq!(h.queue.returned_headers_count().await, 5);
    assert_eq!(h.queue.dropped_headers_from().await, vec![peer_id]);
}

#[tokio::test]
async fn scenario_7_low_difficulty_new_block_is_ignored() {
    let genesis = hash(0xAA);
    let mut h = build_harness(genesis, hash(1));
    h.chain.set_best(BlockIdentifier::new(10, hash(10)), U256::from(100));

    let new_header = header(11, hash(11), hash(10));
    let body = BlockBody {
        commitment: hash(11),
        payload: vec![1, 2, 3],
    };
    h.handler
        .handle_event(InboundEvent::Message(Message::NewBlock {
            header: new_header,
            body,
            announced_total_difficulty: U256::from(99),
        }))
        .await
        .unwrap();

    assert!(h.transport.disconnect_reason().await.is_none());
    assert!(h.queue.accepted_blocks().await.is_empty());
    assert_eq!(h.handler.best_known_block(), None);
}

#[tokio::test]
async fn change_state_is_idempotent_on_equal_input() {
    let genesis = hash(0xAA);
    let mut h = build_harness(genesis, hash(1));
    h.chain.set_best(BlockIdentifier::new(10, hash(10)), U256::from(100));

    h.handler.change_state(SyncState::HashRetrieving).await.unwrap();
    let first_len = h.transport.sent_messages().await.len();

    h.handler.change_state(SyncState::HashRetrieving).await.unwrap();
    let second_len = h.transport.sent_messages().await.len();

    assert_eq!(first_len, second_len);
}

#[tokio::test]
async fn best_known_block_is_monotonically_non_decreasing() {
    let genesis = hash(0xAA);
    let mut h = build_harness(genesis, hash(1));
    complete_handshake(&mut h).await;

    assert_eq!(
        h.handler.best_known_block(),
        Some(BlockIdentifier::new(1, hash(0xEE)))
    );

    h.handler
        .handle_event(InboundEvent::Message(Message::NewBlockHashes(vec![
            BlockIdentifier::new(0, hash(5)),
        ])))
        .await
        .unwrap();

    // A lower-numbered announcement never regresses bestKnownBlock.
    assert_eq!(
        h.handler.best_known_block(),
        Some(BlockIdentifier::new(1, hash(0xEE)))
    );
}

#[tokio::test]
async fn merged_block_hash_round_trips_the_requested_header() {
    let h0 = header(1, hash(1), hash(0));
    let body = BlockBody {
        commitment: hash(1),
        payload: vec![9],
    };
    let block = Block::try_merge(h0, body).unwrap();
    assert_eq!(block.hash(), h0.hash);
}
