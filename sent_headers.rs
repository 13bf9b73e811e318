//! `sentHeaders`: the ordered sequence of headers awaiting a body response
//! (§3, §5, §9). Guarded by a mutex because the shutdown path runs on the
//! supervisor's task, not the handler's own message-processing path.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::types::BlockHeaderWrapper;

#[derive(Debug, Default)]
pub struct SentHeaders {
    inner: Mutex<VecDeque<BlockHeaderWrapper>>,
}

impl SentHeaders {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Records a freshly dispatched `GET_BLOCK_BODIES` batch as outstanding.
    pub async fn reserve(&self, headers: Vec<BlockHeaderWrapper>) {
        let mut guard = self.inner.lock().await;
        guard.clear();
        guard.extend(headers);
    }

    /// Drains every outstanding wrapper, returning them so the caller can
    /// hand them back to the shared queue. Used on shutdown/protocol-drop
    /// (§5, §7) and is the only place `sentHeaders` is emptied wholesale.
    pub async fn drain(&self) -> Vec<BlockHeaderWrapper> {
        let mut guard = self.inner.lock().await;
        guard.drain(..).collect()
    }

    /// Snapshot of the wrappers currently outstanding, for the validator to
    /// check against an incoming `BLOCK_BODIES` response.
    pub async fn snapshot(&self) -> Vec<BlockHeaderWrapper> {
        self.inner.lock().await.iter().copied().collect()
    }

    /// Removes the first `count` wrappers after a successful merge, leaving
    /// any unmatched tail in place for a follow-up response (§4.4).
    pub async fn remove_front(&self, count: usize) {
        let mut guard = self.inner.lock().await;
        for _ in 0..count {
            guard.pop_front();
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::H256;

    fn wrapper(n: u64, sent_by: u64) -> BlockHeaderWrapper {
        BlockHeaderWrapper {
            header: crate::types::BlockHeader {
                number: n,
                hash: H256::from_low_u64_be(n),
                parent_hash: H256::from_low_u64_be(n.saturating_sub(1)),
                body_commitment: H256::from_low_u64_be(n),
            },
            sent_by: H256::from_low_u64_be(sent_by),
        }
    }

    #[tokio::test]
    async fn reserve_replaces_previous_batch() {
        let sent = SentHeaders::new();
        sent.reserve(vec![wrapper(1, 1)]).await;
        sent.reserve(vec![wrapper(2, 1), wrapper(3, 1)]).await;
        assert_eq!(sent.len().await, 2);
    }

    #[tokio::test]
    async fn drain_empties_and_returns_all() {
        let sent = SentHeaders::new();
        sent.reserve(vec![wrapper(1, 1), wrapper(2, 1)]).await;
        let drained = sent.drain().await;
        assert_eq!(drained.len(), 2);
        assert!(sent.is_empty().await);
    }

    #[tokio::test]
    async fn remove_front_leaves_unmatched_tail() {
        let sent = SentHeaders::new();
        sent.reserve(vec![wrapper(1, 1), wrapper(2, 1), wrapper(3, 1)])
            .await;
        sent.remove_front(2).await;
        let remaining = sent.snapshot().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].header.number, 3);
    }
}
