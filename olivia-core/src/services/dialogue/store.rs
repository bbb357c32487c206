// File: olivia-core/src/services/dialogue/store.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::services::dialogue::state::ConversationState;

/// Exclusive access to one conversation. Hold the lock for the whole turn.
pub type ConversationHandle = Arc<Mutex<ConversationState>>;

pub trait ConversationStore: Send + Sync {
    fn get(&self, conversation_id: &str) -> Option<ConversationHandle>;

    /// Existing handle, or a fresh state created with `init`.
    fn get_or_create(
        &self,
        conversation_id: &str,
        init: &dyn Fn() -> ConversationState,
    ) -> ConversationHandle;

    fn put(&self, state: ConversationState) -> ConversationHandle;

    fn evict(&self, conversation_id: &str) -> bool;

    /// Drops conversations untouched for longer than `idle_for`. Conversations
    /// whose handle is checked out by a caller are in use and skipped.
    fn evict_idle(&self, idle_for: Duration, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sharded map of per-conversation mutexes. Turns on different conversations
/// never wait on each other.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<String, ConversationHandle>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get(&self, conversation_id: &str) -> Option<ConversationHandle> {
        self.conversations.get(conversation_id).map(|h| h.value().clone())
    }

    fn get_or_create(
        &self,
        conversation_id: &str,
        init: &dyn Fn() -> ConversationState,
    ) -> ConversationHandle {
        self.conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .value()
            .clone()
    }

    fn put(&self, state: ConversationState) -> ConversationHandle {
        let id = state.conversation_id.clone();
        let handle = Arc::new(Mutex::new(state));
        self.conversations.insert(id, handle.clone());
        handle
    }

    fn evict(&self, conversation_id: &str) -> bool {
        self.conversations.remove(conversation_id).is_some()
    }

    fn evict_idle(&self, idle_for: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - idle_for;
        let before = self.conversations.len();
        // Handles are only cloned out under the shard lock that `retain` holds,
        // so a count of one means no caller can be about to lock this entry.
        self.conversations.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(state) => state.last_touched >= cutoff,
                Err(_) => true,
            }
        });
        let evicted = before.saturating_sub(self.conversations.len());
        if evicted > 0 {
            debug!("evicted {} idle conversations", evicted);
        }
        evicted
    }

    fn len(&self) -> usize {
        self.conversations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str, touched: DateTime<Utc>) -> ConversationState {
        ConversationState::new(id, 12, touched)
    }

    #[tokio::test]
    async fn get_or_create_returns_same_handle() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        let a = store.get_or_create("c1", &|| state("c1", now));
        let b = store.get_or_create("c1", &|| state("c1", now));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
        assert!(store.evict("c1"));
        assert!(store.get("c1").is_none());
    }

    #[tokio::test]
    async fn evict_idle_skips_checked_out_handles() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        let stale = now - Duration::hours(2);

        let handle = store.get_or_create("c1", &|| state("c1", stale));
        assert_eq!(store.evict_idle(Duration::hours(1), now), 0);

        // the turn that checked it out still updates the stored conversation
        handle.lock().await.touch(now);
        let stored = store.get("c1").expect("still stored");
        assert!(Arc::ptr_eq(&handle, &stored));
        assert_eq!(stored.lock().await.last_touched, now);

        drop(handle);
        drop(stored);
        assert_eq!(store.evict_idle(Duration::minutes(30), now + Duration::hours(1)), 1);
        assert!(store.get("c1").is_none());
    }

    #[tokio::test]
    async fn evict_idle_skips_recent_and_busy() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        store.put(state("old", now - Duration::hours(2)));
        store.put(state("fresh", now));
        let busy = store.put(state("busy", now - Duration::hours(2)));

        let _guard = busy.lock().await;
        let evicted = store.evict_idle(Duration::hours(1), now);

        assert_eq!(evicted, 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
        assert!(store.get("busy").is_some());
    }
}
