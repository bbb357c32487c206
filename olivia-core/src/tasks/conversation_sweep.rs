// olivia-core/src/tasks/conversation_sweep.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::services::dialogue::ConversationStore;
use crate::utils::time::Clock;

/// Spawns a background task that drops conversations idle for longer than `ttl`,
/// measured against `clock`.
pub fn spawn_conversation_sweep_task(
    store: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let idle_for = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(1));
    tokio::spawn(async move {
        info!("conversation sweep every {:?}, ttl {:?}", interval, ttl);
        loop {
            sleep(interval).await;
            let evicted = store.evict_idle(idle_for, clock.now());
            if evicted > 0 {
                info!("swept {} idle conversations ({} remain)", evicted, store.len());
            } else {
                debug!("conversation sweep: nothing idle");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::services::dialogue::{ConversationState, InMemoryConversationStore};
    use crate::utils::time::FixedClock;

    #[tokio::test]
    async fn sweeps_idle_conversations_by_injected_clock() {
        let now = Utc
            .with_ymd_and_hms(2025, 1, 8, 15, 0, 0)
            .single()
            .expect("valid instant");
        let store = Arc::new(InMemoryConversationStore::new());
        store.put(ConversationState::new("stale", 12, now - chrono::Duration::hours(3)));
        store.put(ConversationState::new("live", 12, now - chrono::Duration::minutes(5)));

        let handle = spawn_conversation_sweep_task(
            store.clone(),
            Arc::new(FixedClock(now)),
            Duration::from_secs(3600),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        // the real clock is long past both; the injected one keeps "live" fresh
        assert!(store.get("stale").is_none());
        assert!(store.get("live").is_some());
        handle.abort();
    }
}
