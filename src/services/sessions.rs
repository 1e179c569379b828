use crate::core::{SessionLiveness, SwipeSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A live session plus the flag needed to stop it without its lock
pub struct SessionEntry {
    pub user_id: String,
    pub session: Mutex<SwipeSession>,
    pub liveness: SessionLiveness,
}

/// In-memory session table.
///
/// Sessions idle longer than the configured time are evicted, and eviction
/// abandons them so an in-flight expansion stops.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: moka::future::Cache<String, Arc<SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(capacity: u64, idle_secs: u64) -> Self {
        let sessions = moka::future::CacheBuilder::new(capacity)
            .time_to_idle(Duration::from_secs(idle_secs))
            .eviction_listener(|id: Arc<String>, entry: Arc<SessionEntry>, cause| {
                tracing::debug!("Session {} removed ({:?})", id, cause);
                entry.liveness.abandon();
            })
            .build();

        Self { sessions }
    }

    /// Register a started session and return its id
    pub async fn insert(
        &self,
        user_id: &str,
        session: SwipeSession,
    ) -> (String, Arc<SessionEntry>) {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = Arc::new(SessionEntry {
            user_id: user_id.to_string(),
            liveness: session.liveness(),
            session: Mutex::new(session),
        });

        self.sessions.insert(id.clone(), entry.clone()).await;
        tracing::info!("Session {} registered for user {}", id, user_id);
        (id, entry)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<SessionEntry>> {
        self.sessions.get(id).await
    }

    /// Remove and abandon a session
    pub async fn remove(&self, id: &str) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.remove(id).await?;
        entry.liveness.abandon();
        Some(entry)
    }

    /// Approximate number of live sessions
    pub fn count(&self) -> u64 {
        self.sessions.entry_count()
    }
}
