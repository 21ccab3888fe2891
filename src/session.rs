//! In-memory chat sessions.
//!
//! One session per user id, created on first message and held until
//! deleted or evicted. The store is owned by the service state rather
//! than a process global, so every handler sees the same sessions and
//! tests get a fresh store per app.

use crate::config::ChatConfig;
use crate::provider::{Conversation, GeminiClient, ProviderError, SendOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// A single user's conversation.
pub struct Session {
    user_id: String,
    conversation: Mutex<Conversation>,
    last_active: std::sync::Mutex<Instant>,
}

impl Session {
    fn new(user_id: impl Into<String>, conversation: Conversation) -> Self {
        Self {
            user_id: user_id.into(),
            conversation: Mutex::new(conversation),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// User this session belongs to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Send one message through this session's conversation.
    ///
    /// The conversation lock is held across the provider call, so
    /// concurrent sends for the same user serialize. A failed send leaves
    /// the history untouched.
    pub async fn send(
        &self,
        client: &GeminiClient,
        text: &str,
    ) -> Result<SendOutcome, ProviderError> {
        let mut conversation = self.conversation.lock().await;
        let outcome = client.send(&mut conversation, text).await?;
        self.touch();
        Ok(outcome)
    }

    /// Completed exchanges in this session.
    pub async fn turns(&self) -> usize {
        self.conversation.lock().await.turns()
    }

    /// Time since the last successful exchange (or since creation).
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    fn touch(&self) {
        if let Ok(mut t) = self.last_active.lock() {
            *t = Instant::now();
        }
    }
}

/// All active sessions, keyed by user id.
pub struct SessionStore {
    chat: ChatConfig,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(chat: ChatConfig) -> Self {
        Self {
            chat,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the session for a user, creating one on first contact.
    pub async fn get_or_create(&self, client: &GeminiClient, user_id: &str) -> Arc<Session> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(user_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; a racing create may have inserted already.
        if let Some(session) = sessions.get(user_id) {
            return session.clone();
        }

        let conversation = client
            .create_conversation(self.chat.model.clone(), self.chat.system_instruction.clone())
            .with_generation(self.chat.temperature, self.chat.max_output_tokens);
        let session = Arc::new(Session::new(user_id, conversation));
        sessions.insert(user_id.to_string(), session.clone());
        tracing::info!(user_id = %user_id, "Created chat session");
        session
    }

    /// Remove a user's session. Returns false when none exists.
    pub async fn delete(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Number of active sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many
    /// were removed.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() <= max_idle);
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Pruned idle chat sessions");
        }
        removed
    }
}

/// How often the sweeper wakes up for a given idle threshold.
fn sweep_interval(max_idle: Duration) -> Duration {
    (max_idle / 4).max(Duration::from_secs(30))
}

/// Spawn a background task that evicts idle sessions.
pub fn spawn_idle_sweeper(store: Arc<SessionStore>, max_idle: Duration) {
    let period = sweep_interval(max_idle);
    tracing::debug!(period_secs = period.as_secs(), "Idle session sweeper started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.prune_idle(max_idle).await;
        }
    });
}
