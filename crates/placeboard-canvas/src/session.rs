//! Session Registry
//!
//! Every live WebSocket connection owns one [`Session`] while it is open.
//! The registry fans broadcast messages out to all of them.

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::ServerMessage;

/// Default number of queued outbound frames per session
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Registry handle for one live connection
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    tx: mpsc::Sender<String>,
}

impl Session {
    /// Create a session and the receiving end of its outbound queue
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame without waiting; returns false if it was dropped
    fn offer(&self, frame: String) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %self.id, "Outbound queue full, dropping broadcast");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %self.id, "Session closed before broadcast");
                false
            }
        }
    }
}

/// Registry of all connected sessions
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
    queue_capacity: usize,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Configure the per-session outbound queue size
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Create a session sized for this registry and register it
    pub async fn open(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (session, rx) = Session::channel(self.queue_capacity);
        let id = session.id();
        self.register(session).await;
        (id, rx)
    }

    /// Register a session
    pub async fn register(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        debug!(session_id = %session.id, "Session registered");
        sessions.insert(session.id, session);
    }

    /// Remove a session; returns whether it was registered
    pub async fn unregister(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&session_id).is_some();
        if removed {
            debug!(session_id = %session_id, "Session unregistered");
        }
        removed
    }

    /// Send a message to every registered session
    ///
    /// Best effort: a full or closed session queue is skipped without
    /// affecting the others. Returns how many sessions accepted the frame.
    pub async fn broadcast(&self, message: &ServerMessage) -> Result<usize> {
        let frame = message.to_json()?;

        let targets: Vec<Session> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let delivered = targets
            .iter()
            .filter(|session| session.offer(frame.clone()))
            .count();

        debug!(
            sessions = targets.len(),
            delivered = delivered,
            "Broadcast sent"
        );
        Ok(delivered)
    }

    /// Number of registered sessions
    pub async fn count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// List registered session IDs
    pub async fn session_ids(&self) -> Vec<Uuid> {
        let sessions = self.sessions.read().await;
        sessions.keys().copied().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
