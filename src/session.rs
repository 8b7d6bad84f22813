//! Per-call conversation history.
//!
//! Keyed by the telephony call id. A session expires `ttl` after its last
//! write and keeps at most `max_turns` exchanges, dropping the oldest.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::SessionConfig;

/// One caller utterance and the assistant's reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

struct Session {
    updated: Instant,
    history: Vec<Exchange>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_turns,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_turns)
    }

    /// History for `call_id`, oldest first. Unknown or expired calls are empty.
    pub async fn get(&self, call_id: &str) -> Vec<Exchange> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(call_id) {
            Some(s) if s.updated.elapsed() < self.ttl => s.history.clone(),
            Some(_) => {
                sessions.remove(call_id);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub async fn append(&self, call_id: &str, exchange: Exchange) {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        sessions.retain(|_, s| now.duration_since(s.updated) < self.ttl);

        let session = sessions.entry(call_id.to_string()).or_insert_with(|| Session {
            updated: now,
            history: Vec::new(),
        });
        session.updated = now;
        session.history.push(exchange);
        if session.history.len() > self.max_turns {
            let excess = session.history.len() - self.max_turns;
            session.history.drain(..excess);
        }
    }

    pub async fn clear(&self, call_id: &str) {
        self.sessions.lock().await.remove(call_id);
    }
}
