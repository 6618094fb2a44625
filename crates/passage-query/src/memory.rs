//! Bounded per-session conversation memory.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use passage_core::Exchange;

/// Short-term memory of (query, answer) pairs, keyed by session.
///
/// Each session holds a FIFO queue of bounded capacity: when full, the
/// oldest exchange is evicted before the new one is appended. Sessions
/// are created lazily on first append and live until cleared or process
/// teardown.
///
/// The outer map is behind an RwLock so operations on different sessions
/// proceed concurrently; the per-session Mutex serializes same-session
/// mutation, preserving FIFO order.
pub struct ConversationMemory {
    capacity: usize,
    sessions: RwLock<HashMap<String, Mutex<VecDeque<Exchange>>>>,
}

impl ConversationMemory {
    /// Create a memory retaining `capacity` exchanges per session.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Recent exchanges for a session, oldest first. An unseen session
    /// yields an empty sequence, not an error.
    pub fn get(&self, session_id: &str) -> Vec<Exchange> {
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(queue) => {
                let queue = queue.lock().unwrap();
                queue.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Append an exchange, evicting the oldest entry first when the
    /// session is at capacity.
    pub fn append(&self, session_id: &str, query: &str, response: &str) {
        if self.capacity == 0 {
            return;
        }

        let exchange = Exchange {
            query: query.to_string(),
            response: response.to_string(),
        };

        // Fast path: the session already exists, a read lock suffices
        {
            let sessions = self.sessions.read().unwrap();
            if let Some(queue) = sessions.get(session_id) {
                Self::push_bounded(queue, exchange, self.capacity);
                return;
            }
        }

        // Lazily create the session under the write lock; another writer
        // may have raced us here, so go through the entry API
        let mut sessions = self.sessions.write().unwrap();
        let queue = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        Self::push_bounded(queue, exchange, self.capacity);
    }

    /// Reset a session to an empty sequence.
    pub fn clear(&self, session_id: &str) {
        let sessions = self.sessions.read().unwrap();
        if let Some(queue) = sessions.get(session_id) {
            queue.lock().unwrap().clear();
        }
    }

    fn push_bounded(queue: &Mutex<VecDeque<Exchange>>, exchange: Exchange, capacity: usize) {
        let mut queue = queue.lock().unwrap();
        while queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(exchange);
    }
}
