//! Grace timers on the tokio runtime
//!
//! Each armed timer is a task that sleeps and then posts
//! [`Event::GraceExpired`] back into the orchestrator queue. Cancelling
//! aborts the task; a timer that already posted is filtered out by its
//! stale token.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use impostor_core::{GraceTimers, LossToken};

use crate::server::Event;

pub(crate) struct TokioTimers {
    events: mpsc::Sender<Event>,
    handles: HashMap<LossToken, JoinHandle<()>>,
}

impl TokioTimers {
    pub(crate) fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            events,
            handles: HashMap::new(),
        }
    }

    /// Drop the handle of a timer that already fired
    pub fn fired(&mut self, token: LossToken) {
        self.handles.remove(&token);
    }

    pub fn armed_count(&self) -> usize {
        self.handles.len()
    }

    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl GraceTimers for TokioTimers {
    fn arm(&mut self, room: &str, token: LossToken, after: Duration) {
        let events = self.events.clone();
        let room = room.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(Event::GraceExpired { room, token }).await;
        });
        if let Some(previous) = self.handles.insert(token, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, room: &str, token: LossToken) {
        if let Some(handle) = self.handles.remove(&token) {
            handle.abort();
            debug!(room = %room, token = %token, "Grace timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impostor_core::PresenceManager;

    #[tokio::test]
    async fn test_timer_posts_expiry() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = TokioTimers::new(tx);
        let mut presence = PresenceManager::new(Duration::from_millis(10));

        let token = presence.connection_lost("ABCD", "ana", &mut timers);
        match rx.recv().await {
            Some(Event::GraceExpired { room, token: fired }) => {
                assert_eq!(room, "ABCD");
                assert_eq!(fired, token);
            }
            _ => panic!("Expected GraceExpired"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_timer_is_silent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timers = TokioTimers::new(tx);
        let mut presence = PresenceManager::new(Duration::from_millis(20));

        presence.connection_lost("ABCD", "ana", &mut timers);
        presence.reconnected("ABCD", "ana", &mut timers);
        assert_eq!(timers.armed_count(), 0);

        let waited = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(waited.is_err());
    }
}
