//! In-memory session registry with idle eviction
//!
//! Each browser tab owns one session. Sessions are never persisted; the
//! sweeper drops any session untouched for longer than the idle TTL.

use super::{Session, SessionSnapshot};
use crate::config::SessionsConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub max_sessions: usize,
}

impl fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session limit reached ({} live sessions)", self.max_sessions)
    }
}

impl std::error::Error for CapacityExceeded {}

struct Slot {
    session: Session,
    last_touched: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    config: SessionsConfig,
}

impl SessionStore {
    pub fn new(config: SessionsConfig) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Create an idle session and return its first snapshot
    pub async fn create(&self, language: &str) -> Result<SessionSnapshot, CapacityExceeded> {
        let mut slots = self.slots.lock().await;
        if slots.len() >= self.config.max_sessions {
            return Err(CapacityExceeded {
                max_sessions: self.config.max_sessions,
            });
        }

        let id = loop {
            let candidate = new_session_id();
            if !slots.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Session::new(id.clone(), language);
        let snapshot = session.snapshot();
        slots.insert(
            id,
            Slot {
                session,
                last_touched: Instant::now(),
            },
        );

        tracing::debug!(session = %snapshot.id, live = slots.len(), "Session created");
        Ok(snapshot)
    }

    /// Run `f` against a session, refreshing its idle timer.
    /// Returns None for unknown (or evicted) ids.
    ///
    /// `f` runs under the registry lock and must not block.
    pub async fn with<R>(&self, id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(id)?;
        slot.last_touched = Instant::now();
        Some(f(&mut slot.session))
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.slots.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Drop sessions idle at `now` for longer than the TTL
    pub async fn sweep(&self, now: Instant) -> usize {
        let ttl = Duration::from_secs(self.config.idle_ttl_secs);
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, slot| now.saturating_duration_since(slot.last_touched) <= ttl);
        before - slots.len()
    }

    /// Periodically evict idle sessions until the runtime shuts down
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let period = Duration::from_secs(self.config.sweep_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.sweep(Instant::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Evicted idle sessions");
                }
            }
        })
    }
}

fn new_session_id() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
