use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, info};
use uuid::Uuid;

/// A live login, keyed by the token id (`jti`) of the access token it was
/// opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub opened_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>, idle_timeout: ChronoDuration) -> bool {
        now < self.expires_at && now - self.last_seen < idle_timeout
    }
}

/// Server-side session bookkeeping with an idle timeout.
///
/// Cloning is cheap; clones share the same sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    idle_timeout: ChronoDuration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_timeout: ChronoDuration::from_std(idle_timeout)
                .unwrap_or_else(|_| ChronoDuration::minutes(30)),
        }
    }

    pub fn open(&self, token_id: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> Session {
        self.open_at(token_id, user_id, expires_at, Utc::now())
    }

    pub fn open_at(
        &self,
        token_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            user_id,
            opened_at: now,
            last_seen: now,
            expires_at,
        };
        self.sessions.insert(token_id.to_string(), session.clone());
        session
    }

    /// Marks the session as used. Returns `None` (and forgets the session)
    /// when it is unknown, idle for too long or past its token expiry.
    pub fn touch(&self, token_id: &str) -> Option<Session> {
        self.touch_at(token_id, Utc::now())
    }

    pub fn touch_at(&self, token_id: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut entry = self.sessions.get_mut(token_id)?;
        if !entry.is_live(now, self.idle_timeout) {
            drop(entry);
            self.sessions.remove(token_id);
            return None;
        }
        entry.last_seen = now;
        Some(entry.clone())
    }

    pub fn end(&self, token_id: &str) -> bool {
        self.sessions.remove(token_id).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let idle = self.idle_timeout;
        self.sessions.retain(|_, session| session.is_live(now, idle));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Starts the background sweeper. Stop it with [`SessionJanitor::shutdown`].
    pub fn spawn_janitor(&self, every: Duration) -> SessionJanitor {
        let store = self.clone();
        let (tx, mut rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if store.is_empty() {
                            continue;
                        }
                        let purged = store.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = store.len(), "expired sessions purged");
                        }
                    }
                    _ = &mut rx => break,
                }
            }
            info!("Session janitor stopped");
        });

        SessionJanitor {
            shutdown: Some(tx),
            handle,
        }
    }
}

pub struct SessionJanitor {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SessionJanitor {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(15 * 60))
    }

    #[test]
    fn touch_extends_idle_window() {
        let store = store();
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        store.open_at("jti-1", user, t0 + ChronoDuration::hours(8), t0);

        let t1 = t0 + ChronoDuration::minutes(10);
        assert_eq!(store.touch_at("jti-1", t1).unwrap().last_seen, t1);

        // 20 minutes after open but only 10 after the last touch
        let t2 = t0 + ChronoDuration::minutes(20);
        assert!(store.touch_at("jti-1", t2).is_some());
    }

    #[test]
    fn idle_session_is_dropped_on_touch() {
        let store = store();
        let t0 = Utc::now();
        store.open_at("jti-idle", Uuid::new_v4(), t0 + ChronoDuration::hours(8), t0);

        assert!(store
            .touch_at("jti-idle", t0 + ChronoDuration::minutes(16))
            .is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn token_expiry_closes_session() {
        let store = store();
        let t0 = Utc::now();
        store.open_at("jti-exp", Uuid::new_v4(), t0 + ChronoDuration::minutes(5), t0);
        assert!(store
            .touch_at("jti-exp", t0 + ChronoDuration::minutes(6))
            .is_none());
    }

    #[test]
    fn end_and_purge() {
        let store = store();
        let t0 = Utc::now();
        let exp = t0 + ChronoDuration::hours(1);
        store.open_at("a", Uuid::new_v4(), exp, t0);
        store.open_at("b", Uuid::new_v4(), exp, t0);
        store.open_at("c", Uuid::new_v4(), exp, t0 + ChronoDuration::minutes(10));

        assert!(store.end("a"));
        assert!(!store.end("a"));
        assert_eq!(store.purge_expired_at(t0 + ChronoDuration::minutes(20)), 1);
        assert_eq!(store.len(), 1);
        assert!(store.touch_at("c", t0 + ChronoDuration::minutes(20)).is_some());
    }

    #[tokio::test]
    async fn janitor_stops_on_shutdown() {
        let store = store();
        let janitor = store.spawn_janitor(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(25)).await;
        janitor.shutdown().await;
    }
}
