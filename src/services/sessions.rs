use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::SessionSigner;
use crate::client::PortalApi;
use crate::error::BookingError;
use crate::models::session::Session;
use crate::services::reservation::ReservationController;

struct SessionEntry {
    controller: Arc<ReservationController>,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }
}

/// Live booking sessions, keyed by session id.
///
/// A session is created by a successful login and lives until logout or
/// until it sits idle past the timeout; each one owns its own reservation
/// controller.
pub struct SessionRegistry {
    api: Arc<dyn PortalApi>,
    signer: SessionSigner,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(api: Arc<dyn PortalApi>, signer: SessionSigner) -> Self {
        Self {
            api,
            signer,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Log in against the backend and open a session; returns its signed handle.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, Arc<ReservationController>), BookingError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(BookingError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let token = self.api.login(email.trim(), password).await?;
        let user = self.api.current_user(&token.access_token).await?;
        info!("User {} ({}) logged in", user.id, user.email);

        let session_id = SessionSigner::generate_session_id();
        let controller = Arc::new(ReservationController::new(
            Arc::clone(&self.api),
            Session::new(user, token.access_token),
        ));

        self.sessions.write().await.insert(
            session_id.clone(),
            SessionEntry {
                controller: Arc::clone(&controller),
                last_seen: Mutex::new(Instant::now()),
            },
        );

        Ok((self.signer.sign(&session_id), controller))
    }

    pub async fn get(&self, handle: &str) -> Result<Arc<ReservationController>, BookingError> {
        let session_id = self.signer.verify(handle)?;
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(&session_id)
            .ok_or(BookingError::SessionNotFound)?;
        entry.touch();
        Ok(Arc::clone(&entry.controller))
    }

    pub async fn logout(&self, handle: &str) -> Result<(), BookingError> {
        let session_id = self.signer.verify(handle)?;
        match self.sessions.write().await.remove(&session_id) {
            Some(entry) => {
                info!("User {} logged out", entry.controller.session().user_id());
                Ok(())
            }
            None => {
                warn!("Logout for unknown session");
                Err(BookingError::SessionNotFound)
            }
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions untouched for at least `max_idle`; returns how many went.
    pub async fn purge_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let keep = entry.idle_for() < max_idle;
            if !keep {
                info!(
                    "Expiring idle session of user {}",
                    entry.controller.session().user_id()
                );
            }
            keep
        });
        before - sessions.len()
    }
}

/// Sweep idle sessions every `every`, expiring those idle for `max_idle`.
pub fn spawn_session_sweeper(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let expired = registry.purge_idle(max_idle).await;
            if expired > 0 {
                debug!("Session sweep expired {} sessions", expired);
            }
        }
    })
}
