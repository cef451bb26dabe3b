use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::{AppConfig, DEFAULT_SESSION_TTL_SECS};

use crate::error::BookingChatError;
use crate::models::{DialogSnapshot, DoctorProfile};
use crate::services::dialog::{BookingDialog, DialogOptions};
use crate::services::gateway::{BookingBackend, HttpBookingBackend};

/// Open booking dialogs, one per widget instance.
pub struct DialogRegistry {
    backend: Arc<dyn BookingBackend>,
    options: DialogOptions,
    session_ttl: Duration,
    dialogs: RwLock<HashMap<Uuid, Arc<BookingDialog>>>,
}

impl DialogRegistry {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_backend(
            Arc::new(HttpBookingBackend::new(config)),
            DialogOptions::from_config(config),
        )
        .with_session_ttl(Duration::from_secs(config.session_ttl_secs))
    }

    pub fn with_backend(backend: Arc<dyn BookingBackend>, options: DialogOptions) -> Self {
        Self {
            backend,
            options,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            dialogs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }

    pub async fn open_session(&self, doctor: DoctorProfile) -> (Uuid, DialogSnapshot) {
        self.purge_expired().await;

        let session_id = Uuid::new_v4();
        let dialog = Arc::new(BookingDialog::new(doctor, Arc::clone(&self.backend), self.options));
        let snapshot = dialog.open().await;

        self.dialogs.write().await.insert(session_id, dialog);
        info!("Opened booking session {}", session_id);

        (session_id, snapshot)
    }

    pub async fn get(&self, session_id: Uuid) -> Result<Arc<BookingDialog>, BookingChatError> {
        self.dialogs
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(BookingChatError::SessionNotFound(session_id))
    }

    pub async fn remove(&self, session_id: Uuid) -> Result<(), BookingChatError> {
        let dialog = self
            .dialogs
            .write()
            .await
            .remove(&session_id)
            .ok_or(BookingChatError::SessionNotFound(session_id))?;

        dialog.close().await;
        info!("Removed booking session {}", session_id);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.dialogs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.dialogs.read().await.is_empty()
    }

    /// Drops closed sessions and sessions idle for longer than the TTL.
    /// Checked and removed under one write lock so a concurrent reopen is never lost.
    pub async fn purge_expired(&self) -> usize {
        let mut dialogs = self.dialogs.write().await;

        let mut expired = Vec::new();
        for (id, dialog) in dialogs.iter() {
            if dialog.is_expired(self.session_ttl).await {
                expired.push(*id);
            }
        }

        for id in &expired {
            if let Some(dialog) = dialogs.remove(id) {
                dialog.close().await;
            }
        }

        if !expired.is_empty() {
            debug!("Purged {} expired booking sessions", expired.len());
        }
        expired.len()
    }

    /// Background eviction for widgets that were abandoned without a close.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            info!("Booking session sweeper started, interval {:?}", every);
            let mut ticker = interval(every);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let purged = registry.purge_expired().await;
                if purged > 0 {
                    info!("Evicted {} booking sessions", purged);
                }
            }
        })
    }
}
