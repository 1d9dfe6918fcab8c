use std::collections::HashMap;
use std::sync::Arc;

use gatepass_core::TicketRegistry;
use gatepass_scan::ScanSession;
use gatepass_shared::models::events::TicketScannedEvent;
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<ScanSession>>;

/// Open scan sessions, one per scanner device.
///
/// The outer lock is only held to find a session; a session's own mutex is
/// held for a whole submission, which serializes calls from one scanner.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub async fn open(&self, session: ScanSession) -> Uuid {
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn close(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn TicketRegistry>,
    pub sessions: Arc<SessionStore>,
    pub scan_tx: broadcast::Sender<TicketScannedEvent>,
}

impl AppState {
    pub fn new(registry: Arc<dyn TicketRegistry>, event_buffer: usize) -> Self {
        let (scan_tx, _) = broadcast::channel(event_buffer.max(1));
        Self {
            registry,
            sessions: Arc::new(SessionStore::default()),
            scan_tx,
        }
    }
}
