use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use encore_core::{
    unix_now_ms, ServerMessage, SessionController, ShowState, ShowStateUpdate,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// The one show session a server process runs.
///
/// Every inbound replace/trigger/reset event is handled to completion under
/// the controller lock — validate, mutate, broadcast — before the next event
/// is processed, so a single state replacement is atomic without any finer
/// locking. Broadcasts are fire-and-forget; each client individually sees
/// them in the order the server issued them.
pub struct ShowSession {
    controller: Mutex<SessionController>,
    broadcast: broadcast::Sender<ServerMessage>,
    connections: AtomicUsize,
}

impl ShowSession {
    pub fn new(initial: ShowState, broadcast_buffer: usize) -> Arc<Self> {
        let (broadcast, _) = broadcast::channel(broadcast_buffer);
        Arc::new(Self {
            controller: Mutex::new(SessionController::new(initial)),
            broadcast,
            connections: AtomicUsize::new(0),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast.subscribe()
    }

    /// Full copy of the current state, for the initial push to a new client.
    pub fn snapshot(&self) -> ShowState {
        self.controller.lock().state().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Record a new connection and broadcast the updated gauge to everyone.
    pub fn client_connected(&self) -> usize {
        let count = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(ServerMessage::SpectatorCount { count });
        count
    }

    /// Record a disconnect and broadcast the updated gauge to everyone.
    pub fn client_disconnected(&self) -> usize {
        let count = self.connections.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        self.send(ServerMessage::SpectatorCount { count });
        count
    }

    /// Whole-state replacement from the writer. A committed replace is
    /// broadcast to every client synchronously; a rejected candidate is
    /// discarded with a log line and no broadcast.
    pub fn handle_update(&self, candidate: ShowStateUpdate) {
        let mut controller = self.controller.lock();
        match controller.replace(candidate) {
            Ok(state) => {
                let state = state.clone();
                self.send(ServerMessage::StateUpdate { state });
            }
            Err(err) => log::warn!("{err}"),
        }
    }

    /// Start a synchronized session. Refused (logged, no broadcast) when the
    /// active routine index doesn't resolve.
    pub fn handle_trigger(&self, requested_delay_ms: Option<u64>) {
        let mut controller = self.controller.lock();
        match controller.trigger(requested_delay_ms, unix_now_ms()) {
            Ok(start) => self.send(start.into()),
            Err(err) => log::warn!("trigger refused: {err}"),
        }
    }

    /// Abort any in-progress session on every client.
    pub fn handle_reset(&self) {
        self.controller.lock().reset();
        self.send(ServerMessage::ResetSequence);
    }

    fn send(&self, message: ServerMessage) {
        // Err just means no client is currently subscribed.
        let _ = self.broadcast.send(message);
    }
}

/// Shared state passed to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ShowSession>,
    pub media_dir: PathBuf,
}
