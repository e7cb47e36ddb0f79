use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::message::Envelope;

/// Capacity of each client's outbound queue. A receiver that falls this far
/// behind starts losing broadcasts instead of slowing anyone else down.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// Send half of one connection's outbound queue, owned by the registry so
/// that removal closes the queue.
struct ClientHandle {
    sender: mpsc::Sender<Envelope>,
}

/// Live connections, keyed by server-assigned identity.
///
/// The map is the only shared mutable state in the relay. The lock is held
/// for add/remove/fan-out only and never across I/O; enqueueing is a
/// non-blocking `try_send`, so broadcasts from concurrent senders serialize
/// on the lock and each one sees a consistent set of recipients.
pub struct Registry {
    clients: Mutex<HashMap<String, ClientHandle>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new connection: allocates the next identity and returns
    /// it along with the receive half of the connection's outbound queue.
    /// Identities count up from "1" and are never reused while the server
    /// runs.
    pub async fn add(&self) -> (String, mpsc::Receiver<Envelope>) {
        let identity = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        let mut clients = self.clients.lock().await;
        clients.insert(identity.clone(), ClientHandle { sender });

        (identity, receiver)
    }

    /// Unregisters a connection. Dropping the entry drops the queue's send
    /// half, so the outbound drain ends once it has consumed what is left.
    /// Callers invoke this exactly once per connection, at teardown.
    pub async fn remove(&self, identity: &str) {
        let mut clients = self.clients.lock().await;
        clients.remove(identity);
    }

    /// Enqueues `envelope` for every registered client except `exclude`.
    /// A full queue drops the envelope for that one recipient and moves on;
    /// the broadcast never waits on a slow receiver.
    pub async fn broadcast(&self, envelope: Envelope, exclude: &str) {
        let clients = self.clients.lock().await;
        for (identity, handle) in clients.iter() {
            if identity == exclude {
                continue;
            }
            match handle.sender.try_send(envelope.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%identity, "outbound queue full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%identity, "outbound queue closed, skipping");
                }
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
