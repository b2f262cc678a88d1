//! Response Router - maps an outstanding request's correlation key to the
//! one-shot slot its caller is waiting on.
//!
//! Flow:
//! 1. Caller calls `create_slot()` before sending its request
//! 2. Engine loop receives the reply and calls `deliver()`
//! 3. Caller reads the reply from its slot
//! 4. The slot guard removes the entry on every exit path

use crate::domain::correlation::CorrelationKey;
use crate::errors::ShimError;
use parking_lot::Mutex;
use shared_types::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// One registered waiter.
struct Pending {
    /// Distinguishes this registration from a later one under the same key.
    id: u64,
    sender: oneshot::Sender<Message>,
}

/// Correlation table shared by the engine loop and every calling task.
///
/// `None` once the router has been closed.
pub struct ResponseRouter {
    table: Mutex<Option<HashMap<CorrelationKey, Pending>>>,
    next_id: AtomicU64,
}

impl Default for ResponseRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRouter {
    /// Create an empty, open router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Some(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a slot for `key`.
    ///
    /// # Errors
    ///
    /// `DuplicateCorrelation` if a slot for `key` exists, `RouterClosed`
    /// after [`close`](Self::close).
    pub fn create_slot(self: &Arc<Self>, key: CorrelationKey) -> Result<ResponseSlot, ShimError> {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut guard = self.table.lock();
            let table = guard.as_mut().ok_or(ShimError::RouterClosed)?;
            if table.contains_key(&key) {
                return Err(ShimError::DuplicateCorrelation(key));
            }
            table.insert(key.clone(), Pending { id, sender: tx });
        }

        debug!(key = %key, "Created response slot");

        Ok(ResponseSlot {
            router: Arc::clone(self),
            key,
            id,
            receiver: rx,
        })
    }

    /// Hand `msg` to the slot registered under its correlation key and
    /// remove the slot.
    ///
    /// # Errors
    ///
    /// `NoSuchCorrelation` if nobody is waiting on the key,
    /// `ResponseDropped` if the waiter gave up before delivery.
    pub fn deliver(&self, msg: Message) -> Result<(), ShimError> {
        let key = CorrelationKey::of(&msg);
        let pending = self
            .table
            .lock()
            .as_mut()
            .and_then(|table| table.remove(&key));

        let Some(pending) = pending else {
            warn!(key = %key, kind = %msg.kind, "Response for unknown correlation key");
            return Err(ShimError::NoSuchCorrelation(key));
        };

        if pending.sender.send(msg).is_err() {
            debug!(key = %key, "Response slot receiver dropped");
            return Err(ShimError::ResponseDropped(key));
        }

        debug!(key = %key, "Delivered response");
        Ok(())
    }

    /// Remove the slot for `key`, if any.
    pub fn delete_slot(&self, key: &CorrelationKey) {
        if let Some(table) = self.table.lock().as_mut() {
            table.remove(key);
        }
    }

    /// Remove `key` only if it still belongs to registration `id`.
    fn release(&self, key: &CorrelationKey, id: u64) {
        if let Some(table) = self.table.lock().as_mut() {
            if table.get(key).is_some_and(|p| p.id == id) {
                table.remove(key);
            }
        }
    }

    /// Tear the table down. Every waiting slot observes a closed channel and
    /// later `create_slot` calls fail with `RouterClosed`.
    pub fn close(&self) {
        if let Some(table) = self.table.lock().take() {
            if !table.is_empty() {
                warn!(waiting = table.len(), "Closing router with requests outstanding");
            }
        }
    }

    /// Number of outstanding slots.
    pub fn pending_count(&self) -> usize {
        self.table.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Check whether a slot exists for `key`.
    pub fn is_pending(&self, key: &CorrelationKey) -> bool {
        self.table
            .lock()
            .as_ref()
            .is_some_and(|table| table.contains_key(key))
    }
}

/// The receiving end of one registration. Dropping it removes the
/// registration from the router.
pub struct ResponseSlot {
    router: Arc<ResponseRouter>,
    key: CorrelationKey,
    id: u64,
    receiver: oneshot::Receiver<Message>,
}

impl ResponseSlot {
    /// The key this slot is registered under.
    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Wait for the reply. `ConnectionClosed` if the router is closed first.
    pub async fn recv(&mut self) -> Result<Message, ShimError> {
        (&mut self.receiver)
            .await
            .map_err(|_| ShimError::ConnectionClosed)
    }
}

impl Drop for ResponseSlot {
    fn drop(&mut self) {
        self.router.release(&self.key, self.id);
    }
}
