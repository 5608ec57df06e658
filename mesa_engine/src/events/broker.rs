//! The live-notification connection registry.
//!
//! The broker maintains a per-owner-identity set of open delivery sinks and fans new-order events out to every
//! sink registered under the owning partner's key. Delivery is single-process, best-effort and at-most-once per
//! open connection: a write failure evicts the offending sink and never aborts the rest of the fan-out, and an
//! event published under a key with no sinks is simply dropped.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        RwLock,
    },
};

use log::*;
use tokio::sync::mpsc;

use crate::{db_types::OwnerIdentity, events::LiveEvent};

struct Sink {
    id: u64,
    tx: mpsc::UnboundedSender<LiveEvent>,
}

#[derive(Default)]
struct BrokerInner {
    next_id: AtomicU64,
    channels: RwLock<HashMap<OwnerIdentity, Vec<Sink>>>,
}

/// Cloneable handle to the process-wide registry of open live channels.
#[derive(Clone, Default)]
pub struct OrderBroker {
    inner: Arc<BrokerInner>,
}

impl OrderBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new sink under `owner` and return the removal handle together with the receiving half of the
    /// channel. A [`LiveEvent::Connected`] acknowledgment is delivered to the new sink (and only to it) before any
    /// subsequent publish under the same key can reach it, since both happen under the registry lock.
    pub fn subscribe(&self, owner: OwnerIdentity) -> (Subscription, mpsc::UnboundedReceiver<LiveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let subscription = Subscription { broker: self.clone(), key: owner.clone(), id };
        match self.inner.channels.write() {
            Ok(mut channels) => {
                let _ = tx.send(LiveEvent::connected());
                let sinks = channels.entry(owner.clone()).or_default();
                sinks.push(Sink { id, tx });
                debug!("📡️ '{owner}' opened live channel {id}. {} channel(s) under this key.", sinks.len());
            },
            Err(e) => {
                error!("📡️ Could not lock the channel registry: {e}");
            },
        }
        (subscription, rx)
    }

    /// Remove exactly the sink the handle refers to. Dropping the handle does the same thing; calling it twice is
    /// harmless.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.remove(&subscription.key, subscription.id);
    }

    /// Deliver `event` to every sink currently registered under `owner`. Sinks whose peer has gone away are
    /// evicted on the spot. Unknown keys are a no-op. Failures are never surfaced to the caller.
    pub fn publish(&self, owner: &OwnerIdentity, event: LiveEvent) {
        let mut channels = match self.inner.channels.write() {
            Ok(channels) => channels,
            Err(e) => {
                error!("📡️ Could not lock the channel registry: {e}");
                return;
            },
        };
        let Some(sinks) = channels.get_mut(owner) else {
            trace!("📡️ No open channels for '{owner}'. Event dropped.");
            return;
        };
        let before = sinks.len();
        sinks.retain(|sink| match sink.tx.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!("📡️ Channel {} for '{owner}' is closed. Evicting it.", sink.id);
                false
            },
        });
        let delivered = sinks.len();
        if before > delivered {
            debug!("📡️ Evicted {} dead channel(s) for '{owner}'.", before - delivered);
        }
        if sinks.is_empty() {
            channels.remove(owner);
        }
        trace!("📡️ Event fanned out to {delivered} channel(s) for '{owner}'.");
    }

    /// Number of open channels under a key. Handy for logs and tests.
    pub fn subscriber_count(&self, owner: &OwnerIdentity) -> usize {
        self.inner.channels.read().map(|channels| channels.get(owner).map_or(0, Vec::len)).unwrap_or(0)
    }

    fn remove(&self, key: &OwnerIdentity, id: u64) {
        let mut channels = match self.inner.channels.write() {
            Ok(channels) => channels,
            Err(e) => {
                error!("📡️ Could not lock the channel registry: {e}");
                return;
            },
        };
        if let Some(sinks) = channels.get_mut(key) {
            sinks.retain(|sink| sink.id != id);
            if sinks.is_empty() {
                channels.remove(key);
            }
            debug!("📡️ '{key}' closed live channel {id}.");
        }
    }
}

/// Handle to one registered sink. The sink is removed from the registry when this is dropped, which keeps removal
/// synchronous with connection closure.
pub struct Subscription {
    broker: OrderBroker,
    key: OwnerIdentity,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broker.remove(&self.key, self.id);
    }
}
