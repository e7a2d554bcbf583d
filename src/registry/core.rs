use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, info};

use super::descriptor::HandlerDescriptor;
use super::shape::{RequestShape, ResponseShape};
use crate::error::RegistrationError;
use crate::message::MessageId;
use crate::pool::PoolOptions;
use crate::typed::Invoke;

/// Immutable id → descriptor map published by the registry.
pub type Snapshot = HashMap<MessageId, Arc<HandlerDescriptor>>;

/// Copy-on-write handler table.
///
/// Readers load the current snapshot without locking. Writers build a new map
/// (copy plus one change) and swap it in with a compare-and-swap loop, so two
/// concurrent registrations never drop each other's entry.
pub struct Registry {
    snapshot: ArcSwap<Snapshot>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Registry {
            snapshot: ArcSwap::from_pointee(Snapshot::new()),
        }
    }

    /// Validate and install a handler with default pools and no plugins.
    pub fn register(
        &self,
        id: impl Into<MessageId>,
        request: RequestShape,
        response: ResponseShape,
        invoke: Arc<dyn Invoke>,
    ) -> Result<(), RegistrationError> {
        let descriptor = HandlerDescriptor::new(
            id.into(),
            request,
            response,
            invoke,
            &[],
            PoolOptions::default(),
        )?;
        self.publish(descriptor);
        Ok(())
    }

    /// Install an already validated descriptor, returning the one it replaced.
    pub fn publish(&self, descriptor: HandlerDescriptor) -> Option<Arc<HandlerDescriptor>> {
        let id = descriptor.id().clone();
        let descriptor = Arc::new(descriptor);
        let previous = self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.insert(id.clone(), Arc::clone(&descriptor));
            next
        });
        let replaced = previous.get(&id).cloned();
        info!(
            message_id = %id,
            request = descriptor.request_shape().info().name(),
            response = descriptor.response_shape().info().name(),
            replaced = replaced.is_some(),
            handlers = previous.len() + usize::from(replaced.is_none()),
            "Handler registered"
        );
        replaced
    }

    /// Remove a handler. Returns `false` if the id was not registered.
    pub fn unregister(&self, id: &MessageId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let previous = self.snapshot.rcu(|current| {
            let mut next = Snapshot::clone(current);
            next.remove(id);
            next
        });
        let removed = previous.contains_key(id);
        if removed {
            info!(message_id = %id, "Handler unregistered");
        }
        removed
    }

    /// Descriptor for `id` in the current snapshot.
    #[must_use]
    pub fn lookup(&self, id: &MessageId) -> Option<Arc<HandlerDescriptor>> {
        let found = self.snapshot.load().get(id).cloned();
        if found.is_none() {
            debug!(message_id = %id, "Handler lookup missed");
        }
        found
    }

    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.snapshot.load().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = self.snapshot.load().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The currently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("ids", &self.ids()).finish()
    }
}
