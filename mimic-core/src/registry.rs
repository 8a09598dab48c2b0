//! Object registry for references that cannot be serialized
//!
//! The `ObjectRegistry` provides:
//! - Registration of live objects under short textual ids (`Calculator_1`)
//! - Resolution of ids back to the same instance at replay time
//! - Reverse lookup by identity, never by structural equality
//! - Supply channels handing out instances per capability type
//!
//! # Supply precedence
//!
//! For a capability type, `request` consults its channels in this order:
//! queued (FIFO, each handed out once) > persistent > auto-substitute.
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_core::registry::ObjectRegistry;
//!
//! let mut registry = ObjectRegistry::new();
//! let id = registry.register(Arc::new(Database::open()), None)?;
//! assert_eq!(id, "Database_1");
//!
//! registry.supply_queued::<dyn Mailer>(Arc::new(FakeMailer::default()));
//! let mailer = registry.request::<dyn Mailer>().unwrap();
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::error::{MimicError, Result};
use crate::value::{CapabilityType, ObjectRef};

type Generator = Box<dyn FnMut() -> ObjectRef + Send>;

/// Channels installed for one capability type
#[derive(Default)]
struct SupplyChannel {
    queued: VecDeque<ObjectRef>,
    persistent: Option<ObjectRef>,
    auto: Option<Generator>,
}

impl SupplyChannel {
    fn is_empty(&self) -> bool {
        self.queued.is_empty() && self.persistent.is_none() && self.auto.is_none()
    }
}

/// Where a requested object came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyKind {
    Queued,
    Persistent,
    Auto,
}

/// Per-session identity map from id to live object
#[derive(Default)]
pub struct ObjectRegistry {
    entries: HashMap<String, ObjectRef>,
    /// Ids in registration order
    order: Vec<String>,
    ids_by_address: HashMap<usize, String>,
    counters: HashMap<String, usize>,
    channels: HashMap<CapabilityType, SupplyChannel>,
    /// Other capability views of registered allocations, keyed by address.
    /// Filled on registration and whenever an id is looked up for a new view.
    views: RefCell<HashMap<(usize, CapabilityType), ObjectRef>>,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared object, synthesizing `TypeName_n` when no id is given.
    ///
    /// Registering the same instance again returns its existing id.
    pub fn register<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        object: Arc<T>,
        id: Option<&str>,
    ) -> Result<String> {
        self.register_ref(ObjectRef::new(object), id)
    }

    /// Register an already wrapped object reference
    pub fn register_ref(&mut self, object: ObjectRef, id: Option<&str>) -> Result<String> {
        if let Some(existing) = self.ids_by_address.get(&object.address()) {
            if let Some(requested) = id {
                if requested != existing {
                    tracing::debug!(
                        existing = %existing,
                        requested = %requested,
                        "Object already registered, keeping existing id"
                    );
                }
            }
            let existing = existing.clone();
            self.remember_view(&object);
            return Ok(existing);
        }

        let id = match id {
            Some(explicit) => {
                if self.entries.contains_key(explicit) {
                    return Err(MimicError::DuplicateId {
                        id: explicit.to_string(),
                    });
                }
                explicit.to_string()
            }
            None => self.next_id(object.type_name()),
        };

        tracing::debug!(id = %id, type_name = %object.type_name(), "Registered object");
        self.ids_by_address.insert(object.address(), id.clone());
        self.entries.insert(id.clone(), object);
        self.order.push(id.clone());
        Ok(id)
    }

    /// Resolve an id to its object
    pub fn resolve(&self, id: &str) -> Option<ObjectRef> {
        self.entries.get(id).cloned()
    }

    /// Resolve an id to the view of its object typed as `capability`
    pub fn resolve_view(&self, id: &str, capability: &CapabilityType) -> Option<ObjectRef> {
        let primary = self.entries.get(id)?;
        if primary.is_a(capability) {
            return Some(primary.clone());
        }
        self.views
            .borrow()
            .get(&(primary.address(), capability.clone()))
            .cloned()
    }

    /// Resolve an id and downcast to `T`
    pub fn resolve_as<T: ?Sized + Send + Sync + 'static>(&self, id: &str) -> Option<Arc<T>> {
        self.resolve_view(id, &CapabilityType::of::<T>())
            .and_then(|obj| obj.downcast::<T>())
    }

    /// Find the id of an object by identity.
    ///
    /// The object's capability is remembered as a view of that id, so the id
    /// later resolves back to an object of the same type.
    pub fn lookup_id(&self, object: &ObjectRef) -> Option<&str> {
        let id = self.ids_by_address.get(&object.address())?;
        self.remember_view(object);
        Some(id.as_str())
    }

    /// Find the id of a shared object by identity
    pub fn id_of<T: ?Sized>(&self, object: &Arc<T>) -> Option<&str> {
        let address = Arc::as_ptr(object) as *const () as usize;
        self.ids_by_address.get(&address).map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue an instance to be handed out once by `request::<T>()`
    pub fn supply_queued<T: ?Sized + Send + Sync + 'static>(&mut self, object: Arc<T>) {
        let capability = CapabilityType::of::<T>();
        tracing::debug!(capability = %capability.name(), "Queued instance");
        self.channel(capability)
            .queued
            .push_back(ObjectRef::new(object));
    }

    /// Hand out the same instance on every `request::<T>()`
    pub fn supply_persistent<T: ?Sized + Send + Sync + 'static>(&mut self, object: Arc<T>) {
        let capability = CapabilityType::of::<T>();
        tracing::debug!(capability = %capability.name(), "Persistent instance");
        self.channel(capability).persistent = Some(ObjectRef::new(object));
    }

    /// Synthesize a fresh instance with `generator` on every `request::<T>()`
    pub fn supply_auto<T, F>(&mut self, mut generator: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnMut() -> Arc<T> + Send + 'static,
    {
        let capability = CapabilityType::of::<T>();
        tracing::debug!(capability = %capability.name(), "Auto-substitute generator");
        self.channel(capability).auto = Some(Box::new(move || ObjectRef::new(generator())));
    }

    /// Request the next instance of `T` from its supply channels
    pub fn request<T: ?Sized + Send + Sync + 'static>(&mut self) -> Option<Arc<T>> {
        self.request_type(&CapabilityType::of::<T>())
            .and_then(|(obj, _)| obj.downcast::<T>())
    }

    /// Untyped request returning the object and the channel it came from.
    ///
    /// The produced object is registered if it is not already.
    pub fn request_type(&mut self, capability: &CapabilityType) -> Option<(ObjectRef, SupplyKind)> {
        let channel = self.channels.get_mut(capability)?;

        let (object, kind) = if let Some(obj) = channel.queued.pop_front() {
            (obj, SupplyKind::Queued)
        } else if let Some(obj) = &channel.persistent {
            (obj.clone(), SupplyKind::Persistent)
        } else if let Some(generator) = channel.auto.as_mut() {
            (generator(), SupplyKind::Auto)
        } else {
            return None;
        };

        let id = match self.lookup_id(&object) {
            Some(id) => id.to_string(),
            None => {
                // Auto substitutes are named after the capability, not the concrete type.
                let id = self.next_id(capability.name());
                self.ids_by_address.insert(object.address(), id.clone());
                self.entries.insert(id.clone(), object.clone());
                self.order.push(id.clone());
                id
            }
        };

        tracing::debug!(
            capability = %capability.name(),
            id = %id,
            source = ?kind,
            "Supplied instance"
        );
        Some((object, kind))
    }

    /// Whether any supply channel is installed for `T`
    pub fn has_supply<T: ?Sized + 'static>(&self) -> bool {
        self.channels
            .get(&CapabilityType::of::<T>())
            .is_some_and(|c| !c.is_empty())
    }

    /// Remove every supply channel for `T`; registered entries stay
    pub fn clear_supply<T: ?Sized + 'static>(&mut self) {
        self.channels.remove(&CapabilityType::of::<T>());
    }

    /// Empty the whole registry: entries, channels and id counters
    pub fn clear(&mut self) {
        tracing::debug!(entries = self.entries.len(), "Clearing object registry");
        self.entries.clear();
        self.order.clear();
        self.ids_by_address.clear();
        self.counters.clear();
        self.channels.clear();
        self.views.get_mut().clear();
    }

    fn remember_view(&self, object: &ObjectRef) {
        let primary_is_same = self
            .ids_by_address
            .get(&object.address())
            .and_then(|id| self.entries.get(id))
            .is_some_and(|primary| primary.capability() == object.capability());
        if primary_is_same {
            return;
        }
        let key = (object.address(), object.capability().clone());
        let mut views = self.views.borrow_mut();
        if !views.contains_key(&key) {
            tracing::debug!(
                capability = %object.type_name(),
                address = object.address(),
                "Recorded capability view"
            );
            views.insert(key, object.clone());
        }
    }

    fn channel(&mut self, capability: CapabilityType) -> &mut SupplyChannel {
        self.channels.entry(capability).or_default()
    }

    fn next_id(&mut self, type_name: &str) -> String {
        let counter = self.counters.entry(type_name.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}_{}", type_name, counter);
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("ids", &self.order)
            .field("channels", &self.channels.len())
            .finish()
    }
}
