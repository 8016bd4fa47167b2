//! A flat registry of named, versioned modules.
//!
//! Modules are looked up by the exact `(name, version)` pair they were
//! registered under. Monitors hear about registrations and deregistrations
//! through the same fail-safe broadcaster the forest uses.

use std::cell::RefCell;
use std::fmt;
use std::iter::FusedIterator;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::broadcast::Broadcaster;
use crate::broadcast::Listener;
use crate::broadcast::ListenerId;
use crate::broadcast::deliver;
use crate::cursor::CursorId;
use crate::cursor::Cursors;
use crate::error::Error;
use crate::error::Result;

/// A loadable unit of functionality.
pub trait Module {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
}

pub enum ModuleEvent {
    Registered(Rc<dyn Module>),
    Deregistered(Rc<dyn Module>),
}

impl ModuleEvent {
    pub fn module(&self) -> &Rc<dyn Module> {
        return match self {
            ModuleEvent::Registered(module) | ModuleEvent::Deregistered(module) => module,
        };
    }
}

impl fmt::Debug for ModuleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ModuleEvent::Registered(_) => "Registered",
            ModuleEvent::Deregistered(_) => "Deregistered",
        };
        let module = self.module();
        return write!(f, "{}({} {})", kind, module.name(), module.version());
    }
}

type Key = (String, String);

fn key_of(module: &dyn Module) -> Key {
    return (module.name().to_string(), module.version().to_string());
}

#[derive(Default)]
struct Registry {
    order: Vec<Rc<dyn Module>>,
    by_key: FxHashMap<Key, Rc<dyn Module>>,
    monitors: Broadcaster<ModuleEvent>,
    cursors: Cursors,
}

/// Shared handle to a module registry. Clones see the same registry.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    inner: Rc<RefCell<Registry>>,
}

impl ModuleRegistry {
    pub fn new() -> ModuleRegistry {
        return ModuleRegistry::default();
    }

    pub fn len(&self) -> usize {
        return self.inner.borrow().order.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Register `module` under its name and version. A pair that is already
    /// registered is left alone and monitors are not told.
    pub fn register(&self, module: Rc<dyn Module>) {
        {
            let mut registry = self.inner.borrow_mut();
            let key = key_of(&*module);
            if registry.by_key.contains_key(&key) {
                tracing::debug!(name = %key.0, version = %key.1, "module already registered");
                return;
            }
            registry.by_key.insert(key, module.clone());
            registry.order.push(module.clone());
        }
        tracing::debug!(name = module.name(), version = module.version(), "registered module");
        self.notify(&ModuleEvent::Registered(module));
    }

    /// Remove the module registered under the same name and version as
    /// `module`, provided it is that same object. Monitors are told before
    /// it goes.
    pub fn deregister(&self, module: &Rc<dyn Module>) {
        let key = key_of(&**module);
        let registered = match self.inner.borrow().by_key.get(&key) {
            Some(registered) if Rc::ptr_eq(registered, module) => registered.clone(),
            _ => return,
        };

        self.notify(&ModuleEvent::Deregistered(registered.clone()));

        let removed = {
            let mut registry = self.inner.borrow_mut();
            let Some(index) = registry.order.iter().position(|entry| Rc::ptr_eq(entry, &registered)) else {
                return;
            };
            registry.cursors.removed_at(index);
            let removed = registry.order.remove(index);
            registry.by_key.remove(&key);
            removed
        };
        tracing::debug!(name = removed.name(), version = removed.version(), "deregistered module");
    }

    pub fn find(&self, name: &str, version: &str) -> Option<Rc<dyn Module>> {
        let key = (name.to_string(), version.to_string());
        return self.inner.borrow().by_key.get(&key).cloned();
    }

    /// Ask for a module to be loaded on demand. Lazy loading is not
    /// available, so this always fails.
    pub fn request(&self, name: &str, version: &str) -> Result<()> {
        return Err(Error::NotSupported {
            name: name.to_string(),
            version: version.to_string(),
        });
    }

    pub fn add_monitor(&self, monitor: Rc<dyn Listener<ModuleEvent>>) -> ListenerId {
        return self.inner.borrow_mut().monitors.register(monitor);
    }

    pub fn remove_monitor(&self, id: ListenerId) -> bool {
        let removed = self.inner.borrow_mut().monitors.unregister(id);
        return removed.is_some();
    }

    /// Walk the modules in registration order.
    pub fn iter_modules(&self) -> ModuleIterator {
        let cursor = self.inner.borrow_mut().cursors.open();
        return ModuleIterator {
            registry: self.clone(),
            cursor,
            finished: false,
        };
    }

    fn notify(&self, event: &ModuleEvent) {
        let snapshot = self.inner.borrow().monitors.snapshot();
        deliver(&snapshot, event, |monitor| {
            self.remove_monitor(monitor);
        });
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.borrow();
        return f
            .debug_struct("ModuleRegistry")
            .field("modules", &registry.order.len())
            .field("monitors", &registry.monitors.len())
            .finish();
    }
}

/// A live walk over a registry. Deregistering the module under the cursor
/// moves it to the next one.
pub struct ModuleIterator {
    registry: ModuleRegistry,
    cursor: CursorId,
    finished: bool,
}

impl Iterator for ModuleIterator {
    type Item = Rc<dyn Module>;

    fn next(&mut self) -> Option<Rc<dyn Module>> {
        if self.finished {
            return None;
        }
        let mut registry = self.registry.inner.borrow_mut();
        let index = registry.cursors.advance(self.cursor);
        let module = index.and_then(|index| registry.order.get(index).cloned());
        if module.is_none() {
            self.finished = true;
            registry.cursors.close(self.cursor);
        }
        return module;
    }
}

impl FusedIterator for ModuleIterator {}

impl Drop for ModuleIterator {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.inner.borrow_mut().cursors.close(self.cursor);
        }
    }
}
