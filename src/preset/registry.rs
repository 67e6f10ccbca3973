//! Preset registry — discovers the builtin kinds and introspects their
//! parameter tables.
//!
//! Three coupled maps (constructor, signature, parameter defaults) live
//! behind a single mutex. `reload` rebuilds all three and swaps them in
//! one assignment, so readers observe either the old or the new state —
//! never a name with a stale signature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::params::Params;
use super::Preset;

/// Constructor signature: builds a boxed instance from a parameter map
/// at the given sample rate.
pub type Ctor = fn(f64, &Params) -> Box<dyn Preset>;

/// Static descriptor a preset kind registers itself with.
pub struct KindSpec {
    pub name: &'static str,
    /// Melodic kinds require `notes` and `durations` to construct.
    pub requires_melody: bool,
    pub defaults: fn() -> Params,
    pub ctor: Ctor,
}

/// Introspected constructor signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Declared parameter names, in table order.
    pub params: Vec<String>,
    pub requires_melody: bool,
}

struct Tables {
    ctors: HashMap<String, Ctor>,
    sigs: HashMap<String, Signature>,
    meta: HashMap<String, Params>,
}

/// An immutable view of the registry taken under the lock. The engine
/// worker instantiates from one of these without re-locking per command.
#[derive(Clone)]
pub struct RegistrySnapshot {
    tables: Arc<Tables>,
}

impl RegistrySnapshot {
    pub fn instantiate(&self, name: &str, sample_rate: f64, params: &Params) -> Option<Box<dyn Preset>> {
        self.tables.ctors.get(name).map(|ctor| ctor(sample_rate, params))
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.tables.sigs.get(name)
    }

    pub fn defaults(&self, name: &str) -> Option<&Params> {
        self.tables.meta.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.ctors.contains_key(name)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.ctors.keys().cloned().collect();
        names.sort();
        names
    }
}

/// The registry proper.
pub struct PresetRegistry {
    inner: Mutex<Arc<Tables>>,
}

impl PresetRegistry {
    /// Build the registry from the builtin kind table.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Arc::new(Self::load(super::kinds::all()))),
        }
    }

    fn load(specs: Vec<KindSpec>) -> Tables {
        let mut ctors = HashMap::new();
        let mut sigs = HashMap::new();
        let mut meta = HashMap::new();
        for spec in specs {
            let defaults = (spec.defaults)();
            let sig = Signature {
                params: defaults.keys().cloned().collect(),
                requires_melody: spec.requires_melody,
            };
            log::debug!(
                "registered preset '{}' ({} params{})",
                spec.name,
                sig.params.len(),
                if sig.requires_melody { ", melodic" } else { "" }
            );
            ctors.insert(spec.name.to_string(), spec.ctor);
            sigs.insert(spec.name.to_string(), sig);
            meta.insert(spec.name.to_string(), defaults);
        }
        Tables { ctors, sigs, meta }
    }

    /// Rediscover all kinds and swap the three maps atomically.
    pub fn reload(&self) {
        let tables = Arc::new(Self::load(super::kinds::all()));
        let mut guard = self.inner.lock().expect("registry lock poisoned");
        *guard = tables;
        log::info!("preset registry reloaded ({} kinds)", guard.ctors.len());
    }

    /// Take an immutable snapshot of the current state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let guard = self.inner.lock().expect("registry lock poisoned");
        RegistrySnapshot {
            tables: Arc::clone(&guard),
        }
    }

    pub fn signature(&self, name: &str) -> Option<Signature> {
        self.snapshot().signature(name).cloned()
    }

    pub fn defaults(&self, name: &str) -> Option<Params> {
        self.snapshot().defaults(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains(name)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.snapshot().kinds()
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
