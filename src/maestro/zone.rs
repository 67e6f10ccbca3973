//! Zone state — a named preset bundle plus its parameter walkers and
//! block deadline.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::preset::ParamWalker;

/// One zone: its preset set, the random-walk state for each static
/// preset's parameters, the presets it has actually started (faded out
/// when the zone is left), and the next block deadline.
pub struct Zone {
    pub name: String,
    pub presets: BTreeSet<String>,
    pub walkers: BTreeMap<String, BTreeMap<String, ParamWalker>>,
    pub active: BTreeSet<String>,
    pub next_due: Instant,
    pub started: bool,
}

impl Zone {
    pub fn new(name: &str, presets: BTreeSet<String>, now: Instant) -> Self {
        Self {
            name: name.to_string(),
            presets,
            walkers: BTreeMap::new(),
            active: BTreeSet::new(),
            next_due: now,
            started: false,
        }
    }
}
