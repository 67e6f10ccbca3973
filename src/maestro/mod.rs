//! Maestro — the zone-based, block-aligned orchestrator.
//!
//! Every zone runs cooperatively on one control thread: each block the
//! Maestro drifts the global tempo and energy, random-steps the static
//! presets' parameters, re-issues their plays, runs the arrangement
//! pipeline for the melodic presets, and sleeps until the next block
//! boundary. [`MaestroCore`] is a plain tick-driven state machine so
//! all scheduling is testable without threads or audio hardware;
//! [`Maestro`] wraps it in the control thread and channel API.

pub mod zone;

pub use zone::Zone;

use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::arrange::{ArrangementEngine, Genre, Part};
use crate::compositor::Compositor;
use crate::engine::EngineHandle;
use crate::pool::WorkerPool;
use crate::preset::{ParamWalker, Params, PresetRegistry, Value};

/// Beats per scheduler block.
pub const DEFAULT_BLOCK_BEATS: f64 = 8.0;
/// Fade applied to a zone's presets when it is left or replaced.
const ZONE_FADE_MS: f64 = 1000.0;

const TEMPO_MIN: f64 = 60.0;
const TEMPO_MAX: f64 = 240.0;

enum Ctrl {
    Enter { zone: String, presets: Vec<String> },
    Leave { zone: String },
    Sfx { preset: String, params: Params },
    Shutdown,
}

/// The single-threaded scheduler state. Drive it with [`tick`](Self::tick).
pub struct MaestroCore {
    zones: HashMap<String, Zone>,
    tempo: f64,
    energy: f64,
    phase: f64,
    last_time: Option<Instant>,
    block_beats: f64,
    rng: ChaCha8Rng,
    registry: Arc<PresetRegistry>,
    engine: EngineHandle,
    compositor: Compositor,
    arranger: ArrangementEngine,
    pool: WorkerPool,
    sfx: Vec<(String, Params)>,
    shutdown: bool,
}

impl MaestroCore {
    pub fn new(
        engine: EngineHandle,
        registry: Arc<PresetRegistry>,
        compositor: Compositor,
        genre: Option<Genre>,
        seed: u64,
    ) -> Self {
        Self {
            zones: HashMap::new(),
            tempo: 120.0,
            energy: 0.7,
            phase: 0.02,
            last_time: None,
            block_beats: DEFAULT_BLOCK_BEATS,
            rng: ChaCha8Rng::seed_from_u64(seed),
            registry,
            engine,
            compositor,
            arranger: ArrangementEngine::new(genre, seed),
            pool: WorkerPool::with_default_size(),
            sfx: Vec::new(),
            shutdown: false,
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn block_beats(&self) -> f64 {
        self.block_beats
    }

    pub fn zone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.zones.keys().cloned().collect();
        names.sort();
        names
    }

    /// Presets a zone has started so far.
    pub fn zone_active(&self, name: &str) -> Option<Vec<String>> {
        self.zones
            .get(name)
            .map(|z| z.active.iter().cloned().collect())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Install (or replace) a zone. A replaced zone's presets fade out
    /// first; the new loop's first block is due immediately.
    pub fn enter_zone<I>(&mut self, name: &str, presets: I, now: Instant)
    where
        I: IntoIterator<Item = String>,
    {
        if self.zones.contains_key(name) {
            self.leave_zone(name);
        }
        let presets: BTreeSet<String> = presets.into_iter().collect();
        log::info!("entering zone '{name}' with {} preset(s)", presets.len());
        self.zones
            .insert(name.to_string(), Zone::new(name, presets, now));
    }

    /// Cancel a zone's loop and fade out every preset it started.
    pub fn leave_zone(&mut self, name: &str) {
        if let Some(zone) = self.zones.remove(name) {
            log::info!("leaving zone '{name}'");
            for preset in &zone.active {
                if let Err(e) = self.engine.stop_preset(preset, ZONE_FADE_MS) {
                    log::warn!("[{name}] failed to stop '{preset}': {e}");
                }
            }
        }
    }

    /// Queue a one-shot effect, dispatched at the next block boundary.
    pub fn queue_sfx(&mut self, preset: &str, params: Params) {
        self.sfx.push((preset.to_string(), params));
    }

    /// Run every zone whose deadline has passed. Returns the earliest
    /// next deadline, if any zone remains.
    pub fn tick(&mut self, now: Instant) -> Option<Instant> {
        let due: Vec<String> = self
            .zones
            .values()
            .filter(|z| z.next_due <= now)
            .map(|z| z.name.clone())
            .collect();
        for name in due {
            self.run_zone_block(&name, now);
        }
        self.zones.values().map(|z| z.next_due).min()
    }

    fn handle(&mut self, ctrl: Ctrl, now: Instant) {
        match ctrl {
            Ctrl::Enter { zone, presets } => self.enter_zone(&zone, presets, now),
            Ctrl::Leave { zone } => self.leave_zone(&zone),
            Ctrl::Sfx { preset, params } => self.queue_sfx(&preset, params),
            Ctrl::Shutdown => {
                if let Err(e) = self.engine.stop_all(ZONE_FADE_MS) {
                    log::warn!("stop_all on shutdown failed: {e}");
                }
                let _ = self.engine.shutdown();
                self.shutdown = true;
            }
        }
    }

    /// One block for one zone: drift the globals, step the static
    /// presets, render the melodic ones, reschedule.
    fn run_zone_block(&mut self, name: &str, now: Instant) {
        let Some(mut zone) = self.zones.remove(name) else {
            return;
        };

        if !zone.started {
            if let Some(melody) = self.compositor.pick_random() {
                log::info!("[{name}] starting melody '{melody}'");
                self.compositor.start(&melody);
            }
            zone.started = true;
        }

        self.update_tempo();
        self.update_energy(now);

        let snapshot = self.registry.snapshot();
        let mut statics = Vec::new();
        let mut melodic = Vec::new();
        for preset in &zone.presets {
            match snapshot.signature(preset) {
                Some(sig) if sig.requires_melody => melodic.push(preset.clone()),
                Some(_) => statics.push(preset.clone()),
                None => log::warn!("[{name}] unknown preset '{preset}' in zone"),
            }
        }

        // Static presets first: step every declared parameter and
        // re-issue the play.
        for preset in &statics {
            let walkers = zone.walkers.entry(preset.clone()).or_insert_with(|| {
                snapshot
                    .defaults(preset)
                    .map(|defaults| {
                        defaults
                            .iter()
                            .map(|(k, v)| (k.clone(), ParamWalker::new(v.clone())))
                            .collect()
                    })
                    .unwrap_or_default()
            });
            let mut params = Params::new();
            for (key, walker) in walkers.iter_mut() {
                params.insert(key.clone(), walker.step(&mut self.rng));
            }
            // The energy LFO feeds the intensity parameter.
            if let Some(intensity) = params.get("intensity").and_then(Value::as_f64) {
                params.insert(
                    "intensity".to_string(),
                    Value::Float((intensity * self.energy).clamp(0.0, 1.0)),
                );
            }
            match self.engine.play_preset(preset, params) {
                Ok(()) => {
                    zone.active.insert(preset.clone());
                }
                Err(e) => log::warn!("[{name}] dropping play for '{preset}': {e}"),
            }
        }

        // Queued SFX ride along after the statics.
        for (preset, params) in std::mem::take(&mut self.sfx) {
            if let Err(e) = self.engine.play_preset(&preset, params) {
                log::warn!("[{name}] dropping sfx '{preset}': {e}");
            }
        }

        // Melodic presets: run the arrangement pipeline and hand each
        // part to one of them.
        if !melodic.is_empty() {
            // Occasionally drift toward another melody.
            if !self.compositor.crossfade_pending() && self.compositor.sprinkle(0.05) {
                if let Some(next) = self.compositor.pick_random() {
                    log::info!("[{name}] crossfading toward '{next}'");
                    self.compositor.crossfade_to(&next, 4);
                }
            }
            let parts =
                self.arranger
                    .prepare_block(&mut self.compositor, self.block_beats, Some(&self.pool));
            let mut roles: Vec<&String> = parts.keys().collect();
            roles.sort();
            for role in roles {
                let part = &parts[role];
                if part.is_empty() {
                    continue;
                }
                let target = &melodic[self.rng.gen_range(0..melodic.len())];
                match self
                    .engine
                    .play_preset(target, part_params(part, self.tempo))
                {
                    Ok(()) => {
                        zone.active.insert(target.clone());
                    }
                    Err(e) => log::warn!("[{name}] dropping '{role}' render: {e}"),
                }
            }
            log::debug!("[{name}] rendered block at {:.1} BPM", self.tempo);

            // Stochastic accent on top of the arrangement.
            if self.compositor.sprinkle(0.1) {
                let mut accent = Params::new();
                accent.insert(
                    "intensity".to_string(),
                    Value::Float((0.4 * self.energy).clamp(0.0, 1.0)),
                );
                if self.engine.play_preset("impulse_tap", accent).is_ok() {
                    zone.active.insert("impulse_tap".to_string());
                }
            }
        }

        let block_secs = self.block_beats * 60.0 / self.tempo;
        zone.next_due = now + Duration::from_secs_f64(block_secs);
        self.zones.insert(name.to_string(), zone);
    }

    fn update_tempo(&mut self) {
        let spread = 0.07 * self.tempo;
        let step = self.rng.gen_range(-spread..=spread);
        self.tempo = (self.tempo + step).clamp(TEMPO_MIN, TEMPO_MAX);
    }

    fn update_energy(&mut self, now: Instant) {
        let dt = self
            .last_time
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        let beat_time = 60.0 / self.tempo;
        self.phase = (self.phase + dt / (32.0 * beat_time)).rem_euclid(1.0);
        self.energy = 0.7 + 0.3 * (std::f64::consts::TAU * self.phase).sin();
        self.last_time = Some(now);
    }
}

/// Translate a mixed part into preset parameters.
fn part_params(part: &Part, tempo: f64) -> Params {
    let mut params = Params::new();
    params.insert("notes".to_string(), Value::List(part.notes.clone()));
    params.insert(
        "durations".to_string(),
        Value::List(part.durations.clone()),
    );
    params.insert(
        "intensity".to_string(),
        Value::List(part.intensity.clone()),
    );
    params.insert("tempo".to_string(), Value::Float(tempo));
    params.insert(
        "gain_db".to_string(),
        Value::Float(part.gain_db.unwrap_or(0.0)),
    );
    params.insert(
        "enable_reverb".to_string(),
        Value::Bool(part.enable_reverb),
    );
    params.insert(
        "enable_chorus".to_string(),
        Value::Bool(part.enable_chorus),
    );
    params
}

/// The public Maestro: owns the control thread and posts messages to it.
pub struct Maestro {
    tx: Sender<Ctrl>,
    handle: Option<JoinHandle<()>>,
}

impl Maestro {
    /// Launch the control thread around a prepared core.
    pub fn start(core: MaestroCore) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || run_loop(core, rx));
        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Install (or replace) a zone.
    pub fn enter_zone<I, S>(&self, name: &str, presets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _ = self.tx.send(Ctrl::Enter {
            zone: name.to_string(),
            presets: presets.into_iter().map(Into::into).collect(),
        });
    }

    /// Alias for [`enter_zone`](Self::enter_zone).
    pub fn set_zone<I, S>(&self, name: &str, presets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enter_zone(name, presets);
    }

    pub fn leave_zone(&self, name: &str) {
        let _ = self.tx.send(Ctrl::Leave {
            zone: name.to_string(),
        });
    }

    pub fn queue_sfx(&self, preset: &str, params: Params) {
        let _ = self.tx.send(Ctrl::Sfx {
            preset: preset.to_string(),
            params,
        });
    }

    /// Stop all zones and join the control thread.
    pub fn shutdown(mut self) {
        let _ = self.tx.send(Ctrl::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Maestro {
    fn drop(&mut self) {
        let _ = self.tx.send(Ctrl::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(mut core: MaestroCore, rx: Receiver<Ctrl>) {
    let mut next_due: Option<Instant> = None;
    loop {
        if core.is_shutdown() {
            break;
        }
        let timeout = next_due
            .map(|due| due.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_millis(200));
        match rx.recv_timeout(timeout) {
            Ok(ctrl) => core.handle(ctrl, Instant::now()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        next_due = core.tick(Instant::now());
    }
    log::info!("maestro control loop stopped");
}
