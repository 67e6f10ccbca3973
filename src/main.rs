//! Sempre — always-on generative music engine.
//!
//! Headless driver: boots the engine worker and the Maestro, enters one
//! zone, and plays until Ctrl-C (or `--duration` elapses).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use sempre::arrange::Genre;
use sempre::compositor::{Compositor, Melody};
use sempre::engine::{command_queue, AudioOut, Engine, COMMAND_QUEUE_CAPACITY};
use sempre::maestro::{Maestro, MaestroCore};
use sempre::preset::PresetRegistry;

/// Frames per rendered block.
const BLOCK_FRAMES: usize = 1024;

#[derive(Parser)]
#[command(name = "sempre", about = "Always-on generative music engine")]
struct Cli {
    /// Directory of melody .json files
    #[arg(short, long, default_value = "melodies")]
    melodies: PathBuf,

    /// Zone name to enter on startup
    #[arg(short, long, default_value = "ambient")]
    zone: String,

    /// Presets for the zone (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    presets: Vec<String>,

    /// Genre template for the progression (pop, rock, blues, jazz,
    /// classical, funk); omit for the Markov fallback
    #[arg(short, long)]
    genre: Option<String>,

    /// Stop after this many seconds (omit for indefinite playback)
    #[arg(short, long)]
    duration: Option<f64>,

    /// RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

/// Built-in fallback so the engine sings without any melody files.
fn default_melody() -> Melody {
    Melody::from_source(
        "aria",
        r#"{
          // simple built-in aria
          "tempo": 96,
          "time_signature": "4/4",
          "hands": [
            [ { "frequency": 261.63, "duration_beats": 1.0 },
              { "frequency": 329.63, "duration_beats": 1.0 },
              { "frequency": 392.0,  "duration_beats": 1.0 },
              { "frequency": 329.63, "duration_beats": 0.5 },
              { "frequency": 440.0,  "duration_beats": 1.5 },
              { "frequency": 392.0,  "duration_beats": 2.0 } ]
          ]
        }"#,
    )
    .expect("builtin melody parses")
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let presets = if cli.presets.is_empty() {
        vec!["dual_drone".to_string(), "keys".to_string()]
    } else {
        cli.presets.clone()
    };
    let genre = cli.genre.as_deref().and_then(Genre::parse);

    let registry = Arc::new(PresetRegistry::new());
    log::info!("presets discovered: {}", registry.kinds().join(", "));

    let compositor = match Compositor::load_dir(&cli.melodies, cli.seed) {
        Ok(c) if !c.is_empty() => c,
        Ok(_) => {
            log::warn!(
                "no melodies in {}, using the builtin aria",
                cli.melodies.display()
            );
            Compositor::with_melodies(vec![default_melody()], cli.seed)
        }
        Err(e) => {
            log::warn!(
                "cannot read {} ({e}), using the builtin aria",
                cli.melodies.display()
            );
            Compositor::with_melodies(vec![default_melody()], cli.seed)
        }
    };

    let (handle, consumer) = command_queue(COMMAND_QUEUE_CAPACITY);

    let stop = Arc::new(AtomicBool::new(false));

    // The engine worker owns the device: render, push, pace on a full
    // ring. Device failure is fatal — the control side exits too.
    let worker_registry = Arc::clone(&registry);
    let worker_stop = Arc::clone(&stop);
    let worker = thread::spawn(move || {
        let mut audio = match AudioOut::new() {
            Ok(audio) => audio,
            Err(e) => {
                log::error!("audio device unavailable: {e}");
                worker_stop.store(true, Ordering::SeqCst);
                return;
            }
        };
        let mut engine = Engine::new(consumer, worker_registry, audio.sample_rate() as f64);
        engine.enable_auto_eq();
        log::info!("engine up at {} Hz", audio.sample_rate());

        loop {
            engine.process();
            if engine.is_shutdown() && engine.active_voices() == 0 {
                break;
            }
            let mut block = engine.render_block(BLOCK_FRAMES);
            loop {
                match audio.send(block) {
                    Ok(()) => break,
                    Err(rejected) => {
                        // Ring is full: the device is behind, wait it out.
                        block = rejected;
                        thread::sleep(Duration::from_millis(2));
                        engine.process();
                    }
                }
            }
        }
        log::info!("engine worker stopped");
    });

    let core = MaestroCore::new(handle, registry, compositor, genre, cli.seed);
    let maestro = Maestro::start(core);
    maestro.enter_zone(&cli.zone, presets.iter().map(String::as_str));

    let stop_clone = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::SeqCst);
    }) {
        log::warn!("failed to set Ctrl-C handler: {e}");
    }

    eprintln!(
        "Playing zone '{}' with [{}]... (Ctrl-C to stop)",
        cli.zone,
        presets.join(", ")
    );

    let start = Instant::now();
    let timeout = cli.duration.map(Duration::from_secs_f64);
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if let Some(t) = timeout {
            if start.elapsed() >= t {
                break;
            }
        }
        thread::sleep(Duration::from_millis(50));
    }

    maestro.shutdown();
    let _ = worker.join();
    eprintln!("Stopped.");
}
