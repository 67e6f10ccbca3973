//! Maestro and engine integration — zone lifecycle, parameter walks,
//! registry snapshots. Everything runs against the hardware-free
//! engine worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sempre::arrange::Genre;
use sempre::compositor::{Compositor, Melody};
use sempre::engine::{command_queue, Engine};
use sempre::maestro::MaestroCore;
use sempre::preset::{ParamWalker, PresetRegistry, Value};

fn melody() -> Melody {
    Melody::from_source(
        "two_note",
        r#"{ "tempo": 120, "time_signature": "4/4",
            "hands": [[ { "frequency": 440.0, "duration_beats": 1.0 },
                        { "frequency": 523.25, "duration_beats": 1.0 } ]] }"#,
    )
    .unwrap()
}

fn setup() -> (MaestroCore, Engine) {
    let registry = Arc::new(PresetRegistry::new());
    let (handle, consumer) = command_queue(256);
    let engine = Engine::new(consumer, Arc::clone(&registry), 44100.0);
    let compositor = Compositor::with_melodies(vec![melody()], 42);
    let core = MaestroCore::new(handle, registry, compositor, Some(Genre::Pop), 42);
    (core, engine)
}

#[test]
fn two_note_melody_cycles_through_playheads() {
    let mut c = Compositor::with_melodies(vec![melody()], 42);
    c.start("two_note");
    let mut notes = Vec::new();
    for _ in 0..8 {
        let (n, d, i) = c.next_event();
        assert_eq!(d, [1.0]);
        assert_eq!(i, [0.8]);
        notes.push(n[0]);
    }
    assert_eq!(
        notes,
        vec![440.0, 523.25, 440.0, 523.25, 440.0, 523.25, 440.0, 523.25]
    );
}

#[test]
fn zone_enter_then_leave_reclaims_all_instances() {
    let (mut core, mut engine) = setup();
    let now = Instant::now();

    core.enter_zone("ambient", vec!["dual_drone".to_string()], now);
    core.tick(now);
    engine.process();
    assert!(engine.active_voices() >= 1, "zone should start its preset");

    // Leave within the same block (well under 100 ms of control time).
    core.leave_zone("ambient");
    engine.process();

    // Fade-out completes within 2 s of rendered audio.
    let blocks_for_two_secs = (2.0 * 44100.0 / 1024.0) as usize + 1;
    for _ in 0..blocks_for_two_secs {
        engine.render_block(1024);
    }
    assert_eq!(
        engine.active_voices(),
        0,
        "no live instances may remain after fade-out"
    );
}

#[test]
fn walker_ten_thousand_steps_stay_in_window() {
    let mut walker = ParamWalker::new(Value::Float(100.0));
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for _ in 0..10_000 {
        match walker.step(&mut rng) {
            Value::Float(v) => assert!(
                (50.0..=200.0).contains(&v),
                "stepped value {v} escaped [50, 200]"
            ),
            other => panic!("float walker produced {other:?}"),
        }
    }
}

#[test]
fn registry_snapshot_is_never_partial() {
    let registry = PresetRegistry::new();
    // Interleave reloads with snapshot reads; every name visible in a
    // snapshot must have both its signature and defaults in that same
    // snapshot.
    for _ in 0..50 {
        let snap = registry.snapshot();
        for kind in snap.kinds() {
            let sig = snap.signature(&kind).expect("signature present");
            let defaults = snap.defaults(&kind).expect("defaults present");
            assert_eq!(
                sig.params,
                defaults.keys().cloned().collect::<Vec<_>>(),
                "{kind}: signature and defaults out of sync"
            );
        }
        registry.reload();
    }
}

#[test]
fn melodic_and_static_presets_coexist_in_a_zone() {
    let (mut core, mut engine) = setup();
    let now = Instant::now();
    core.enter_zone(
        "mixed",
        vec!["dual_drone".to_string(), "keys".to_string()],
        now,
    );
    core.tick(now);
    let handled = engine.process();
    // One static play plus one play per arranged part.
    assert!(handled >= 4, "expected static + part plays, got {handled}");
    assert!(engine.active_voices() >= 2);
}

#[test]
fn blocks_advance_on_schedule() {
    let (mut core, mut engine) = setup();
    let mut now = Instant::now();
    core.enter_zone("z", vec!["air_bed".to_string()], now);

    let mut plays = 0;
    for _ in 0..5 {
        let next = core.tick(now).expect("zone keeps a deadline");
        engine.process();
        plays += 1;
        now = next + Duration::from_millis(1);
    }
    assert_eq!(plays, 5);
    // Tempo stays clamped through all the drift.
    assert!((60.0..=240.0).contains(&core.tempo()));
}

#[test]
fn stepped_parameters_change_between_blocks() {
    let (mut core, mut engine) = setup();
    let mut now = Instant::now();
    core.enter_zone("z", vec!["dual_drone".to_string()], now);

    // Run several blocks; the drone is re-issued each time with walked
    // parameters, which shows up as repeated play commands.
    let mut total_commands = 0;
    for _ in 0..4 {
        let next = core.tick(now).unwrap();
        total_commands += engine.process();
        now = next + Duration::from_millis(1);
    }
    assert_eq!(total_commands, 4);
    // Replays crossfade through the rack rather than stacking.
    let mut out_blocks = 0;
    while engine.active_voices() > 1 && out_blocks < 200 {
        engine.render_block(1024);
        out_blocks += 1;
    }
    assert!(engine.active_voices() >= 1);
}
