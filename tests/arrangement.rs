//! Arrangement pipeline integration tests — compositor through auto-mix,
//! no audio hardware involved.

use std::collections::HashMap;

use sempre::arrange::{
    ArrangementEngine, Genre, HarmonicAnalyser, HarmonicFunction, LoudnessMeter, Orchestrator,
    Part, ProgressionSynth,
};
use sempre::arrange::automix::{sine_stub, AutoMixer, MIX_SAMPLE_RATE};
use sempre::compositor::{Compositor, Melody};
use sempre::theory::ChordSymbol;

fn walk_compositor() -> Compositor {
    let melody = Melody::from_source(
        "walk",
        r#"{ "tempo": 120, "time_signature": "4/4",
            "hands": [[
                { "frequency": 261.63, "duration_beats": 1.0 },
                { "frequency": 329.63, "duration_beats": 1.0 },
                { "frequency": 392.0,  "duration_beats": 1.0 },
                { "frequency": 440.0,  "duration_beats": 1.0 }
            ]] }"#,
    )
    .unwrap();
    let mut c = Compositor::with_melodies(vec![melody], 42);
    c.start("walk");
    c
}

#[test]
fn analyser_labels_c_major_triad() {
    let mut ha = HarmonicAnalyser::new();
    let analysis = ha.describe(&[(261.63, 1.0), (329.63, 1.0), (392.0, 1.0)]);
    assert_eq!(analysis.key.to_string(), "C major");
    let chords: Vec<String> = analysis.chords.iter().map(|c| c.to_string()).collect();
    assert_eq!(chords, vec!["C", "C", "C"]);
    assert!(analysis
        .functions
        .iter()
        .all(|f| *f == HarmonicFunction::Tonic));
}

#[test]
fn pop_progression_in_c_over_sixteen_beats() {
    let mut ha = HarmonicAnalyser::new();
    let analysis = ha.describe(&[(261.63, 1.0), (329.63, 1.0), (392.0, 1.0)]);
    let mut ps = ProgressionSynth::new(Some(Genre::Pop), 0.5);
    let chords: Vec<String> = ps
        .next(&analysis, 16.0)
        .iter()
        .map(|c| c.to_string())
        .collect();
    assert_eq!(chords, vec!["C", "G", "Am", "F"]);
}

#[test]
fn progression_coverage_for_every_genre_and_beat_count() {
    let mut ha = HarmonicAnalyser::new();
    let analysis = ha.describe(&[(261.63, 1.0)]);
    for genre in Genre::ALL {
        let mut ps = ProgressionSynth::new(Some(genre), 0.5);
        for beats in 1..=64u32 {
            let chords = ps.next(&analysis, beats as f64);
            let expected = ((beats as f64 / 4.0).round() as usize).max(1);
            assert!(!chords.is_empty(), "{genre:?}/{beats}: empty progression");
            assert_eq!(chords.len(), expected, "{genre:?}/{beats}");
        }
    }
}

#[test]
fn orchestrator_respects_registers() {
    let orc = Orchestrator::new();
    let chords = vec![
        ChordSymbol::parse("C").unwrap(),
        ChordSymbol::parse("G").unwrap(),
    ];
    let parts = orc.voice(&chords, &[2.0, 2.0]);

    let bass = &parts["bass"];
    assert!(!bass.notes.is_empty());
    assert!(bass.notes.iter().all(|&n| (28.0..=48.0).contains(&n)));

    let piano = &parts["piano"];
    assert!(piano.notes.len() >= 2 * chords.len());
    assert!(piano.notes.iter().all(|&n| (50.0..=96.0).contains(&n)));
}

#[test]
fn block_durations_match_requested_beats() {
    let mut engine = ArrangementEngine::new(Some(Genre::Pop), 42);
    let mut comp = walk_compositor();
    for beats in [4.0, 8.0, 12.0, 16.0] {
        let parts = engine.prepare_block(&mut comp, beats, None);
        for role in ["bass", "piano"] {
            let total = parts[role].total_duration();
            assert!(
                (total - beats).abs() < 1e-6,
                "{role}@{beats}: sum {total}"
            );
        }
    }
}

#[test]
fn automix_reaches_target_loudness() {
    let mut mixer = AutoMixer::new(-14.0);
    let meter = LoudnessMeter::new(MIX_SAMPLE_RATE);
    let mut parts = HashMap::new();
    parts.insert(
        "melody".to_string(),
        Part {
            notes: vec![440.0, 523.25, 659.26],
            durations: vec![1.0, 1.0, 1.0],
            intensity: vec![0.8; 3],
            ..Part::default()
        },
    );
    parts.insert(
        "bass".to_string(),
        Part {
            notes: vec![36.0, 43.0, 36.0],
            durations: vec![2.0, 1.0, 1.0],
            intensity: vec![0.9; 3],
            ..Part::default()
        },
    );

    mixer.autoset(&mut parts, Some(-14.0));

    for (name, part) in &parts {
        let gain_db = part.gain_db.expect("gain set");
        let stub = sine_stub(&part.notes, &part.durations, MIX_SAMPLE_RATE);
        let lin = 10.0f64.powf(gain_db / 20.0);
        let adjusted: Vec<f64> = stub.iter().map(|x| x * lin).collect();
        let after = meter.integrated(&adjusted);
        assert!(
            (after - (-14.0)).abs() <= 1.5,
            "{name}: {after} LUFS after {gain_db} dB"
        );
    }
}

#[test]
fn full_pipeline_emits_consistent_parts() {
    let mut engine = ArrangementEngine::new(Some(Genre::Classical), 7);
    let mut comp = walk_compositor();
    let parts = engine.prepare_block(&mut comp, 8.0, None);

    assert!(parts.len() >= 3);
    for (role, part) in &parts {
        assert_eq!(part.notes.len(), part.durations.len(), "{role}");
        assert_eq!(part.notes.len(), part.intensity.len(), "{role}");
        assert!(part.gain_db.is_some(), "{role} unmixed");
        assert!(part.durations.iter().all(|&d| d > 0.0), "{role}");
    }
}

#[test]
fn pipeline_keeps_flowing_across_blocks() {
    // An always-on engine must produce block after block.
    let mut engine = ArrangementEngine::new(None, 3);
    let mut comp = walk_compositor();
    for _ in 0..16 {
        let parts = engine.prepare_block(&mut comp, 8.0, None);
        assert!(!parts["melody"].is_empty());
        assert!(!parts["bass"].is_empty());
    }
}
