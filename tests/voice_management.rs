//! Voice pool behaviour through the public surface.

mod common;

use common::*;
use segno::prelude::*;
use segno::Value;

const RATE: u32 = 48000;
const CHUNK: usize = 1024;

/// A looping pattern so externally fired notes keep rendering.
fn looping_player(voices: usize) -> Player {
    let module = with_one_pattern(noise_module(), 1);
    let mut player =
        Player::with_voices(arc(module), RATE, CHUNK, voices).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();
    player
}

#[test]
fn each_note_takes_one_voice_per_processor() {
    let mut player = looping_player(16);
    player.fire(0, "c.note_on", Value::Float(0.0));
    player.render(64);
    // Pitch, force and noise.
    assert_eq!(player.active_voice_count(), 3);
}

#[test]
fn full_pool_steals_the_oldest_note() {
    // Room for exactly two three-voice groups.
    let mut player = looping_player(6);
    player.fire(0, "c.note_on", Value::Float(0.0));
    player.render(64);
    player.fire(1, "c.note_on", Value::Float(100.0));
    player.render(64);
    assert_eq!(player.active_voice_count(), 6);

    // The third note steals the first note's whole group.
    player.fire(2, "c.note_on", Value::Float(200.0));
    player.render(64);
    assert_eq!(player.active_voice_count(), 6);
}

#[test]
fn released_notes_are_stolen_before_held_ones() {
    let mut player = looping_player(6);
    player.fire(0, "c.note_on", Value::Float(0.0));
    player.render(16);
    player.fire(1, "c.note_on", Value::Float(100.0));
    // Release the newer note; it becomes the preferred victim.
    player.fire(1, "c.note_off", Value::None);

    player.fire(2, "c.note_on", Value::Float(200.0));
    player.render(16);

    // The held note on channel 0 survived; retriggering channel 0 replaces
    // it rather than allocating beside it, so the count stays bounded.
    assert!(player.active_voice_count() <= 6);
}

#[test]
fn stop_silences_everything() {
    let mut player = looping_player(16);
    player.fire(0, "c.note_on", Value::Float(0.0));
    player.render(64);
    assert!(player.active_voice_count() > 0);

    player.stop();
    assert_eq!(player.active_voice_count(), 0);
    assert_eq!(player.render(CHUNK), 0);
}

#[test]
fn note_on_to_effect_unit_is_ignored() {
    use segno::core::module::{AuType, AudioUnit};

    let mut module = with_one_pattern(noise_module(), 1);
    module.audio_units.push(AudioUnit::new(AuType::Effect));
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();

    player.fire(0, "c.set_au", Value::Int(1));
    player.fire(0, "c.note_on", Value::Float(0.0));
    player.render(64);
    assert_eq!(player.active_voice_count(), 0);
}

#[test]
fn hit_without_mapping_allocates_nothing() {
    let mut player = looping_player(16);
    player.fire(0, "c.hit", Value::Int(3));
    player.render(64);
    assert_eq!(player.active_voice_count(), 0);
}

#[test]
fn hit_selects_through_the_hit_map() {
    use segno::core::module::{ProcParams, SampleEntry, SampleProcParams};
    use segno::{HitMap, HitMapEntry, Sample};

    let mut samples = SampleProcParams::default();
    samples.samples.push(SampleEntry {
        sample: Sample::new(vec![vec![0.5; 512]]),
        middle_pitch: 0.0,
        volume: 0.0,
    });
    let mut hit_map = HitMap::new();
    hit_map.add_entry(
        2,
        HitMapEntry {
            force: 0.0,
            sample_index: 0,
            cents_offset: 0.0,
            volume_adjust: 0.0,
        },
    );
    samples.hit_map = hit_map;

    let mut module = with_one_pattern(
        instrument_module(ProcParams::Sample(samples)),
        1,
    );
    module.audio_units[0].hits = vec![
        segno::core::module::HitInfo::default(),
        segno::core::module::HitInfo::default(),
        segno::core::module::HitInfo {
            exists: true,
            allowed_procs: None,
        },
    ];

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();

    // Hit 0 does not exist; hit 2 is mapped.
    player.fire(0, "c.hit", Value::Int(0));
    player.render(16);
    assert_eq!(player.active_voice_count(), 0);

    player.fire(0, "c.hit", Value::Int(2));
    player.render(16);
    assert_eq!(player.active_voice_count(), 3);
}

#[test]
fn note_expression_filters_processors() {
    let mut module = with_one_pattern(noise_module(), 1);
    // Under "muted", only pitch and force render; the generator is gated.
    module.audio_units[0]
        .expressions
        .add("muted", vec![true, true, false]);

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();

    player.fire(0, "c.carry_note_expression", Value::Bool(true));
    player.fire(0, "c.set_note_expression", Value::String("muted".into()));
    player.fire(0, "c.note_on", Value::Float(0.0));

    // Only two voices were reserved, and with no generator the group has
    // nothing audible, so it is dropped after the first chunk.
    let reserved = player.active_voice_count();
    assert_eq!(reserved, 2);
    player.render(16);
    assert_eq!(player.active_voice_count(), 0);
}

#[test]
fn control_variable_bindings_reshape_the_processor() {
    use segno::core::module::{ControlVarBinding, ControlVarDef};

    let build = |set_cv: bool| {
        let mut module = with_one_pattern(noise_module(), 2);
        module.random_seed = 21;
        module.audio_units[0].control_vars.push(ControlVarDef {
            name: "tone".into(),
            init_value: Value::Int(0),
            bindings: vec![ControlVarBinding {
                proc_index: PROC_GEN,
                param_name: "order".into(),
            }],
        });

        let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
        player.play_pattern(PatInstRef::new(0, 0)).unwrap();
        if set_cv {
            player.fire(0, "cv.set_name", Value::String("tone".into()));
            player.fire(0, "cv.set_value", Value::Int(4));
        }
        player.fire(0, "c.note_on", Value::Float(0.0));
        let mut out = Vec::new();
        for _ in 0..4 {
            player.render(512);
            out.extend_from_slice(player.output_buffer(0));
        }
        out
    };

    // A fourth-order zero chain sounds nothing like the flat default.
    assert_ne!(build(false), build(true));
}
