//! Timeline sequencing: pattern advancement, jumps, goto, tempo slides and
//! pattern delay.

mod common;

use common::*;
use segno::prelude::*;
use segno::Value;

const RATE: u32 = 48000;
const CHUNK: usize = 1024;

fn render_to_end(player: &mut Player, cap: usize) -> usize {
    let mut total = 0;
    while !player.end_reached() && total < cap {
        let produced = player.render(CHUNK);
        if produced == 0 && player.end_reached() {
            break;
        }
        if produced == 0 {
            break;
        }
        total += produced;
    }
    total
}

#[test]
fn one_pattern_song_ends_after_its_length() {
    // 4 beats at 120 BPM = 96000 frames.
    let module = with_one_pattern(debug_module(), 4);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let total = render_to_end(&mut player, 200_000);
    assert!(player.end_reached());
    assert!((95990..=96010).contains(&total), "total {total}");
}

#[test]
fn song_walks_every_system() {
    use segno::core::module::{PatInstRef, Pattern, Song, TrackList};

    let mut module = debug_module();
    module
        .patterns
        .push(Pattern::new(Tstamp::from_beats(1)));
    module
        .patterns
        .push(Pattern::new(Tstamp::from_beats(2)));
    let mut song = Song::new(120.0);
    song.push(PatInstRef::new(0, 0));
    song.push(PatInstRef::new(1, 0));
    song.push(PatInstRef::new(0, 1));
    module.songs.push(song);
    module.track_list = TrackList::new(vec![0]);

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // 1 + 2 + 1 beats = 96000 frames.
    let total = render_to_end(&mut player, 200_000);
    assert!((95990..=96010).contains(&total), "total {total}");
    assert!(player.end_reached());
}

#[test]
fn position_tracks_the_timeline() {
    let module = with_one_pattern(debug_module(), 4);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // One beat in: row sits at beat 1.
    let mut rendered = 0;
    while rendered < 24000 {
        rendered += player.render((24000 - rendered).min(CHUNK));
    }
    let pos = player.position();
    assert_eq!(pos.system, 0);
    assert!((pos.row.as_beats_f64() - 1.0).abs() < 0.001, "{:?}", pos.row);
}

#[test]
fn bounded_jump_repeats_the_loop_twice() {
    let mut module = with_one_pattern(debug_module(), 1);
    // At half a beat, jump back to the pattern start twice.
    add_trigger(
        &mut module,
        0,
        0,
        "m.set_jump_counter",
        Value::Int(2),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "m.set_jump_row",
        Value::Tstamp(Tstamp::ZERO),
        Tstamp::ZERO,
    );
    let half = Tstamp::new(0, segno::core::limits::TSTAMP_BEAT as i64 / 2);
    add_trigger(&mut module, 0, 0, "m.jump", Value::None, half);

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // Two extra half-beat passes: 0.5 + 0.5 + 1.0 beats = 48000 frames.
    let total = render_to_end(&mut player, 200_000);
    assert!((47980..=48030).contains(&total), "total {total}");
}

#[test]
fn zero_length_goto_loop_stops_playback() {
    let mut module = with_one_pattern(debug_module(), 1);
    add_trigger(
        &mut module,
        0,
        0,
        "m.set_goto_row",
        Value::Tstamp(Tstamp::ZERO),
        Tstamp::ZERO,
    );
    add_trigger(&mut module, 0, 0, "m.goto", Value::None, Tstamp::ZERO);

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let produced = player.render(CHUNK);
    assert_eq!(produced, 0);
    assert_eq!(player.position().row, Tstamp::ZERO);
}

#[test]
fn pattern_delay_postpones_the_timeline() {
    let mut module = with_one_pattern(debug_module(), 1);
    add_trigger(
        &mut module,
        0,
        0,
        "m.pattern_delay",
        Value::Tstamp(Tstamp::from_beats(1)),
        Tstamp::ZERO,
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // One beat of delay plus the one-beat pattern.
    let total = render_to_end(&mut player, 200_000);
    assert!((47980..=48030).contains(&total), "total {total}");
}

#[test]
fn tempo_slide_shortens_the_pattern_as_expected() {
    let mut module = with_one_pattern(debug_module(), 4);
    add_trigger(
        &mut module,
        0,
        0,
        "m.slide_tempo_length",
        Value::Tstamp(Tstamp::from_beats(1)),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "m.slide_tempo",
        Value::Float(240.0),
        Tstamp::ZERO,
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // Piecewise-linear BPM 120 -> 240 over the first beat in 24 slices,
    // then 3 beats at 240: the slide beat takes about 17100 frames and the
    // tail exactly 36000.
    let total = render_to_end(&mut player, 200_000);
    assert!((52600..=53700).contains(&total), "total {total}");
}

#[test]
fn set_tempo_applies_immediately() {
    let mut module = with_one_pattern(debug_module(), 2);
    add_trigger(
        &mut module,
        0,
        0,
        "m.set_tempo",
        Value::Float(240.0),
        Tstamp::ZERO,
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // 2 beats at 240 BPM = 24000 frames.
    let total = render_to_end(&mut player, 100_000);
    assert!((23990..=24010).contains(&total), "total {total}");
}

#[test]
fn type_mismatched_trigger_is_dropped_without_effect() {
    let mut module = with_one_pattern(debug_module(), 2);
    // Tempo wants a number; a string must be ignored.
    add_trigger(
        &mut module,
        0,
        0,
        "m.set_tempo",
        Value::String("fast".into()),
        Tstamp::ZERO,
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let total = render_to_end(&mut player, 100_000);
    // Still the original 120 BPM: 2 beats = 48000 frames.
    assert!((47990..=48010).contains(&total), "total {total}");
}

#[test]
fn pattern_mode_loops_until_stopped() {
    let module = with_one_pattern(debug_module(), 1);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();

    // Three pattern lengths without reaching an end.
    let mut total = 0;
    for _ in 0..100 {
        total += player.render(CHUNK);
    }
    assert!(total >= 72000);
    assert!(!player.end_reached());

    player.stop();
    assert_eq!(player.render(CHUNK), 0);
}

#[test]
fn environment_events_store_values() {
    let module = with_one_pattern(debug_module(), 1);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_pattern(PatInstRef::new(0, 0)).unwrap();

    player.fire(0, "env.set_name", Value::String("section".into()));
    player.fire(0, "env.set_value", Value::Int(3));
    assert_eq!(player.environment_value("section"), Some(&Value::Int(3)));
    assert_eq!(player.environment_value("missing"), None);
}
