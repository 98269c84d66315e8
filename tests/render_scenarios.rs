//! End-to-end rendering scenarios.

mod common;

use common::*;
use segno::prelude::*;
use segno::Value;

const RATE: u32 = 48000;
const CHUNK: usize = 1024;

/// Reference one-pole DC blocker matching the master output stage.
struct RefDcBlock {
    ff: f32,
    fb: f32,
}

impl RefDcBlock {
    fn new() -> Self {
        RefDcBlock { ff: 0.0, fb: 0.0 }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = x - self.ff + 0.995 * self.fb;
        self.ff = x;
        self.fb = y;
        y
    }
}

#[test]
fn debug_note_renders_the_expected_waveform() {
    let mut module = with_one_pattern(debug_module(), 4);
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(0.0),
        Tstamp::ZERO,
    );
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let out = render_left(&mut player, 480);
    assert_eq!(out.len(), 480);

    // The generator emits 1.0 on the first frame of each ~109.09-frame
    // period at 0 cents and 0.5 elsewhere; the master stage DC-blocks it.
    // The second period starts at frame 110.
    let mut dc = RefDcBlock::new();
    for (i, &got) in out.iter().enumerate().take(218) {
        let raw = if i == 0 || i == 110 { 1.0 } else { 0.5 };
        let expected = dc.process(raw);
        assert!(
            (got - expected).abs() < 1e-4,
            "frame {i}: got {got}, expected {expected}"
        );
    }
}

#[test]
fn zero_input_is_exactly_zero() {
    let module = with_one_pattern(debug_module(), 2);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let out = render_left(&mut player, 4800);
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn volume_slide_over_silence_stays_silent() {
    let module = with_one_pattern(debug_module(), 4);
    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // Slide the master volume from -96 dB to 0 dB over one beat of silence.
    player.fire(0, "m.set_volume", Value::Float(-96.0));
    player.fire(0, "m.slide_volume_length", Value::Tstamp(Tstamp::from_beats(1)));
    player.fire(0, "m.slide_volume", Value::Float(0.0));

    let out = render_left(&mut player, 24000);
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn chunked_rendering_is_bit_identical() {
    let build = || {
        let mut module = with_one_pattern(noise_module(), 4);
        module.random_seed = 7;
        add_trigger(
            &mut module,
            0,
            0,
            "c.note_on",
            Value::Float(0.0),
            Tstamp::ZERO,
        );
        module
    };

    let mut one = Player::new(arc(build()), RATE, 4096).unwrap();
    one.play_track(0).unwrap();
    let whole = {
        let produced = one.render(4000);
        assert_eq!(produced, 4000);
        one.output_buffer(0).to_vec()
    };

    let mut split = Player::new(arc(build()), RATE, 4096).unwrap();
    split.play_track(0).unwrap();
    let mut parts = Vec::new();
    for want in [13, 987, 1500, 1500] {
        let produced = split.render(want);
        assert_eq!(produced, want);
        parts.extend_from_slice(split.output_buffer(0));
    }

    assert_eq!(whole, parts);
}

#[test]
fn same_seed_renders_identically_across_runs() {
    let build = || {
        let mut module = with_one_pattern(noise_module(), 2);
        module.random_seed = 42;
        add_trigger(
            &mut module,
            0,
            0,
            "c.note_on",
            Value::Float(0.0),
            Tstamp::ZERO,
        );
        module
    };

    let render_once = || {
        let mut player = Player::new(arc(build()), RATE, CHUNK).unwrap();
        player.play_track(0).unwrap();
        render_left(&mut player, 2000)
    };

    assert_eq!(render_once(), render_once());
}

#[test]
fn different_seeds_render_differently() {
    let build = |seed: u64| {
        let mut module = with_one_pattern(noise_module(), 2);
        module.random_seed = seed;
        add_trigger(
            &mut module,
            0,
            0,
            "c.note_on",
            Value::Float(0.0),
            Tstamp::ZERO,
        );
        let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
        player.play_track(0).unwrap();
        render_left(&mut player, 2000)
    };

    assert_ne!(build(1), build(2));
}

#[test]
fn pitch_slide_reaches_halfway_at_half_time() {
    // Noise keeps the group alive for the whole slide; the test tap reads
    // the pitch processor instead of the audio output.
    let mut module = with_one_pattern(noise_module(), 4);
    // Observe the pitch processor output directly through the test tap.
    add_trigger(
        &mut module,
        0,
        0,
        "c.use_test_output",
        Value::Bool(true),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "c.set_test_processor",
        Value::Int(PROC_PITCH as i64),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(0.0),
        Tstamp::ZERO,
    );
    // 2 beats at 120 BPM = 48000 frames.
    add_trigger(
        &mut module,
        0,
        0,
        "c.slide_pitch_length",
        Value::Tstamp(Tstamp::from_beats(2)),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "c.slide_pitch",
        Value::Float(1200.0),
        Tstamp::ZERO,
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    let out = render_left(&mut player, 24000);
    // The DC blocker settles on slow ramps; near frame 24000 the pitch
    // track sits around 600 cents. The blocked value tracks the ramp's
    // per-frame increment scaled up by the 1/(1-pole) gain, so compare the
    // raw accumulated track instead: undo nothing, just check the trend by
    // re-deriving the pitch from the last raw frames.
    // The unblocked pitch track is linear: ~0.025 cents per frame; after
    // DC blocking a linear ramp converges to slope/(1-pole) = 5 cents.
    let tail = out[23990..24000].iter().copied().sum::<f32>() / 10.0;
    assert!(
        (tail - 5.0).abs() < 0.5,
        "DC-blocked ramp plateau off: {tail}"
    );
}

#[test]
fn note_off_with_fallback_release_goes_quiet_quickly() {
    let mut module = with_one_pattern(noise_module(), 4);
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(0.0),
        Tstamp::ZERO,
    );
    // Note off a tenth of a beat in (1200 frames).
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_off",
        Value::None,
        Tstamp::new(0, segno::core::limits::TSTAMP_BEAT as i64 / 20),
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // One beat: far past the 5 ms fallback release.
    render_left(&mut player, 24000);
    assert_eq!(player.active_voice_count(), 0);
}

#[test]
fn release_envelope_deactivates_the_group() {
    use segno::core::module::ForceEnvelopeParams;
    use segno::Envelope;

    let mut module = with_one_pattern(noise_module(), 4);
    // Release reaches zero 200 frames (1/240 s) after note off.
    module.audio_units[0].params.env_force_release = Some(ForceEnvelopeParams::new(
        Envelope::from_nodes(&[(0.0, 1.0), (200.0 / RATE as f64, 0.0)]),
    ));
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(0.0),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_off",
        Value::None,
        Tstamp::new(0, segno::core::limits::TSTAMP_BEAT as i64 / 240),
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    render_left(&mut player, 2400);
    assert_eq!(player.active_voice_count(), 0);
}

#[test]
fn retrigger_replaces_the_previous_group() {
    let mut module = with_one_pattern(noise_module(), 4);
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(0.0),
        Tstamp::ZERO,
    );
    add_trigger(
        &mut module,
        0,
        0,
        "c.note_on",
        Value::Float(1200.0),
        Tstamp::from_beats(1),
    );

    let mut player = Player::new(arc(module), RATE, CHUNK).unwrap();
    player.play_track(0).unwrap();

    // Render past the second note-on plus the fallback release of the first.
    render_left(&mut player, 30000);
    // Only the second group's voices remain (pitch, force, noise).
    assert_eq!(player.active_voice_count(), 3);
}

#[test]
fn identity_chorus_effect_is_transparent() {
    use segno::core::module::{ChorusParams, ChorusTapParams};

    let base = || {
        let mut module = with_one_pattern(noise_module(), 2);
        module.random_seed = 5;
        add_trigger(
            &mut module,
            0,
            0,
            "c.note_on",
            Value::Float(0.0),
            Tstamp::ZERO,
        );
        module
    };

    let mut direct = Player::new(arc(base()), RATE, CHUNK).unwrap();
    direct.play_track(0).unwrap();
    let reference = render_left(&mut direct, 2000);

    // One tap at zero delay, zero range, zero speed, 0 dB: exact identity.
    let mut chorus = ChorusParams::default();
    chorus.taps[0] = ChorusTapParams {
        delay: 0.0,
        range: 0.0,
        speed: 0.0,
        volume: 0.0,
    };
    let with_fx = insert_effect(base(), ProcParams::Chorus(chorus));
    let mut fx = Player::new(arc(with_fx), RATE, CHUNK).unwrap();
    fx.play_track(0).unwrap();
    let processed = render_left(&mut fx, 2000);

    assert_eq!(reference, processed);
}

#[test]
fn bypassed_effect_passes_the_dry_signal() {
    use segno::core::module::FreeverbParams;

    let base = || {
        let mut module = with_one_pattern(noise_module(), 2);
        module.random_seed = 11;
        add_trigger(
            &mut module,
            0,
            0,
            "c.note_on",
            Value::Float(0.0),
            Tstamp::ZERO,
        );
        module
    };

    let mut direct = Player::new(arc(base()), RATE, CHUNK).unwrap();
    direct.play_track(0).unwrap();
    let reference = render_left(&mut direct, 2000);

    let with_fx = insert_effect(base(), ProcParams::Freeverb(FreeverbParams::default()));
    let mut fx = Player::new(arc(with_fx), RATE, CHUNK).unwrap();
    fx.play_track(0).unwrap();
    // Bypass before anything renders; channel 0 is bound to the instrument,
    // so bind a scratch channel to the effect unit first.
    fx.fire(1, "c.set_au", Value::Int(1));
    fx.fire(1, "a.set_bypass", Value::Bool(true));
    let processed = render_left(&mut fx, 2000);

    assert_eq!(reference, processed);
}
