//! Shared module builders for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use segno::core::module::{
    AuType, AudioUnit, Connection, DebugParams, DeviceRef, Module, NoiseParams, PatInstRef,
    Pattern, ProcDef, ProcParams, Song, TrackList, Trigger,
};

use segno::{Tstamp, Value};

/// Processor slots used by the standard instrument layout.
pub const PROC_PITCH: usize = 0;
pub const PROC_FORCE: usize = 1;
pub const PROC_GEN: usize = 2;

fn proc_ref(proc_index: usize) -> DeviceRef {
    DeviceRef::Proc {
        au_index: 0,
        proc_index,
    }
}

/// An instrument with pitch and force processors feeding one generator,
/// wired to the master sink.
pub fn instrument_module(generator: ProcParams) -> Module {
    let mut module = Module::new();
    module.mix_volume_db = 0.0;

    let mut au = AudioUnit::new(AuType::Instrument);
    au.set_processor(PROC_PITCH, ProcDef::new(ProcParams::Pitch));
    au.set_processor(PROC_FORCE, ProcDef::new(ProcParams::Force));
    au.set_processor(PROC_GEN, ProcDef::new(generator));

    // Pitch feeds the force scaler and the generator; force feeds the
    // generator's force input.
    au.connections.push(Connection::new(
        proc_ref(PROC_PITCH),
        0,
        proc_ref(PROC_FORCE),
        0,
    ));
    au.connections
        .push(Connection::new(proc_ref(PROC_PITCH), 0, proc_ref(PROC_GEN), 0));
    au.connections
        .push(Connection::new(proc_ref(PROC_FORCE), 0, proc_ref(PROC_GEN), 1));
    au.connections
        .push(Connection::new(proc_ref(PROC_GEN), 0, DeviceRef::AuOutput(0), 0));
    au.connections
        .push(Connection::new(proc_ref(PROC_GEN), 1, DeviceRef::AuOutput(0), 1));
    module.audio_units.push(au);

    module.connections.push(Connection::new(
        DeviceRef::AuOutput(0),
        0,
        DeviceRef::Master,
        0,
    ));
    module.connections.push(Connection::new(
        DeviceRef::AuOutput(0),
        1,
        DeviceRef::Master,
        1,
    ));

    module
}

pub fn debug_module() -> Module {
    instrument_module(ProcParams::Debug(DebugParams::default()))
}

pub fn noise_module() -> Module {
    instrument_module(ProcParams::Noise(NoiseParams::default()))
}

/// Add a song with one pattern of `beats` beats and return the module.
pub fn with_one_pattern(mut module: Module, beats: i64) -> Module {
    let pattern = Pattern::new(Tstamp::from_beats(beats));
    module.patterns.push(pattern);
    let mut song = Song::new(120.0);
    song.push(PatInstRef::new(0, 0));
    module.songs.push(song);
    module.track_list = TrackList::new(vec![0]);
    module
}

/// Add a trigger to a pattern column.
pub fn add_trigger(
    module: &mut Module,
    pattern: usize,
    column: usize,
    name: &str,
    arg: Value,
    position: Tstamp,
) {
    module.patterns[pattern]
        .column_mut(column)
        .add_trigger(Trigger::new(name, arg, position));
}

/// Wrap up for the player.
pub fn arc(module: Module) -> Arc<Module> {
    Arc::new(module)
}

/// Render everything the player produces for `frames`, returning the left
/// channel.
pub fn render_left(player: &mut segno::Player, frames: usize) -> Vec<f32> {
    let mut collected = Vec::with_capacity(frames);
    while collected.len() < frames {
        let want = (frames - collected.len()).min(1024);
        let produced = player.render(want);
        if produced == 0 {
            break;
        }
        collected.extend_from_slice(player.output_buffer(0));
    }
    collected
}

/// Route the instrument's output through a one-processor effect unit
/// instead of straight to the master sink.
pub fn insert_effect(mut module: Module, effect: ProcParams) -> Module {
    module
        .connections
        .retain(|c| c.send != DeviceRef::AuOutput(0));

    let mut fx = AudioUnit::new(AuType::Effect);
    fx.set_processor(0, ProcDef::new(effect));
    let fx_proc = DeviceRef::Proc {
        au_index: 1,
        proc_index: 0,
    };
    for port in 0..2 {
        fx.connections
            .push(Connection::new(DeviceRef::AuInput(1), port, fx_proc, port));
        fx.connections
            .push(Connection::new(fx_proc, port, DeviceRef::AuOutput(1), port));
    }
    module.audio_units.push(fx);

    for port in 0..2 {
        module.connections.push(Connection::new(
            DeviceRef::AuOutput(0),
            port,
            DeviceRef::AuInput(1),
            port,
        ));
        module.connections.push(Connection::new(
            DeviceRef::AuOutput(1),
            port,
            DeviceRef::Master,
            port,
        ));
    }
    module
}
