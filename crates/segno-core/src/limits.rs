//! Engine-wide limits.

/// Sub-beat units in one beat.
///
/// Highly composite so that common subdivisions (thirds, fifths, 2^n) stay
/// exact in integer arithmetic.
pub const TSTAMP_BEAT: i32 = 882_161_280;

/// Number of pattern columns / channels.
pub const CHANNELS_MAX: usize = 64;

/// Maximum processors inside one audio unit.
pub const PROCESSORS_MAX: usize = 64;

/// Ports per device per direction.
pub const PORTS_MAX: usize = 32;

/// Maximum nodes in a parameter envelope.
pub const ENVELOPE_NODES_MAX: usize = 256;

/// Maximum named marks on an envelope.
pub const ENVELOPE_MARKS_MAX: usize = 4;

/// Maximum notes in a tuning table.
pub const TUNING_TABLE_NOTES_MAX: usize = 128;

/// Maximum tuning tables in a module.
pub const TUNING_TABLES_MAX: usize = 16;

/// Maximum arpeggio tones per channel.
pub const ARPEGGIO_TONES_MAX: usize = 64;

/// Maximum hit indices per audio unit.
pub const HITS_MAX: usize = 128;

/// Maximum simultaneously tracked jump contexts.
pub const JUMP_CONTEXTS_MAX: usize = 64;

/// Re-entry bound for zero-length goto loops.
pub const GOTO_SAFETY_MAX: u32 = 1024;

/// Delay taps in the chorus processor.
pub const CHORUS_VOICES_MAX: usize = 32;

/// Upper bound of a chorus tap delay, in seconds.
pub const CHORUS_DELAY_MAX: f64 = 0.25;

/// Order of the voice lowpass filter.
pub const FILTER_ORDER: usize = 2;

/// Default length of a variable-name string, in bytes.
pub const VAR_NAME_MAX: usize = 32;
