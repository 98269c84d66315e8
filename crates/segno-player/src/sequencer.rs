//! The timeline sequencer.
//!
//! Walks the current pattern row by row, fires due triggers into the event
//! dispatcher, slices rendering so no chunk crosses a trigger, a pattern end,
//! a pattern-delay end or a tempo-slide slice boundary, and advances the
//! playback position by exactly the rendered beat time.

use segno_core::Tstamp;

use crate::event::TriggerOrigin;
use crate::master::{tempo_slide_slice, PlaybackState};
use crate::player::Player;

impl Player {
    /// Render up to `frames` frames (bounded by the chunk maximum) and
    /// return the number of frames produced.
    pub fn render(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.chunk_max);
        self.frames_avail = 0;

        // Bound on consecutive non-rendering steps, against degenerate
        // timelines (e.g. a looped zero-length pattern).
        let mut spins = 0u32;

        while self.frames_avail < frames && self.master.is_playing() {
            spins += 1;
            if spins > 4096 {
                log::warn!("timeline makes no progress; stopping playback");
                self.master.playback_state = PlaybackState::Stopped;
                break;
            }

            if self.needs_pattern_turnover() {
                self.handle_pattern_end();
                continue;
            }

            self.fire_due_triggers();
            if !self.master.is_playing() {
                break;
            }
            if self.position_dirty {
                self.position_dirty = false;
                continue;
            }
            if self.needs_pattern_turnover() {
                continue;
            }

            let limit = self.compute_render_limit(frames - self.frames_avail);
            self.render_chunk(limit);
            self.advance_position(limit);
            // Forward progress resets the loop guards.
            self.master.goto_safety_counter = 0;
            spins = 0;
            self.frames_avail += limit;
        }

        self.frames_avail
    }

    fn current_pattern_length(&self) -> Option<Tstamp> {
        let piref = self.master.pos.piref?;
        self.module.pattern(piref.pattern).map(|p| p.length)
    }

    fn needs_pattern_turnover(&self) -> bool {
        match self.current_pattern_length() {
            Some(length) => self.master.pos.row >= length,
            None => true,
        }
    }

    /// Fire every unfired trigger at or before the current row position, in
    /// column order. Stops early when a handler moves the position.
    fn fire_due_triggers(&mut self) {
        if !self.master.delay_left.is_zero() {
            return;
        }
        let Some(piref) = self.master.pos.piref else {
            return;
        };
        let Some(pattern) = self.module.pattern(piref.pattern) else {
            return;
        };
        let pattern = pattern.clone();
        let row = self.master.pos.row;

        for ch in 0..pattern.column_count() {
            let Some(column) = pattern.column(ch) else {
                continue;
            };
            while self.col_positions[ch] < column.triggers().len() {
                let trigger = &column.triggers()[self.col_positions[ch]];
                if trigger.position > row {
                    break;
                }
                let trigger = trigger.clone();
                let trigger_index = self.col_positions[ch];
                self.col_positions[ch] += 1;

                let origin = TriggerOrigin {
                    piref,
                    row: trigger.position,
                    channel: ch,
                    trigger_index,
                };
                self.dispatch_event(ch, &trigger.name, &trigger.argument, Some(&origin), false);

                if self.position_dirty || !self.master.is_playing() {
                    return;
                }
            }
        }
    }

    /// Largest chunk that stays within one uniform stretch of time.
    fn compute_render_limit(&self, frames_left: usize) -> usize {
        let tempo = self.master.tempo;
        let rate = self.audio_rate;
        let frames_of = |t: Tstamp| -> usize { t.to_frames(tempo, rate).ceil() as usize };

        let mut limit = frames_left;

        if !self.master.delay_left.is_zero() {
            limit = limit.min(frames_of(self.master.delay_left).max(1));
        } else if let (Some(piref), Some(length)) =
            (self.master.pos.piref, self.current_pattern_length())
        {
            let row = self.master.pos.row;
            limit = limit.min(frames_of(length - row).max(1));

            if let Some(pattern) = self.module.pattern(piref.pattern) {
                for ch in 0..pattern.column_count() {
                    if let Some(column) = pattern.column(ch) {
                        if let Some(trigger) = column.triggers().get(self.col_positions[ch]) {
                            limit = limit.min(frames_of(trigger.position - row).max(1));
                        }
                    }
                }
            }
        }

        if let Some(slide) = &self.master.tempo_slide {
            limit = limit.min(frames_of(slide.slice_left).max(1));
        }

        limit.max(1)
    }

    /// Move beat time forward by exactly `frames` frames at the current
    /// tempo, consuming pattern delay first and stepping the tempo slide.
    fn advance_position(&mut self, frames: usize) {
        let dt = Tstamp::from_frames(frames as f64, self.master.tempo, self.audio_rate);

        if let Some(mut slide) = self.master.tempo_slide.take() {
            if dt >= slide.slice_left {
                self.master.tempo += slide.update;
                let reached = (slide.update >= 0.0 && self.master.tempo >= slide.target)
                    || (slide.update < 0.0 && self.master.tempo <= slide.target);
                slide.slide_left = if dt >= slide.slide_left {
                    Tstamp::ZERO
                } else {
                    slide.slide_left - dt
                };
                if reached || slide.slide_left.is_zero() {
                    self.master.tempo = slide.target;
                    self.master.tempo_slide = None;
                } else {
                    slide.slice_left = tempo_slide_slice().min(slide.slide_left);
                    self.master.tempo_slide = Some(slide);
                }
                self.propagate_tempo();
            } else {
                slide.slice_left -= dt;
                slide.slide_left = if dt >= slide.slide_left {
                    Tstamp::ZERO
                } else {
                    slide.slide_left - dt
                };
                self.master.tempo_slide = Some(slide);
            }
        }

        if !self.master.delay_left.is_zero() {
            self.master.delay_left = if dt >= self.master.delay_left {
                Tstamp::ZERO
            } else {
                self.master.delay_left - dt
            };
        } else {
            self.master.pos.row += dt;
        }
    }

    /// Move to the next pattern instance (or loop / stop).
    fn handle_pattern_end(&mut self) {
        // A slide crossing the boundary snaps: keep the tempo reached so far.
        if self.master.tempo_slide.is_some() {
            self.master.snap_tempo_slide();
        }

        let excess = self
            .current_pattern_length()
            .map(|length| {
                if self.master.pos.row > length {
                    self.master.pos.row - length
                } else {
                    Tstamp::ZERO
                }
            })
            .unwrap_or(Tstamp::ZERO);

        match self.master.playback_state {
            PlaybackState::Pattern => {
                self.master.pos.row = excess;
                self.col_positions.fill(0);
            }
            PlaybackState::Song => {
                let next_system = self.master.pos.system + 1;
                let song_index = self.module.song_for_track(self.master.pos.track);
                let next_piref = song_index
                    .and_then(|s| self.module.songs.get(s))
                    .and_then(|song| song.system(next_system));
                match next_piref {
                    Some(piref) => {
                        self.master.pos.system = next_system;
                        self.master.pos.piref = Some(piref);
                        self.master.pos.row = excess;
                        self.col_positions.fill(0);
                    }
                    None => {
                        self.master.playback_state = PlaybackState::Stopped;
                        self.master.end_reached = true;
                    }
                }
            }
            PlaybackState::Stopped => {}
        }
    }

    /// Jump or goto: move to a pattern instance and row immediately.
    pub(crate) fn seek_to(&mut self, piref: Option<segno_core::module::PatInstRef>, row: Tstamp) {
        if let Some(target) = piref {
            if self.module.pattern(target.pattern).is_none() {
                return;
            }
            self.master.pos.piref = Some(target);
            if self.master.playback_state == PlaybackState::Song {
                if let Some(song) = self
                    .module
                    .song_for_track(self.master.pos.track)
                    .and_then(|s| self.module.songs.get(s))
                {
                    if let Some(system) = song.find(target) {
                        self.master.pos.system = system;
                    }
                }
            }
        }
        self.master.pos.row = row;

        // Skip triggers authored before the landing row.
        if let Some(piref) = self.master.pos.piref {
            if let Some(pattern) = self.module.pattern(piref.pattern) {
                for ch in 0..self.col_positions.len() {
                    self.col_positions[ch] = pattern
                        .column(ch)
                        .map(|col| col.first_trigger_at(row))
                        .unwrap_or(0);
                }
            }
        }
        self.position_dirty = true;
    }
}
