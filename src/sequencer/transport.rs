// Transport - Playback control and bar scheduling
// Drives the chord, drum and melody lanes from a single time-ordered event queue

use crate::audio::engine::SoundEngine;
use crate::config::EngineConfig;
use crate::messaging::channels::{RenderProducer, push_render_event};
use crate::messaging::render::RenderEvent;
use crate::sequencer::arpeggiator::arpeggiate;
use crate::sequencer::chaining::{ChainAction, ChainInput, resolve};
use crate::sequencer::event_queue::{EventQueue, ScheduledEvent, TransportEvent};
use crate::sequencer::follow::MelodyGenerators;
use crate::sequencer::pattern::{Channel2Mode, DrumTrack, Lane};
use crate::sequencer::playhead::{PlayheadClock, PlayheadPosition};
use crate::sequencer::song::Song;
use crate::sequencer::timeline::{PatternName, STEPS_PER_BAR, TimelineError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Per-session playback state
///
/// Exists only while playing; `stop()` drops it, which also resets both
/// arpeggiator indices.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    pub is_playing: bool,
    /// 0-indexed bar being played
    pub current_bar: usize,
    pub current_pattern_name: PatternName,
    /// Run-mode position of the chord-lane arpeggiator
    pub arp_sequence_index: usize,
    /// Run-mode position of the melody-lane arpeggiator
    pub channel2_arp_sequence_index: usize,
    pub play_start_time: f64,
    pub play_start_bar: usize,
    /// Session this state belongs to
    pub epoch: u64,
}

/// A highlight currently shown by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Highlight {
    Bar(usize),
    Chord { bar: usize, chord: usize },
    Step { bar: usize, step: usize },
}

/// The playback clock
///
/// Time is supplied by the caller in seconds (`now`). Each bar start schedules
/// that bar's notes and highlights at absolute times, plus a bar end event
/// that decides what plays next. Every scheduled event carries the session
/// epoch it was created under; events from an older session are discarded
/// when they come due.
pub struct Transport<E: SoundEngine> {
    song: Song,
    engine: E,
    config: EngineConfig,
    render_tx: Option<RenderProducer>,
    queue: EventQueue,
    epoch: u64,
    state: Option<TransportState>,
    playhead: PlayheadClock,
    generators: MelodyGenerators,
    rng: StdRng,
    selected_bar: Option<usize>,
    preview_active: bool,
    highlights: BTreeSet<Highlight>,
    /// Voice currently owning each sounding `(lane, pitch)`
    voices: HashMap<(Lane, u8), u64>,
}

impl<E: SoundEngine> Transport<E> {
    /// Create a stopped transport
    pub fn new(song: Song, engine: E, config: EngineConfig) -> Self {
        Self {
            song,
            engine,
            config,
            render_tx: None,
            queue: EventQueue::new(),
            epoch: 0,
            state: None,
            playhead: PlayheadClock::new(),
            generators: MelodyGenerators::new(),
            rng: StdRng::from_entropy(),
            selected_bar: None,
            preview_active: false,
            highlights: BTreeSet::new(),
            voices: HashMap::new(),
        }
    }

    /// Send highlight and lifecycle events to a renderer
    pub fn with_render_channel(mut self, render_tx: RenderProducer) -> Self {
        self.render_tx = Some(render_tx);
        self
    }

    /// Generators used to fill empty melody lanes
    pub fn with_generators(mut self, generators: MelodyGenerators) -> Self {
        self.generators = generators;
        self
    }

    /// Seed the random arpeggio order and the melody generators
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.generators = MelodyGenerators::with_seed(seed);
        self
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn song_mut(&mut self) -> &mut Song {
        &mut self.song
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&TransportState> {
        self.state.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_playing)
    }

    /// Current session id
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn highlights(&self) -> &BTreeSet<Highlight> {
        &self.highlights
    }

    /// Fire time of the next scheduled event
    pub fn next_event_time(&self) -> Option<f64> {
        self.queue.next_time()
    }

    /// Bar to start from on the next `play()` (0-indexed, `None` = loop start)
    pub fn set_selected_bar(&mut self, bar: Option<usize>) {
        self.selected_bar = bar;
    }

    pub fn selected_bar(&self) -> Option<usize> {
        self.selected_bar
    }

    /// While a preview session owns the melody synth, the melody lane is not played
    pub fn set_preview_active(&mut self, active: bool) {
        self.preview_active = active;
    }

    pub fn is_preview_active(&self) -> bool {
        self.preview_active
    }

    pub fn set_drum_muted(&mut self, track: DrumTrack, muted: bool) {
        self.song.set_drum_muted(track, muted);
    }

    /// Start playback at `now`
    ///
    /// An empty progression stops immediately. Playing while already playing
    /// restarts the session.
    pub fn play(&mut self, now: f64) {
        if self.is_playing() {
            self.stop();
        }

        let bar_count = self.song.bar_count();
        if bar_count == 0 {
            log::info!("Nothing to play: progression is empty");
            self.stop();
            return;
        }

        let settings = &self.song.active().channel2_settings;
        if settings.audible
            && settings.mode != Channel2Mode::Direct
            && !self.song.active().has_melody()
        {
            let generated = self
                .song
                .edit_active(|pattern| self.generators.regenerate(pattern));
            log::info!("Generated melody for {} bars", generated);
        }

        let start_bar = self
            .selected_bar
            .filter(|bar| *bar < bar_count)
            .unwrap_or_else(|| self.song.loop_range().start_index())
            .min(bar_count - 1);

        self.epoch += 1;
        self.queue.clear();
        self.state = Some(TransportState {
            is_playing: true,
            current_bar: start_bar,
            current_pattern_name: self.song.current_pattern(),
            arp_sequence_index: 0,
            channel2_arp_sequence_index: 0,
            play_start_time: now,
            play_start_bar: start_bar,
            epoch: self.epoch,
        });
        self.playhead
            .start(now, start_bar, self.song.bpm().bar_duration_seconds());

        log::info!(
            "Playback started at bar {} of pattern {} ({})",
            start_bar + 1,
            self.song.current_pattern(),
            self.song.bpm()
        );
        self.emit(RenderEvent::Started { bar: start_bar });
        self.queue
            .push(now, self.epoch, TransportEvent::BarStart { bar: start_bar });
    }

    /// Stop playback
    ///
    /// Invalidates every pending event, releases all voices, cancels the
    /// playhead and clears highlights.
    pub fn stop(&mut self) {
        let was_playing = self.state.take().is_some();

        self.epoch += 1;
        self.queue.clear();
        self.engine.release_all();
        self.voices.clear();
        self.playhead.cancel();
        self.highlights.clear();
        self.emit(RenderEvent::ClearHighlights);

        if was_playing {
            log::info!("Playback stopped");
            self.emit(RenderEvent::Stopped);
        }
    }

    pub fn toggle_play(&mut self, now: f64) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play(now);
        }
    }

    /// Fire every event due at or before `now`
    ///
    /// Returns the number of events fired (stale ones are not counted).
    pub fn advance(&mut self, now: f64) -> usize {
        let mut fired = 0;
        while let Some(scheduled) = self.queue.pop_due(now) {
            if scheduled.epoch != self.epoch {
                log::trace!(
                    "Discarding stale {:?} from session {} (current {})",
                    scheduled.event,
                    scheduled.epoch,
                    self.epoch
                );
                continue;
            }
            self.fire(scheduled);
            fired += 1;
        }
        fired
    }

    /// Where the renderer should draw the playhead
    pub fn playhead(&mut self, now: f64) -> Option<PlayheadPosition> {
        let loop_range = self
            .song
            .flags
            .loop_enabled
            .then(|| self.song.loop_range());
        self.playhead
            .refresh(now, loop_range, &self.config.playhead, self.song.bar_count())
    }

    /// Audition one bar's chords for a quarter note without starting playback
    pub fn preview_bar(&mut self, now: f64, bar: usize) -> Result<(), TimelineError> {
        let pattern = self.song.active_pattern();
        let bar_data = pattern.bar(bar).ok_or(TimelineError::BarOutOfRange(bar))?;
        let length = self.song.bpm().beat_duration_seconds();

        for chord in &bar_data.chords {
            for &pitch in chord.midi_notes() {
                self.engine
                    .trigger_note_on(Lane::Chords, pitch, self.config.chord_velocity, now);
                self.engine
                    .trigger_note_off(Lane::Chords, pitch, now + length);
            }
        }
        log::debug!("Previewed bar {}", bar + 1);
        Ok(())
    }

    fn emit(&mut self, event: RenderEvent) {
        if let Some(render_tx) = self.render_tx.as_mut() {
            push_render_event(render_tx, event);
        }
    }

    fn fire(&mut self, scheduled: ScheduledEvent) {
        let time = scheduled.time;
        match scheduled.event {
            TransportEvent::BarStart { bar } => self.start_bar(time, bar),
            TransportEvent::BarEnd { bar } => self.end_bar(time, bar),
            TransportEvent::ChordHighlight { bar, chord } => {
                self.highlights
                    .retain(|h| !matches!(h, Highlight::Chord { .. }));
                self.highlights.insert(Highlight::Chord { bar, chord });
                self.emit(RenderEvent::ChordHighlight { bar, chord });
            }
            TransportEvent::StepHighlight { bar, step } => {
                self.highlights
                    .retain(|h| !matches!(h, Highlight::Step { .. }));
                self.highlights.insert(Highlight::Step { bar, step });
                self.emit(RenderEvent::StepHighlight { bar, step });
            }
            TransportEvent::NoteOn {
                lane,
                pitch,
                velocity,
                voice,
            } => {
                self.voices.insert((lane, pitch), voice);
                self.engine.trigger_note_on(lane, pitch, velocity, time);
            }
            TransportEvent::NoteOff { lane, pitch, voice } => {
                // A later note on the same pitch took the voice over
                if self.voices.get(&(lane, pitch)) != Some(&voice) {
                    log::trace!("Skipping release of retriggered {lane} {pitch}");
                    return;
                }
                self.voices.remove(&(lane, pitch));
                self.engine.trigger_note_off(lane, pitch, time);
            }
        }
    }

    /// Schedule the whole content of one bar starting at `t`
    fn start_bar(&mut self, t: f64, bar: usize) {
        let pattern = self.song.active_pattern();
        let Some(bar_data) = pattern.bar(bar) else {
            log::warn!("Bar {} no longer exists, stopping", bar + 1);
            self.stop();
            return;
        };

        self.highlights.clear();
        self.highlights.insert(Highlight::Bar(bar));
        self.emit(RenderEvent::BarHighlight { bar });

        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.current_bar = bar;

        let epoch = self.epoch;
        let tempo = self.song.bpm();
        let bar_duration = tempo.bar_duration_seconds();

        // Chord lane
        let chord_count = bar_data.chords.len();
        let chord_duration = if chord_count > 0 {
            bar_duration / chord_count as f64
        } else {
            bar_duration
        };
        for (index, chord) in bar_data.chords.iter().enumerate() {
            let at = t + index as f64 * chord_duration;
            self.queue.push(
                at,
                epoch,
                TransportEvent::ChordHighlight { bar, chord: index },
            );

            if self.config.chord_arp.enabled {
                let notes = arpeggiate(
                    chord.midi_notes(),
                    &self.config.chord_arp,
                    &tempo,
                    chord_duration,
                    &mut state.arp_sequence_index,
                    &mut self.rng,
                );
                for note in notes {
                    self.queue.push_note(
                        epoch,
                        Lane::Chords,
                        note.pitch,
                        self.config.chord_velocity,
                        at + note.offset,
                        at + note.offset + note.length,
                    );
                }
            } else {
                let length = chord_duration * self.config.chord_gate;
                for &pitch in chord.midi_notes() {
                    self.queue.push_note(
                        epoch,
                        Lane::Chords,
                        pitch,
                        self.config.chord_velocity,
                        at,
                        at + length,
                    );
                }
            }
        }

        // Drum lane
        if let Some(lane) = pattern.drum_lane(bar) {
            let step_duration = bar_duration / STEPS_PER_BAR as f64;
            for step in 0..STEPS_PER_BAR {
                self.queue.push(
                    t + step as f64 * step_duration,
                    epoch,
                    TransportEvent::StepHighlight { bar, step },
                );
            }
            for (step, track) in lane.active_steps() {
                if self.song.is_drum_muted(track) {
                    continue;
                }
                self.queue.push_note(
                    epoch,
                    Lane::Drums,
                    track.gm_pitch(),
                    self.config.drum_velocity,
                    t + step as f64 * step_duration,
                    t + (step + 1) as f64 * step_duration,
                );
            }
        }

        // Melody lane
        let settings = &pattern.channel2_settings;
        if !self.preview_active && settings.audible {
            if self.config.melody_arp.enabled {
                let shift = settings.octave as i16 * 12;
                for (index, chord) in bar_data.chords.iter().enumerate() {
                    let tones: Vec<u8> = chord
                        .midi_notes()
                        .iter()
                        .map(|&p| p as i16 + shift)
                        .filter(|p| (0..=127).contains(p))
                        .map(|p| p as u8)
                        .collect();
                    let at = t + index as f64 * chord_duration;
                    let notes = arpeggiate(
                        &tones,
                        &self.config.melody_arp,
                        &tempo,
                        chord_duration,
                        &mut state.channel2_arp_sequence_index,
                        &mut self.rng,
                    );
                    for note in notes {
                        self.queue.push_note(
                            epoch,
                            Lane::Melody,
                            note.pitch,
                            settings.velocity,
                            at + note.offset,
                            at + note.offset + note.length,
                        );
                    }
                }
            } else {
                for note in pattern.melody_notes(bar) {
                    self.queue.push_note(
                        epoch,
                        Lane::Melody,
                        note.midi,
                        note.velocity.unwrap_or(self.config.melody_velocity),
                        t + note.start * bar_duration,
                        t + note.end() * bar_duration,
                    );
                }
            }
        }

        log::debug!(
            "Scheduled bar {} ({} chords) at {:.3}s",
            bar + 1,
            chord_count,
            t
        );
        self.queue
            .push(t + bar_duration, epoch, TransportEvent::BarEnd { bar });
    }

    /// Decide and schedule what follows the bar that just ended at `t`
    fn end_bar(&mut self, t: f64, bar: usize) {
        if self.state.is_none() {
            return;
        }

        let next_bar = bar + 1;
        let action = resolve(&ChainInput {
            current_bar: next_bar,
            loop_range: self.song.loop_range(),
            progression_len: self.song.bar_count(),
            flags: self.song.flags,
            patterns: self.song.patterns(),
            current_pattern: self.song.current_pattern(),
        });

        match action {
            ChainAction::Continue => {
                self.queue
                    .push(t, self.epoch, TransportEvent::BarStart { bar: next_bar });
            }
            ChainAction::Loop { bar: loop_bar } => {
                log::debug!("Looping back to bar {}", loop_bar + 1);
                self.restamp(t, loop_bar);
                self.queue
                    .push(t, self.epoch, TransportEvent::BarStart { bar: loop_bar });
            }
            ChainAction::Chain { target } => self.chain_to(t, target),
            ChainAction::Stop => self.stop(),
        }
    }

    /// Swap in the target pattern as a whole and restart at its first bar
    fn chain_to(&mut self, t: f64, target: PatternName) {
        let Some(mut next) = self.song.patterns().get(target) else {
            self.stop();
            return;
        };

        if !next.has_melody() && next.channel2_settings.audible {
            let mut regenerated = next.as_ref().clone();
            self.generators.regenerate(&mut regenerated);
            next = Arc::new(regenerated);
        }

        log::info!(
            "Chaining from pattern {} to {}",
            self.song.current_pattern(),
            target
        );
        self.song.swap_active(target, next);
        if let Some(state) = self.state.as_mut() {
            state.current_pattern_name = target;
        }
        self.restamp(t, 0);
        self.emit(RenderEvent::PatternChanged { pattern: target });
        self.queue
            .push(t, self.epoch, TransportEvent::BarStart { bar: 0 });
    }

    /// Renew the authoritative position stamps and rebuild the playhead from them
    fn restamp(&mut self, t: f64, bar: usize) {
        if let Some(state) = self.state.as_mut() {
            state.current_bar = bar;
            state.play_start_time = t;
            state.play_start_bar = bar;
            self.playhead
                .rebase(state.play_start_time, state.play_start_bar);
        }
    }
}
