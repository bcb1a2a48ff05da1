// Playhead - Visual clock for the renderer
// Re-derived from the transport's stamps on every refresh; never drives audio

use crate::sequencer::timeline::LoopRange;
use serde::{Deserialize, Serialize};

/// Presentation settings for the playhead
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayheadSettings {
    /// Width of one bar in pixels
    pub bar_width: f64,
    /// Visible width of the timeline in pixels
    pub viewport_width: f64,
    /// Keep the playhead in view by scrolling the timeline
    pub follow: bool,
}

impl Default for PlayheadSettings {
    fn default() -> Self {
        Self {
            bar_width: 120.0,
            viewport_width: 960.0,
            follow: true,
        }
    }
}

/// Where the renderer should draw the playhead
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayheadPosition {
    /// 0-indexed bar
    pub estimated_bar: usize,
    /// Position inside the bar, in [0, 1)
    pub progress_within_bar: f64,
    /// Position in timeline pixels
    pub x: f64,
    /// Position of the glyph inside the viewport
    pub glyph_x: f64,
    /// Timeline scroll offset
    pub scroll: f64,
}

/// Pixel layout for a playhead position
///
/// In follow mode the glyph moves from the left edge to the viewport
/// center, then stays centered while the timeline scrolls, then moves
/// again once the timeline end is in view.
pub fn layout(
    estimated_bar: usize,
    progress_within_bar: f64,
    settings: &PlayheadSettings,
    total_bars: usize,
) -> PlayheadPosition {
    let x = (estimated_bar as f64 + progress_within_bar) * settings.bar_width;

    let (glyph_x, scroll) = if settings.follow {
        let center = settings.viewport_width / 2.0;
        let content_width = total_bars as f64 * settings.bar_width;
        let max_scroll = (content_width - settings.viewport_width).max(0.0);

        if x <= center {
            (x, 0.0)
        } else if x - center >= max_scroll {
            (x - max_scroll, max_scroll)
        } else {
            (center, x - center)
        }
    } else {
        (x, 0.0)
    };

    PlayheadPosition {
        estimated_bar,
        progress_within_bar,
        x,
        glyph_x,
        scroll,
    }
}

/// Approximate bar clock for drawing
#[derive(Debug, Clone, Default)]
pub struct PlayheadClock {
    play_start_time: f64,
    play_start_bar: usize,
    bar_duration: f64,
    running: bool,
}

impl PlayheadClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin following a play session
    pub fn start(&mut self, now: f64, bar: usize, bar_duration: f64) {
        self.bar_duration = bar_duration;
        self.rebase(now, bar);
        self.running = true;
    }

    /// Re-stamp from the transport's authoritative position
    pub fn rebase(&mut self, now: f64, bar: usize) {
        self.play_start_time = now;
        self.play_start_bar = bar;
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn play_start_time(&self) -> f64 {
        self.play_start_time
    }

    pub fn play_start_bar(&self) -> usize {
        self.play_start_bar
    }

    /// Estimate the current position
    ///
    /// With a loop, an estimate past the loop end is folded back and the
    /// stamps are renewed so drift never outlives one loop pass. A start bar
    /// after the loop end is shown as is until that bar is over.
    pub fn refresh(
        &mut self,
        now: f64,
        loop_range: Option<LoopRange>,
        settings: &PlayheadSettings,
        total_bars: usize,
    ) -> Option<PlayheadPosition> {
        if !self.running || self.bar_duration <= 0.0 {
            return None;
        }

        let elapsed = (now - self.play_start_time).max(0.0);
        let total_bars_played = elapsed / self.bar_duration;
        let bar_offset = total_bars_played.floor();
        let progress = total_bars_played - bar_offset;
        let mut estimated_bar = self.play_start_bar + bar_offset as usize;

        if let Some(range) = loop_range {
            // A session started past the loop end plays its first bar there
            let last_unfolded = range.end_index().max(self.play_start_bar);
            if estimated_bar > last_unfolded {
                let into_loop = estimated_bar - last_unfolded - 1;
                estimated_bar = range.start_index() + into_loop % range.len();
                self.play_start_time = now - progress * self.bar_duration;
                self.play_start_bar = estimated_bar;
            }
        }

        Some(layout(estimated_bar, progress, settings, total_bars))
    }
}
