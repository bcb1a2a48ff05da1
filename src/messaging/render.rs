// Render events - What the transport tells the renderer

use crate::sequencer::timeline::PatternName;

/// Highlight and lifecycle events for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    Started { bar: usize },
    Stopped,
    BarHighlight { bar: usize },
    ChordHighlight { bar: usize, chord: usize },
    StepHighlight { bar: usize, step: usize },
    ClearHighlights,
    PatternChanged { pattern: PatternName },
}

impl RenderEvent {
    /// Whether the event adds a highlight
    pub fn is_highlight(&self) -> bool {
        matches!(
            self,
            RenderEvent::BarHighlight { .. }
                | RenderEvent::ChordHighlight { .. }
                | RenderEvent::StepHighlight { .. }
        )
    }
}
