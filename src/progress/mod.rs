//! Progress aggregation for the push event stream
//!
//! The engine interleaves per-layer events in no particular order and never
//! announces the layer count up front. [`PushProgress`] collapses that stream
//! into one tracker per layer id plus a single aggregate counter, driving a
//! [`ProgressRenderer`] as it goes.

pub mod render;

use crate::error::{PushError, Result};
use crate::registry::client::EventStream;
use crate::registry::events::{LayerPhase, PushEvent};
use futures_util::StreamExt;
use render::ProgressRenderer;
use std::collections::HashMap;

/// Per-layer state, created on first sighting of an id and never destroyed
#[derive(Debug)]
struct LayerTracker {
    phase: LayerPhase,
    current_bytes: u64,
    total_bytes: u64,
    /// Whether this layer was already counted into the aggregate
    counted: bool,
}

/// What the stream reported by the time it ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// Distinct layer ids observed
    pub layers_total: usize,
    /// Layers that reached a terminal phase
    pub layers_completed: usize,
    /// Whether the stream carried an explicit "Successfully pushed" record
    pub saw_summary: bool,
}

/// Single consumer of one push event stream
pub struct PushProgress<'a> {
    renderer: &'a mut dyn ProgressRenderer,
    layers: HashMap<String, LayerTracker>,
    completed: usize,
    saw_summary: bool,
}

impl<'a> PushProgress<'a> {
    pub fn new(renderer: &'a mut dyn ProgressRenderer) -> Self {
        Self {
            renderer,
            layers: HashMap::new(),
            completed: 0,
            saw_summary: false,
        }
    }

    /// Pull events in arrival order until the stream ends or an error record
    /// appears. An error record aborts immediately; nothing after it is
    /// processed. Stream end without a summary record is reported through
    /// `saw_summary` and left for the caller to judge.
    pub async fn consume(mut self, mut stream: EventStream) -> Result<PushSummary> {
        while let Some(event) = stream.next().await {
            match event? {
                PushEvent::Error(message) => return Err(PushError::Remote(message)),
                PushEvent::StreamLine(line) | PushEvent::Status(line) => {
                    self.renderer.plain_line(&line);
                }
                PushEvent::Summary => {
                    self.saw_summary = true;
                    self.completed = self.layers.len();
                    self.renderer.aggregate(self.completed, self.layers.len());
                    self.renderer.finish();
                }
                PushEvent::Layer {
                    id,
                    phase,
                    current,
                    total,
                } => {
                    // bars stop moving once the summary arrived; later events
                    // are only scanned for errors
                    if !self.saw_summary {
                        self.layer_event(id, phase, current, total);
                    }
                }
            }
        }
        Ok(PushSummary {
            layers_total: self.layers.len(),
            layers_completed: self.completed,
            saw_summary: self.saw_summary,
        })
    }

    fn layer_event(
        &mut self,
        id: String,
        phase: LayerPhase,
        current: Option<u64>,
        total: Option<u64>,
    ) {
        if !self.layers.contains_key(&id) {
            self.layers.insert(
                id.clone(),
                LayerTracker {
                    phase: LayerPhase::Preparing,
                    current_bytes: 0,
                    total_bytes: 0,
                    counted: false,
                },
            );
            self.renderer.layer_discovered(&id);
            self.renderer.aggregate(self.completed, self.layers.len());
        }

        let (finished_now, label, current_bytes, total_bytes) = {
            let tracker = match self.layers.get_mut(&id) {
                Some(tracker) => tracker,
                None => return,
            };
            // phases only move forward; stale or duplicate events may still
            // refresh the display but never regress the state
            if phase.rank() >= tracker.phase.rank() {
                tracker.phase = phase;
            }
            if let Some(total) = total {
                tracker.total_bytes = total;
            }
            if let Some(current) = current {
                tracker.current_bytes = tracker.current_bytes.max(current);
            }
            let finished_now = tracker.phase.is_terminal() && !tracker.counted;
            if finished_now {
                tracker.counted = true;
                tracker.current_bytes = tracker.total_bytes;
            }
            (
                finished_now,
                tracker.phase.label().to_string(),
                tracker.current_bytes,
                tracker.total_bytes,
            )
        };

        if finished_now {
            self.completed += 1;
            self.renderer.layer_finished(&id, &label);
            self.renderer.aggregate(self.completed, self.layers.len());
        } else {
            self.renderer
                .layer_update(&id, &label, current_bytes, total_bytes);
        }
    }
}
