//! Renderer capability for push progress
//!
//! The aggregator only talks to [`ProgressRenderer`]; swapping the
//! implementation changes how progress looks without touching the
//! aggregation logic. [`TermRenderer`] draws stacked indicatif bars,
//! [`LogRenderer`] degrades to discrete lines for non-terminal output.

use crate::output::OutputManager;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Output surface the aggregator draws on.
///
/// One named progress line per layer id plus a single "Layers" aggregate
/// line. Rows are allocated in `layer_discovered` and live until `finish`.
pub trait ProgressRenderer: Send {
    /// Newline-terminated pass-through line, does not disturb the bars
    fn plain_line(&mut self, line: &str);

    /// A new layer id appeared in the stream; allocate its row
    fn layer_discovered(&mut self, id: &str);

    /// Byte progress for one layer
    fn layer_update(&mut self, id: &str, phase: &str, current: u64, total: u64);

    /// The layer reached a terminal phase; pin its row at 100%
    fn layer_finished(&mut self, id: &str, phase: &str);

    /// Redraw the aggregate "Layers" line
    fn aggregate(&mut self, completed: usize, total: usize);

    /// The stream reported overall completion
    fn finish(&mut self);
}

const LAYERS_TEMPLATE: &str = "Layers: {bar:10} {pos}/{len}";
const LAYER_TEMPLATE: &str = "{prefix}: {bar:10} {bytes}/{total_bytes} [{bytes_per_sec}]";

/// Terminal renderer: one byte bar per active layer stacked under the
/// aggregate bar. indicatif hides everything when stderr is not a tty.
pub struct TermRenderer {
    multi: MultiProgress,
    layers_bar: ProgressBar,
    bars: HashMap<String, ProgressBar>,
}

impl TermRenderer {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let layers_bar = multi.add(ProgressBar::new(0));
        layers_bar.set_style(
            ProgressStyle::with_template(LAYERS_TEMPLATE).expect("static template"),
        );
        Self {
            multi,
            layers_bar,
            bars: HashMap::new(),
        }
    }
}

impl Default for TermRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRenderer for TermRenderer {
    fn plain_line(&mut self, line: &str) {
        let _ = self.multi.println(line);
    }

    fn layer_discovered(&mut self, id: &str) {
        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(ProgressStyle::with_template(LAYER_TEMPLATE).expect("static template"));
        bar.set_prefix(id.to_string());
        self.bars.insert(id.to_string(), bar);
    }

    fn layer_update(&mut self, id: &str, _phase: &str, current: u64, total: u64) {
        if let Some(bar) = self.bars.get(id) {
            bar.set_length(total);
            bar.set_position(current);
        }
    }

    fn layer_finished(&mut self, id: &str, _phase: &str) {
        if let Some(bar) = self.bars.get(id) {
            if let Some(total) = bar.length() {
                bar.set_position(total);
            }
            bar.finish();
        }
    }

    fn aggregate(&mut self, completed: usize, total: usize) {
        self.layers_bar.set_length(total as u64);
        self.layers_bar.set_position(completed as u64);
    }

    fn finish(&mut self) {
        for bar in self.bars.values() {
            bar.finish();
        }
        self.layers_bar.finish();
    }
}

/// Non-terminal fallback: one discrete line per milestone, no in-place redraw
pub struct LogRenderer {
    output: OutputManager,
    last_aggregate: Option<(usize, usize)>,
}

impl LogRenderer {
    pub fn new(output: OutputManager) -> Self {
        Self {
            output,
            last_aggregate: None,
        }
    }
}

impl ProgressRenderer for LogRenderer {
    fn plain_line(&mut self, line: &str) {
        self.output.info(line);
    }

    fn layer_discovered(&mut self, id: &str) {
        self.output.debug(&format!("{}: discovered", id));
    }

    fn layer_update(&mut self, _id: &str, _phase: &str, _current: u64, _total: u64) {
        // byte-level redraws would flood a log; milestones are enough
    }

    fn layer_finished(&mut self, id: &str, phase: &str) {
        self.output.info(&format!("{}: {}", id, phase));
    }

    fn aggregate(&mut self, completed: usize, total: usize) {
        if self.last_aggregate != Some((completed, total)) {
            self.last_aggregate = Some((completed, total));
            self.output.info(&format!("Layers: {}/{}", completed, total));
        }
    }

    fn finish(&mut self) {}
}
