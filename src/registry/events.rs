//! Push event stream decoding
//!
//! The engine reports push progress as a stream of JSON records whose fields
//! are all optional. [`RawEvent`] mirrors that wire shape; [`PushEvent`] is
//! the closed set of cases the rest of the crate actually handles, decoded
//! once at the client boundary.

use serde::Deserialize;

/// Byte counters attached to a layer event
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProgressDetail {
    pub current: Option<u64>,
    pub total: Option<u64>,
}

/// One record from the push stream, exactly as the engine emits it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub status: Option<String>,
    pub id: Option<String>,
    pub progress_detail: Option<ProgressDetail>,
    pub stream: Option<String>,
    pub error: Option<String>,
    pub error_detail: Option<serde_json::Value>,
}

/// Status label of the final summary record
pub const SUMMARY_STATUS: &str = "Successfully pushed";

/// Per-layer phase parsed from the free-text status label.
///
/// Phases are ordered: a layer only ever moves forward along
/// Preparing -> Waiting -> Pushing -> Pushed (or straight to AlreadyExists).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerPhase {
    Preparing,
    Waiting,
    Pushing,
    Pushed,
    AlreadyExists,
    /// Unrecognized label, display-only
    Other(String),
}

impl LayerPhase {
    pub fn parse(status: &str) -> Self {
        match status {
            "Preparing" => LayerPhase::Preparing,
            "Waiting" => LayerPhase::Waiting,
            "Pushing" => LayerPhase::Pushing,
            "Pushed" => LayerPhase::Pushed,
            "Layer already exists" => LayerPhase::AlreadyExists,
            other => LayerPhase::Other(other.to_string()),
        }
    }

    /// Position along the forward-only transition order
    pub fn rank(&self) -> u8 {
        match self {
            LayerPhase::Preparing | LayerPhase::Other(_) => 0,
            LayerPhase::Waiting => 1,
            LayerPhase::Pushing => 2,
            LayerPhase::Pushed | LayerPhase::AlreadyExists => 3,
        }
    }

    /// No further byte progress is expected after a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, LayerPhase::Pushed | LayerPhase::AlreadyExists)
    }

    pub fn label(&self) -> &str {
        match self {
            LayerPhase::Preparing => "Preparing",
            LayerPhase::Waiting => "Waiting",
            LayerPhase::Pushing => "Pushing",
            LayerPhase::Pushed => "Pushed",
            LayerPhase::AlreadyExists => "Layer already exists",
            LayerPhase::Other(label) => label,
        }
    }
}

/// Decoded push event, one variant per case the aggregator handles
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Progress for one layer id
    Layer {
        id: String,
        phase: LayerPhase,
        current: Option<u64>,
        total: Option<u64>,
    },
    /// Status line with no layer id (e.g. "The push refers to a repository ...")
    Status(String),
    /// Plain log pass-through
    StreamLine(String),
    /// Final "Successfully pushed" record
    Summary,
    /// Remote failure; aborts the push
    Error(String),
}

impl PushEvent {
    /// Decode a raw record. Returns `None` for records carrying nothing
    /// recognizable, which are skipped.
    pub fn from_raw(raw: RawEvent) -> Option<PushEvent> {
        if let Some(error) = raw.error {
            if !error.is_empty() {
                return Some(PushEvent::Error(error));
            }
        }
        if let Some(id) = raw.id {
            let phase = LayerPhase::parse(raw.status.as_deref()?);
            let detail = raw.progress_detail.unwrap_or_default();
            return Some(PushEvent::Layer {
                id,
                phase,
                current: detail.current,
                total: detail.total,
            });
        }
        if let Some(status) = raw.status {
            if status == SUMMARY_STATUS {
                return Some(PushEvent::Summary);
            }
            return Some(PushEvent::Status(status));
        }
        if let Some(stream) = raw.stream {
            return Some(PushEvent::StreamLine(stream.trim_end().to_string()));
        }
        None
    }
}
