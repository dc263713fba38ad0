use serde::Deserialize;
use std::time::Duration;

/// Per-session editing constants.
///
/// One instance per open document, passed in at construction; nothing in
/// the core is process-global.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum retained undo snapshots; the oldest is dropped silently
    /// beyond this. 0 means unlimited.
    pub history_limit: usize,

    /// Deadline for one AI-assist round trip, in seconds
    pub assist_timeout_secs: u64,

    /// Minimum extracted text length before an assist request leaves the
    /// client
    pub assist_min_chars: usize,

    /// Buffered state-change events per subscriber
    pub event_buffer: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            assist_timeout_secs: 60,
            assist_min_chars: 10,
            event_buffer: 64,
        }
    }
}

impl EditorConfig {
    pub fn assist_timeout(&self) -> Duration {
        Duration::from_secs(self.assist_timeout_secs)
    }
}
