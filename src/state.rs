//! Captured board states for restore after a programming run.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Enabled flag of one board at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    /// Index into the device set the snapshot was taken from.
    pub index: usize,
    /// Whether the board was enabled.
    pub was_enabled: bool,
}

/// Ordered list of board states.
///
/// Boards in an unknown state are not captured: they cannot be toggled
/// affirmatively, so there is nothing to restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<BoardState>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one board.
    pub fn record(&mut self, index: usize, was_enabled: bool) {
        trace!(index, was_enabled, "Recording board state");
        self.entries.push(BoardState { index, was_enabled });
    }

    /// Entries in capture order.
    #[must_use]
    pub fn entries(&self) -> &[BoardState] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captured flag for a board index.
    #[must_use]
    pub fn was_enabled(&self, index: usize) -> Option<bool> {
        self.entries
            .iter()
            .find(|e| e.index == index)
            .map(|e| e.was_enabled)
    }
}

impl FromIterator<(usize, bool)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (usize, bool)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(index, was_enabled)| BoardState { index, was_enabled })
                .collect(),
        }
    }
}
