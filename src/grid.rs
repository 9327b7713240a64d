//! # Row Grid
//!
//! [`DisplayGrid`] owns the table's fixed set of row slots. Its capacity is
//! decided once from the host's height and never changes afterwards. Every
//! update binds all slots: the first `min(capacity, rows)` mirror the new rows,
//! the rest are cleared.

use crate::formatter::DisplayRow;
use crate::scheduler::wait_for_cancel;
use crate::surface::{write_text, Column, Element, Surface};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Hard upper bound on table rows, whatever the configuration says
pub const MAX_ROWS: usize = 200;

/// Vertical geometry used to size the grid.
///
/// Units are whatever the host measures height in: pixels for a graphical
/// host, text lines for the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridGeometry {
    /// Height of one row, also used for each header line
    pub row_height: u32,
    /// Lines above the first table row (header box, countdown, column titles)
    pub header_rows: u32,
    /// Empty space kept above and below the board
    pub outer_margin: u32,
    /// Upper bound on the row count
    pub max_rows: usize,
}

impl GridGeometry {
    /// Board geometry for a character terminal
    pub fn terminal(max_rows: usize) -> Self {
        GridGeometry {
            row_height: 1,
            header_rows: 6,
            outer_margin: 1,
            max_rows,
        }
    }

    /// Largest row count that fits into `height`, between one and
    /// `min(max_rows, MAX_ROWS)`.
    pub fn capacity(&self, height: u32) -> usize {
        let available = u64::from(height.saturating_sub(2 * self.outer_margin));
        let rows_start = u64::from(self.header_rows) * u64::from(self.row_height);

        let limit = self.max_rows.clamp(1, MAX_ROWS);
        let fit = available
            .saturating_sub(rows_start)
            .checked_div(u64::from(self.row_height))
            .map_or(limit, |rows| usize::try_from(rows).unwrap_or(limit));
        fit.clamp(1, limit)
    }
}

/// Fixed-capacity table bound to a [`Surface`].
#[derive(Debug)]
pub struct DisplayGrid {
    slots: Vec<DisplayRow>,
    pacing: Duration,
}

impl DisplayGrid {
    /// Create a grid with `capacity` empty slots, clamped to `1..=MAX_ROWS`.
    pub fn new(capacity: usize, pacing: Duration) -> Self {
        DisplayGrid {
            slots: vec![DisplayRow::empty(); capacity.clamp(1, MAX_ROWS)],
            pacing,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Currently bound slot contents, top to bottom
    pub fn slots(&self) -> &[DisplayRow] {
        &self.slots
    }

    /// Bind `rows` into the slots, top to bottom, clearing unused slots.
    ///
    /// Pauses for the pacing interval between slots. Once `cancel` fires the
    /// pauses are skipped but the remaining slots are still bound, so the
    /// final state does not depend on cancellation.
    pub async fn update(
        &mut self,
        rows: &[DisplayRow],
        surface: &mut dyn Surface,
        cancel: &CancellationToken,
    ) {
        let shown = rows.len().min(self.capacity());
        debug!(shown, available = rows.len(), capacity = self.capacity(), "updating grid");

        let empty = DisplayRow::empty();
        for index in 0..self.capacity() {
            let row = if index < shown { &rows[index] } else { &empty };
            bind_row(surface, index, row);
            self.slots[index] = row.clone();

            let last = index + 1 == self.capacity();
            if !last && !self.pacing.is_zero() && !cancel.is_cancelled() {
                wait_for_cancel(cancel, self.pacing).await;
            }
        }
    }
}

fn bind_row(surface: &mut dyn Surface, row: usize, content: &DisplayRow) {
    let fields = [
        (Column::Line, &content.line),
        (Column::Type, &content.kind),
        (Column::Time, &content.time),
        (Column::Delay, &content.delay),
        (Column::Direction, &content.direction),
        (Column::Stop, &content.stop),
    ];
    for (column, text) in fields {
        write_text(surface, Element::Cell { row, column }, text);
    }
}
