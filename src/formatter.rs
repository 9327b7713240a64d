//! # Row Formatting
//!
//! Turns one [`DepartureEvent`] into a [`DisplayRow`] whose six fields fit the
//! table's fixed column widths. Formatting is total: missing data renders as
//! an empty string or a sentinel, never as an error.

use crate::DepartureEvent;

/// Shown in the time column when neither estimate nor timetable is known
pub const NO_TIME: &str = "--:--";

/// Shown in the type column when the product category is missing
pub const UNKNOWN_TYPE: &str = "??";

/// Delay column glyph
pub const DELAY_MARK: &str = "!";

/// Appended to truncated text
pub const ELLIPSIS: char = '…';

pub const DIRECTION_WIDTH: usize = 32;
pub const STOP_WIDTH: usize = 24;

/// One table row, ready to bind to a grid slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayRow {
    pub line: String,
    /// Two- or three-letter product code
    pub kind: String,
    pub time: String,
    pub delay: String,
    pub direction: String,
    pub stop: String,
}

impl DisplayRow {
    /// The all-empty row used for unused slots
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// Format a single departure event.
///
/// # Example
/// ```
/// use departure_board_lib::{formatter::format_event, DepartureEvent};
///
/// let row = format_event(&DepartureEvent::default());
/// assert_eq!(row.kind, "??");
/// assert_eq!(row.time, "--:--");
/// assert_eq!(row.delay, "");
/// ```
pub fn format_event(event: &DepartureEvent) -> DisplayRow {
    let time = [event.estimate(), event.timetable()]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .unwrap_or(NO_TIME);

    DisplayRow {
        line: event.line_number().unwrap_or_default().to_string(),
        kind: product_short(event.product()),
        time: time.to_string(),
        delay: if event.is_delayed() { DELAY_MARK } else { "" }.to_string(),
        direction: truncate(event.direction().unwrap_or_default(), DIRECTION_WIDTH),
        stop: truncate(event.stop_name().unwrap_or_default(), STOP_WIDTH),
    }
}

/// Abbreviate a product category to its table code.
pub fn product_short(product: Option<&str>) -> String {
    let label = match product {
        Some(label) if !label.is_empty() => label,
        _ => return UNKNOWN_TYPE.to_string(),
    };

    let lower = label.to_lowercase();
    if lower.contains("light") || lower.contains("stadtbahn") {
        "U".to_string()
    } else if lower.contains("bus") {
        "BUS".to_string()
    } else if lower.contains("train") || lower.contains("rail") {
        "RB".to_string()
    } else {
        label.chars().take(3).collect::<String>().to_uppercase()
    }
}

/// Cut `text` to at most `width` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}
