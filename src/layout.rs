//! Character-cell geometry of the board.
//!
//! ```text
//! ****************************************************************
//!  *                 WIENER PLATZ DEPARTURES                    *
//!  *                   LAST UPDATE: 12:00                       *
//! ****************************************************************
//!                  -- next refresh in 30 s --
//! LINE  TYP  TIME    DELAY  DIRECTION ...        STOP ...          panel
//! 1     U    12:05     !    A very long dire…    Wiener Platz      panel
//! ```
//!
//! The block is centered on the host. Positions are computed once; the
//! number of table rows never changes after startup.

use crate::formatter::{DIRECTION_WIDTH, STOP_WIDTH};
use crate::grid::MAX_ROWS;
use crate::surface::{Column, Element, Marker};

pub const GAP: u16 = 2;
pub const MARKER_WIDTH: u16 = 3;
pub const PANEL_GAP: u16 = 3;
pub const PANEL_WIDTH: u16 = 24;
pub const MARKER_GLYPH: &str = "*";
pub const RULE_LEN: usize = 64;

/// Lines above the first table row
pub const HEADER_LINES: u16 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Where an element lives on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub align: Align,
}

impl Placement {
    /// Pad or cut `text` to exactly `width` characters.
    pub fn fit(&self, text: &str) -> String {
        let width = self.width as usize;
        let text: String = text.chars().take(width).collect();
        let len = text.chars().count();
        match self.align {
            Align::Left => format!("{text:<width$}"),
            Align::Center => {
                let left = (width - len) / 2;
                format!("{}{text}{}", " ".repeat(left), " ".repeat(width - len - left))
            }
        }
    }
}

pub fn column_width(column: Column) -> u16 {
    match column {
        Column::Line => 5,
        Column::Type => 4,
        Column::Time => 6,
        Column::Delay => 5,
        Column::Direction => DIRECTION_WIDTH as u16,
        Column::Stop => STOP_WIDTH as u16,
    }
}

fn column_offset(column: Column) -> u16 {
    Column::ALL
        .iter()
        .take_while(|&&c| c != column)
        .map(|&c| column_width(c) + GAP)
        .sum()
}

fn column_align(column: Column) -> Align {
    if column == Column::Delay {
        Align::Center
    } else {
        Align::Left
    }
}

/// Width of the table and header box
pub fn table_width() -> u16 {
    Column::ALL.iter().map(|&c| column_width(c)).sum::<u16>() + GAP * (Column::ALL.len() as u16 - 1)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    origin_x: u16,
    origin_y: u16,
    rows: usize,
    panel: bool,
}

impl Layout {
    /// Center a board with `rows` table rows on a `cols` x `lines` host.
    /// `rows` is clamped to `1..=MAX_ROWS`.
    pub fn new(cols: u16, lines: u16, rows: usize, panel: bool) -> Self {
        let mut layout = Layout {
            origin_x: 0,
            origin_y: 0,
            rows: rows.clamp(1, MAX_ROWS),
            panel,
        };
        layout.origin_x = cols.saturating_sub(layout.width()) / 2;
        layout.origin_y = lines.saturating_sub(layout.height()) / 2;
        layout
    }

    /// Board anchored at the top-left corner, for snapshots
    pub fn compact(rows: usize, panel: bool) -> Self {
        Self::new(0, 0, rows, panel)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> u16 {
        if self.panel {
            table_width() + PANEL_GAP + PANEL_WIDTH
        } else {
            table_width()
        }
    }

    pub fn height(&self) -> u16 {
        HEADER_LINES + self.rows as u16
    }

    /// Panel lines run alongside the column headers and table rows
    pub fn panel_lines(&self) -> usize {
        if self.panel {
            self.rows + 1
        } else {
            0
        }
    }

    /// The two decorative star rules framing the header box
    pub fn rules(&self) -> [(Placement, String); 2] {
        let rule = "*".repeat(RULE_LEN);
        let at = |y| Placement {
            x: self.origin_x,
            y: self.origin_y + y,
            width: table_width(),
            align: Align::Center,
        };
        [(at(0), rule.clone()), (at(3), rule)]
    }

    pub fn position(&self, element: Element) -> Option<Placement> {
        let x0 = self.origin_x;
        let y0 = self.origin_y;
        let inner = table_width() - 2 * MARKER_WIDTH;
        let place = |x, y, width, align| Placement {
            x,
            y,
            width,
            align,
        };

        Some(match element {
            Element::Title => place(x0 + MARKER_WIDTH, y0 + 1, inner, Align::Center),
            Element::LastUpdate => place(x0 + MARKER_WIDTH, y0 + 2, inner, Align::Center),
            Element::Marker(marker) => {
                let y = if marker.is_top() { y0 + 1 } else { y0 + 2 };
                let x = match marker {
                    Marker::TopLeft | Marker::BottomLeft => x0,
                    Marker::TopRight | Marker::BottomRight => x0 + table_width() - MARKER_WIDTH,
                };
                place(x, y, MARKER_WIDTH, Align::Center)
            }
            Element::Countdown => place(x0, y0 + 4, table_width(), Align::Center),
            Element::ColumnHeader(column) => place(
                x0 + column_offset(column),
                y0 + 5,
                column_width(column),
                column_align(column),
            ),
            Element::Cell { row, column } if row < self.rows => place(
                x0 + column_offset(column),
                y0 + HEADER_LINES + row as u16,
                column_width(column),
                column_align(column),
            ),
            Element::Panel(line) if line < self.panel_lines() => place(
                x0 + table_width() + PANEL_GAP,
                y0 + 5 + line as u16,
                PANEL_WIDTH,
                Align::Left,
            ),
            Element::Cell { .. } | Element::Panel(_) => return None,
        })
    }

    /// Every element that has a place on this board
    pub fn elements(&self) -> Vec<Element> {
        let mut elements = vec![Element::Title, Element::LastUpdate, Element::Countdown];
        elements.extend(Marker::ALL.map(Element::Marker));
        elements.extend(Column::ALL.map(Element::ColumnHeader));
        for row in 0..self.rows {
            elements.extend(Column::ALL.map(|column| Element::Cell { row, column }));
        }
        elements.extend((0..self.panel_lines()).map(Element::Panel));
        elements
    }
}
