//! Host surface abstraction.
//!
//! The board is a fixed set of labelled elements created once by the host and
//! mutated through two commands: set the text of an element, or show/hide it.
//! [`Surface`] is that contract; the scheduler, grid, animator and side panel
//! only ever talk to the host through it.

use std::collections::HashMap;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("surface IO: {0}")]
    Io(#[from] io::Error),

    #[error("surface has been released")]
    Released,
}

/// One of the four header markers that blink around the title box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Marker {
    pub const ALL: [Marker; 4] = [
        Marker::TopLeft,
        Marker::TopRight,
        Marker::BottomLeft,
        Marker::BottomRight,
    ];

    pub fn is_top(self) -> bool {
        matches!(self, Marker::TopLeft | Marker::TopRight)
    }
}

/// Table columns, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Line,
    Type,
    Time,
    Delay,
    Direction,
    Stop,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Line,
        Column::Type,
        Column::Time,
        Column::Delay,
        Column::Direction,
        Column::Stop,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Column::Line => "LINE",
            Column::Type => "TYP",
            Column::Time => "TIME",
            Column::Delay => "DELAY",
            Column::Direction => "DIRECTION",
            Column::Stop => "STOP",
        }
    }
}

/// Address of a single element on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    Title,
    LastUpdate,
    Countdown,
    Marker(Marker),
    ColumnHeader(Column),
    Cell { row: usize, column: Column },
    /// Line `n` of the supplementary panel
    Panel(usize),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Title => write!(f, "title"),
            Element::LastUpdate => write!(f, "last-update"),
            Element::Countdown => write!(f, "countdown"),
            Element::Marker(m) => write!(f, "marker:{m:?}"),
            Element::ColumnHeader(c) => write!(f, "header:{c:?}"),
            Element::Cell { row, column } => write!(f, "cell:{row}:{column:?}"),
            Element::Panel(n) => write!(f, "panel:{n}"),
        }
    }
}

/// Bindable text/visibility sink provided by the rendering host.
///
/// Calls are cheap and may be issued in any order; the core issues them
/// top-to-bottom from a single control flow.
pub trait Surface {
    fn set_text(&mut self, element: Element, text: &str) -> Result<(), SurfaceError>;

    fn set_visible(&mut self, element: Element, visible: bool) -> Result<(), SurfaceError>;

    /// Hand the display back to the host. Called exactly once on shutdown.
    fn release(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Write text and log instead of propagating; there is no recovery action
/// for a failed host write.
pub fn write_text(surface: &mut dyn Surface, element: Element, text: &str) {
    if let Err(e) = surface.set_text(element, text) {
        tracing::warn!(%element, error = %e, "surface text write failed");
    }
}

/// Visibility counterpart of [`write_text`].
pub fn write_visible(surface: &mut dyn Surface, element: Element, visible: bool) {
    if let Err(e) = surface.set_visible(element, visible) {
        tracing::warn!(%element, error = %e, "surface visibility write failed");
    }
}

/// A recorded host command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SetText(Element, String),
    SetVisible(Element, bool),
}

/// In-memory surface that keeps the current bound state and a full command
/// log. Used for the `--stdout` snapshot and throughout the tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    texts: HashMap<Element, String>,
    hidden: HashMap<Element, bool>,
    commands: Vec<Command>,
    releases: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of an element, empty if never written
    pub fn text(&self, element: Element) -> &str {
        self.texts.get(&element).map(String::as_str).unwrap_or("")
    }

    /// Elements are visible until explicitly hidden
    pub fn is_visible(&self, element: Element) -> bool {
        !self.hidden.get(&element).copied().unwrap_or(false)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Texts written to `element`, oldest first
    pub fn history(&self, element: Element) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::SetText(e, text) if *e == element => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl Surface for MemorySurface {
    fn set_text(&mut self, element: Element, text: &str) -> Result<(), SurfaceError> {
        if self.releases > 0 {
            return Err(SurfaceError::Released);
        }
        self.texts.insert(element, text.to_string());
        self.commands.push(Command::SetText(element, text.to_string()));
        Ok(())
    }

    fn set_visible(&mut self, element: Element, visible: bool) -> Result<(), SurfaceError> {
        if self.releases > 0 {
            return Err(SurfaceError::Released);
        }
        self.hidden.insert(element, !visible);
        self.commands.push(Command::SetVisible(element, visible));
        Ok(())
    }

    fn release(&mut self) -> Result<(), SurfaceError> {
        self.releases += 1;
        Ok(())
    }
}
