//! Supplementary panel beside the departure table.
//!
//! The board can carry one extra panel (a station notice, a link to the full
//! timetable). It is installed once at startup and notified after every
//! render so it can react to fresh data.

use crate::surface::{write_text, Element, Surface};

pub trait SidePanel {
    /// Draw the panel's initial content
    fn install(&mut self, surface: &mut dyn Surface);

    /// Called after each render with the header timestamp
    fn refresh(&mut self, _updated: &str, _surface: &mut dyn Surface) {}
}

/// Fixed lines of text taken from configuration.
#[derive(Debug, Clone)]
pub struct TextPanel {
    lines: Vec<String>,
}

impl TextPanel {
    /// `None` when there is nothing to show
    pub fn from_lines(lines: &[String]) -> Option<Self> {
        if lines.is_empty() {
            None
        } else {
            Some(TextPanel {
                lines: lines.to_vec(),
            })
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl SidePanel for TextPanel {
    fn install(&mut self, surface: &mut dyn Surface) {
        for (index, line) in self.lines.iter().enumerate() {
            write_text(surface, Element::Panel(index), line);
        }
    }
}
