//! # ASCII Board Rendering
//!
//! Renders the bound state of a [`MemorySurface`] as plain text. This is the
//! development mode: one refresh, one snapshot on stdout, no terminal control
//! sequences.

use crate::layout::{Layout, MARKER_GLYPH};
use crate::surface::{Element, MemorySurface};

/// Render the board as lines of text, trailing spaces trimmed.
pub fn draw_ascii(surface: &MemorySurface, layout: &Layout) -> String {
    let width = layout.width() as usize;
    let mut grid = vec![vec![' '; width]; layout.height() as usize];

    let mut put = |x: u16, y: u16, text: &str| {
        if let Some(line) = grid.get_mut(y as usize) {
            for (offset, ch) in text.chars().enumerate() {
                if let Some(cell) = line.get_mut(x as usize + offset) {
                    *cell = ch;
                }
            }
        }
    };

    for (placement, rule) in layout.rules() {
        put(placement.x, placement.y, &placement.fit(&rule));
    }

    for element in layout.elements() {
        let Some(placement) = layout.position(element) else {
            continue;
        };
        let text = match element {
            Element::Marker(_) => MARKER_GLYPH,
            _ => surface.text(element),
        };
        let text = if surface.is_visible(element) { text } else { "" };
        put(placement.x, placement.y, &placement.fit(text));
    }

    grid.into_iter()
        .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
