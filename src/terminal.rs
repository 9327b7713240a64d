//! Crossterm host for the board.
//!
//! [`TerminalSurface`] takes over the terminal (raw mode, alternate screen,
//! mouse capture), draws each element at its [`Layout`] position and hands
//! the terminal back on release, on drop, or from the panic hook.
//! [`spawn_input_listener`] turns any key press or mouse click into
//! cancellation.

use crate::grid::GridGeometry;
use crate::layout::{Layout, MARKER_GLYPH};
use crate::surface::{Element, Surface, SurfaceError};
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use crossterm::{cursor, execute, queue, style, terminal};
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How often the input listener re-checks the token
const INPUT_POLL: Duration = Duration::from_millis(100);

pub struct TerminalSurface {
    out: Stdout,
    layout: Layout,
    texts: HashMap<Element, String>,
    hidden: HashMap<Element, bool>,
    active: bool,
}

impl TerminalSurface {
    /// Take over the terminal and size the grid from its height.
    pub fn open(geometry: GridGeometry, with_panel: bool) -> Result<Self, SurfaceError> {
        install_panic_hook();

        let (cols, lines) = terminal::size()?;
        let rows = geometry.capacity(lines as u32);
        let layout = Layout::new(cols, lines, rows, with_panel);

        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(
            out,
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        )?;
        info!(cols, lines, rows, "terminal surface acquired");

        let mut surface = TerminalSurface {
            out,
            layout,
            texts: HashMap::new(),
            hidden: HashMap::new(),
            active: true,
        };
        surface.draw_rules()?;
        Ok(surface)
    }

    /// Number of table rows that fit
    pub fn capacity(&self) -> usize {
        self.layout.rows()
    }

    fn draw_rules(&mut self) -> Result<(), SurfaceError> {
        for (placement, rule) in self.layout.rules() {
            queue!(
                self.out,
                cursor::MoveTo(placement.x, placement.y),
                style::Print(placement.fit(&rule))
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn draw(&mut self, element: Element) -> Result<(), SurfaceError> {
        if !self.active {
            return Err(SurfaceError::Released);
        }
        let Some(placement) = self.layout.position(element) else {
            debug!(%element, "element has no place on this terminal");
            return Ok(());
        };

        let visible = !self.hidden.get(&element).copied().unwrap_or(false);
        let text = match element {
            Element::Marker(_) => MARKER_GLYPH,
            _ => self.texts.get(&element).map(String::as_str).unwrap_or(""),
        };
        let text = placement.fit(if visible { text } else { "" });

        queue!(
            self.out,
            cursor::MoveTo(placement.x, placement.y),
            style::Print(text)
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        restore_terminal();
        info!("terminal surface released");
    }
}

impl Surface for TerminalSurface {
    fn set_text(&mut self, element: Element, text: &str) -> Result<(), SurfaceError> {
        self.texts.insert(element, text.to_string());
        self.draw(element)
    }

    fn set_visible(&mut self, element: Element, visible: bool) -> Result<(), SurfaceError> {
        self.hidden.insert(element, !visible);
        self.draw(element)
    }

    fn release(&mut self) -> Result<(), SurfaceError> {
        self.restore();
        Ok(())
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Undo everything [`TerminalSurface::open`] did, ignoring failures
fn restore_terminal() {
    let mut out = io::stdout();
    let _ = execute!(
        out,
        event::DisableMouseCapture,
        cursor::Show,
        terminal::LeaveAlternateScreen
    );
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));
    });
}

/// Any key press or mouse click ends the board
pub fn is_exit_event(event: &Event) -> bool {
    match event {
        Event::Key(key) => key.kind == KeyEventKind::Press,
        Event::Mouse(mouse) => matches!(mouse.kind, MouseEventKind::Down(_)),
        _ => false,
    }
}

/// Watch terminal input on a blocking thread and cancel on the first exit
/// event. The thread ends within one poll interval after cancellation.
pub fn spawn_input_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "terminal input unavailable, stopping listener");
                    return;
                }
            }
            match event::read() {
                Ok(ev) if is_exit_event(&ev) => {
                    info!("input received, stopping");
                    cancel.cancel();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read terminal input");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{
        KeyCode, KeyEvent, KeyEventState, KeyModifiers, MouseButton, MouseEvent,
    };

    fn key(kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 3,
            row: 4,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_key_press_and_click_exit() {
        assert!(is_exit_event(&key(KeyEventKind::Press)));
        assert!(is_exit_event(&mouse(MouseEventKind::Down(MouseButton::Left))));
    }

    #[test]
    fn test_other_events_are_ignored() {
        assert!(!is_exit_event(&key(KeyEventKind::Release)));
        assert!(!is_exit_event(&mouse(MouseEventKind::Moved)));
        assert!(!is_exit_event(&Event::Resize(80, 24)));
        assert!(!is_exit_event(&Event::FocusGained));
    }
}
