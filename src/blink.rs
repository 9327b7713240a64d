//! Header marker animation.
//!
//! Four markers frame the title box. In [`BlinkMode::Stars`] they alternate
//! between the top and bottom pair once per countdown second, and all four
//! flash together right after each refresh. [`BlinkMode::Static`] shows them
//! permanently as a plain bracketed header.

use crate::scheduler::wait_for_cancel;
use crate::surface::{write_visible, Element, Marker, Surface};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Number of half-cycles in the refresh flash
pub const FLASH_HALF_CYCLES: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkMode {
    #[default]
    Stars,
    Static,
}

#[derive(Debug)]
pub struct BlinkAnimator {
    mode: BlinkMode,
    top_active: bool,
    half_cycle: Duration,
}

impl BlinkAnimator {
    pub fn new(mode: BlinkMode, half_cycle: Duration) -> Self {
        BlinkAnimator {
            mode,
            top_active: true,
            half_cycle,
        }
    }

    pub fn mode(&self) -> BlinkMode {
        self.mode
    }

    /// Pair the next [`tick`](Self::tick) will show
    pub fn top_active(&self) -> bool {
        self.top_active
    }

    /// Initial marker state: top pair in stars mode, all four when static.
    pub fn show_initial(&self, surface: &mut dyn Surface) {
        match self.mode {
            BlinkMode::Stars => show_pair(surface, true),
            BlinkMode::Static => show_all(surface, true),
        }
    }

    /// One countdown second: show the active pair, then switch pairs.
    pub fn tick(&mut self, surface: &mut dyn Surface) {
        if self.mode == BlinkMode::Static {
            return;
        }
        show_pair(surface, self.top_active);
        self.top_active = !self.top_active;
    }

    /// Flash all markers in unison. Returns `true` if cancelled midway.
    pub async fn flash(&self, surface: &mut dyn Surface, cancel: &CancellationToken) -> bool {
        if self.mode == BlinkMode::Static {
            return false;
        }
        for i in 0..FLASH_HALF_CYCLES {
            show_all(surface, i % 2 == 0);
            if wait_for_cancel(cancel, self.half_cycle).await {
                return true;
            }
        }
        false
    }
}

fn show_pair(surface: &mut dyn Surface, top: bool) {
    for marker in Marker::ALL {
        write_visible(surface, Element::Marker(marker), marker.is_top() == top);
    }
}

fn show_all(surface: &mut dyn Surface, visible: bool) {
    for marker in Marker::ALL {
        write_visible(surface, Element::Marker(marker), visible);
    }
}
