//! # Refresh/Countdown Scheduler
//!
//! [`CycleScheduler`] runs the board's endless cycle:
//!
//! ```text
//! Fetching -> Flashing -> Rendering -> CountingDown -> Fetching ...
//!     \__________\____________\____________\__________> Cancelled
//! ```
//!
//! Every phase runs on the same control flow. The only suspension points are
//! timed waits, each of which races the cancellation token, and the token is
//! checked again right after every wait. Once cancelled the surface is
//! released exactly once and [`CycleScheduler::run`] hands it back.

use crate::blink::BlinkAnimator;
use crate::feed::{DepartureSource, FeedError};
use crate::formatter::{format_event, DisplayRow};
use crate::grid::DisplayGrid;
use crate::panel::SidePanel;
use crate::surface::{write_text, Column, Element, Surface};
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Length of one countdown tick
pub const TICK: Duration = Duration::from_secs(1);

/// Sleep for `duration` unless `cancel` fires first. Returns `true` when
/// cancelled.
pub async fn wait_for_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => cancel.is_cancelled(),
    }
}

/// Header text for a feed timestamp
pub fn last_update_text(updated: &str) -> String {
    if updated.is_empty() {
        "LAST UPDATE: n/a".to_string()
    } else {
        format!("LAST UPDATE: {updated}")
    }
}

/// Countdown line text
pub fn countdown_text(remaining: u64) -> String {
    format!("-- next refresh in {remaining:2} s --")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Fetching,
    Flashing,
    Rendering,
    CountingDown,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fetching => "fetching",
            Phase::Flashing => "flashing",
            Phase::Rendering => "rendering",
            Phase::CountingDown => "counting-down",
            Phase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// State carried between cycles.
#[derive(Debug, Default)]
struct CycleState {
    /// Timestamp of the last successful fetch, empty before the first one
    updated: String,
    /// Rows of the last successful fetch
    rows: Vec<DisplayRow>,
    /// Seconds left in the current countdown
    remaining_seconds: u64,
    /// Wall-clock time of the last successful fetch
    last_success: Option<DateTime<Local>>,
}

/// Outcome of the fetching phase
enum Fetched {
    Fresh,
    Stale,
}

pub struct CycleScheduler<S, D> {
    source: S,
    surface: D,
    grid: DisplayGrid,
    blink: BlinkAnimator,
    panel: Option<Box<dyn SidePanel>>,
    title: String,
    interval: u64,
    cancel: CancellationToken,
    state: CycleState,
    phase: Phase,
}

impl<S: DepartureSource, D: Surface> CycleScheduler<S, D> {
    /// `interval` is clamped to at least one second.
    pub fn new(
        source: S,
        surface: D,
        grid: DisplayGrid,
        blink: BlinkAnimator,
        interval: u64,
        cancel: CancellationToken,
    ) -> Self {
        CycleScheduler {
            source,
            surface,
            grid,
            blink,
            panel: None,
            title: String::new(),
            interval: interval.max(1),
            cancel,
            state: CycleState::default(),
            phase: Phase::Fetching,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_panel(mut self, panel: Box<dyn SidePanel>) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run cycles until cancelled, then release the surface and return it.
    pub async fn run(mut self) -> D {
        self.prepare();

        while !self.cancel.is_cancelled() {
            if !self.refresh().await {
                break;
            }
            if !self.count_down().await {
                break;
            }
        }

        self.shutdown()
    }

    /// One fetch/flash/render pass, then release. Used for snapshots.
    ///
    /// The flash leaves every marker dark, so the resting marker state is
    /// restored before the surface is handed back.
    pub async fn run_once(mut self) -> D {
        self.prepare();
        if !self.cancel.is_cancelled() && self.refresh().await {
            self.blink.show_initial(&mut self.surface);
        }
        self.shutdown()
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
    }

    /// Static texts and initial marker state
    fn prepare(&mut self) {
        let surface: &mut dyn Surface = &mut self.surface;
        write_text(surface, Element::Title, &self.title);
        for column in Column::ALL {
            write_text(surface, Element::ColumnHeader(column), column.heading());
        }
        write_text(surface, Element::LastUpdate, &last_update_text(""));
        write_text(surface, Element::Countdown, "");
        self.blink.show_initial(surface);
        if let Some(panel) = self.panel.as_mut() {
            panel.install(surface);
        }
        info!(
            capacity = self.grid.capacity(),
            interval = self.interval,
            blink = ?self.blink.mode(),
            "board ready"
        );
    }

    /// Fetching, Flashing and Rendering. Returns `false` once cancelled.
    async fn refresh(&mut self) -> bool {
        self.enter(Phase::Fetching);
        let fetched = self.fetch().await;
        if self.cancel.is_cancelled() {
            return false;
        }

        self.enter(Phase::Flashing);
        if self.blink.flash(&mut self.surface, &self.cancel).await {
            return false;
        }

        self.enter(Phase::Rendering);
        write_text(
            &mut self.surface,
            Element::LastUpdate,
            &last_update_text(&self.state.updated),
        );
        if let Fetched::Fresh = fetched {
            self.grid
                .update(&self.state.rows, &mut self.surface, &self.cancel)
                .await;
        }
        if let Some(panel) = self.panel.as_mut() {
            panel.refresh(&self.state.updated, &mut self.surface);
        }

        !self.cancel.is_cancelled()
    }

    async fn fetch(&mut self) -> Fetched {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Fetched::Stale,
            result = self.source.fetch() => result,
        };

        match result {
            Ok(feed) => {
                info!(events = feed.events.len(), updated = %feed.updated, "fetched departures");
                self.state.rows = feed.events.iter().map(format_event).collect();
                self.state.updated = feed.updated;
                self.state.last_success = Some(Local::now());
                Fetched::Fresh
            }
            Err(FeedError::Network(e)) => {
                warn!(error = %e, stale_for = ?self.stale_for(), "network error, keeping previous data");
                Fetched::Stale
            }
            Err(e @ FeedError::Decode(_)) => {
                error!(error = %e, stale_for = ?self.stale_for(), "unexpected feed payload, keeping previous data");
                Fetched::Stale
            }
        }
    }

    /// Seconds since the last successful fetch, for diagnostics
    fn stale_for(&self) -> Option<i64> {
        self.state
            .last_success
            .map(|at| (Local::now() - at).num_seconds())
    }

    /// Countdown with per-second marker ticks. Returns `false` once cancelled.
    async fn count_down(&mut self) -> bool {
        self.enter(Phase::CountingDown);
        self.state.remaining_seconds = self.interval;

        while self.state.remaining_seconds > 0 && !self.cancel.is_cancelled() {
            write_text(
                &mut self.surface,
                Element::Countdown,
                &countdown_text(self.state.remaining_seconds),
            );
            self.blink.tick(&mut self.surface);

            if wait_for_cancel(&self.cancel, TICK).await {
                return false;
            }
            self.state.remaining_seconds -= 1;
        }

        !self.cancel.is_cancelled()
    }

    fn shutdown(mut self) -> D {
        self.enter(Phase::Cancelled);
        info!("stopping departure board");
        if let Err(e) = self.surface.release() {
            warn!(error = %e, "releasing surface failed");
        }
        self.surface
    }
}
