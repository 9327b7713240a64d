//! # Cycle Scenario Tests
//!
//! Each test scripts the feed responses for a few cycles, runs the scheduler
//! on Tokio's paused clock and inspects the bound state of a
//! [`MemorySurface`]. A script that runs out cancels the token, which ends
//! the run at the next fetch.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::blink::{BlinkAnimator, BlinkMode};
use crate::feed::{decode, DepartureSource, FeedError};
use crate::grid::DisplayGrid;
use crate::panel::TextPanel;
use crate::scheduler::{countdown_text, CycleScheduler, Phase};
use crate::surface::{Column, Command, Element, Marker, MemorySurface};
use crate::Feed;

const WIENER_PLATZ: &str = r#"{"updated":"12:00","events":[{"line":{"number":"1","product":"Stadtbahn","direction":"A very long direction name exceeding thirty two characters total"},"departure":{"estimate":"12:05","delayed":true},"stopPoint":{"name":"Wiener Platz"}}]}"#;

const MORNING: &str = r#"{"updated":"09:30","events":[
    {"line":{"number":"13","product":"Stadtbahn","direction":"Sülzgürtel"},"departure":{"timetable":"09:41"},"stopPoint":{"name":"Wiener Platz"}},
    {"line":{"number":"151","product":"Bus","direction":"Dünnwald"},"departure":{"estimate":"09:44","delayed":false},"stopPoint":{"name":"Wiener Platz"}}
]}"#;

enum Step {
    Payload(&'static str),
    NetworkDown,
    Garbage,
}

/// Replays a fixed list of responses, then cancels the run.
struct ScriptedSource {
    steps: RefCell<VecDeque<Step>>,
    calls: Cell<usize>,
    cancel: CancellationToken,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>, cancel: &CancellationToken) -> Self {
        ScriptedSource {
            steps: RefCell::new(steps.into()),
            calls: Cell::new(0),
            cancel: cancel.clone(),
        }
    }
}

fn network_error() -> FeedError {
    // an unparsable URL fails in the request builder without any I/O
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("invalid URL must fail");
    FeedError::Network(err)
}

impl DepartureSource for &ScriptedSource {
    async fn fetch(&self) -> Result<Feed, FeedError> {
        self.calls.set(self.calls.get() + 1);
        match self.steps.borrow_mut().pop_front() {
            Some(Step::Payload(body)) => decode(body),
            Some(Step::NetworkDown) => Err(network_error()),
            Some(Step::Garbage) => decode("<html>502 Bad Gateway</html>"),
            None => {
                self.cancel.cancel();
                Err(network_error())
            }
        }
    }
}

/// Never answers; only cancellation ends a fetch.
struct PendingSource {
    calls: Cell<usize>,
}

impl DepartureSource for &PendingSource {
    async fn fetch(&self) -> Result<Feed, FeedError> {
        self.calls.set(self.calls.get() + 1);
        std::future::pending().await
    }
}

/// Records the level and message of every event.
#[derive(Clone, Default)]
struct CapturedEvents(Arc<Mutex<Vec<(Level, String)>>>);

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

fn scheduler<'a>(
    source: &'a ScriptedSource,
    capacity: usize,
    interval: u64,
    mode: BlinkMode,
    cancel: &CancellationToken,
) -> CycleScheduler<&'a ScriptedSource, MemorySurface> {
    CycleScheduler::new(
        source,
        MemorySurface::new(),
        DisplayGrid::new(capacity, Duration::ZERO),
        BlinkAnimator::new(mode, Duration::from_millis(100)),
        interval,
        cancel.clone(),
    )
    .with_title("WIENER PLATZ DEPARTURES")
}

fn cell(row: usize, column: Column) -> Element {
    Element::Cell { row, column }
}

fn row_texts(surface: &MemorySurface, row: usize) -> [&str; 6] {
    Column::ALL.map(|column| surface.text(cell(row, column)))
}

fn cell_writes(surface: &MemorySurface) -> usize {
    surface
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::SetText(Element::Cell { .. }, _)))
        .count()
}

#[tokio::test(start_paused = true)]
async fn wiener_platz_end_to_end() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(WIENER_PLATZ)], &cancel);

    let surface = scheduler(&source, 5, 2, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(
        row_texts(&surface, 0),
        [
            "1",
            "U",
            "12:05",
            "!",
            "A very long direction name exce…",
            "Wiener Platz"
        ]
    );
    for row in 1..5 {
        assert_eq!(row_texts(&surface, row), [""; 6], "row {row}");
    }
    assert_eq!(surface.text(Element::LastUpdate), "LAST UPDATE: 12:00");
    assert_eq!(surface.text(Element::Title), "WIENER PLATZ DEPARTURES");
    assert_eq!(surface.text(Element::ColumnHeader(Column::Delay)), "DELAY");
    assert_eq!(source.calls.get(), 2);
    assert_eq!(surface.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn network_failure_keeps_previous_header_and_rows() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING), Step::NetworkDown], &cancel);

    let surface = scheduler(&source, 4, 1, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(surface.text(Element::LastUpdate), "LAST UPDATE: 09:30");
    assert_eq!(
        surface.history(Element::LastUpdate),
        vec![
            "LAST UPDATE: n/a",
            "LAST UPDATE: 09:30",
            "LAST UPDATE: 09:30"
        ]
    );
    assert_eq!(
        row_texts(&surface, 0),
        ["13", "U", "09:41", "", "Sülzgürtel", "Wiener Platz"]
    );
    assert_eq!(
        row_texts(&surface, 1),
        ["151", "BUS", "09:44", "", "Dünnwald", "Wiener Platz"]
    );
    // only the successful cycle touched the grid
    assert_eq!(cell_writes(&surface), 4 * 6);
    assert_eq!(source.calls.get(), 3);
}

#[tokio::test(start_paused = true)]
async fn failures_before_first_success_show_placeholder() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Garbage, Step::NetworkDown], &cancel);

    let surface = scheduler(&source, 3, 1, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(
        surface.history(Element::LastUpdate),
        vec!["LAST UPDATE: n/a"; 3]
    );
    assert_eq!(cell_writes(&surface), 0);
    for row in 0..3 {
        assert_eq!(row_texts(&surface, row), [""; 6]);
    }
}

#[tokio::test(start_paused = true)]
async fn empty_event_list_clears_every_slot() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![
            Step::Payload(MORNING),
            Step::Payload(r#"{"updated":"10:00","events":[]}"#),
        ],
        &cancel,
    );

    let surface = scheduler(&source, 3, 1, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(surface.text(Element::LastUpdate), "LAST UPDATE: 10:00");
    for row in 0..3 {
        assert_eq!(row_texts(&surface, row), [""; 6], "row {row}");
    }
}

#[tokio::test(start_paused = true)]
async fn more_events_than_slots_shows_first_ones() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING)], &cancel);

    let scheduler = scheduler(&source, 1, 1, BlinkMode::Stars, &cancel);
    let surface = scheduler.run().await;

    assert_eq!(surface.text(cell(0, Column::Line)), "13");
    assert_eq!(surface.text(cell(1, Column::Line)), "");
    assert_eq!(cell_writes(&surface), 6);
}

#[tokio::test(start_paused = true)]
async fn countdown_runs_interval_ticks_then_fetches_again() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(
        vec![Step::Payload(MORNING), Step::Payload(MORNING)],
        &cancel,
    );
    let start = Instant::now();

    let surface = scheduler(&source, 2, 3, BlinkMode::Stars, &cancel).run().await;

    let expected: Vec<String> = std::iter::once(String::new())
        .chain([3, 2, 1, 3, 2, 1].map(countdown_text))
        .collect();
    assert_eq!(surface.history(Element::Countdown), expected);
    assert_eq!(source.calls.get(), 3);
    // two flashes of 6 x 100ms plus two countdowns of 3s
    assert_eq!(start.elapsed(), Duration::from_millis(7200));
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_countdown_stops_within_a_tick() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING)], &cancel);
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5500)).await;
        trigger.cancel();
    });
    let start = Instant::now();

    let surface = scheduler(&source, 2, 30, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(start.elapsed(), Duration::from_millis(5500));
    assert_eq!(
        surface.history(Element::Countdown).last().copied(),
        Some(countdown_text(26).as_str())
    );
    assert_eq!(source.calls.get(), 1);
    assert_eq!(surface.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_flash_skips_rendering() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING)], &cancel);
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let surface = scheduler(&source, 2, 30, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(surface.text(Element::LastUpdate), "LAST UPDATE: n/a");
    assert_eq!(cell_writes(&surface), 0);
    assert_eq!(surface.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_releases_once() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING)], &cancel);

    let surface = scheduler(&source, 2, 30, BlinkMode::Stars, &cancel).run().await;

    assert_eq!(source.calls.get(), 0);
    assert_eq!(surface.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn static_header_never_blinks() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING)], &cancel);
    let start = Instant::now();

    let surface = scheduler(&source, 2, 2, BlinkMode::Static, &cancel).run().await;

    let marker_writes = surface
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::SetVisible(Element::Marker(_), _)))
        .count();
    // only the initial bracketed state
    assert_eq!(marker_writes, 4);
    assert!(Marker::ALL
        .iter()
        .all(|&m| surface.is_visible(Element::Marker(m))));
    // no flash delay, just the 2s countdown
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn stars_alternate_across_cycles() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(MORNING), Step::Payload(MORNING)], &cancel);

    let surface = scheduler(&source, 2, 1, BlinkMode::Stars, &cancel).run().await;

    // with a one-second interval each countdown is a single tick, so the
    // second cycle shows the bottom pair
    assert!(!surface.is_visible(Element::Marker(Marker::TopLeft)));
    assert!(surface.is_visible(Element::Marker(Marker::BottomRight)));
}

#[tokio::test(start_paused = true)]
async fn run_once_renders_single_refresh_with_panel() {
    let cancel = CancellationToken::new();
    let source = ScriptedSource::new(vec![Step::Payload(WIENER_PLATZ)], &cancel);
    let panel = TextPanel::from_lines(&["Fahrplan".to_string()]).unwrap();

    let scheduler = scheduler(&source, 3, 30, BlinkMode::Stars, &cancel).with_panel(Box::new(panel));
    assert_eq!(scheduler.phase(), Phase::Fetching);
    let surface = scheduler.run_once().await;

    assert_eq!(source.calls.get(), 1);
    assert_eq!(surface.text(Element::Panel(0)), "Fahrplan");
    assert_eq!(surface.text(cell(0, Column::Line)), "1");
    assert_eq!(surface.history(Element::Countdown), vec![""]);
    // the snapshot shows the resting top pair, not the dark end of the flash
    assert!(surface.is_visible(Element::Marker(Marker::TopLeft)));
    assert!(surface.is_visible(Element::Marker(Marker::TopRight)));
    assert!(!surface.is_visible(Element::Marker(Marker::BottomLeft)));
    assert!(!surface.is_visible(Element::Marker(Marker::BottomRight)));
    assert_eq!(surface.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_pending_fetch_ends_run() {
    let cancel = CancellationToken::new();
    let source = PendingSource {
        calls: Cell::new(0),
    };
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });
    let start = Instant::now();

    let surface = CycleScheduler::new(
        &source,
        MemorySurface::new(),
        DisplayGrid::new(2, Duration::ZERO),
        BlinkAnimator::new(BlinkMode::Stars, Duration::from_millis(100)),
        30,
        cancel.clone(),
    )
    .run()
    .await;

    assert_eq!(start.elapsed(), Duration::from_millis(300));
    assert_eq!(source.calls.get(), 1);
    assert_eq!(cell_writes(&surface), 0);
    assert_eq!(surface.text(Element::LastUpdate), "LAST UPDATE: n/a");
    assert_eq!(surface.releases(), 1);
}

#[test]
fn fetch_failures_log_at_their_own_level() {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());

    tracing::subscriber::with_default(subscriber, || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let cancel = CancellationToken::new();
            let source = ScriptedSource::new(vec![Step::NetworkDown, Step::Garbage], &cancel);
            scheduler(&source, 2, 1, BlinkMode::Stars, &cancel).run().await;
        });
    });

    let network = "network error, keeping previous data".to_string();
    let payload = "unexpected feed payload, keeping previous data".to_string();
    let failures: Vec<(Level, String)> = events
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, _)| *level == Level::WARN || *level == Level::ERROR)
        .cloned()
        .collect();
    // the last entry is the exhausted script's final fetch
    assert_eq!(
        failures,
        vec![
            (Level::WARN, network.clone()),
            (Level::ERROR, payload),
            (Level::WARN, network),
        ]
    );
}
