//! # Departure Board Core Library
//!
//! This library holds everything the departure board needs apart from process
//! bootstrap: the feed model and client, row formatting, the bounded row grid,
//! the marker animation and the refresh/countdown scheduler that ties them
//! together.
//!
//! ## Design Philosophy
//!
//! ### One control flow
//! All phases of a cycle run sequentially inside a single future. The only
//! suspension points are the flash half-cycle wait, the row pacing pause and
//! the one-second countdown tick. Each of them races a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and the
//! scheduler re-checks the token right after every wait.
//!
//! ### Host independence
//! The core never talks to a terminal directly. It writes through the
//! [`surface::Surface`] trait ("set text of element E", "show/hide element E"),
//! so the same scheduler drives the crossterm host in production and a
//! [`surface::MemorySurface`] in tests.
//!
//! ### Stale is better than blank
//! A failed fetch leaves both the "LAST UPDATE" header and the grid showing the
//! last successful data.
//!
//! ## Data Flow
//! 1. **Fetch**: [`feed::FeedClient`] downloads and decodes one [`Feed`]
//! 2. **Format**: [`formatter::format_event`] turns each event into a row
//! 3. **Bind**: [`grid::DisplayGrid`] writes rows into its fixed slots
//! 4. **Wait**: [`scheduler::CycleScheduler`] counts down to the next cycle
//!
//! ## Core Types
//! - [`Feed`]: one decoded payload
//! - [`DepartureEvent`]: a single departure as reported by the feed

use serde::{Deserialize, Deserializer};
use serde_json::Value;

// Module declarations
pub mod blink;
pub mod config;
pub mod feed;
pub mod formatter;
pub mod grid;
pub mod layout;
pub mod panel;
pub mod renderer;
pub mod scheduler;
pub mod surface;
pub mod terminal;

#[cfg(test)]
mod tests;

/// One decoded feed payload.
///
/// `updated` is the feed's own timestamp string and is shown verbatim in the
/// header. Events keep the feed's order.
///
/// # Example
/// ```
/// use departure_board_lib::Feed;
///
/// let feed: Feed = serde_json::from_str(r#"{"updated":"12:00","events":[]}"#).unwrap();
/// assert_eq!(feed.updated, "12:00");
/// assert!(feed.events.is_empty());
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Feed {
    /// Feed timestamp, empty when the payload has none
    #[serde(default, deserialize_with = "lenient_string_or_empty")]
    pub updated: String,
    /// Departures in feed order
    #[serde(default, deserialize_with = "lenient_events")]
    pub events: Vec<DepartureEvent>,
}

/// A single departure as reported by the feed.
///
/// Every nested object and field is optional. Absent or `null` values decode
/// to `None`/`false` instead of failing the whole payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DepartureEvent {
    pub stop_point: Option<StopPoint>,
    pub departure: Option<Departure>,
    pub line: Option<Line>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StopPoint {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Departure {
    /// Real-time estimate, preferred over the timetable value
    #[serde(deserialize_with = "lenient_string")]
    pub estimate: Option<String>,
    /// Scheduled time
    #[serde(deserialize_with = "lenient_string")]
    pub timetable: Option<String>,
    /// Interpreted by truthiness: `"yes"`, `1` and `true` all count as delayed
    #[serde(deserialize_with = "truthy")]
    pub delayed: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Line {
    /// Line number; numeric values are stringified
    #[serde(deserialize_with = "lenient_string")]
    pub number: Option<String>,
    /// Free-text product category such as "Bus" or "LightRail"
    #[serde(deserialize_with = "lenient_string")]
    pub product: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub direction: Option<String>,
}

impl DepartureEvent {
    pub fn stop_name(&self) -> Option<&str> {
        self.stop_point.as_ref()?.name.as_deref()
    }

    pub fn line_number(&self) -> Option<&str> {
        self.line.as_ref()?.number.as_deref()
    }

    pub fn product(&self) -> Option<&str> {
        self.line.as_ref()?.product.as_deref()
    }

    pub fn direction(&self) -> Option<&str> {
        self.line.as_ref()?.direction.as_deref()
    }

    pub fn estimate(&self) -> Option<&str> {
        self.departure.as_ref()?.estimate.as_deref()
    }

    pub fn timetable(&self) -> Option<&str> {
        self.departure.as_ref()?.timetable.as_deref()
    }

    pub fn is_delayed(&self) -> bool {
        self.departure.as_ref().is_some_and(|d| d.delayed)
    }
}

// -- Lenient field decoding --

/// Scalars become strings; `null`, arrays and objects become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

fn lenient_string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_events<'de, D>(deserializer: D) -> Result<Vec<DepartureEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DepartureEvent>>::deserialize(deserializer)?.unwrap_or_default())
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}
