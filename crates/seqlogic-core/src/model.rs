//! Diagram entities: nodes, wires, texts and the viewport.
//!
//! Nodes carry a [`Powered`] source that is either a fixed bit or a clock.
//! Wires connect two nodes either directly (`not = false`, the two nodes
//! share one signal) or through an inverter (`not = true`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest half-period accepted for an oscillating clock, in milliseconds.
pub const MAX_CLOCK_DURATION: f64 = 10_000.0;

/// Magnitude editors store, negated, as the duration of a power-on source.
///
/// Any negative duration is treated as power-on by [`Powered::evaluate`].
pub const POWER_ON_DURATION: f64 = 1e12;

/// A 2D position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinate {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Power source of a node.
///
/// Serialized untagged, so a document stores either a plain boolean or an
/// `{ "offset": .., "duration": .. }` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Powered {
    /// A constant bit
    Fixed(bool),
    /// A square wave with half-period `duration`, shifted by `offset`
    Oscillating {
        /// Phase offset in milliseconds
        offset: f64,
        /// Half-period in milliseconds; negative means permanently on
        duration: f64,
    },
}

impl Default for Powered {
    fn default() -> Self {
        Self::Fixed(false)
    }
}

impl Powered {
    /// A source that is permanently on.
    #[must_use]
    pub fn power_on() -> Self {
        Powered::Oscillating {
            offset: 0.0,
            duration: -POWER_ON_DURATION,
        }
    }

    /// Evaluate the source at `elapsed_ms` milliseconds since the time origin.
    #[must_use]
    pub fn evaluate(&self, elapsed_ms: f64) -> bool {
        match *self {
            Powered::Fixed(value) => value,
            Powered::Oscillating { duration, .. } if duration < 0.0 => true,
            Powered::Oscillating { offset, duration } => {
                let period = ((elapsed_ms - offset) / duration).floor();
                // zero duration gives a non-finite period, which is off
                period.is_finite() && period.rem_euclid(2.0) == 0.0
            }
        }
    }

    /// Classify the source.
    #[must_use]
    pub fn kind(&self) -> PoweredKind {
        match *self {
            Powered::Fixed(_) => PoweredKind::General,
            Powered::Oscillating { duration, .. } if duration < 0.0 => PoweredKind::PowerOn,
            Powered::Oscillating { .. } => PoweredKind::Clock,
        }
    }

    /// Whether the source is a valid clock or a fixed bit.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Powered::Fixed(_) => true,
            Powered::Oscillating { offset, duration } => {
                offset.is_finite() && duration.is_finite() && duration <= MAX_CLOCK_DURATION
            }
        }
    }
}

/// The three kinds of power source an editor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoweredKind {
    /// A fixed on/off bit
    General,
    /// An oscillating clock
    Clock,
    /// Permanently on
    PowerOn,
}

impl PoweredKind {
    /// All kinds, in display order.
    pub const ALL: [PoweredKind; 3] = [
        PoweredKind::General,
        PoweredKind::Clock,
        PoweredKind::PowerOn,
    ];

    /// Stable name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PoweredKind::General => "general",
            PoweredKind::Clock => "clock",
            PoweredKind::PowerOn => "power-on",
        }
    }
}

impl std::fmt::Display for PoweredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoweredKind {
    type Err = UnknownPoweredKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownPoweredKind(s.to_string()))
    }
}

/// Returned when parsing an unknown [`PoweredKind`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown powered kind: {0}")]
pub struct UnknownPoweredKind(pub String);

/// A logic signal point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Power source
    pub powered: Powered,
}

impl Node {
    /// Create a node at `position`.
    #[must_use]
    pub fn new(position: Coordinate, powered: Powered) -> Self {
        Self {
            x: position.x,
            y: position.y,
            powered,
        }
    }

    /// Position of the node.
    #[must_use]
    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }
}

/// A connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    /// Source node id
    pub start: String,
    /// Target node id
    pub end: String,
    /// Inverting connection
    pub not: bool,
}

impl Wire {
    /// A direct connection that merges both ends into one signal.
    #[must_use]
    pub fn short(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            not: false,
        }
    }

    /// An inverting connection from `start` to `end`.
    #[must_use]
    pub fn inverter(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            not: true,
        }
    }

    /// The unordered endpoint pair, used to detect duplicate wires.
    #[must_use]
    pub fn pair(&self) -> WirePair {
        WirePair::new(&self.start, &self.end)
    }

    /// Whether both ends are the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.start == self.end
    }
}

/// Unordered pair of node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WirePair(String, String);

impl WirePair {
    /// Normalize `a` and `b` into one pair regardless of order.
    #[must_use]
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

/// A free-standing annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Annotation content
    pub text: String,
    /// Font scale
    pub scale: f64,
}

impl Text {
    /// Create an annotation at `position`.
    #[must_use]
    pub fn new(position: Coordinate, text: impl Into<String>, scale: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            text: text.into(),
            scale,
        }
    }
}

/// View state of an editor. Not versioned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan
    pub x: f64,
    /// Vertical pan
    pub y: f64,
    /// Zoom factor, strictly positive
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}
