//! # seqlogic Core
//!
//! Diagram model, edit history, and tick-driven simulation for seqlogic.
//!
//! This crate provides:
//! - Entity model for nodes, wires, texts and the viewport
//! - Versioned collections with staged edits and undo/redo
//! - Signal grouping over direct wires and dependencies over inverters
//! - A tick scheduler that propagates output flips with random jitter

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dependency;
pub mod diagram;
pub mod grouping;
pub mod history;
pub mod model;
pub mod scheduler;
pub mod services;
pub mod storage;

pub use diagram::{Diagram, DiagramError, MergedIds};
pub use history::{History, HistoryError};
pub use model::{
    Coordinate, Node, Powered, PoweredKind, Text, Viewport, Wire, WirePair, MAX_CLOCK_DURATION,
};
pub use scheduler::Status;
pub use services::{
    CollectingNotifier, DiagramServices, FixedTime, IdGenerator, Notifier, SequentialIds,
    SystemTimeSource, TimeSource, TracingNotifier, UuidIds,
};
pub use storage::{DiagramStorage, ValidationError};
