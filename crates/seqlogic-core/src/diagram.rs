//! The diagram orchestrator.
//!
//! Owns the three versioned entity collections, the viewport, and the
//! derived simulation state. Edits are staged through the `add_*`,
//! `update_*` and `remove_*` methods and become durable on
//! [`Diagram::commit`], which also re-derives signal groups, dependencies
//! and scheduling through [`Diagram::parse`].

use crate::dependency::DependencyGraph;
use crate::grouping::SignalGroups;
use crate::history::{History, HistoryError};
use crate::model::{Node, Text, Viewport, Wire, WirePair};
use crate::scheduler::{Scheduler, Status};
use crate::services::{DiagramServices, TimeSource};
use crate::storage::{
    validate_node, validate_text, validate_viewport, DiagramStorage, ValidationError,
};
use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use std::collections::HashSet;

/// Ids created by [`Diagram::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedIds {
    /// New node ids
    pub nodes: IndexSet<String>,
    /// New wire ids
    pub wires: IndexSet<String>,
    /// New text ids
    pub texts: IndexSet<String>,
}

/// A logic diagram with edit history and a running simulation.
pub struct Diagram {
    nodes: History<Node>,
    wires: History<Wire>,
    texts: History<Text>,
    viewport: Viewport,
    modified: bool,
    wire_pairs: HashSet<WirePair>,
    groups: SignalGroups,
    dependencies: DependencyGraph,
    scheduler: Scheduler,
    services: DiagramServices,
}

impl Diagram {
    /// Load `storage` with default services.
    #[must_use]
    pub fn new(storage: DiagramStorage) -> Self {
        Self::with_services(storage, DiagramServices::default())
    }

    /// Load `storage`.
    ///
    /// An invalid document is replaced by a blank diagram and reported to
    /// the notifier.
    #[must_use]
    pub fn with_services(storage: DiagramStorage, services: DiagramServices) -> Self {
        let storage = match storage.validate_all() {
            Ok(()) => storage,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid diagram, loading blank");
                services.notifier.error(&format!("Invalid diagram: {e}"));
                DiagramStorage::blank()
            }
        };

        let elapsed = services.time.elapsed_ms();
        let statuses = initial_statuses(&storage.nodes, elapsed);
        let wire_pairs = storage.wire_pairs();

        let mut diagram = Self {
            nodes: History::new(storage.nodes),
            wires: History::new(storage.wires),
            texts: History::new(storage.texts),
            viewport: storage.viewport,
            modified: false,
            wire_pairs,
            groups: SignalGroups::default(),
            dependencies: DependencyGraph::default(),
            scheduler: Scheduler::new(statuses),
            services,
        };
        diagram.parse();
        diagram
    }

    /// Decode a JSON document and load it.
    ///
    /// Malformed or invalid documents load as a blank diagram and are
    /// reported to the notifier.
    #[must_use]
    pub fn from_json(json: &str, services: DiagramServices) -> Self {
        match DiagramStorage::from_json_str(json) {
            Ok(storage) => Self::with_services(storage, services),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable diagram, loading blank");
                services.notifier.error(&format!("Invalid diagram: {e}"));
                Self::with_services(DiagramStorage::blank(), services)
            }
        }
    }

    /// Nodes, read-only. Edit through the diagram's methods.
    #[must_use]
    pub fn nodes(&self) -> &History<Node> {
        &self.nodes
    }

    /// Wires, read-only. Edit through the diagram's methods.
    #[must_use]
    pub fn wires(&self) -> &History<Wire> {
        &self.wires
    }

    /// Texts, read-only. Edit through the diagram's methods.
    #[must_use]
    pub fn texts(&self) -> &History<Text> {
        &self.texts
    }

    /// Current view state.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replace the view state. Not recorded in history.
    ///
    /// # Errors
    ///
    /// Returns error if the zoom factor is not strictly positive.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), DiagramError> {
        validate_viewport(&viewport)?;
        self.viewport = viewport;
        Ok(())
    }

    /// Return to the default view.
    pub fn reset_viewport(&mut self) {
        self.viewport = Viewport::default();
    }

    /// Whether anything was committed, undone or redone since loading or
    /// the last [`Diagram::mark_saved`].
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clear the modified flag.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// Swap the time source used for clock-powered nodes.
    pub fn set_time_source(&mut self, time: impl TimeSource + 'static) {
        self.services.time = Box::new(time);
    }

    /// Re-derive groups, dependencies and statuses from committed structure.
    pub fn parse(&mut self) {
        let elapsed = self.services.time.elapsed_ms();
        self.wire_pairs = self.wires.values().map(Wire::pair).collect();

        for id in self.nodes.keys() {
            self.scheduler.ensure(id);
        }
        let nodes = &self.nodes;
        let removed = self.scheduler.retain(|id| nodes.has(id));
        for (id, node) in self.nodes.iter() {
            if let Some(status) = self.scheduler.status_mut(id) {
                status.powered = node.powered.evaluate(elapsed);
            }
        }

        self.groups = SignalGroups::new(self.nodes.keys());
        let mut dangling = 0usize;
        for wire in self.wires.values().filter(|w| !w.not) {
            let (Some(start), Some(end)) = (
                self.groups.index_of(&wire.start),
                self.groups.index_of(&wire.end),
            ) else {
                dangling += 1;
                continue;
            };
            let Some(merge) = self.groups.union(start, end) else {
                continue;
            };
            let absorbed_powered = self
                .scheduler
                .status(self.groups.id_at(merge.absorbed))
                .is_some_and(|s| s.powered);
            if absorbed_powered {
                if let Some(status) = self.scheduler.status_mut(self.groups.id_at(merge.survivor)) {
                    status.powered = true;
                }
            }
        }
        self.groups.flatten();
        self.dependencies = DependencyGraph::build(&self.groups, self.wires.values());
        if dangling > 0 {
            tracing::warn!(dangling, "Skipped wires with missing endpoints");
        }

        self.activate_all();
        tracing::debug!(
            nodes = self.nodes.len(),
            wires = self.wires.len(),
            groups = self.groups.roots().count(),
            dependencies = self.dependencies.edge_count(),
            removed,
            pending = self.scheduler.pending(),
            "Parsed diagram"
        );
    }

    /// Re-evaluate clock-powered nodes at the current time.
    pub fn fetch_clock(&mut self) {
        self.parse();
    }

    /// Rebuild every status from the power inputs and drop pending flips.
    pub fn reset_status(&mut self) {
        let elapsed = self.services.time.elapsed_ms();
        self.scheduler
            .reset(initial_statuses(&self.nodes.to_map(), elapsed));
        self.parse();
    }

    fn activate_all(&mut self) {
        for root in self.groups.roots() {
            self.scheduler
                .activate(root, &self.dependencies, &mut *self.services.rng);
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// Returns the number of groups that flipped.
    pub fn next_tick(&mut self) -> usize {
        self.scheduler
            .next_tick(&self.dependencies, &mut *self.services.rng)
    }

    /// The tick the next call to [`Diagram::next_tick`] processes.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.scheduler.current()
    }

    /// Number of scheduled flips not yet applied.
    #[must_use]
    pub fn pending_toggles(&self) -> usize {
        self.scheduler.pending()
    }

    /// Number of signal groups as of the last parse.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.roots().count()
    }

    /// Status of the group containing `node_id`, as of the last parse.
    #[must_use]
    pub fn node_status(&self, node_id: &str) -> Option<Status> {
        let root = self.groups.root(node_id)?;
        self.scheduler.status(root).copied()
    }

    /// Whether the group containing `node_id` is active.
    #[must_use]
    pub fn is_active(&self, node_id: &str) -> bool {
        self.node_status(node_id).is_some_and(|s| s.active)
    }

    /// Stage a new node and return its id.
    ///
    /// # Errors
    ///
    /// Returns error if the position is not finite or the clock is out of
    /// range.
    pub fn add_node(&mut self, node: Node) -> Result<String, DiagramError> {
        let id = self.services.ids.next_id();
        validate_node(&id, &node)?;
        self.nodes.set(&id, node);
        Ok(id)
    }

    /// Stage a new wire and return its id.
    ///
    /// Returns `Ok(None)` for a self loop or when the two nodes are already
    /// connected.
    ///
    /// # Errors
    ///
    /// Returns error if an endpoint does not exist.
    pub fn add_wire(&mut self, wire: Wire) -> Result<Option<String>, DiagramError> {
        if wire.is_self_loop() || self.wire_pairs.contains(&wire.pair()) {
            return Ok(None);
        }
        self.check_endpoints(&wire)?;
        let id = self.services.ids.next_id();
        self.wire_pairs.insert(wire.pair());
        self.wires.set(&id, wire);
        Ok(Some(id))
    }

    /// Stage a new text and return its id.
    ///
    /// # Errors
    ///
    /// Returns error if the position or scale is not finite.
    pub fn add_text(&mut self, text: Text) -> Result<String, DiagramError> {
        let id = self.services.ids.next_id();
        validate_text(&id, &text)?;
        self.texts.set(&id, text);
        Ok(id)
    }

    /// Stage a replacement for an existing node.
    ///
    /// # Errors
    ///
    /// Returns error if the node does not exist or the replacement is
    /// rejected as in [`Diagram::add_node`].
    pub fn update_node(&mut self, id: &str, node: Node) -> Result<(), DiagramError> {
        if !self.nodes.has(id) {
            return Err(DiagramError::NodeNotFound(id.to_string()));
        }
        validate_node(id, &node)?;
        self.nodes.set(id, node);
        Ok(())
    }

    /// Stage a replacement for an existing wire.
    ///
    /// Returns `Ok(false)` without staging anything if the new wire is a
    /// self loop or its node pair is taken by another wire.
    ///
    /// # Errors
    ///
    /// Returns error if the wire or one of the new endpoints does not exist.
    pub fn update_wire(&mut self, id: &str, wire: Wire) -> Result<bool, DiagramError> {
        let old_pair = self
            .wires
            .peek(id)
            .map(Wire::pair)
            .ok_or_else(|| DiagramError::WireNotFound(id.to_string()))?;
        let new_pair = wire.pair();
        if wire.is_self_loop() || (new_pair != old_pair && self.wire_pairs.contains(&new_pair)) {
            return Ok(false);
        }
        self.check_endpoints(&wire)?;
        self.wire_pairs.remove(&old_pair);
        self.wire_pairs.insert(new_pair);
        self.wires.set(id, wire);
        Ok(true)
    }

    /// Stage a replacement for an existing text.
    ///
    /// # Errors
    ///
    /// Returns error if the text does not exist or the replacement has
    /// non-finite geometry.
    pub fn update_text(&mut self, id: &str, text: Text) -> Result<(), DiagramError> {
        if !self.texts.has(id) {
            return Err(DiagramError::TextNotFound(id.to_string()));
        }
        validate_text(id, &text)?;
        self.texts.set(id, text);
        Ok(())
    }

    /// Stage a node removal.
    ///
    /// Wires attached to the node are left in place; follow up with
    /// [`Diagram::remove_invalid_wires`].
    ///
    /// # Errors
    ///
    /// Returns error if the node does not exist.
    pub fn remove_node(&mut self, id: &str) -> Result<(), DiagramError> {
        if !self.nodes.has(id) {
            return Err(DiagramError::NodeNotFound(id.to_string()));
        }
        self.nodes.delete(id);
        Ok(())
    }

    /// Stage a wire removal.
    ///
    /// # Errors
    ///
    /// Returns error if the wire does not exist.
    pub fn remove_wire(&mut self, id: &str) -> Result<(), DiagramError> {
        let pair = self
            .wires
            .peek(id)
            .map(Wire::pair)
            .ok_or_else(|| DiagramError::WireNotFound(id.to_string()))?;
        self.wire_pairs.remove(&pair);
        self.wires.delete(id);
        Ok(())
    }

    /// Stage a text removal.
    ///
    /// # Errors
    ///
    /// Returns error if the text does not exist.
    pub fn remove_text(&mut self, id: &str) -> Result<(), DiagramError> {
        if !self.texts.has(id) {
            return Err(DiagramError::TextNotFound(id.to_string()));
        }
        self.texts.delete(id);
        Ok(())
    }

    /// Stage removal of every wire with a missing endpoint.
    ///
    /// Returns the number of wires removed.
    pub fn remove_invalid_wires(&mut self) -> usize {
        let invalid: Vec<String> = self
            .wires
            .iter()
            .filter(|(_, w)| !self.nodes.has(&w.start) || !self.nodes.has(&w.end))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &invalid {
            if let Some(wire) = self.wires.peek(id) {
                self.wire_pairs.remove(&wire.pair());
            }
            self.wires.delete(id);
        }
        invalid.len()
    }

    /// Check if any collection has staged edits.
    #[must_use]
    pub fn has_uncommitted(&self) -> bool {
        self.nodes.has_uncommitted() || self.wires.has_uncommitted() || self.texts.has_uncommitted()
    }

    /// Seal the staged edits of all three collections into one undoable step
    /// and re-parse.
    ///
    /// Returns `false`, and notifies, if nothing was staged.
    pub fn commit(&mut self) -> bool {
        if !self.has_uncommitted() {
            self.services.notifier.error("No changes to commit");
            return false;
        }
        self.modified = true;
        self.nodes.commit();
        self.wires.commit();
        self.texts.commit();
        tracing::debug!(head = self.nodes.head(), "Committed diagram edit");
        self.parse();
        true
    }

    /// Discard staged edits in all three collections.
    ///
    /// The derived simulation state is not re-parsed.
    pub fn clear_uncommitted(&mut self) {
        self.nodes.clear_uncommitted();
        self.wires.clear_uncommitted();
        self.texts.clear_uncommitted();
        self.wire_pairs = self.wires.values().map(Wire::pair).collect();
    }

    /// Check if a committed step can be undone.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.nodes.can_undo() && self.wires.can_undo() && self.texts.can_undo()
    }

    /// Check if an undone step can be redone.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.nodes.can_redo() && self.wires.can_redo() && self.texts.can_redo()
    }

    /// Revert the last committed step in all three collections.
    ///
    /// Returns `Ok(false)`, and notifies, if there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns error if there are staged edits.
    pub fn undo(&mut self) -> Result<bool, DiagramError> {
        self.ensure_clean("undo")?;
        if !self.can_undo() {
            self.services.notifier.error("Cannot undo anymore");
            return Ok(false);
        }
        self.nodes.undo()?;
        self.wires.undo()?;
        self.texts.undo()?;
        self.modified = true;
        tracing::debug!(head = self.nodes.head(), "Undid diagram edit");
        self.parse();
        Ok(true)
    }

    /// Re-apply the last undone step in all three collections.
    ///
    /// Returns `Ok(false)`, and notifies, if there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns error if there are staged edits.
    pub fn redo(&mut self) -> Result<bool, DiagramError> {
        self.ensure_clean("redo")?;
        if !self.can_redo() {
            self.services.notifier.error("Cannot redo anymore");
            return Ok(false);
        }
        self.nodes.redo()?;
        self.wires.redo()?;
        self.texts.redo()?;
        self.modified = true;
        tracing::debug!(head = self.nodes.head(), "Redid diagram edit");
        self.parse();
        Ok(true)
    }

    /// Copy the given nodes and texts, plus every wire whose both ends are
    /// among the nodes.
    #[must_use]
    pub fn extract(&self, node_ids: &HashSet<String>, text_ids: &HashSet<String>) -> DiagramStorage {
        DiagramStorage {
            nodes: self
                .nodes
                .iter()
                .filter(|(id, _)| node_ids.contains(*id))
                .map(|(id, node)| (id.clone(), *node))
                .collect(),
            wires: self
                .wires
                .iter()
                .filter(|(_, w)| node_ids.contains(&w.start) && node_ids.contains(&w.end))
                .map(|(id, wire)| (id.clone(), wire.clone()))
                .collect(),
            texts: self
                .texts
                .iter()
                .filter(|(id, _)| text_ids.contains(*id))
                .map(|(id, text)| (id.clone(), text.clone()))
                .collect(),
            viewport: self.viewport,
        }
    }

    /// Paste `clipboard` into this diagram under fresh ids and commit.
    ///
    /// Incoming geometry is moved next to the current view with a small
    /// random offset. Returns `None`, and notifies, if the incoming document
    /// is invalid or empty.
    pub fn merge(&mut self, clipboard: &DiagramStorage) -> Option<MergedIds> {
        let incoming = match clipboard
            .remap_ids(&mut *self.services.ids)
            .and_then(|s| s.validate_all().map(|()| s))
        {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected merge");
                let label = match e {
                    ValidationError::SelfLoop { .. }
                    | ValidationError::DanglingWire { .. }
                    | ValidationError::DuplicateWire { .. } => "Invalid wires",
                    _ => "Invalid diagram",
                };
                self.services.notifier.error(&format!("{label}: {e}"));
                return None;
            }
        };

        let dx = self.viewport.x - incoming.viewport.x - self.paste_spread();
        let dy = self.viewport.y - incoming.viewport.y - self.paste_spread();

        let mut merged = MergedIds::default();
        for (id, mut node) in incoming.nodes {
            node.x -= dx;
            node.y -= dy;
            self.nodes.set(&id, node);
            merged.nodes.insert(id);
        }
        for (id, wire) in incoming.wires {
            self.wire_pairs.insert(wire.pair());
            self.wires.set(&id, wire);
            merged.wires.insert(id);
        }
        for (id, mut text) in incoming.texts {
            text.x -= dx;
            text.y -= dy;
            self.texts.set(&id, text);
            merged.texts.insert(id);
        }

        tracing::debug!(
            nodes = merged.nodes.len(),
            wires = merged.wires.len(),
            texts = merged.texts.len(),
            "Merged diagram"
        );
        self.commit().then_some(merged)
    }

    fn paste_spread(&mut self) -> f64 {
        self.services.rng.gen::<f64>() * 10.0 + 10.0
    }

    /// Snapshot of the live entities and viewport.
    #[must_use]
    pub fn to_storage(&self) -> DiagramStorage {
        DiagramStorage {
            nodes: self.nodes.to_map(),
            wires: self.wires.to_map(),
            texts: self.texts.to_map(),
            viewport: self.viewport,
        }
    }

    fn check_endpoints(&self, wire: &Wire) -> Result<(), DiagramError> {
        for endpoint in [&wire.start, &wire.end] {
            if !self.nodes.has(endpoint) {
                return Err(DiagramError::MissingEndpoint(endpoint.clone()));
            }
        }
        Ok(())
    }

    fn ensure_clean(&self, action: &'static str) -> Result<(), HistoryError> {
        if self.has_uncommitted() {
            return Err(HistoryError::Uncommitted { action });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Diagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagram")
            .field("nodes", &self.nodes.len())
            .field("wires", &self.wires.len())
            .field("texts", &self.texts.len())
            .field("viewport", &self.viewport)
            .field("modified", &self.modified)
            .field("tick", &self.scheduler.current())
            .finish_non_exhaustive()
    }
}

fn initial_statuses(nodes: &IndexMap<String, Node>, elapsed_ms: f64) -> IndexMap<String, Status> {
    nodes
        .iter()
        .map(|(id, node)| (id.clone(), Status::settled(node.powered.evaluate(elapsed_ms))))
        .collect()
}

/// Errors from misuse of the diagram API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagramError {
    /// No node with this id
    #[error("node not found: {0}")]
    NodeNotFound(String),
    /// No wire with this id
    #[error("wire not found: {0}")]
    WireNotFound(String),
    /// No text with this id
    #[error("text not found: {0}")]
    TextNotFound(String),
    /// A wire endpoint does not exist
    #[error("wire endpoint not found: {0}")]
    MissingEndpoint(String),
    /// Undo or redo while editing
    #[error(transparent)]
    History(#[from] HistoryError),
    /// An edit would produce a document that does not load
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
