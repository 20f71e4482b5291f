//! Persisted diagram snapshot and its validation rules.

use crate::model::{Node, Text, Viewport, Wire, WirePair, MAX_CLOCK_DURATION};
use crate::services::IdGenerator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A complete, self-contained diagram document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiagramStorage {
    /// Nodes by id
    pub nodes: IndexMap<String, Node>,
    /// Wires by id
    pub wires: IndexMap<String, Wire>,
    /// Annotations by id
    pub texts: IndexMap<String, Text>,
    /// View state
    pub viewport: Viewport,
}

impl DiagramStorage {
    /// An empty diagram at the default viewport.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Decode and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a well-formed diagram.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let storage: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        storage.validate()?;
        Ok(storage)
    }

    /// Decode and validate an already parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the value is not a well-formed diagram.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        let storage: Self = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        storage.validate()?;
        Ok(storage)
    }

    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check field-level constraints that the type system does not carry.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_viewport(&self.viewport)?;
        for (id, node) in &self.nodes {
            validate_node(id, node)?;
        }
        for (id, text) in &self.texts {
            validate_text(id, text)?;
        }
        Ok(())
    }

    /// Check wire integrity: no self loops, existing endpoints, and at most
    /// one wire per unordered node pair.
    ///
    /// # Errors
    ///
    /// Returns the first offending wire.
    pub fn validate_wires(&self) -> Result<(), ValidationError> {
        let mut pairs = HashSet::with_capacity(self.wires.len());
        for (id, wire) in &self.wires {
            if wire.is_self_loop() {
                return Err(ValidationError::SelfLoop { wire: id.clone() });
            }
            for endpoint in [&wire.start, &wire.end] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(ValidationError::DanglingWire {
                        wire: id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            if !pairs.insert(wire.pair()) {
                return Err(ValidationError::DuplicateWire { wire: id.clone() });
            }
        }
        Ok(())
    }

    /// Run [`DiagramStorage::validate`] and [`DiagramStorage::validate_wires`].
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate_all(&self) -> Result<(), ValidationError> {
        self.validate()?;
        self.validate_wires()
    }

    /// Give every entity a fresh id, rewriting wire endpoints to match.
    ///
    /// # Errors
    ///
    /// Returns error if a wire references a node that is not in the document.
    pub fn remap_ids(&self, ids: &mut dyn IdGenerator) -> Result<Self, ValidationError> {
        let mapping: IndexMap<&str, String> = self
            .nodes
            .keys()
            .map(|id| (id.as_str(), ids.next_id()))
            .collect();
        let lookup = |wire_id: &str, node: &str| {
            mapping
                .get(node)
                .cloned()
                .ok_or_else(|| ValidationError::DanglingWire {
                    wire: wire_id.to_string(),
                    node: node.to_string(),
                })
        };

        let nodes = self
            .nodes
            .iter()
            .map(|(id, node)| (mapping[id.as_str()].clone(), *node))
            .collect();
        let wires = self
            .wires
            .iter()
            .map(|(id, wire)| {
                Ok((
                    ids.next_id(),
                    Wire {
                        start: lookup(id, &wire.start)?,
                        end: lookup(id, &wire.end)?,
                        not: wire.not,
                    },
                ))
            })
            .collect::<Result<_, ValidationError>>()?;
        let texts = self
            .texts
            .values()
            .map(|text| (ids.next_id(), text.clone()))
            .collect();

        Ok(Self {
            nodes,
            wires,
            texts,
            viewport: self.viewport,
        })
    }

    /// Unordered endpoint pairs of every wire.
    #[must_use]
    pub fn wire_pairs(&self) -> HashSet<WirePair> {
        self.wires.values().map(Wire::pair).collect()
    }
}

pub(crate) fn validate_viewport(viewport: &Viewport) -> Result<(), ValidationError> {
    if viewport.scale > 0.0 && viewport.scale.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::ViewportScale(viewport.scale))
    }
}

pub(crate) fn validate_node(id: &str, node: &Node) -> Result<(), ValidationError> {
    if !(node.x.is_finite() && node.y.is_finite()) {
        return Err(ValidationError::Coordinate { id: id.to_string() });
    }
    if !node.powered.is_valid() {
        return Err(ValidationError::Clock {
            node: id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_text(id: &str, text: &Text) -> Result<(), ValidationError> {
    if text.x.is_finite() && text.y.is_finite() && text.scale.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::Coordinate { id: id.to_string() })
    }
}

/// Reasons a diagram document is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The document does not have the diagram shape
    #[error("malformed diagram: {0}")]
    Malformed(String),
    /// Viewport zoom must be strictly positive
    #[error("invalid viewport scale: {0}")]
    ViewportScale(f64),
    /// A position or scale is not a finite number
    #[error("non-finite geometry on {id}")]
    Coordinate {
        /// Offending entity id
        id: String,
    },
    /// A clock is out of range
    #[error("invalid clock on node {node} (duration must be at most {max})", max = MAX_CLOCK_DURATION)]
    Clock {
        /// Offending node id
        node: String,
    },
    /// A wire connects a node to itself
    #[error("wire {wire} connects a node to itself")]
    SelfLoop {
        /// Offending wire id
        wire: String,
    },
    /// A wire references a missing node
    #[error("wire {wire} references missing node {node}")]
    DanglingWire {
        /// Offending wire id
        wire: String,
        /// Missing node id
        node: String,
    },
    /// Two wires connect the same pair of nodes
    #[error("wire {wire} duplicates an existing connection")]
    DuplicateWire {
        /// Offending wire id
        wire: String,
    },
}
