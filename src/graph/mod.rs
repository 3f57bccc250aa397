//! Family graph: adjacency structure derived from the entity store, plus the
//! path-search algorithms that run over it.
//!
//! Every relation is inserted as a neighbor link from both endpoints. The
//! relation type rides along as metadata for rendering; it never restricts
//! traversal direction.

mod builder;
mod describe;
pub mod traversal;

pub use builder::build_family_graph;
pub use describe::{describe_path, PathStep};
pub use traversal::{breadth_first_search, depth_first_search, dijkstra, dijkstra_with};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::family::{Person, PersonId, Relation, RelationType};

/// How a neighbor relates to the node whose list it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRole {
    /// The neighbor is a parent of this node.
    Parent,
    /// The neighbor is a child of this node.
    Child,
    Spouse,
}

/// A single adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Neighbor {
    pub id: PersonId,
    pub relation_type: RelationType,
    pub role: EdgeRole,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub person: Person,
    /// Neighbors in relation insertion order.
    pub neighbors: Vec<Neighbor>,
}

/// Immutable adjacency snapshot. Built by [`build_family_graph`] only.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    nodes: BTreeMap<PersonId, GraphNode>,
    skipped: Vec<Relation>,
}

impl FamilyGraph {
    pub fn contains(&self, id: PersonId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: PersonId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    /// Neighbors of `id`; empty for unknown ids.
    pub fn neighbors(&self, id: PersonId) -> &[Neighbor] {
        self.nodes
            .get(&id)
            .map(|n| n.neighbors.as_slice())
            .unwrap_or(&[])
    }

    /// Person ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of neighbor links (each relation contributes two).
    pub fn link_count(&self) -> usize {
        self.nodes.values().map(|n| n.neighbors.len()).sum()
    }

    /// Relations dropped during the build because an endpoint was missing.
    pub fn skipped_relations(&self) -> &[Relation] {
        &self.skipped
    }
}
