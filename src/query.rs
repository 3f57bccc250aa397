//! Query façade: the single entry point collaborators use for mutations and
//! kinship queries.
//!
//! The service owns the entity store behind a lock. Queries take the lock
//! only long enough to fetch (or build) the graph for the current revision,
//! then search on that `Arc` snapshot with no lock held, so a mutation never
//! disturbs a search already in flight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::GraphCache;
use crate::family::{
    FamilySnapshot, FamilyStore, NewPerson, Person, PersonId, PersonUpdate, Relation,
    RelationType,
};
use crate::graph::{
    breadth_first_search, build_family_graph, depth_first_search, describe_path, dijkstra,
    FamilyGraph, PathStep,
};
use crate::{KinshipError, Result};

/// Default number of graph revisions kept in the cache.
pub const DEFAULT_GRAPH_CACHE: usize = 4;

/// Path-search algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Dfs,
    #[default]
    Bfs,
    Dijkstra,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Dfs, Algorithm::Bfs, Algorithm::Dijkstra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Dfs => "dfs",
            Algorithm::Bfs => "bfs",
            Algorithm::Dijkstra => "dijkstra",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = KinshipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dfs" => Ok(Algorithm::Dfs),
            "bfs" => Ok(Algorithm::Bfs),
            "dijkstra" => Ok(Algorithm::Dijkstra),
            _ => Err(KinshipError::InvalidAlgorithm(s.to_string())),
        }
    }
}

/// Outcome of a path query. "No path" is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResult {
    Found(Vec<PersonId>),
    NotFound,
}

impl PathResult {
    fn from_path(path: Vec<PersonId>) -> Self {
        if path.is_empty() {
            PathResult::NotFound
        } else {
            PathResult::Found(path)
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }

    /// The ids from start to goal; empty when not found.
    pub fn path(&self) -> &[PersonId] {
        match self {
            PathResult::Found(path) => path,
            PathResult::NotFound => &[],
        }
    }

    pub fn into_path(self) -> Vec<PersonId> {
        match self {
            PathResult::Found(path) => path,
            PathResult::NotFound => Vec::new(),
        }
    }
}

/// Run `algorithm` over an explicit graph snapshot.
pub fn find_path(
    graph: &FamilyGraph,
    start: PersonId,
    goal: PersonId,
    algorithm: Algorithm,
) -> PathResult {
    if !graph.contains(start) || !graph.contains(goal) {
        log::warn!(
            "Path query {} -> {} references a person absent from the graph",
            start,
            goal
        );
        return PathResult::NotFound;
    }

    let path = match algorithm {
        Algorithm::Dfs => depth_first_search(graph, start, goal),
        Algorithm::Bfs => breadth_first_search(graph, start, goal),
        Algorithm::Dijkstra => dijkstra(graph, start, goal),
    };
    log::debug!("{} {} -> {}: {:?}", algorithm, start, goal, path);
    PathResult::from_path(path)
}

/// A path together with its labelled steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub algorithm: Algorithm,
    pub found: bool,
    pub path: Vec<PersonId>,
    pub steps: Vec<PathStep>,
}

/// Immediate family of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relatives {
    pub person: Person,
    pub parents: Vec<Person>,
    pub children: Vec<Person>,
    pub spouses: Vec<Person>,
    pub siblings: Vec<Person>,
}

/// Entity store + graph cache behind one façade.
pub struct KinshipService {
    store: RwLock<FamilyStore>,
    graphs: GraphCache,
}

impl Default for KinshipService {
    fn default() -> Self {
        Self::new(FamilyStore::new())
    }
}

impl KinshipService {
    pub fn new(store: FamilyStore) -> Self {
        Self::with_cache_capacity(store, DEFAULT_GRAPH_CACHE)
    }

    pub fn with_cache_capacity(store: FamilyStore, capacity: usize) -> Self {
        Self {
            store: RwLock::new(store),
            graphs: GraphCache::new(capacity),
        }
    }

    pub fn from_snapshot(snapshot: FamilySnapshot) -> Result<Self> {
        Ok(Self::new(FamilyStore::from_snapshot(snapshot)?))
    }

    fn read(&self) -> RwLockReadGuard<'_, FamilyStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FamilyStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn revision(&self) -> u64 {
        self.read().revision()
    }

    pub fn snapshot(&self) -> FamilySnapshot {
        self.read().snapshot()
    }

    /// Graph for the current store revision, built from a consistent read.
    pub fn graph(&self) -> Arc<FamilyGraph> {
        let store = self.read();
        self.graphs.get_or_build(store.revision(), || {
            build_family_graph(store.people(), store.relations())
        })
    }

    pub fn person(&self, id: PersonId) -> Result<Person> {
        self.read()
            .person(id)
            .cloned()
            .ok_or_else(|| KinshipError::NotFound(format!("person {}", id)))
    }

    pub fn people(&self) -> Vec<Person> {
        self.read().people().cloned().collect()
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.read().relations().to_vec()
    }

    pub fn add_person(&self, data: NewPerson) -> Result<Person> {
        self.write().add_person(data)
    }

    pub fn update_person(&self, id: PersonId, update: PersonUpdate) -> Result<Person> {
        self.write().update_person(id, update)
    }

    pub fn remove_person(&self, id: PersonId) -> Result<Person> {
        self.write().remove_person(id)
    }

    pub fn add_relation(
        &self,
        from: PersonId,
        to: PersonId,
        relation_type: RelationType,
    ) -> Result<Relation> {
        self.write().add_relation(from, to, relation_type)
    }

    pub fn remove_relation(
        &self,
        from: PersonId,
        to: PersonId,
        relation_type: RelationType,
    ) -> Result<()> {
        self.write().remove_relation(from, to, relation_type)
    }

    pub fn add_spouse(&self, data: NewPerson, spouse_of: PersonId) -> Result<(Person, Relation)> {
        self.write().add_spouse(data, spouse_of)
    }

    pub fn add_child(
        &self,
        data: NewPerson,
        parent_ids: &[PersonId],
    ) -> Result<(Person, Vec<Relation>)> {
        self.write().add_child(data, parent_ids)
    }

    /// Find a kinship path. Absent ids give [`PathResult::NotFound`].
    pub fn find_path(&self, start: PersonId, goal: PersonId, algorithm: Algorithm) -> PathResult {
        let graph = self.graph();
        find_path(&graph, start, goal, algorithm)
    }

    /// Like [`find_path`](Self::find_path) with a textual algorithm selector.
    pub fn find_path_by_name(
        &self,
        start: PersonId,
        goal: PersonId,
        algorithm: &str,
    ) -> Result<PathResult> {
        let algorithm: Algorithm = algorithm.parse()?;
        Ok(self.find_path(start, goal, algorithm))
    }

    /// Find a path and label each hop. Unlike `find_path`, unknown ids are
    /// an error here since there is nobody to describe.
    pub fn explain_path(
        &self,
        start: PersonId,
        goal: PersonId,
        algorithm: Algorithm,
    ) -> Result<Explanation> {
        let graph = self.graph();
        for id in [start, goal] {
            if !graph.contains(id) {
                return Err(KinshipError::UnknownPerson(id));
            }
        }

        let path = find_path(&graph, start, goal, algorithm).into_path();
        let steps = describe_path(&graph, &path)?;
        Ok(Explanation {
            algorithm,
            found: !path.is_empty(),
            path,
            steps,
        })
    }

    pub fn relatives(&self, id: PersonId) -> Result<Relatives> {
        let store = self.read();
        let person = store
            .person(id)
            .cloned()
            .ok_or(KinshipError::UnknownPerson(id))?;
        let owned = |people: Vec<&Person>| people.into_iter().cloned().collect::<Vec<_>>();

        Ok(Relatives {
            person,
            parents: owned(store.parents_of(id)?),
            children: owned(store.children_of(id)?),
            spouses: owned(store.spouses_of(id)?),
            siblings: owned(store.siblings_of(id)?),
        })
    }

    pub fn is_married(&self, a: PersonId, b: PersonId) -> bool {
        self.read().is_married(a, b)
    }

    pub fn search_people(&self, query: &str) -> Vec<Person> {
        self.read().search_people(query).into_iter().cloned().collect()
    }
}
