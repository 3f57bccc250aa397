//! Path search over a [`FamilyGraph`]: DFS, BFS and Dijkstra.
//!
//! All three return the ids from `start` to `goal` inclusive, or an empty
//! vector when no path exists or either endpoint is absent. None of them
//! mutate the graph or keep state between calls.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use super::{FamilyGraph, Neighbor};
use crate::family::PersonId;

/// Depth-first search. Returns the first path found, not necessarily the
/// shortest. Neighbors are explored in insertion order.
pub fn depth_first_search(graph: &FamilyGraph, start: PersonId, goal: PersonId) -> Vec<PersonId> {
    if !graph.contains(start) || !graph.contains(goal) {
        return Vec::new();
    }

    let mut visited = HashSet::from([start]);
    // (node, index of the next neighbor to try); the ids on this stack are the path.
    let mut stack: Vec<(PersonId, usize)> = vec![(start, 0)];

    while let Some(&mut (current, ref mut next)) = stack.last_mut() {
        if current == goal {
            let path: Vec<PersonId> = stack.iter().map(|&(id, _)| id).collect();
            log::debug!("[DFS] path found: {:?}", path);
            return path;
        }

        let neighbors = graph.neighbors(current);
        let mut advanced = None;
        while *next < neighbors.len() {
            let candidate = neighbors[*next].id;
            *next += 1;
            if visited.insert(candidate) {
                advanced = Some(candidate);
                break;
            }
        }

        match advanced {
            Some(id) => stack.push((id, 0)),
            None => {
                stack.pop();
            }
        }
    }

    log::debug!("[DFS] no path from {} to {}", start, goal);
    Vec::new()
}

/// Breadth-first search. Ids are marked visited when enqueued, and the first
/// path reaching `goal` has the minimum hop count.
pub fn breadth_first_search(graph: &FamilyGraph, start: PersonId, goal: PersonId) -> Vec<PersonId> {
    if !graph.contains(start) {
        log::debug!("[BFS] start node {} not found", start);
        return Vec::new();
    }
    if !graph.contains(goal) {
        log::debug!("[BFS] goal node {} not found", goal);
        return Vec::new();
    }

    let mut previous: HashMap<PersonId, PersonId> = HashMap::new();
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            let path = reconstruct_path(&previous, start, goal);
            log::debug!("[BFS] path found: {:?}", path);
            return path;
        }

        for neighbor in graph.neighbors(current) {
            if visited.insert(neighbor.id) {
                previous.insert(neighbor.id, current);
                queue.push_back(neighbor.id);
            }
        }
    }

    log::debug!("[BFS] no path from {} to {}", start, goal);
    Vec::new()
}

/// Dijkstra with uniform edge weight 1.
pub fn dijkstra(graph: &FamilyGraph, start: PersonId, goal: PersonId) -> Vec<PersonId> {
    dijkstra_with(graph, start, goal, |_| 1)
}

/// Dijkstra with a caller-supplied edge weight.
///
/// The frontier is a min-heap on (distance, id), so equal distances resolve
/// to the lower id. Search stops as soon as `goal` is settled.
pub fn dijkstra_with<W>(graph: &FamilyGraph, start: PersonId, goal: PersonId, weight: W) -> Vec<PersonId>
where
    W: Fn(&Neighbor) -> u64,
{
    if !graph.contains(start) || !graph.contains(goal) {
        return Vec::new();
    }

    // Missing entries are at infinite distance.
    let mut distances: HashMap<PersonId, u64> = HashMap::from([(start, 0)]);
    let mut previous: HashMap<PersonId, PersonId> = HashMap::new();
    let mut settled: HashSet<PersonId> = HashSet::new();
    let mut frontier = BinaryHeap::from([Reverse((0u64, start))]);

    while let Some(Reverse((distance, current))) = frontier.pop() {
        if !settled.insert(current) {
            continue;
        }
        if current == goal {
            let path = reconstruct_path(&previous, start, goal);
            log::debug!("[Dijkstra] path found at distance {}: {:?}", distance, path);
            return path;
        }

        for neighbor in graph.neighbors(current) {
            if settled.contains(&neighbor.id) {
                continue;
            }
            let candidate = distance.saturating_add(weight(neighbor));
            let known = distances.get(&neighbor.id).copied().unwrap_or(u64::MAX);
            if candidate < known {
                distances.insert(neighbor.id, candidate);
                previous.insert(neighbor.id, current);
                frontier.push(Reverse((candidate, neighbor.id)));
            }
        }
    }

    log::debug!("[Dijkstra] no path from {} to {}", start, goal);
    Vec::new()
}

/// Walk predecessors from `goal` back to `start`.
fn reconstruct_path(
    previous: &HashMap<PersonId, PersonId>,
    start: PersonId,
    goal: PersonId,
) -> Vec<PersonId> {
    let mut path = vec![goal];
    let mut step = goal;
    while step != start {
        match previous.get(&step) {
            Some(&prev) => {
                path.push(prev);
                step = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
