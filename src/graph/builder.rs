//! Graph builder: flat people + relations -> adjacency lists.

use std::collections::BTreeMap;

use super::{EdgeRole, FamilyGraph, GraphNode, Neighbor};
use crate::family::{Person, Relation, RelationType};

/// Build a [`FamilyGraph`].
///
/// Every person gets an entry, isolated or not. Each relation is linked from
/// both endpoints regardless of type. Relations with a missing endpoint are
/// skipped and reported through [`FamilyGraph::skipped_relations`].
pub fn build_family_graph<'a, P, R>(people: P, relations: R) -> FamilyGraph
where
    P: IntoIterator<Item = &'a Person>,
    R: IntoIterator<Item = &'a Relation>,
{
    let mut nodes: BTreeMap<_, _> = people
        .into_iter()
        .map(|person| {
            (
                person.id,
                GraphNode {
                    person: person.clone(),
                    neighbors: Vec::new(),
                },
            )
        })
        .collect();
    let mut skipped = Vec::new();

    for relation in relations {
        if !nodes.contains_key(&relation.from) || !nodes.contains_key(&relation.to) {
            log::warn!(
                "Skipping relation {} -> {} ({}): endpoint not in people list",
                relation.from,
                relation.to,
                relation.relation_type
            );
            skipped.push(*relation);
            continue;
        }

        let (forward, backward) = match relation.relation_type {
            RelationType::Spouse => (EdgeRole::Spouse, EdgeRole::Spouse),
            // Seen from the parent the neighbor is a child, and vice versa.
            RelationType::Child => (EdgeRole::Child, EdgeRole::Parent),
        };

        if let Some(node) = nodes.get_mut(&relation.from) {
            node.neighbors.push(Neighbor {
                id: relation.to,
                relation_type: relation.relation_type,
                role: forward,
            });
        }
        if let Some(node) = nodes.get_mut(&relation.to) {
            node.neighbors.push(Neighbor {
                id: relation.from,
                relation_type: relation.relation_type,
                role: backward,
            });
        }
    }

    log::debug!(
        "Built family graph: {} nodes, {} skipped relation(s)",
        nodes.len(),
        skipped.len()
    );

    FamilyGraph { nodes, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Gender, PersonId};

    fn people(ids: &[PersonId]) -> Vec<Person> {
        ids.iter()
            .map(|&id| Person {
                id,
                name: format!("P{}", id),
                gender: Gender::Female,
                birth_date: String::new(),
                photo: None,
                details: None,
            })
            .collect()
    }

    fn neighbor_ids(graph: &FamilyGraph, id: PersonId) -> Vec<PersonId> {
        graph.neighbors(id).iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_isolated_people_get_entries() {
        let people = people(&[1, 2, 3]);
        let graph = build_family_graph(&people, &[] as &[Relation]);
        assert_eq!(graph.len(), 3);
        assert!(graph.contains(2));
        assert!(graph.neighbors(2).is_empty());
    }

    #[test]
    fn test_every_relation_linked_from_both_endpoints() {
        let people = people(&[1, 2, 3]);
        let relations = vec![Relation::spouse(1, 2), Relation::child(1, 3)];
        let graph = build_family_graph(&people, &relations);

        assert_eq!(neighbor_ids(&graph, 1), vec![2, 3]);
        assert_eq!(neighbor_ids(&graph, 2), vec![1]);
        assert_eq!(neighbor_ids(&graph, 3), vec![1]);
        assert_eq!(graph.link_count(), 4);
    }

    #[test]
    fn test_roles_follow_relation_direction() {
        let people = people(&[1, 2, 3]);
        let relations = vec![Relation::spouse(1, 2), Relation::child(1, 3)];
        let graph = build_family_graph(&people, &relations);

        assert_eq!(graph.neighbors(3)[0].role, EdgeRole::Parent);
        assert_eq!(graph.neighbors(1)[1].role, EdgeRole::Child);
        assert_eq!(graph.neighbors(2)[0].role, EdgeRole::Spouse);
        assert_eq!(graph.neighbors(2)[0].relation_type, RelationType::Spouse);
    }

    #[test]
    fn test_stale_relation_skipped_not_raised() {
        let people = people(&[1, 2]);
        let relations = vec![Relation::child(1, 9), Relation::spouse(1, 2)];
        let graph = build_family_graph(&people, &relations);

        assert_eq!(graph.skipped_relations(), &[Relation::child(1, 9)]);
        assert_eq!(neighbor_ids(&graph, 1), vec![2]);
        assert!(!graph.contains(9));
    }
}
