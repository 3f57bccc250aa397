//! Turn a bare id path into labelled steps ("3 is a child of 1", ...).

use serde::Serialize;

use super::{EdgeRole, FamilyGraph};
use crate::family::PersonId;
use crate::{KinshipError, Result};

/// One hop of a path: `to` is the `role` of `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub from: PersonId,
    pub to: PersonId,
    pub role: EdgeRole,
}

/// Label every consecutive pair of `path`.
///
/// A one-element or empty path yields no steps. Non-adjacent pairs are
/// reported as [`KinshipError::UnknownPerson`] on the first id that is
/// missing, or [`KinshipError::NotFound`] when both exist but are not linked.
pub fn describe_path(graph: &FamilyGraph, path: &[PersonId]) -> Result<Vec<PathStep>> {
    if let Some(&missing) = path.iter().find(|&&id| !graph.contains(id)) {
        return Err(KinshipError::UnknownPerson(missing));
    }

    path.windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            graph
                .neighbors(from)
                .iter()
                .find(|n| n.id == to)
                .map(|n| PathStep { from, to, role: n.role })
                .ok_or_else(|| {
                    KinshipError::NotFound(format!("link between {} and {}", from, to))
                })
        })
        .collect()
}
