//! Topological leveling (Kahn's algorithm).

use crate::graph::DependencyGraph;
use serde::Serialize;
use strata_core::{InvocationId, StructuralError, StructuralResult};

/// Levels of a validated graph.
///
/// Level `n` holds invocation indices whose dependencies all sit in levels
/// `< n`. Each level is ordered by submission index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Levels {
    levels: Vec<Vec<usize>>,
    level_of: Vec<usize>,
}

impl Levels {
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.levels.iter().map(Vec::as_slice)
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Indices in level `n`.
    pub fn get(&self, n: usize) -> Option<&[usize]> {
        self.levels.get(n).map(Vec::as_slice)
    }

    /// Level assigned to invocation `idx`.
    pub fn level_of(&self, idx: usize) -> usize {
        self.level_of[idx]
    }

    /// Size of the widest level.
    pub fn max_width(&self) -> usize {
        self.levels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Levels as invocation ids.
    pub fn to_ids(&self, graph: &DependencyGraph) -> Vec<Vec<InvocationId>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&idx| graph.id(idx).clone()).collect())
            .collect()
    }
}

/// Execution plan for a batch: levels by id, without running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub levels: Vec<Vec<InvocationId>>,
}

impl ExecutionPlan {
    pub fn invocation_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Assign every invocation in `graph` to a level.
///
/// Level 0 holds every invocation without dependencies. Each following
/// level holds the invocations whose last outstanding dependency sat in the
/// previous level.
///
/// # Errors
///
/// [`StructuralError::DependencyCycle`] if some invocations can never be
/// leveled. `remaining` lists them in submission order.
pub fn level(graph: &DependencyGraph) -> StructuralResult<Levels> {
    let mut in_degree: Vec<usize> = (0..graph.len())
        .map(|idx| graph.dependencies(idx).len())
        .collect();
    let mut level_of: Vec<Option<usize>> = vec![None; graph.len()];
    let mut levels: Vec<Vec<usize>> = Vec::new();

    let mut current: Vec<usize> = (0..graph.len()).filter(|&idx| in_degree[idx] == 0).collect();

    while !current.is_empty() {
        let depth = levels.len();
        let mut next = Vec::new();
        for &idx in &current {
            level_of[idx] = Some(depth);
            for &dependent in graph.dependents(idx) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        next.sort_unstable();
        levels.push(std::mem::replace(&mut current, next));
    }

    match level_of.iter().copied().collect::<Option<Vec<usize>>>() {
        Some(level_of) => Ok(Levels { levels, level_of }),
        None => Err(StructuralError::DependencyCycle {
            remaining: level_of
                .iter()
                .enumerate()
                .filter(|(_, level)| level.is_none())
                .map(|(idx, _)| graph.id(idx).clone())
                .collect(),
        }),
    }
}
