//! Dependency graph construction.
//!
//! A [`DependencyGraph`] is an index-based adjacency structure over one
//! batch. Invocation `i` in the graph is `specs[i]` in the submitted batch,
//! so submission order is preserved everywhere downstream.

use std::collections::HashMap;
use strata_core::{InvocationId, InvocationSpec, StructuralError, StructuralResult};

/// Directed dependency graph over one batch of invocations.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<InvocationId>,
    index_of: HashMap<InvocationId, usize>,
    /// For each invocation, the indices it depends on (sorted, deduplicated)
    dependencies: Vec<Vec<usize>>,
    /// For each invocation, the indices that depend on it (sorted)
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph for a batch.
    ///
    /// Dependencies are the union of the explicit `depends_on` list and
    /// every invocation referenced from an argument.
    ///
    /// # Errors
    ///
    /// - [`StructuralError::DuplicateInvocation`] if two specs share an id
    /// - [`StructuralError::SelfDependency`] if an invocation depends on itself
    /// - [`StructuralError::UnknownDependency`] if a dependency is not in the batch
    pub fn build(specs: &[InvocationSpec]) -> StructuralResult<Self> {
        let mut index_of = HashMap::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            if index_of.insert(spec.id.clone(), idx).is_some() {
                return Err(StructuralError::DuplicateInvocation {
                    invocation: spec.id.clone(),
                });
            }
        }

        let mut dependencies = Vec::with_capacity(specs.len());
        let mut dependents = vec![Vec::new(); specs.len()];

        for (idx, spec) in specs.iter().enumerate() {
            let mut deps = Vec::new();
            for dep in spec.dependency_ids() {
                if *dep == spec.id {
                    return Err(StructuralError::SelfDependency {
                        invocation: spec.id.clone(),
                    });
                }
                let dep_idx =
                    *index_of
                        .get(dep)
                        .ok_or_else(|| StructuralError::UnknownDependency {
                            invocation: spec.id.clone(),
                            missing: dep.clone(),
                        })?;
                deps.push(dep_idx);
            }
            deps.sort_unstable();
            deps.dedup();

            for &dep_idx in &deps {
                dependents[dep_idx].push(idx);
            }
            dependencies.push(deps);
        }

        Ok(Self {
            ids: specs.iter().map(|spec| spec.id.clone()).collect(),
            index_of,
            dependencies,
            dependents,
        })
    }

    /// Number of invocations.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id of the invocation at `idx`.
    pub fn id(&self, idx: usize) -> &InvocationId {
        &self.ids[idx]
    }

    /// All ids in submission order.
    pub fn ids(&self) -> &[InvocationId] {
        &self.ids
    }

    /// Index of the invocation with the given id.
    pub fn index_of(&self, id: &InvocationId) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    /// Indices `idx` depends on, in submission order.
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    /// Indices that depend on `idx`, in submission order.
    pub fn dependents(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Total number of distinct dependency edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(Vec::len).sum()
    }
}
