//! Dependency resolver
//!
//! Pure checks of an addon's declared dependencies against a snapshot of the
//! registry and the live host services.

use std::collections::{HashMap, HashSet};

use addonhost_api::{AddonState, HostServices};

use super::error::AddonHostError;
use super::manifest::AddonDescriptor;

/// Which dependency kinds a check covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyScope {
    /// Addon dependencies only; used to gate registration
    Load,
    /// Addon and host-service dependencies; used to gate activation
    Enable,
}

/// Read access to addon states, as the resolver needs it
pub trait AddonStates {
    fn state_of(&self, id: &str) -> Option<AddonState>;
}

impl AddonStates for HashMap<String, AddonState> {
    fn state_of(&self, id: &str) -> Option<AddonState> {
        self.get(id).copied()
    }
}

/// Outcome of a dependency check
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Unsatisfied names, addon ids first, in declaration order
    pub missing: Vec<String>,
}

impl Resolution {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }

    /// `Err(DependencyMissing)` unless satisfied
    pub fn into_result(self) -> Result<(), AddonHostError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(AddonHostError::DependencyMissing(self.missing))
        }
    }
}

/// Check `descriptor`'s dependencies.
///
/// An addon dependency holds when the id is registered and not FAILED or
/// UNLOADED. A service dependency holds when the host reports it available
/// at call time.
pub fn check(
    descriptor: &AddonDescriptor,
    addons: &dyn AddonStates,
    services: &dyn HostServices,
    scope: DependencyScope,
) -> Resolution {
    let mut missing: Vec<String> = descriptor
        .addon_dependencies
        .iter()
        .filter(|id| {
            !addons
                .state_of(id)
                .is_some_and(|state| state.satisfies_dependency())
        })
        .cloned()
        .collect();

    if scope == DependencyScope::Enable {
        missing.extend(
            descriptor
                .host_service_dependencies
                .iter()
                .filter(|service| !services.is_service_available(service))
                .cloned(),
        );
    }

    if !missing.is_empty() {
        tracing::debug!(
            addon = %descriptor.id,
            missing = ?missing,
            scope = ?scope,
            "Dependencies not satisfied"
        );
    }
    Resolution { missing }
}

/// Order a batch of descriptors so each comes after the batch members it
/// depends on.
///
/// Depth-first over `addon_dependencies`, visiting roots in input order.
/// Dependencies outside the batch are ignored. A cycle is broken at the
/// member reached second, so every member still fails its own dependency
/// check when loaded. Returns indices into `batch`.
pub fn load_order(batch: &[&AddonDescriptor]) -> Vec<usize> {
    let index: HashMap<&str, usize> = batch
        .iter()
        .enumerate()
        .map(|(i, descriptor)| (descriptor.id.as_str(), i))
        .rev()
        .collect();

    let mut visited: HashSet<usize> = HashSet::new();
    let mut order = Vec::with_capacity(batch.len());
    for i in 0..batch.len() {
        visit_for_order(i, batch, &index, &mut visited, &mut order);
    }
    order
}

fn visit_for_order(
    i: usize,
    batch: &[&AddonDescriptor],
    index: &HashMap<&str, usize>,
    visited: &mut HashSet<usize>,
    order: &mut Vec<usize>,
) {
    if !visited.insert(i) {
        return;
    }

    for dep in &batch[i].addon_dependencies {
        if let Some(&dep_index) = index.get(dep.as_str()) {
            visit_for_order(dep_index, batch, index, visited, order);
        }
    }

    order.push(i);
}
