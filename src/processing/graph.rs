//! Build-ordered resource graph.
//!
//! Collects emitted [`Resource`]s in the order they were created, which is the
//! dependency order the serialization collaborator must preserve.

use crate::error::TopologyError;
use crate::models::{Resource, ResourceKind, ResourceRef};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Serialize, Debug, Default, Clone)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    #[serde(skip)]
    names: HashSet<(ResourceKind, String)>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource, returning the handle others use to reference it.
    ///
    /// A (kind, name) pair can only be emitted once per graph.
    pub fn emit(&mut self, resource: Resource) -> Result<ResourceRef, TopologyError> {
        let key = (resource.kind, resource.name.clone());
        if self.names.contains(&key) {
            return Err(TopologyError::DuplicateResource(format!(
                "{}.{}",
                resource.kind, resource.name
            )));
        }
        log::debug!("emit {}.{}", resource.kind, resource.name);
        let handle = resource.handle();
        self.names.insert(key);
        self.resources.push(resource);
        Ok(handle)
    }

    /// Move every resource of `other` to the end of this graph.
    ///
    /// Nothing is moved if any (kind, name) pair already exists here.
    pub fn merge(&mut self, other: ResourceGraph) -> Result<(), TopologyError> {
        if let Some(dup) = other
            .resources
            .iter()
            .find(|r| self.names.contains(&(r.kind, r.name.clone())))
        {
            return Err(TopologyError::DuplicateResource(format!(
                "{}.{}",
                dup.kind, dup.name
            )));
        }
        for resource in other.resources {
            self.names.insert((resource.kind, resource.name.clone()));
            self.resources.push(resource);
        }
        Ok(())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources of one kind, in build order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }
}
