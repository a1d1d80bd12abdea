//! Default role graph
//!
//! Roles live in an arena and refer to their parents by index, so a parent
//! shared by many roles is stored once and links never own each other.

use super::{qualify, unqualify, MatchingFn, RoleManager};
use crate::error::{RbacError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Graph node for one (possibly domain-qualified) role name
#[derive(Debug, Clone)]
struct RoleNode {
    name: String,

    /// Indices of directly inherited roles, in insertion order
    parents: Vec<usize>,
}

impl RoleNode {
    fn new(name: String) -> Self {
        Self {
            name,
            parents: Vec::new(),
        }
    }

    fn add_parent(&mut self, parent: usize) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    fn remove_parent(&mut self, parent: usize) {
        self.parents.retain(|p| *p != parent);
    }
}

/// Role manager backed by an in-memory role graph
pub struct DefaultRoleManager {
    nodes: Vec<RoleNode>,
    index: HashMap<String, usize>,
    max_hierarchy_level: usize,
    matching_fn: Option<MatchingFn>,
}

impl DefaultRoleManager {
    /// Create a role manager that follows at most `max_hierarchy_level` links
    pub fn new(max_hierarchy_level: usize) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            max_hierarchy_level,
            matching_fn: None,
        }
    }

    pub fn max_hierarchy_level(&self) -> usize {
        self.max_hierarchy_level
    }

    /// Number of roles in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `name` is known, exactly or through the matching function
    pub fn has_role(&self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return true;
        }
        match &self.matching_fn {
            Some(matches) => self.nodes.iter().any(|node| matches(name, &node.name)),
            None => false,
        }
    }

    /// Whether `child` directly inherits `parent`
    pub fn has_direct_role(&self, child: &str, parent: &str) -> bool {
        match (self.index.get(child), self.index.get(parent)) {
            (Some(c), Some(p)) => self.nodes[*c].parents.contains(p),
            _ => false,
        }
    }

    /// Get or create the node for `name`
    ///
    /// A new node inherits every existing role its name matches under the
    /// matching function.
    fn create_role(&mut self, name: &str) -> usize {
        if let Some(&id) = self.index.get(name) {
            return id;
        }

        let id = self.nodes.len();
        let mut node = RoleNode::new(name.to_string());
        if let Some(matches) = &self.matching_fn {
            for (other, existing) in self.nodes.iter().enumerate() {
                if existing.name != name && matches(name, &existing.name) {
                    node.add_parent(other);
                }
            }
        }
        self.nodes.push(node);
        self.index.insert(name.to_string(), id);
        id
    }

    /// Depth-bounded search from `start` for a role named `target`
    fn reaches(&self, start: usize, target: &str, level: usize) -> bool {
        let node = &self.nodes[start];
        if node.name == target {
            return true;
        }
        if level == 0 {
            return false;
        }
        node.parents
            .iter()
            .any(|parent| self.reaches(*parent, target, level - 1))
    }

    /// Parents `name` would have: its own if it exists, otherwise every
    /// role it matches
    fn parents_of(&self, name: &str) -> Vec<String> {
        if let Some(&id) = self.index.get(name) {
            return self.nodes[id]
                .parents
                .iter()
                .map(|p| self.nodes[*p].name.clone())
                .collect();
        }
        match &self.matching_fn {
            Some(matches) => self
                .nodes
                .iter()
                .filter(|node| node.name != name && matches(name, &node.name))
                .map(|node| node.name.clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for DefaultRoleManager {
    fn default() -> Self {
        Self::new(10)
    }
}

impl RoleManager for DefaultRoleManager {
    fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    fn add_link(&mut self, name1: &str, name2: &str, domain: Option<&str>) {
        let child = self.create_role(&qualify(name1, domain));
        let parent = self.create_role(&qualify(name2, domain));
        self.nodes[child].add_parent(parent);
    }

    fn delete_link(&mut self, name1: &str, name2: &str, domain: Option<&str>) -> Result<()> {
        let name1 = qualify(name1, domain);
        let name2 = qualify(name2, domain);
        if !self.has_role(&name1) || !self.has_role(&name2) {
            return Err(RbacError::NotFound(format!("{}, {}", name1, name2)).into());
        }

        let child = self.create_role(&name1);
        let parent = self.create_role(&name2);
        self.nodes[child].remove_parent(parent);
        Ok(())
    }

    fn has_link(&self, name1: &str, name2: &str, domain: Option<&str>) -> bool {
        let name1 = qualify(name1, domain);
        let name2 = qualify(name2, domain);
        if name1 == name2 {
            return true;
        }
        if !self.has_role(&name1) || !self.has_role(&name2) {
            return false;
        }

        match &self.matching_fn {
            None => self
                .index
                .get(&name1)
                .is_some_and(|start| self.reaches(*start, &name2, self.max_hierarchy_level)),
            Some(matches) => self.nodes.iter().enumerate().any(|(id, node)| {
                (node.name == name1 || matches(&name1, &node.name))
                    && self.reaches(id, &name2, self.max_hierarchy_level)
            }),
        }
    }

    fn get_roles(&self, name: &str, domain: Option<&str>) -> Vec<String> {
        let name = qualify(name, domain);
        if !self.has_role(&name) {
            return Vec::new();
        }
        self.parents_of(&name)
            .iter()
            .map(|role| unqualify(role, domain))
            .collect()
    }

    fn get_users(&self, name: &str, domain: Option<&str>) -> Vec<String> {
        let name = qualify(name, domain);
        let Some(&target) = self.index.get(&name) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .filter(|node| node.parents.contains(&target))
            .map(|node| unqualify(&node.name, domain))
            .collect()
    }

    fn print_roles(&self) {
        let lines: Vec<String> = self
            .nodes
            .iter()
            .filter(|node| !node.parents.is_empty())
            .map(|node| {
                let names: Vec<&str> = node
                    .parents
                    .iter()
                    .map(|p| self.nodes[*p].name.as_str())
                    .collect();
                if names.len() == 1 {
                    format!("{} < {}", node.name, names[0])
                } else {
                    format!("{} < ({})", node.name, names.join(", "))
                }
            })
            .collect();
        debug!(roles = %lines.join(", "), "Role graph");
    }

    fn add_matching_fn(&mut self, matching_fn: MatchingFn) {
        self.matching_fn = Some(matching_fn);
    }
}
