//! Role manager module
//!
//! Answers transitive "has role" questions over the links built from grouping
//! (`g`) rows. Links may be scoped to a domain, and a matching function can
//! stand in for exact name equality so that patterns such as `/book/:id` act
//! as roles for every concrete path they match.
//!
//! # Example
//!
//! ```rust
//! use warden_authz::rbac::{DefaultRoleManager, RoleManager};
//!
//! let mut rm = DefaultRoleManager::new(10);
//! rm.add_link("alice", "admin", None);
//! rm.add_link("admin", "staff", None);
//!
//! assert!(rm.has_link("alice", "staff", None));
//! assert_eq!(rm.get_roles("alice", None), vec!["admin".to_string()]);
//! ```

pub mod default_role_manager;


pub use default_role_manager::DefaultRoleManager;

/// Wrap a role manager for sharing
pub fn shared<R: RoleManager + 'static>(rm: R) -> SharedRoleManager {
    Arc::new(RwLock::new(rm))
}

use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Name equivalence used in place of `==`: `(candidate, graph_key) -> bool`
pub type MatchingFn = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Role manager shared between the enforcer and a grouping assertion
pub type SharedRoleManager = Arc<RwLock<dyn RoleManager>>;

/// Separator between a domain and a role name in qualified names
pub const DOMAIN_SEPARATOR: &str = "::";

/// Role graph operations used by the enforcer
pub trait RoleManager: Send + Sync {
    /// Drop every role and link
    fn clear(&mut self);

    /// Make `name2` a parent of `name1`
    fn add_link(&mut self, name1: &str, name2: &str, domain: Option<&str>);

    /// Remove the link from `name1` to `name2`
    ///
    /// # Errors
    /// Returns error if either name is unknown
    fn delete_link(&mut self, name1: &str, name2: &str, domain: Option<&str>) -> Result<()>;

    /// Whether `name1` reaches `name2` within the hierarchy bound
    fn has_link(&self, name1: &str, name2: &str, domain: Option<&str>) -> bool;

    /// Direct parents of `name`
    fn get_roles(&self, name: &str, domain: Option<&str>) -> Vec<String>;

    /// Names that have `name` as a direct parent
    fn get_users(&self, name: &str, domain: Option<&str>) -> Vec<String>;

    /// Log the role graph
    fn print_roles(&self);

    /// Use `matching_fn` instead of exact equality for role names
    fn add_matching_fn(&mut self, matching_fn: MatchingFn);
}

/// Qualify `name` with `domain` as `"domain::name"`
pub fn qualify(name: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) => format!("{}{}{}", domain, DOMAIN_SEPARATOR, name),
        None => name.to_string(),
    }
}

/// Strip the `"domain::"` prefix from a qualified name
pub fn unqualify(name: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) => name
            .strip_prefix(domain)
            .and_then(|rest| rest.strip_prefix(DOMAIN_SEPARATOR))
            .unwrap_or(name)
            .to_string(),
        None => name.to_string(),
    }
}
