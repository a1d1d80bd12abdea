//! Functions available to matchers

use crate::error::RbacError;
use crate::matcher::functions::builtin_functions;
use crate::matcher::{Function, MatcherError, Value};
use crate::rbac::{RoleManager, SharedRoleManager};
use std::collections::HashMap;
use std::sync::Arc;

/// Named functions callable from the matcher
#[derive(Clone)]
pub struct FunctionMap {
    functions: HashMap<String, Function>,
}

impl FunctionMap {
    /// A map holding the built-in operators
    pub fn load() -> Self {
        Self {
            functions: builtin_functions(),
        }
    }

    /// Register (or replace) a function
    pub fn add_function(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), function);
    }

    pub fn get_functions(&self) -> &HashMap<String, Function> {
        &self.functions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for FunctionMap {
    fn default() -> Self {
        Self::load()
    }
}

/// Build the `g(name1, name2[, domain])` relation for a grouping definition
///
/// Without a role manager the relation is plain equality.
pub fn generate_g_function(key: &str, rm: Option<SharedRoleManager>) -> Function {
    let key = key.to_string();
    Arc::new(move |args: &[Value]| -> Result<Value, MatcherError> {
        if args.len() < 2 {
            return Err(MatcherError::function(
                &key,
                format!("expected at least 2 arguments, got {}", args.len()),
            ));
        }
        if args.len() > 3 {
            return Err(MatcherError::function(
                &key,
                RbacError::DomainCount(args.len() - 2).to_string(),
            ));
        }

        let name1 = args[0].to_string();
        let name2 = args[1].to_string();
        let Some(rm) = &rm else {
            return Ok(Value::Bool(name1 == name2));
        };

        let domain = args.get(2).map(Value::to_string);
        let linked = rm.read().has_link(&name1, &name2, domain.as_deref());
        Ok(Value::Bool(linked))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::{shared, DefaultRoleManager};

    fn call(function: &Function, args: &[&str]) -> Result<Value, MatcherError> {
        let args: Vec<Value> = args.iter().map(|a| Value::from(*a)).collect();
        function(&args)
    }

    #[test]
    fn test_builtins_loaded() {
        let fm = FunctionMap::load();
        for name in ["keyMatch", "keyMatch2", "keyMatch3", "regexMatch", "ipMatch", "globMatch"] {
            assert!(fm.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_add_function() {
        let mut fm = FunctionMap::load();
        fm.add_function(
            "always",
            Arc::new(|_: &[Value]| -> Result<Value, MatcherError> { Ok(Value::Bool(true)) }),
        );
        assert!(fm.contains("always"));
    }

    #[test]
    fn test_g_function_without_role_manager() {
        let g = generate_g_function("g", None);
        assert_eq!(call(&g, &["alice", "alice"]).unwrap(), Value::Bool(true));
        assert_eq!(call(&g, &["alice", "admin"]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_g_function_with_domain() {
        let mut rm = DefaultRoleManager::new(10);
        rm.add_link("alice", "admin", Some("domain1"));
        let g = generate_g_function("g", Some(shared(rm)));

        assert_eq!(call(&g, &["alice", "admin", "domain1"]).unwrap(), Value::Bool(true));
        assert_eq!(call(&g, &["alice", "admin", "domain2"]).unwrap(), Value::Bool(false));
        assert_eq!(call(&g, &["alice", "admin"]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_g_function_arity() {
        let g = generate_g_function("g2", Some(shared(DefaultRoleManager::new(10))));
        assert!(call(&g, &["alice"]).is_err());
        let err = call(&g, &["alice", "admin", "d1", "d2"]).unwrap_err();
        assert!(err.to_string().contains("domain should be 1 parameter"));
    }
}
