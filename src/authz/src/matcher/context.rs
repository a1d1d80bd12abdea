//! Evaluation context for matcher expressions

use super::error::{MatcherError, Result};
use super::functions::Function;
use super::value::Value;
use std::collections::HashMap;

/// Variables and functions visible to one matcher evaluation
///
/// The enforcer binds request tokens once per call and rebinds policy tokens
/// for every policy row, reusing the same context.
#[derive(Clone, Default)]
pub struct EvalContext {
    variables: HashMap<String, Value>,
    functions: HashMap<String, Function>,
}

impl EvalContext {
    /// Create an empty evaluation context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with the given variable bindings
    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Create context with the given functions
    pub fn with_functions(mut self, functions: HashMap<String, Function>) -> Self {
        self.functions = functions;
        self
    }

    /// Bind (or rebind) a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Register a function under `name`
    pub fn add_function(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), function);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Reject variables that shadow a function name
    pub fn check_names(&self) -> Result<()> {
        let mut conflicts: Vec<&str> = self
            .variables
            .keys()
            .filter(|name| self.functions.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();

        if conflicts.is_empty() {
            return Ok(());
        }
        conflicts.sort_unstable();
        Err(MatcherError::NamesConflict(conflicts.join(", ")))
    }
}

impl std::fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("EvalContext")
            .field("variables", &self.variables)
            .field("functions", &functions)
            .finish()
    }
}
