//! Access control model
//!
//! A model maps each section (`r`, `p`, `g`, `e`, `m`) to its named
//! assertions. Models are loaded from INI text:
//!
//! ```text
//! [request_definition]
//! r = sub, obj, act
//!
//! [policy_definition]
//! p = sub, obj, act
//!
//! [role_definition]
//! g = _, _
//!
//! [policy_effect]
//! e = some(where (p.eft == allow))
//!
//! [matchers]
//! m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
//! ```
//!
//! A section may hold several numbered definitions (`p`, `p2`, `p3`, ...);
//! loading stops at the first missing number.

pub mod assertion;
pub mod function_map;
mod policy;

pub use assertion::Assertion;
pub use function_map::{generate_g_function, FunctionMap};

use crate::config::Config;
use crate::effect::EffectKind;
use crate::error::{AuthzError, ModelError, Result};
use crate::matcher::rewrite::{escape_assertion, remove_comments};
use crate::rbac::{RoleManager, SharedRoleManager};
use crate::types::{PolicyOp, Rule, SEC_EFFECT, SEC_MATCHER, SEC_POLICY, SEC_REQUEST, SEC_ROLE};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Section keys and the INI sections they are read from
const SECTION_NAMES: [(&str, &str); 5] = [
    (SEC_REQUEST, "request_definition"),
    (SEC_POLICY, "policy_definition"),
    (SEC_ROLE, "role_definition"),
    (SEC_EFFECT, "policy_effect"),
    (SEC_MATCHER, "matchers"),
];

/// Sections every model must define
const REQUIRED_SECTIONS: [&str; 4] = [SEC_REQUEST, SEC_POLICY, SEC_EFFECT, SEC_MATCHER];

/// Section-keyed assertions
#[derive(Debug, Clone, Default)]
pub struct Model {
    sections: HashMap<String, BTreeMap<String, Assertion>>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model from INI text
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_config(&Config::from_text(text)?)
    }

    /// Load a model from an INI file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::from_file(path).await?;
        Self::from_config(&config)
    }

    /// Load a model from parsed configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut model = Self::new();
        for (sec, _) in SECTION_NAMES {
            model.load_section(config, sec);
        }
        Ok(model)
    }

    fn load_section(&mut self, config: &Config, sec: &str) {
        let mut i = 1;
        loop {
            let key = if i == 1 { sec.to_string() } else { format!("{}{}", sec, i) };
            if !self.load_assertion(config, sec, &key) {
                break;
            }
            i += 1;
        }
    }

    fn load_assertion(&mut self, config: &Config, sec: &str, key: &str) -> bool {
        let section_name = SECTION_NAMES
            .iter()
            .find(|(s, _)| *s == sec)
            .map(|(_, name)| *name)
            .unwrap_or(sec);
        let value = config.get(&format!("{}::{}", section_name, key));
        self.add_def(sec, key, value)
    }

    /// Add a definition to `sec` under `key`
    ///
    /// Request and policy definitions become `{key}_{name}` tokens; matcher
    /// and effect expressions have comments stripped and are escaped. Returns
    /// false for an empty value.
    pub fn add_def(&mut self, sec: &str, key: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }

        let mut ast = Assertion::new(key, value);
        match sec {
            SEC_REQUEST | SEC_POLICY => {
                ast.tokens = value
                    .split(',')
                    .map(|name| format!("{}_{}", key, name.trim()))
                    .collect();
            }
            SEC_MATCHER | SEC_EFFECT => {
                ast.value = escape_assertion(&remove_comments(value));
            }
            _ => {}
        }

        self.sections
            .entry(sec.to_string())
            .or_default()
            .insert(key.to_string(), ast);
        true
    }

    /// Check that the required sections exist and the effect is supported
    pub fn validate(&self) -> Result<()> {
        for sec in REQUIRED_SECTIONS {
            if self.get_assertion(sec, sec).is_none() {
                return Err(ModelError::MissingSection(sec.to_string()).into());
            }
        }
        self.effect_kind().map(|_| ())
    }

    /// The combination policy named by `e`
    pub fn effect_kind(&self) -> Result<EffectKind> {
        let ast = self
            .get_assertion(SEC_EFFECT, SEC_EFFECT)
            .ok_or_else(|| ModelError::MissingSection(SEC_EFFECT.to_string()))?;
        Ok(EffectKind::from_expr(&ast.value)?)
    }

    pub fn get_assertion(&self, sec: &str, key: &str) -> Option<&Assertion> {
        self.sections.get(sec).and_then(|asts| asts.get(key))
    }

    pub fn get_assertion_mut(&mut self, sec: &str, key: &str) -> Option<&mut Assertion> {
        self.sections.get_mut(sec).and_then(|asts| asts.get_mut(key))
    }

    /// Assertions of one section, ordered by key
    pub fn section(&self, sec: &str) -> Option<&BTreeMap<String, Assertion>> {
        self.sections.get(sec)
    }

    pub fn has_section(&self, sec: &str) -> bool {
        self.sections.contains_key(sec)
    }

    /// Keys of one section (`g`, `g2`, ...)
    pub fn keys(&self, sec: &str) -> Vec<String> {
        self.sections
            .get(sec)
            .map(|asts| asts.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Log the model definitions
    pub fn print_model(&self) {
        info!("Model:");
        for (sec, _) in SECTION_NAMES {
            if let Some(asts) = self.sections.get(sec) {
                for (key, ast) in asts {
                    info!("{}.{}: {}", sec, key, ast.value);
                }
            }
        }
    }

    /// Log the policy and grouping rows
    pub fn print_policy(&self) {
        info!("Policy:");
        for sec in [SEC_POLICY, SEC_ROLE] {
            if let Some(asts) = self.sections.get(sec) {
                for (key, ast) in asts {
                    info!("{} : {} : {:?}", key, ast.value, ast.policy);
                }
            }
        }
    }

    /// Link every grouping definition into its role manager
    ///
    /// Each role manager is cleared first. All rows are checked before any
    /// role manager is touched.
    pub fn build_role_links(&mut self, rm_map: &HashMap<String, SharedRoleManager>) -> Result<()> {
        let Some(asts) = self.sections.get_mut(SEC_ROLE) else {
            return Ok(());
        };

        for ast in asts.values() {
            ast.validate_grouping(&ast.policy)?;
        }
        for (key, ast) in asts.iter_mut() {
            let Some(rm) = rm_map.get(key) else {
                continue;
            };
            rm.write().clear();
            ast.build_role_links(rm.clone())?;
        }
        Ok(())
    }

    /// Apply added or removed grouping rows to the role manager of `key`
    pub fn build_incremental_role_links(
        &mut self,
        rm_map: &HashMap<String, SharedRoleManager>,
        op: PolicyOp,
        sec: &str,
        key: &str,
        rules: &[Rule],
    ) -> Result<()> {
        if sec != SEC_ROLE {
            return Ok(());
        }
        let (Some(ast), Some(rm)) = (self.get_assertion_mut(sec, key), rm_map.get(key)) else {
            return Ok(());
        };
        ast.build_incremental_role_links(rm.clone(), op, rules)
    }
}

impl FromStr for Model {
    type Err = AuthzError;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_text(text)
    }
}
