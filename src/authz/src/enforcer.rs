//! Enforcer: the model, its rows and role graphs behind one decision call
//!
//! # Architecture
//!
//! ```text
//! request ──> bind r_* ──┐
//!                        ├─> per row: bind p_*, eval() substitution ──> matcher ──> effect
//! policy rows (p) ───────┘                         │                                  │
//!                                        g(..) ──> role managers                      v
//!                                                                         effector ──> decision
//! ```
//!
//! Policy mutations update the model first, then persist through the adapter
//! (when auto-save is on), keep role links current and notify the watcher.

use crate::effect::{effector_for, Effect, EffectStream, Effector};
use crate::error::{AdapterError, AuthzError, ModelError, PolicyError, RequestError, Result};
use crate::matcher::rewrite::{has_eval, replace_eval};
use crate::matcher::{Engine, EvalContext, Function, Value};
use crate::model::{generate_g_function, FunctionMap, Model};
use crate::persist::{Adapter, FileAdapter, Filter, Watcher};
use crate::rbac::{shared, DefaultRoleManager, MatchingFn, SharedRoleManager};
use crate::types::{PolicyOp, Rule, SEC_MATCHER, SEC_POLICY, SEC_REQUEST, SEC_ROLE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Token holding a row's effect tag
const EFFECT_TOKEN: &str = "p_eft";

/// Enforcer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcerConfig {
    /// Evaluate requests; a disabled enforcer denies everything
    pub enabled: bool,

    /// Persist policy mutations through the adapter
    pub auto_save: bool,

    /// Keep role graphs in step with grouping rows
    pub auto_build_role_links: bool,

    /// Notify the watcher after policy mutations
    pub auto_notify_watcher: bool,

    /// Link depth followed by the default role managers
    pub max_hierarchy_level: usize,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_save: true,
            auto_build_role_links: true,
            auto_notify_watcher: true,
            max_hierarchy_level: 10,
        }
    }
}

/// Access control enforcer
pub struct Enforcer {
    model: Model,
    adapter: Option<Arc<dyn Adapter>>,
    watcher: Option<Box<dyn Watcher>>,
    /// One role manager per grouping definition (`g`, `g2`, ...)
    rm_map: HashMap<String, SharedRoleManager>,
    fm: FunctionMap,
    engine: Engine,
    effector: Arc<dyn Effector>,
    config: EnforcerConfig,
}

impl Enforcer {
    /// Create an enforcer and load its policy from `adapter`
    pub async fn new(model: Model, adapter: Option<Arc<dyn Adapter>>) -> Result<Self> {
        Self::with_config(model, adapter, EnforcerConfig::default()).await
    }

    /// Create an enforcer with explicit configuration
    ///
    /// The model is validated first. Policy is loaded from the adapter unless
    /// it holds a filtered view.
    pub async fn with_config(
        model: Model,
        adapter: Option<Arc<dyn Adapter>>,
        config: EnforcerConfig,
    ) -> Result<Self> {
        let mut enforcer = Self::from_model_with_config(model, config)?;
        enforcer.adapter = adapter;
        if enforcer.adapter.as_ref().is_some_and(|a| !a.is_filtered()) {
            enforcer.load_policy().await?;
        }
        Ok(enforcer)
    }

    /// Create an enforcer from a model file and a policy file
    pub async fn from_files(model_path: impl AsRef<Path>, policy_path: impl AsRef<Path>) -> Result<Self> {
        let model = Model::from_file(model_path).await?;
        let adapter: Arc<dyn Adapter> = Arc::new(FileAdapter::new(policy_path.as_ref()));
        Self::new(model, Some(adapter)).await
    }

    /// Create an enforcer over a model without an adapter
    ///
    /// Rows already present in the model are linked into the role managers.
    pub fn from_model(model: Model) -> Result<Self> {
        Self::from_model_with_config(model, EnforcerConfig::default())
    }

    pub fn from_model_with_config(model: Model, config: EnforcerConfig) -> Result<Self> {
        model.validate()?;
        let effector = effector_for(model.effect_kind()?);
        model.print_model();

        let rm_map = default_rm_map(&model, config.max_hierarchy_level);
        let mut enforcer = Self {
            model,
            adapter: None,
            watcher: None,
            rm_map,
            fm: FunctionMap::load(),
            engine: Engine::new(),
            effector,
            config,
        };
        if enforcer.config.auto_build_role_links {
            enforcer.build_role_links()?;
        }
        Ok(enforcer)
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Decide whether the request is allowed
    ///
    /// `rvals` are bound to the request tokens in order; strings, numbers,
    /// booleans and maps (for attribute access) are accepted.
    ///
    /// # Errors
    /// Returns error on request or row arity mismatch, on `eval()` without
    /// policy rows and on matcher evaluation failure
    pub fn enforce<I, V>(&self, rvals: I) -> Result<bool>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enforce_ex(rvals).map(|(allowed, _)| allowed)
    }

    /// Decide and return the row that explains the decision
    ///
    /// The explanation is empty when no single row decided the outcome.
    pub fn enforce_ex<I, V>(&self, rvals: I) -> Result<(bool, Vec<String>)>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rvals: Vec<Value> = rvals.into_iter().map(Into::into).collect();
        let (allowed, explain) = self.private_enforce(&rvals)?;
        let explain = explain
            .and_then(|index| self.model.policy(SEC_POLICY, SEC_POLICY).get(index))
            .cloned()
            .unwrap_or_default();

        log_request(&rvals, allowed, &explain);
        Ok((allowed, explain))
    }

    fn private_enforce(&self, rvals: &[Value]) -> Result<(bool, Option<usize>)> {
        if !self.config.enabled {
            return Ok((false, None));
        }

        let r_ast = self.required(SEC_REQUEST)?;
        let p_ast = self.required(SEC_POLICY)?;
        let matcher = &self.required(SEC_MATCHER)?.value;

        if r_ast.tokens.len() != rvals.len() {
            return Err(RequestError::InvalidSize {
                expected: r_ast.tokens.len(),
                found: rvals.len(),
            }
            .into());
        }

        let mut ctx = EvalContext::new().with_functions(self.functions());
        for (token, value) in r_ast.tokens.iter().zip(rvals) {
            ctx.set(token.as_str(), value.clone());
        }
        for token in &p_ast.tokens {
            ctx.set(token.as_str(), "");
        }
        ctx.check_names()?;

        let with_eval = has_eval(matcher);
        let eft_index = p_ast.tokens.iter().position(|t| t == EFFECT_TOKEN);
        let mut stream = EffectStream::new(self.effector.clone());

        if p_ast.policy.is_empty() {
            if with_eval {
                return Err(PolicyError::EvalWithoutRules.into());
            }
            let program = self.engine.compile(matcher)?;
            let effect = if self.engine.evaluate_match(&program, &ctx)? {
                Effect::Allow
            } else {
                Effect::Indeterminate
            };
            stream.push(0, effect);
            // The synthetic row explains nothing
            return Ok((stream.next(), None));
        }

        for (index, pvals) in p_ast.policy.iter().enumerate() {
            if pvals.len() != p_ast.tokens.len() {
                return Err(PolicyError::InvalidSize {
                    expected: p_ast.tokens.len(),
                    found: pvals.len(),
                }
                .into());
            }
            for (token, value) in p_ast.tokens.iter().zip(pvals) {
                ctx.set(token.as_str(), value.as_str());
            }

            let program = if with_eval {
                let expr = replace_eval(matcher, |name| {
                    p_ast
                        .tokens
                        .iter()
                        .position(|t| t == name)
                        .map(|i| pvals[i].as_str())
                })?;
                self.engine.compile(&expr)?
            } else {
                self.engine.compile(matcher)?
            };

            let effect = if !self.engine.evaluate_match(&program, &ctx)? {
                Effect::Indeterminate
            } else {
                match eft_index {
                    Some(i) => Effect::from_tag(&pvals[i]),
                    None => Effect::Allow,
                }
            };

            if stream.push(index, effect) {
                break;
            }
        }

        Ok((stream.next(), stream.explain()))
    }

    fn required(&self, sec: &str) -> Result<&crate::model::Assertion> {
        self.model
            .get_assertion(sec, sec)
            .ok_or_else(|| ModelError::MissingSection(sec.to_string()).into())
    }

    /// Built-in and custom functions plus one relation per grouping definition
    fn functions(&self) -> HashMap<String, Function> {
        let mut functions = self.fm.get_functions().clone();
        for key in self.model.keys(SEC_ROLE) {
            let rm = self.rm_map.get(&key).cloned();
            let g = generate_g_function(&key, rm);
            functions.insert(key, g);
        }
        functions
    }

    // ========================================================================
    // Runtime configuration
    // ========================================================================

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    pub fn enable_enforce(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn enable_auto_save(&mut self, auto_save: bool) {
        self.config.auto_save = auto_save;
    }

    pub fn enable_auto_build_role_links(&mut self, auto_build_role_links: bool) {
        self.config.auto_build_role_links = auto_build_role_links;
    }

    pub fn enable_auto_notify_watcher(&mut self, auto_notify_watcher: bool) {
        self.config.auto_notify_watcher = auto_notify_watcher;
    }

    pub fn get_model(&self) -> &Model {
        &self.model
    }

    pub fn get_mut_model(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Replace the model, resetting functions, effector and role managers
    ///
    /// Rows held by the new model are linked; call [`Enforcer::load_policy`]
    /// to load rows from the adapter.
    pub fn set_model(&mut self, model: Model) -> Result<()> {
        model.validate()?;
        self.effector = effector_for(model.effect_kind()?);
        self.rm_map = default_rm_map(&model, self.config.max_hierarchy_level);
        self.fm = FunctionMap::load();
        self.model = model;
        self.model.print_model();
        if self.config.auto_build_role_links {
            self.build_role_links()?;
        }
        Ok(())
    }

    pub fn get_adapter(&self) -> Option<Arc<dyn Adapter>> {
        self.adapter.clone()
    }

    pub fn set_adapter(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapter = Some(adapter);
    }

    /// Attach a watcher
    pub fn set_watcher(&mut self, watcher: Box<dyn Watcher>) {
        self.watcher = Some(watcher);
    }

    pub fn has_watcher(&self) -> bool {
        self.watcher.is_some()
    }

    /// Override the effector chosen from the model's effect expression
    pub fn set_effector(&mut self, effector: Arc<dyn Effector>) {
        self.effector = effector;
    }

    /// Register a custom matcher function
    pub fn add_function(&mut self, name: impl Into<String>, function: Function) {
        self.fm.add_function(name, function);
    }

    // ========================================================================
    // Role managers
    // ========================================================================

    /// Role manager of the `g` definition
    pub fn get_role_manager(&self) -> Option<SharedRoleManager> {
        self.get_named_role_manager(SEC_ROLE)
    }

    pub fn get_named_role_manager(&self, ptype: &str) -> Option<SharedRoleManager> {
        self.rm_map.get(ptype).cloned()
    }

    /// Replace the role manager of the `g` definition
    pub fn set_role_manager(&mut self, rm: SharedRoleManager) -> Result<()> {
        self.set_named_role_manager(SEC_ROLE, rm)
    }

    pub fn set_named_role_manager(&mut self, ptype: &str, rm: SharedRoleManager) -> Result<()> {
        self.rm_map.insert(ptype.to_string(), rm);
        if self.config.auto_build_role_links {
            self.build_role_links()?;
        }
        Ok(())
    }

    /// Compare role names of `ptype` with `matching_fn` instead of equality
    ///
    /// Returns false if `ptype` has no role manager.
    pub fn add_named_matching_fn(&mut self, ptype: &str, matching_fn: MatchingFn) -> Result<bool> {
        let Some(rm) = self.rm_map.get(ptype) else {
            return Ok(false);
        };
        rm.write().add_matching_fn(matching_fn);
        if self.config.auto_build_role_links {
            self.build_role_links()?;
        }
        Ok(true)
    }

    /// Rebuild every role graph from the grouping rows
    pub fn build_role_links(&mut self) -> Result<()> {
        self.model.build_role_links(&self.rm_map)
    }

    /// Apply added or removed grouping rows of `ptype` to its role graph
    pub fn build_incremental_role_links(&mut self, op: PolicyOp, ptype: &str, rules: &[Rule]) -> Result<()> {
        self.model
            .build_incremental_role_links(&self.rm_map, op, SEC_ROLE, ptype, rules)
    }

    // ========================================================================
    // Loading and saving
    // ========================================================================

    /// Reload every row from the adapter
    ///
    /// Rows are loaded into a copy of the model; the live model and role
    /// graphs change only once loading and linking succeeded.
    pub async fn load_policy(&mut self) -> Result<()> {
        let adapter = self.adapter.clone().ok_or(AdapterError::NotSet)?;
        let mut model = self.model.clone();
        model.clear_policy();
        adapter.load_policy(&mut model).await?;
        self.install(model)
    }

    /// Reload only the rows accepted by `filter`
    pub async fn load_filtered_policy(&mut self, filter: &Filter) -> Result<()> {
        let adapter = self.adapter.clone().ok_or(AdapterError::NotSet)?;
        let mut model = self.model.clone();
        model.clear_policy();
        adapter.load_filtered_policy(&mut model, filter).await?;
        self.install(model)
    }

    /// Append the rows accepted by `filter` to the current policy
    pub async fn load_incremental_filtered_policy(&mut self, filter: &Filter) -> Result<()> {
        let adapter = self.adapter.clone().ok_or(AdapterError::NotSet)?;
        let mut model = self.model.clone();
        adapter.load_filtered_policy(&mut model, filter).await?;
        self.install(model)
    }

    fn install(&mut self, mut model: Model) -> Result<()> {
        model.print_policy();
        if self.config.auto_build_role_links {
            model.build_role_links(&self.rm_map)?;
        }
        self.model = model;
        Ok(())
    }

    /// Whether the adapter holds a filtered view of the policy
    pub fn is_filtered(&self) -> bool {
        self.adapter.as_ref().is_some_and(|a| a.is_filtered())
    }

    /// Write every row back through the adapter
    ///
    /// # Errors
    /// Returns error if the loaded policy is filtered or no adapter is set
    pub async fn save_policy(&mut self) -> Result<()> {
        if self.is_filtered() {
            return Err(AdapterError::SaveFiltered.into());
        }
        let adapter = self.adapter.clone().ok_or(AdapterError::NotSet)?;
        adapter.save_policy(&self.model).await?;
        self.notify_watcher().await
    }

    /// Drop every row, keeping the definitions
    pub fn clear_policy(&mut self) -> Result<()> {
        self.model.clear_policy();
        if self.config.auto_build_role_links {
            self.build_role_links()?;
        }
        Ok(())
    }

    // ========================================================================
    // Internal mutation API
    // ========================================================================

    pub(crate) async fn add_policy_internal(&mut self, sec: &str, ptype: &str, rule: Rule) -> Result<bool> {
        if !self.model.add_policy(sec, ptype, rule.clone()) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.add_policy(sec, ptype, &rule).await)?;
        }
        if sec == SEC_ROLE && self.config.auto_build_role_links {
            self.build_incremental_role_links(PolicyOp::Add, ptype, &[rule])?;
        }
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn add_policies_internal(&mut self, sec: &str, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        if !self.model.add_policies(sec, ptype, &rules) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.add_policies(sec, ptype, &rules).await)?;
        }
        if sec == SEC_ROLE && self.config.auto_build_role_links {
            self.build_incremental_role_links(PolicyOp::Add, ptype, &rules)?;
        }
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn update_policy_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        old_rule: Rule,
        new_rule: Rule,
    ) -> Result<bool> {
        if !self.model.update_policy(sec, ptype, &old_rule, new_rule.clone()) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.update_policy(sec, ptype, &old_rule, &new_rule).await)?;
        }
        self.after_removal(sec)?;
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn update_policies_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        old_rules: Vec<Rule>,
        new_rules: Vec<Rule>,
    ) -> Result<bool> {
        if !self.model.update_policies(sec, ptype, &old_rules, &new_rules) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.update_policies(sec, ptype, &old_rules, &new_rules).await)?;
        }
        self.after_removal(sec)?;
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn remove_policy_internal(&mut self, sec: &str, ptype: &str, rule: Rule) -> Result<bool> {
        if !self.model.remove_policy(sec, ptype, &rule) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.remove_policy(sec, ptype, &rule).await)?;
        }
        self.after_removal(sec)?;
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn remove_policies_internal(&mut self, sec: &str, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        if !self.model.remove_policies(sec, ptype, &rules) {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(adapter.remove_policies(sec, ptype, &rules).await)?;
        }
        self.after_removal(sec)?;
        self.notify_watcher().await?;
        Ok(true)
    }

    pub(crate) async fn remove_filtered_policy_internal(
        &mut self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: Vec<String>,
    ) -> Result<bool> {
        if !self
            .model
            .remove_filtered_policy(sec, ptype, field_index, &field_values)
        {
            return Ok(false);
        }
        if let Some(adapter) = self.autosave_adapter() {
            tolerate_unsupported(
                adapter
                    .remove_filtered_policy(sec, ptype, field_index, &field_values)
                    .await,
            )?;
        }
        self.after_removal(sec)?;
        self.notify_watcher().await?;
        Ok(true)
    }

    fn autosave_adapter(&self) -> Option<Arc<dyn Adapter>> {
        if self.config.auto_save {
            self.adapter.clone()
        } else {
            None
        }
    }

    /// Rebuild role graphs after grouping rows were removed or replaced
    ///
    /// Links created through a matching function are not tied to single
    /// rows, so removal always rebuilds from scratch.
    fn after_removal(&mut self, sec: &str) -> Result<()> {
        if sec == SEC_ROLE && self.config.auto_build_role_links {
            self.build_role_links()?;
        }
        Ok(())
    }

    async fn notify_watcher(&self) -> Result<()> {
        if !self.config.auto_notify_watcher {
            return Ok(());
        }
        match &self.watcher {
            Some(watcher) => watcher.update().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enforcer")
            .field("model", &self.model)
            .field("adapter", &self.adapter.is_some())
            .field("watcher", &self.watcher.is_some())
            .field("role_managers", &self.rm_map.keys().collect::<Vec<_>>())
            .field("effector", &self.effector)
            .field("config", &self.config)
            .finish()
    }
}

fn default_rm_map(model: &Model, max_hierarchy_level: usize) -> HashMap<String, SharedRoleManager> {
    model
        .keys(SEC_ROLE)
        .into_iter()
        .map(|key| (key, shared(DefaultRoleManager::new(max_hierarchy_level))))
        .collect()
}

/// Treat a missing adapter capability as nothing to persist
fn tolerate_unsupported(result: Result<()>) -> Result<()> {
    match result {
        Err(AuthzError::Adapter(AdapterError::Unsupported(op))) => {
            debug!(op, "Adapter cannot persist incrementally");
            Ok(())
        }
        other => other,
    }
}

fn log_request(rvals: &[Value], allowed: bool, explain: &[String]) {
    let request = rvals
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if allowed {
        info!(request = %request, explain = ?explain, "Request allowed");
    } else {
        debug!(request = %request, explain = ?explain, "Request denied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherError;
    use crate::persist::MemoryAdapter;
    use crate::types::to_rule;

    const BASIC_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = r.sub == p.sub && r.obj == p.obj && r.act == p.act
"#;

    fn basic() -> Enforcer {
        let mut model = Model::from_text(BASIC_MODEL).unwrap();
        model.add_policy("p", "p", to_rule(&["alice", "data1", "read"]));
        model.add_policy("p", "p", to_rule(&["bob", "data2", "write"]));
        Enforcer::from_model(model).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = EnforcerConfig::default();
        assert!(config.enabled);
        assert!(config.auto_save);
        assert!(config.auto_build_role_links);
        assert!(config.auto_notify_watcher);
        assert_eq!(config.max_hierarchy_level, 10);

        let parsed: EnforcerConfig = serde_json::from_str(r#"{"auto_save": false}"#).unwrap();
        assert!(!parsed.auto_save);
        assert!(parsed.enabled);
    }

    #[test]
    fn test_basic_decisions() {
        let e = basic();
        assert!(e.enforce(["alice", "data1", "read"]).unwrap());
        assert!(!e.enforce(["alice", "data1", "write"]).unwrap());
        assert!(e.enforce(["bob", "data2", "write"]).unwrap());
        assert!(!e.enforce(["admin2", "data1", "read"]).unwrap());
    }

    #[test]
    fn test_enforce_ex_explains() {
        let e = basic();
        let (allowed, explain) = e.enforce_ex(["bob", "data2", "write"]).unwrap();
        assert!(allowed);
        assert_eq!(explain, vec!["bob", "data2", "write"]);

        let (allowed, explain) = e.enforce_ex(["bob", "data1", "write"]).unwrap();
        assert!(!allowed);
        assert!(explain.is_empty());
    }

    #[test]
    fn test_disabled_enforcer_denies() {
        let mut e = basic();
        e.enable_enforce(false);
        assert_eq!(
            e.enforce_ex(["alice", "data1", "read"]).unwrap(),
            (false, Vec::new())
        );
        // Arity is not even checked
        assert!(!e.enforce(["alice"]).unwrap());
    }

    #[test]
    fn test_request_arity_mismatch() {
        let e = basic();
        let err = e.enforce(["alice", "data1"]).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Request(RequestError::InvalidSize { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_policy_arity_mismatch() {
        let mut model = Model::from_text(BASIC_MODEL).unwrap();
        model.add_policy("p", "p", to_rule(&["alice", "data1"]));
        let e = Enforcer::from_model(model).unwrap();
        assert!(matches!(
            e.enforce(["alice", "data1", "read"]),
            Err(AuthzError::Policy(PolicyError::InvalidSize { .. }))
        ));
    }

    #[test]
    fn test_no_rows_uses_empty_bindings() {
        let text = BASIC_MODEL.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.sub == \"root\" || p.sub == r.sub",
        );
        let e = Enforcer::from_model(Model::from_text(&text).unwrap()).unwrap();
        assert!(e.enforce(["root", "x", "y"]).unwrap());
        assert!(!e.enforce(["alice", "x", "y"]).unwrap());
        assert!(e.enforce(["", "x", "y"]).unwrap());
    }

    #[test]
    fn test_eval_without_rows_fails() {
        let text = BASIC_MODEL
            .replace("p = sub, obj, act", "p = sub_rule, obj, act")
            .replace(
                "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
                "m = eval(p.sub_rule) && r.obj == p.obj && r.act == p.act",
            );
        let e = Enforcer::from_model(Model::from_text(&text).unwrap()).unwrap();
        assert!(matches!(
            e.enforce(["alice", "data1", "read"]),
            Err(AuthzError::Policy(PolicyError::EvalWithoutRules))
        ));
    }

    #[test]
    fn test_non_boolean_result_fails() {
        let text = BASIC_MODEL.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.sub",
        );
        let mut model = Model::from_text(&text).unwrap();
        model.add_policy("p", "p", to_rule(&["alice", "data1", "read"]));
        let e = Enforcer::from_model(model).unwrap();
        assert!(matches!(
            e.enforce(["alice", "data1", "read"]),
            Err(AuthzError::Matcher(MatcherError::NonBooleanResult(_)))
        ));
    }

    #[test]
    fn test_numeric_result_coerced() {
        let text = BASIC_MODEL.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.obj - 5",
        );
        let mut model = Model::from_text(&text).unwrap();
        model.add_policy("p", "p", to_rule(&["alice", "data1", "read"]));
        let e = Enforcer::from_model(model).unwrap();
        assert!(e.enforce(vec![Value::from("alice"), Value::from(7), Value::from("read")]).unwrap());
        assert!(!e.enforce(vec![Value::from("alice"), Value::from(5), Value::from("read")]).unwrap());
    }

    #[test]
    fn test_custom_function() {
        let text = BASIC_MODEL.replace(
            "m = r.sub == p.sub && r.obj == p.obj && r.act == p.act",
            "m = r.sub == p.sub && startsWith(r.obj, p.obj) && r.act == p.act",
        );
        let mut model = Model::from_text(&text).unwrap();
        model.add_policy("p", "p", to_rule(&["alice", "data", "read"]));
        let mut e = Enforcer::from_model(model).unwrap();
        e.add_function(
            "startsWith",
            crate::matcher::functions::string_predicate("startsWith", |a: &str, b: &str| a.starts_with(b)),
        );
        assert!(e.enforce(["alice", "data1", "read"]).unwrap());
        assert!(!e.enforce(["alice", "other", "read"]).unwrap());
    }

    #[tokio::test]
    async fn test_mutations_persist_to_adapter() {
        let adapter = Arc::new(MemoryAdapter::new());
        let model = Model::from_text(BASIC_MODEL).unwrap();
        let mut e = Enforcer::new(model, Some(adapter.clone() as Arc<dyn Adapter>))
            .await
            .unwrap();

        assert!(e
            .add_policy_internal("p", "p", to_rule(&["carol", "data3", "read"]))
            .await
            .unwrap());
        assert_eq!(adapter.rules("p", "p").await, vec![to_rule(&["carol", "data3", "read"])]);

        e.enable_auto_save(false);
        assert!(e
            .add_policy_internal("p", "p", to_rule(&["dave", "data4", "read"]))
            .await
            .unwrap());
        assert_eq!(adapter.len().await, 1);
        assert!(e.enforce(["dave", "data4", "read"]).unwrap());
    }

    #[tokio::test]
    async fn test_load_policy_requires_adapter() {
        let mut e = basic();
        assert!(matches!(
            e.load_policy().await,
            Err(AuthzError::Adapter(AdapterError::NotSet))
        ));
        // The model is untouched
        assert!(e.enforce(["alice", "data1", "read"]).unwrap());
    }

    #[tokio::test]
    async fn test_filtered_policy_cannot_be_saved() {
        let adapter = Arc::new(
            MemoryAdapter::new()
                .with_rules(
                    "p",
                    "p",
                    vec![to_rule(&["alice", "data1", "read"]), to_rule(&["bob", "data2", "write"])],
                )
                .await,
        );
        let model = Model::from_text(BASIC_MODEL).unwrap();
        let mut e = Enforcer::new(model, Some(adapter as Arc<dyn Adapter>)).await.unwrap();
        assert_eq!(e.get_model().get_policy("p", "p").len(), 2);

        let filter = Filter {
            p: vec!["alice".to_string()],
            g: Vec::new(),
        };
        e.load_filtered_policy(&filter).await.unwrap();
        assert!(e.is_filtered());
        assert_eq!(e.get_model().get_policy("p", "p").len(), 1);
        assert!(matches!(
            e.save_policy().await,
            Err(AuthzError::Adapter(AdapterError::SaveFiltered))
        ));

        let filter = Filter {
            p: vec!["bob".to_string()],
            g: Vec::new(),
        };
        e.load_incremental_filtered_policy(&filter).await.unwrap();
        assert_eq!(e.get_model().get_policy("p", "p").len(), 2);
    }

    #[test]
    fn test_invalid_model_rejected() {
        let text = BASIC_MODEL.replace("[matchers]\nm = r.sub == p.sub && r.obj == p.obj && r.act == p.act", "");
        let model = Model::from_text(&text).unwrap();
        assert!(matches!(
            Enforcer::from_model(model),
            Err(AuthzError::Model(ModelError::MissingSection(_)))
        ));
    }
}
