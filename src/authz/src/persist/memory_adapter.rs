//! In-memory adapter

use super::{load_policy_rule, Adapter, Filter};
use crate::error::Result;
use crate::model::Model;
use crate::types::{Rule, RULE_SECTIONS};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type Rows = BTreeMap<(String, String), Vec<Rule>>;

/// Adapter holding rows in process memory, keyed by section and assertion
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    rows: Arc<RwLock<Rows>>,
    filtered: Arc<AtomicBool>,
}

impl MemoryAdapter {
    /// Create an empty in-memory adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `rules` under `sec`/`ptype`
    pub async fn with_rules(self, sec: &str, ptype: &str, rules: Vec<Rule>) -> Self {
        {
            let mut rows = self.rows.write().await;
            let stored = rows.entry((sec.to_string(), ptype.to_string())).or_default();
            for rule in rules {
                if !stored.contains(&rule) {
                    stored.push(rule);
                }
            }
        }
        self
    }

    /// Stored rows of `sec`/`ptype`
    pub async fn rules(&self, sec: &str, ptype: &str) -> Vec<Rule> {
        let rows = self.rows.read().await;
        rows.get(&(sec.to_string(), ptype.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of stored rows across all assertions
    pub async fn len(&self) -> usize {
        let rows = self.rows.read().await;
        rows.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn load_policy(&self, model: &mut Model) -> Result<()> {
        let rows = self.rows.read().await;
        for ((_, ptype), rules) in rows.iter() {
            for rule in rules {
                load_policy_rule(ptype, rule.clone(), model);
            }
        }
        self.filtered.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn save_policy(&self, model: &Model) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.clear();
        for sec in RULE_SECTIONS {
            let Some(asts) = model.section(sec) else {
                continue;
            };
            for (key, ast) in asts {
                if !ast.policy.is_empty() {
                    rows.insert((sec.to_string(), key.clone()), ast.policy.clone());
                }
            }
        }
        Ok(())
    }

    async fn load_filtered_policy(&self, model: &mut Model, filter: &Filter) -> Result<()> {
        let rows = self.rows.read().await;
        for ((sec, ptype), rules) in rows.iter() {
            for rule in rules.iter().filter(|rule| filter.accepts(sec, rule)) {
                load_policy_rule(ptype, rule.clone(), model);
            }
        }
        self.filtered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered.load(Ordering::SeqCst)
    }

    async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let mut rows = self.rows.write().await;
        let stored = rows.entry((sec.to_string(), ptype.to_string())).or_default();
        if !stored.iter().any(|r| r.as_slice() == rule) {
            stored.push(rule.to_vec());
        }
        Ok(())
    }

    async fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> Result<()> {
        let mut rows = self.rows.write().await;
        if let Some(stored) = rows.get_mut(&(sec.to_string(), ptype.to_string())) {
            stored.retain(|r| r.as_slice() != rule);
        }
        Ok(())
    }

    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()> {
        if field_values.is_empty() {
            return Ok(());
        }
        let mut rows = self.rows.write().await;
        if let Some(stored) = rows.get_mut(&(sec.to_string(), ptype.to_string())) {
            stored.retain(|rule| {
                !field_values.iter().enumerate().all(|(i, value)| {
                    value.is_empty()
                        || field_index
                            .checked_add(i)
                            .and_then(|j| rule.get(j))
                            .is_some_and(|f| f == value)
                })
            });
        }
        Ok(())
    }
}
