//! Policy persistence
//!
//! Adapters move policy and grouping rows between a backing store and a
//! [`Model`]. Only `load_policy` and `save_policy` are required; incremental
//! writes and filtered loads are capabilities an adapter may lack, reported as
//! [`AdapterError::Unsupported`].

pub mod file_adapter;
pub mod memory_adapter;
pub mod watcher;

pub use file_adapter::FileAdapter;
pub use memory_adapter::MemoryAdapter;
pub use watcher::{BroadcastWatcher, UpdateCallback, Watcher};

use crate::error::{AdapterError, Result};
use crate::model::Model;
use crate::types::{Rule, RULE_SECTIONS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage for policy rows
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Load every stored row into `model`
    async fn load_policy(&self, model: &mut Model) -> Result<()>;

    /// Replace the stored rows with the rows of `model`
    async fn save_policy(&self, model: &Model) -> Result<()>;

    /// Load only the rows accepted by `filter`
    async fn load_filtered_policy(&self, _model: &mut Model, _filter: &Filter) -> Result<()> {
        Err(AdapterError::Unsupported("load_filtered_policy").into())
    }

    /// Whether the last load was filtered
    fn is_filtered(&self) -> bool {
        false
    }

    async fn add_policy(&self, _sec: &str, _ptype: &str, _rule: &[String]) -> Result<()> {
        Err(AdapterError::Unsupported("add_policy").into())
    }

    async fn add_policies(&self, sec: &str, ptype: &str, rules: &[Rule]) -> Result<()> {
        for rule in rules {
            self.add_policy(sec, ptype, rule).await?;
        }
        Ok(())
    }

    async fn remove_policy(&self, _sec: &str, _ptype: &str, _rule: &[String]) -> Result<()> {
        Err(AdapterError::Unsupported("remove_policy").into())
    }

    async fn remove_policies(&self, sec: &str, ptype: &str, rules: &[Rule]) -> Result<()> {
        for rule in rules {
            self.remove_policy(sec, ptype, rule).await?;
        }
        Ok(())
    }

    async fn remove_filtered_policy(
        &self,
        _sec: &str,
        _ptype: &str,
        _field_index: usize,
        _field_values: &[String],
    ) -> Result<()> {
        Err(AdapterError::Unsupported("remove_filtered_policy").into())
    }

    async fn update_policy(&self, sec: &str, ptype: &str, old_rule: &[String], new_rule: &[String]) -> Result<()> {
        self.remove_policy(sec, ptype, old_rule).await?;
        self.add_policy(sec, ptype, new_rule).await
    }

    async fn update_policies(&self, sec: &str, ptype: &str, old_rules: &[Rule], new_rules: &[Rule]) -> Result<()> {
        self.remove_policies(sec, ptype, old_rules).await?;
        self.add_policies(sec, ptype, new_rules).await
    }
}

/// Field prefixes selecting the rows of a filtered load
///
/// `p` applies to policy rows and `g` to grouping rows; an empty value
/// matches any field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub p: Vec<String>,
    #[serde(default)]
    pub g: Vec<String>,
}

impl Filter {
    /// Whether a row of section `sec` passes the filter
    pub fn accepts(&self, sec: &str, fields: &[String]) -> bool {
        let prefix = match sec {
            "p" => &self.p,
            "g" => &self.g,
            _ => return true,
        };
        prefix
            .iter()
            .enumerate()
            .all(|(i, want)| want.is_empty() || fields.get(i).is_some_and(|have| have == want))
    }
}

/// Split a text line into its key and fields
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_policy_line(line: &str) -> Option<(String, Rule)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut tokens = line.split(',').map(|t| t.trim().to_string());
    let key = tokens.next().filter(|k| !k.is_empty())?;
    Some((key, tokens.collect()))
}

/// Load one text line into `model`
///
/// The section is the first character of the key; lines naming an unknown
/// assertion are skipped.
pub fn load_policy_line(line: &str, model: &mut Model) {
    let Some((key, rule)) = parse_policy_line(line) else {
        return;
    };
    load_policy_rule(&key, rule, model);
}

/// Add a row under `key` to `model`, skipping unknown assertions
pub fn load_policy_rule(key: &str, rule: Rule, model: &mut Model) {
    let Some(sec) = key.get(..1) else {
        return;
    };
    if model.get_assertion(sec, key).is_some() {
        model.add_policy(sec, key, rule);
    }
}

/// Render one row as `key, field1, field2, ...`
pub fn policy_line(key: &str, rule: &[String]) -> String {
    let mut line = key.to_string();
    for field in rule {
        line.push_str(", ");
        line.push_str(field);
    }
    line
}

/// Every row of `model` as text lines, policy rows before grouping rows
pub fn policy_lines(model: &Model) -> Vec<String> {
    let mut lines = Vec::new();
    for sec in RULE_SECTIONS {
        let Some(asts) = model.section(sec) else {
            continue;
        };
        for (key, ast) in asts {
            lines.extend(ast.policy.iter().map(|rule| policy_line(key, rule)));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_parse_policy_line() {
        assert_eq!(
            parse_policy_line("p, alice, data1, read"),
            Some(("p".to_string(), s(&["alice", "data1", "read"])))
        );
        assert_eq!(
            parse_policy_line("  g,bob ,admin  "),
            Some(("g".to_string(), s(&["bob", "admin"])))
        );
        assert_eq!(parse_policy_line(""), None);
        assert_eq!(parse_policy_line("   "), None);
        assert_eq!(parse_policy_line("# p, alice, data1, read"), None);
    }

    #[test]
    fn test_load_policy_line_skips_unknown_keys() {
        let mut model = Model::from_text(MODEL).unwrap();
        load_policy_line("p, alice, data1, read", &mut model);
        load_policy_line("g, alice, admin", &mut model);
        load_policy_line("p2, bob, data2, write", &mut model);
        load_policy_line("x, y", &mut model);

        assert_eq!(model.get_policy("p", "p"), vec![s(&["alice", "data1", "read"])]);
        assert_eq!(model.get_policy("g", "g"), vec![s(&["alice", "admin"])]);
        assert!(model.get_assertion("p", "p2").is_none());
    }

    #[test]
    fn test_policy_lines() {
        let mut model = Model::from_text(MODEL).unwrap();
        model.add_policy("g", "g", s(&["alice", "admin"]));
        model.add_policy("p", "p", s(&["admin", "data1", "read"]));
        assert_eq!(
            policy_lines(&model),
            vec!["p, admin, data1, read", "g, alice, admin"]
        );
    }

    #[test]
    fn test_filter_accepts() {
        let filter = Filter {
            p: s(&["", "domain1"]),
            g: s(&["", "", "domain1"]),
        };
        assert!(filter.accepts("p", &s(&["admin", "domain1", "data1", "read"])));
        assert!(!filter.accepts("p", &s(&["admin", "domain2", "data2", "read"])));
        assert!(filter.accepts("g", &s(&["alice", "admin", "domain1"])));
        assert!(!filter.accepts("g", &s(&["bob", "admin"])));
        assert!(Filter::default().accepts("p", &s(&["anything"])));
    }
}
