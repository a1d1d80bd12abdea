//! Row storage operations on the model
//!
//! Rows are unique within an assertion. Batch operations are all-or-nothing:
//! a batch add fails if any row already exists and a batch removal fails if
//! any row is missing, in both cases without touching the model.

use super::Model;
use crate::types::{Rule, RULE_SECTIONS};

impl Model {
    /// Rows of `sec`/`key`, or an empty slice if the assertion does not exist
    pub fn policy(&self, sec: &str, key: &str) -> &[Rule] {
        self.get_assertion(sec, key)
            .map(|ast| ast.policy.as_slice())
            .unwrap_or(&[])
    }

    /// All rows of `sec`/`key`
    pub fn get_policy(&self, sec: &str, key: &str) -> Vec<Rule> {
        self.policy(sec, key).to_vec()
    }

    /// Rows whose fields from `field_index` on match `field_values`
    ///
    /// An empty filter value matches anything. No filter values selects every
    /// row.
    pub fn get_filtered_policy(
        &self,
        sec: &str,
        key: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Vec<Rule> {
        self.policy(sec, key)
            .iter()
            .filter(|rule| matches_filter(rule, field_index, field_values))
            .cloned()
            .collect()
    }

    /// Whether `rule` is stored under `sec`/`key`
    pub fn has_policy(&self, sec: &str, key: &str, rule: &[String]) -> bool {
        self.policy(sec, key).iter().any(|r| r.as_slice() == rule)
    }

    /// Append `rule` unless it already exists
    pub fn add_policy(&mut self, sec: &str, key: &str, rule: Rule) -> bool {
        if self.has_policy(sec, key, &rule) {
            return false;
        }
        match self.get_assertion_mut(sec, key) {
            Some(ast) => {
                ast.policy.push(rule);
                true
            }
            None => false,
        }
    }

    /// Append all `rules`, or none if any already exists
    pub fn add_policies(&mut self, sec: &str, key: &str, rules: &[Rule]) -> bool {
        if rules.iter().any(|rule| self.has_policy(sec, key, rule)) {
            return false;
        }
        match self.get_assertion_mut(sec, key) {
            Some(ast) => {
                ast.policy.extend(rules.iter().cloned());
                true
            }
            None => false,
        }
    }

    /// Replace `old_rule` with `new_rule`
    ///
    /// The old row is removed and the new one appended; the new row is not
    /// checked for duplicates.
    pub fn update_policy(&mut self, sec: &str, key: &str, old_rule: &[String], new_rule: Rule) -> bool {
        if !self.has_policy(sec, key, old_rule) {
            return false;
        }
        let Some(ast) = self.get_assertion_mut(sec, key) else {
            return false;
        };
        ast.policy.retain(|r| r.as_slice() != old_rule);
        ast.policy.push(new_rule);
        true
    }

    /// Replace every row of `old_rules` with `new_rules`
    ///
    /// Fails without changes unless all old rows are present.
    pub fn update_policies(&mut self, sec: &str, key: &str, old_rules: &[Rule], new_rules: &[Rule]) -> bool {
        if !old_rules.iter().all(|rule| self.has_policy(sec, key, rule)) {
            return false;
        }
        let Some(ast) = self.get_assertion_mut(sec, key) else {
            return false;
        };
        ast.policy.retain(|r| !old_rules.contains(r));
        ast.policy.extend(new_rules.iter().cloned());
        true
    }

    /// Remove `rule` if present
    pub fn remove_policy(&mut self, sec: &str, key: &str, rule: &[String]) -> bool {
        if !self.has_policy(sec, key, rule) {
            return false;
        }
        let Some(ast) = self.get_assertion_mut(sec, key) else {
            return false;
        };
        ast.policy.retain(|r| r.as_slice() != rule);
        true
    }

    /// Remove all `rules`, or none if any is missing
    pub fn remove_policies(&mut self, sec: &str, key: &str, rules: &[Rule]) -> bool {
        if !rules.iter().all(|rule| self.has_policy(sec, key, rule)) {
            return false;
        }
        let Some(ast) = self.get_assertion_mut(sec, key) else {
            return false;
        };
        ast.policy.retain(|r| !rules.contains(r));
        true
    }

    /// Remove rows whose fields from `field_index` on match `field_values`
    ///
    /// An empty filter value matches anything. With no filter values nothing
    /// is removed. Returns true if any row was removed.
    pub fn remove_filtered_policy(
        &mut self,
        sec: &str,
        key: &str,
        field_index: usize,
        field_values: &[String],
    ) -> bool {
        if field_values.is_empty() {
            return false;
        }
        let Some(ast) = self.get_assertion_mut(sec, key) else {
            return false;
        };
        let before = ast.policy.len();
        ast.policy
            .retain(|rule| !matches_filter(rule, field_index, field_values));
        ast.policy.len() != before
    }

    /// Distinct values of field `field_index`, in first-seen order
    pub fn get_values_for_field_in_policy(&self, sec: &str, key: &str, field_index: usize) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for rule in self.policy(sec, key) {
            if let Some(value) = rule.get(field_index) {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        values
    }

    /// Distinct values of field `field_index` across every assertion of `sec`
    pub fn get_values_for_field_in_section(&self, sec: &str, field_index: usize) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for key in self.keys(sec) {
            for value in self.get_values_for_field_in_policy(sec, &key, field_index) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        values
    }

    /// Drop every policy and grouping row, keeping the definitions
    pub fn clear_policy(&mut self) {
        for sec in RULE_SECTIONS {
            if let Some(asts) = self.sections.get_mut(sec) {
                for ast in asts.values_mut() {
                    ast.policy.clear();
                }
            }
        }
    }
}

fn matches_filter(rule: &[String], field_index: usize, field_values: &[String]) -> bool {
    field_values.iter().enumerate().all(|(i, value)| {
        value.is_empty()
            || field_index
                .checked_add(i)
                .and_then(|j| rule.get(j))
                .is_some_and(|field| field == value)
    })
}
