//! Management API: policy and grouping rows on an [`Enforcer`]
//!
//! Unnamed methods act on the `p` and `g` assertions; `named` variants take
//! the assertion key (`p2`, `g2`, ...). Mutations return `Ok(false)` when
//! nothing changed.

use crate::enforcer::Enforcer;
use crate::error::Result;
use crate::types::{to_rule, Rule, SEC_POLICY, SEC_ROLE};

impl Enforcer {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Subjects appearing in `p` rows
    pub fn get_all_subjects(&self) -> Vec<String> {
        self.get_all_named_subjects(SEC_POLICY)
    }

    pub fn get_all_named_subjects(&self, ptype: &str) -> Vec<String> {
        self.get_model()
            .get_values_for_field_in_policy(SEC_POLICY, ptype, 0)
    }

    /// Objects appearing in `p` rows
    pub fn get_all_objects(&self) -> Vec<String> {
        self.get_all_named_objects(SEC_POLICY)
    }

    pub fn get_all_named_objects(&self, ptype: &str) -> Vec<String> {
        self.get_model()
            .get_values_for_field_in_policy(SEC_POLICY, ptype, 1)
    }

    /// Actions appearing in `p` rows
    pub fn get_all_actions(&self) -> Vec<String> {
        self.get_all_named_actions(SEC_POLICY)
    }

    pub fn get_all_named_actions(&self, ptype: &str) -> Vec<String> {
        self.get_model()
            .get_values_for_field_in_policy(SEC_POLICY, ptype, 2)
    }

    /// Roles appearing in `g` rows
    pub fn get_all_roles(&self) -> Vec<String> {
        self.get_all_named_roles(SEC_ROLE)
    }

    pub fn get_all_named_roles(&self, ptype: &str) -> Vec<String> {
        self.get_model()
            .get_values_for_field_in_policy(SEC_ROLE, ptype, 1)
    }

    pub fn get_policy(&self) -> Vec<Rule> {
        self.get_named_policy(SEC_POLICY)
    }

    pub fn get_named_policy(&self, ptype: &str) -> Vec<Rule> {
        self.get_model().get_policy(SEC_POLICY, ptype)
    }

    /// `p` rows whose fields from `field_index` match `field_values`
    ///
    /// An empty value matches any field.
    pub fn get_filtered_policy<S: AsRef<str>>(&self, field_index: usize, field_values: &[S]) -> Vec<Rule> {
        self.get_filtered_named_policy(SEC_POLICY, field_index, field_values)
    }

    pub fn get_filtered_named_policy<S: AsRef<str>>(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Vec<Rule> {
        self.get_model()
            .get_filtered_policy(SEC_POLICY, ptype, field_index, &to_rule(field_values))
    }

    pub fn get_grouping_policy(&self) -> Vec<Rule> {
        self.get_named_grouping_policy(SEC_ROLE)
    }

    pub fn get_named_grouping_policy(&self, ptype: &str) -> Vec<Rule> {
        self.get_model().get_policy(SEC_ROLE, ptype)
    }

    pub fn get_filtered_grouping_policy<S: AsRef<str>>(&self, field_index: usize, field_values: &[S]) -> Vec<Rule> {
        self.get_filtered_named_grouping_policy(SEC_ROLE, field_index, field_values)
    }

    pub fn get_filtered_named_grouping_policy<S: AsRef<str>>(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Vec<Rule> {
        self.get_model()
            .get_filtered_policy(SEC_ROLE, ptype, field_index, &to_rule(field_values))
    }

    pub fn has_policy<S: AsRef<str>>(&self, params: &[S]) -> bool {
        self.has_named_policy(SEC_POLICY, params)
    }

    pub fn has_named_policy<S: AsRef<str>>(&self, ptype: &str, params: &[S]) -> bool {
        self.get_model()
            .has_policy(SEC_POLICY, ptype, &to_rule(params))
    }

    pub fn has_grouping_policy<S: AsRef<str>>(&self, params: &[S]) -> bool {
        self.has_named_grouping_policy(SEC_ROLE, params)
    }

    pub fn has_named_grouping_policy<S: AsRef<str>>(&self, ptype: &str, params: &[S]) -> bool {
        self.get_model()
            .has_policy(SEC_ROLE, ptype, &to_rule(params))
    }

    // ========================================================================
    // Policy mutations
    // ========================================================================

    /// Add a `p` row; false if it already exists
    pub async fn add_policy<S: AsRef<str>>(&mut self, params: &[S]) -> Result<bool> {
        self.add_named_policy(SEC_POLICY, params).await
    }

    pub async fn add_named_policy<S: AsRef<str>>(&mut self, ptype: &str, params: &[S]) -> Result<bool> {
        self.add_policy_internal(SEC_POLICY, ptype, to_rule(params))
            .await
    }

    /// Add `p` rows; nothing is added if any already exists
    pub async fn add_policies(&mut self, rules: Vec<Rule>) -> Result<bool> {
        self.add_named_policies(SEC_POLICY, rules).await
    }

    pub async fn add_named_policies(&mut self, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        self.add_policies_internal(SEC_POLICY, ptype, rules).await
    }

    /// Replace a `p` row; false if the old row is absent
    pub async fn update_policy<S: AsRef<str>>(&mut self, old_rule: &[S], new_rule: &[S]) -> Result<bool> {
        self.update_named_policy(SEC_POLICY, old_rule, new_rule)
            .await
    }

    pub async fn update_named_policy<S: AsRef<str>>(
        &mut self,
        ptype: &str,
        old_rule: &[S],
        new_rule: &[S],
    ) -> Result<bool> {
        self.update_policy_internal(SEC_POLICY, ptype, to_rule(old_rule), to_rule(new_rule))
            .await
    }

    pub async fn update_policies(&mut self, old_rules: Vec<Rule>, new_rules: Vec<Rule>) -> Result<bool> {
        self.update_named_policies(SEC_POLICY, old_rules, new_rules)
            .await
    }

    pub async fn update_named_policies(
        &mut self,
        ptype: &str,
        old_rules: Vec<Rule>,
        new_rules: Vec<Rule>,
    ) -> Result<bool> {
        self.update_policies_internal(SEC_POLICY, ptype, old_rules, new_rules)
            .await
    }

    /// Remove a `p` row; false if it is absent
    pub async fn remove_policy<S: AsRef<str>>(&mut self, params: &[S]) -> Result<bool> {
        self.remove_named_policy(SEC_POLICY, params).await
    }

    pub async fn remove_named_policy<S: AsRef<str>>(&mut self, ptype: &str, params: &[S]) -> Result<bool> {
        self.remove_policy_internal(SEC_POLICY, ptype, to_rule(params))
            .await
    }

    /// Remove `p` rows; nothing is removed if any is absent
    pub async fn remove_policies(&mut self, rules: Vec<Rule>) -> Result<bool> {
        self.remove_named_policies(SEC_POLICY, rules).await
    }

    pub async fn remove_named_policies(&mut self, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        self.remove_policies_internal(SEC_POLICY, ptype, rules)
            .await
    }

    /// Remove `p` rows matching the field filter
    pub async fn remove_filtered_policy<S: AsRef<str>>(&mut self, field_index: usize, field_values: &[S]) -> Result<bool> {
        self.remove_filtered_named_policy(SEC_POLICY, field_index, field_values)
            .await
    }

    pub async fn remove_filtered_named_policy<S: AsRef<str>>(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Result<bool> {
        self.remove_filtered_policy_internal(SEC_POLICY, ptype, field_index, to_rule(field_values))
            .await
    }

    // ========================================================================
    // Grouping mutations
    // ========================================================================

    /// Add a `g` row; false if it already exists
    pub async fn add_grouping_policy<S: AsRef<str>>(&mut self, params: &[S]) -> Result<bool> {
        self.add_named_grouping_policy(SEC_ROLE, params).await
    }

    pub async fn add_named_grouping_policy<S: AsRef<str>>(&mut self, ptype: &str, params: &[S]) -> Result<bool> {
        self.add_policy_internal(SEC_ROLE, ptype, to_rule(params))
            .await
    }

    pub async fn add_grouping_policies(&mut self, rules: Vec<Rule>) -> Result<bool> {
        self.add_named_grouping_policies(SEC_ROLE, rules).await
    }

    pub async fn add_named_grouping_policies(&mut self, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        self.add_policies_internal(SEC_ROLE, ptype, rules).await
    }

    pub async fn update_grouping_policy<S: AsRef<str>>(&mut self, old_rule: &[S], new_rule: &[S]) -> Result<bool> {
        self.update_named_grouping_policy(SEC_ROLE, old_rule, new_rule)
            .await
    }

    pub async fn update_named_grouping_policy<S: AsRef<str>>(
        &mut self,
        ptype: &str,
        old_rule: &[S],
        new_rule: &[S],
    ) -> Result<bool> {
        self.update_policy_internal(SEC_ROLE, ptype, to_rule(old_rule), to_rule(new_rule))
            .await
    }

    pub async fn remove_grouping_policy<S: AsRef<str>>(&mut self, params: &[S]) -> Result<bool> {
        self.remove_named_grouping_policy(SEC_ROLE, params).await
    }

    pub async fn remove_named_grouping_policy<S: AsRef<str>>(&mut self, ptype: &str, params: &[S]) -> Result<bool> {
        self.remove_policy_internal(SEC_ROLE, ptype, to_rule(params))
            .await
    }

    pub async fn remove_grouping_policies(&mut self, rules: Vec<Rule>) -> Result<bool> {
        self.remove_named_grouping_policies(SEC_ROLE, rules).await
    }

    pub async fn remove_named_grouping_policies(&mut self, ptype: &str, rules: Vec<Rule>) -> Result<bool> {
        self.remove_policies_internal(SEC_ROLE, ptype, rules).await
    }

    pub async fn remove_filtered_grouping_policy<S: AsRef<str>>(
        &mut self,
        field_index: usize,
        field_values: &[S],
    ) -> Result<bool> {
        self.remove_filtered_named_grouping_policy(SEC_ROLE, field_index, field_values)
            .await
    }

    pub async fn remove_filtered_named_grouping_policy<S: AsRef<str>>(
        &mut self,
        ptype: &str,
        field_index: usize,
        field_values: &[S],
    ) -> Result<bool> {
        self.remove_filtered_policy_internal(SEC_ROLE, ptype, field_index, to_rule(field_values))
            .await
    }
}
