//! A single model definition and its rows

use crate::error::{RbacError, Result};
use crate::rbac::{RoleManager, SharedRoleManager};
use crate::types::{PolicyOp, Rule};
use std::fmt;
use tracing::info;

/// One named definition (`r`, `p2`, `g`, `m`, ...)
#[derive(Clone, Default)]
pub struct Assertion {
    /// Definition key, e.g. `p` or `g2`
    pub key: String,

    /// Escaped expression, or the raw parameter list for `r`/`p`/`g`
    pub value: String,

    /// Parameter names (`p_sub`, `p_obj`, ...) for `r` and `p` definitions
    pub tokens: Vec<String>,

    /// Rows in insertion order
    pub policy: Vec<Rule>,

    /// Role manager the rows were linked into (grouping definitions only)
    pub rm: Option<SharedRoleManager>,
}

impl Assertion {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Number of fields a grouping row must carry, from the `_` placeholders
    pub fn grouping_arity(&self) -> Result<usize> {
        let count = self.value.matches('_').count();
        if count < 2 {
            return Err(RbacError::InvalidGrouping(format!(
                "the number of \"_\" in role definition `{}` should be at least 2",
                self.key
            ))
            .into());
        }
        Ok(count)
    }

    /// Check that every row can be linked
    pub fn validate_grouping(&self, rules: &[Rule]) -> Result<()> {
        let arity = self.grouping_arity()?;
        for rule in rules {
            if rule.len() < arity {
                return Err(RbacError::InvalidGrouping(format!(
                    "grouping policy elements do not meet role definition: {:?}",
                    rule
                ))
                .into());
            }
            if rule.len() > 3 {
                return Err(RbacError::DomainCount(rule.len() - 2).into());
            }
        }
        Ok(())
    }

    /// Link every row into `rm`
    ///
    /// Rows are checked before the first link is added, so an invalid row
    /// leaves `rm` untouched.
    pub fn build_role_links(&mut self, rm: SharedRoleManager) -> Result<()> {
        self.validate_grouping(&self.policy)?;
        {
            let mut guard = rm.write();
            for rule in &self.policy {
                link(&mut *guard, PolicyOp::Add, rule)?;
            }
            info!(key = %self.key, rows = self.policy.len(), "Built role links");
            guard.print_roles();
        }
        self.rm = Some(rm);
        Ok(())
    }

    /// Apply added or removed rows to `rm` without rebuilding it
    pub fn build_incremental_role_links(
        &mut self,
        rm: SharedRoleManager,
        op: PolicyOp,
        rules: &[Rule],
    ) -> Result<()> {
        self.validate_grouping(rules)?;
        {
            let mut guard = rm.write();
            for rule in rules {
                link(&mut *guard, op, rule)?;
            }
        }
        self.rm = Some(rm);
        Ok(())
    }
}

fn link(rm: &mut dyn RoleManager, op: PolicyOp, rule: &[String]) -> Result<()> {
    let domain = rule.get(2).map(String::as_str);
    match op {
        PolicyOp::Add => {
            rm.add_link(&rule[0], &rule[1], domain);
            Ok(())
        }
        PolicyOp::Remove => rm.delete_link(&rule[0], &rule[1], domain),
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("tokens", &self.tokens)
            .field("policy", &self.policy)
            .field("rm", &self.rm.is_some())
            .finish()
    }
}
