//! Effect combination
//!
//! Each matching policy row contributes an [`Effect`]. The model's policy
//! effect expression selects the [`Effector`] that folds those row effects into
//! one decision, stopping the scan early where the expression allows it.

pub mod effector;
pub mod stream;

pub use effector::{
    effector_for, AllowAndDenyEffector, AllowOverrideEffector, DenyOverrideEffector, Effector,
    PriorityEffector,
};
pub use stream::{EffectStream, Tally};

use crate::error::ModelError;
use std::fmt;

/// Per-row effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Allow,
    Indeterminate,
    Deny,
}

impl Effect {
    /// Effect named by a row's `p_eft` value
    ///
    /// `allow` and `deny` map to themselves; any other tag is indeterminate.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "allow" => Effect::Allow,
            "deny" => Effect::Deny,
            _ => Effect::Indeterminate,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => write!(f, "allow"),
            Effect::Indeterminate => write!(f, "indeterminate"),
            Effect::Deny => write!(f, "deny"),
        }
    }
}

/// The supported policy effect expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// `some(where (p_eft == allow))`
    AllowOverride,
    /// `!some(where (p_eft == deny))`
    DenyOverride,
    /// `some(where (p_eft == allow)) && !some(where (p_eft == deny))`
    AllowAndDeny,
    /// `priority(p_eft) || deny`
    Priority,
}

impl EffectKind {
    pub const ALLOW_OVERRIDE: &'static str = "some(where (p_eft == allow))";
    pub const DENY_OVERRIDE: &'static str = "!some(where (p_eft == deny))";
    pub const ALLOW_AND_DENY: &'static str =
        "some(where (p_eft == allow)) && !some(where (p_eft == deny))";
    pub const PRIORITY: &'static str = "priority(p_eft) || deny";

    /// Recognise an effect expression, ignoring whitespace
    pub fn from_expr(expr: &str) -> Result<Self, ModelError> {
        let compact = strip_whitespace(expr);
        [
            EffectKind::AllowOverride,
            EffectKind::DenyOverride,
            EffectKind::AllowAndDeny,
            EffectKind::Priority,
        ]
        .into_iter()
        .find(|kind| strip_whitespace(kind.as_expr()) == compact)
        .ok_or_else(|| ModelError::UnsupportedEffect(expr.to_string()))
    }

    /// Canonical expression text
    pub fn as_expr(&self) -> &'static str {
        match self {
            EffectKind::AllowOverride => Self::ALLOW_OVERRIDE,
            EffectKind::DenyOverride => Self::DENY_OVERRIDE,
            EffectKind::AllowAndDeny => Self::ALLOW_AND_DENY,
            EffectKind::Priority => Self::PRIORITY,
        }
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(Effect::from_tag("allow"), Effect::Allow);
        assert_eq!(Effect::from_tag("deny"), Effect::Deny);
        assert_eq!(Effect::from_tag("audit"), Effect::Indeterminate);
        assert_eq!(Effect::from_tag(""), Effect::Indeterminate);
    }

    #[test]
    fn test_from_expr_ignores_whitespace() {
        assert_eq!(
            EffectKind::from_expr("some(where (p_eft==allow))").unwrap(),
            EffectKind::AllowOverride
        );
        assert_eq!(
            EffectKind::from_expr("!some(where (p_eft == deny))").unwrap(),
            EffectKind::DenyOverride
        );
        assert_eq!(
            EffectKind::from_expr("some(where (p_eft==allow)) && !some(where (p_eft==deny))").unwrap(),
            EffectKind::AllowAndDeny
        );
        assert_eq!(
            EffectKind::from_expr("priority(p_eft)||deny").unwrap(),
            EffectKind::Priority
        );
    }

    #[test]
    fn test_unsupported_effect() {
        assert_eq!(
            EffectKind::from_expr("some(where (p_eft == audit))"),
            Err(ModelError::UnsupportedEffect("some(where (p_eft == audit))".into()))
        );
    }
}
