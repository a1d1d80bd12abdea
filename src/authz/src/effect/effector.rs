//! The four effect combinators

use super::stream::Tally;
use super::{Effect, EffectKind};
use std::fmt;
use std::sync::Arc;

/// Folds row effects into a decision
///
/// `push` sees rows in policy order and returns `true` once no later row can
/// change the outcome. Implementations record the deciding row in
/// [`Tally::explain`].
pub trait Effector: Send + Sync + fmt::Debug {
    /// Fold one row's effect into the tally
    fn push(&self, tally: &mut Tally, index: usize, effect: Effect) -> bool;

    /// Final decision after the scan
    fn decide(&self, tally: &Tally) -> bool;
}

/// The built-in effector for an effect expression
pub fn effector_for(kind: EffectKind) -> Arc<dyn Effector> {
    match kind {
        EffectKind::AllowOverride => Arc::new(AllowOverrideEffector),
        EffectKind::DenyOverride => Arc::new(DenyOverrideEffector),
        EffectKind::AllowAndDeny => Arc::new(AllowAndDenyEffector),
        EffectKind::Priority => Arc::new(PriorityEffector),
    }
}

/// `some(where (p_eft == allow))`: any allow wins
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowOverrideEffector;

impl Effector for AllowOverrideEffector {
    fn push(&self, tally: &mut Tally, index: usize, effect: Effect) -> bool {
        tally.record(effect);
        if effect == Effect::Allow {
            tally.explain = Some(index);
            return true;
        }
        false
    }

    fn decide(&self, tally: &Tally) -> bool {
        tally.allow
    }
}

/// `!some(where (p_eft == deny))`: allowed unless a row denies
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyOverrideEffector;

impl Effector for DenyOverrideEffector {
    fn push(&self, tally: &mut Tally, index: usize, effect: Effect) -> bool {
        tally.record(effect);
        if effect == Effect::Deny {
            tally.explain = Some(index);
            return true;
        }
        false
    }

    fn decide(&self, tally: &Tally) -> bool {
        !tally.deny
    }
}

/// `some(where (p_eft == allow)) && !some(where (p_eft == deny))`
///
/// An early allow can still be overturned, so only a deny ends the scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAndDenyEffector;

impl Effector for AllowAndDenyEffector {
    fn push(&self, tally: &mut Tally, index: usize, effect: Effect) -> bool {
        tally.record(effect);
        match effect {
            Effect::Deny => {
                tally.explain = Some(index);
                true
            }
            Effect::Allow => {
                if tally.explain.is_none() {
                    tally.explain = Some(index);
                }
                false
            }
            Effect::Indeterminate => false,
        }
    }

    fn decide(&self, tally: &Tally) -> bool {
        tally.allow && !tally.deny
    }
}

/// `priority(p_eft) || deny`: the first decisive row wins, otherwise deny
///
/// Rows are expected in priority order. The winning row is not reported as
/// the explanation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityEffector;

impl Effector for PriorityEffector {
    fn push(&self, tally: &mut Tally, _index: usize, effect: Effect) -> bool {
        if effect == Effect::Indeterminate {
            return false;
        }
        tally.record(effect);
        true
    }

    fn decide(&self, tally: &Tally) -> bool {
        tally.allow
    }
}
