//! Per-call effect stream

use super::effector::Effector;
use super::Effect;
use std::sync::Arc;

/// Effects seen so far in one enforcement call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// An allow effect was recorded
    pub allow: bool,
    /// A deny effect was recorded
    pub deny: bool,
    /// Index of the row that decided the outcome, if any
    pub explain: Option<usize>,
}

impl Tally {
    pub fn record(&mut self, effect: Effect) {
        match effect {
            Effect::Allow => self.allow = true,
            Effect::Deny => self.deny = true,
            Effect::Indeterminate => {}
        }
    }
}

/// Feeds row effects to an effector until it has decided
pub struct EffectStream {
    effector: Arc<dyn Effector>,
    tally: Tally,
    done: bool,
}

impl EffectStream {
    pub fn new(effector: Arc<dyn Effector>) -> Self {
        Self {
            effector,
            tally: Tally::default(),
            done: false,
        }
    }

    /// Push the effect of row `index`; returns `true` when scanning can stop
    pub fn push(&mut self, index: usize, effect: Effect) -> bool {
        if !self.done {
            self.done = self.effector.push(&mut self.tally, index, effect);
        }
        self.done
    }

    /// Final decision
    pub fn next(&self) -> bool {
        self.effector.decide(&self.tally)
    }

    /// Index of the row that explains the decision
    pub fn explain(&self) -> Option<usize> {
        self.tally.explain
    }
}
