//! Ordered set of aspect conditions.

use super::clock::Clock;
use super::types::{Condition, ConditionType};

/// One condition slot per configured aspect, in configuration order
///
/// Built from the previously persisted conditions; aspects without a previous
/// value start out initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectConditions {
    conditions: Vec<Condition>,
}

impl AspectConditions {
    pub fn from_existing(
        clock: &dyn Clock,
        types: &[ConditionType],
        existing: &[Condition],
    ) -> Self {
        let conditions = types
            .iter()
            .map(|condition_type| Condition::get_or_init(clock, existing, condition_type))
            .collect();
        Self { conditions }
    }

    pub fn get(&self, condition_type: &ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| &c.condition_type == condition_type)
    }

    /// Replace the slot of the condition's type; conditions of unknown types
    /// are ignored
    pub fn set(&mut self, condition: Condition) {
        if let Some(slot) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            *slot = condition;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn into_vec(self) -> Vec<Condition> {
        self.conditions
    }
}
