use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Position;

/// Requirement categories a gate may be configured with. A category left as
/// `None` is treated as satisfied; a gate with no category at all can only
/// be opened explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_vim_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_collectible_keys: Option<Vec<String>>,
}

impl UnlockConditions {
    pub fn vim_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collected_vim_keys: Some(keys.into_iter().map(Into::into).collect()),
            required_collectible_keys: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.collected_vim_keys.is_none() && self.required_collectible_keys.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    position: Position,
    is_open: bool,
    unlock_conditions: UnlockConditions,
}

impl Gate {
    pub fn new(position: Position, unlock_conditions: UnlockConditions) -> Self {
        Self {
            position,
            is_open: false,
            unlock_conditions,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn unlock_conditions(&self) -> &UnlockConditions {
        &self.unlock_conditions
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn is_walkable(&self) -> bool {
        self.is_open
    }

    /// Advisory check over both requirement categories. The owning zone
    /// decides when to actually call [`Gate::open`].
    pub fn can_unlock(
        &self,
        collected_vim_keys: &BTreeSet<String>,
        collected_collectible_key_ids: &BTreeSet<String>,
    ) -> bool {
        if self.unlock_conditions.is_empty() {
            return false;
        }
        let vim_keys_met = self
            .unlock_conditions
            .collected_vim_keys
            .as_deref()
            .map_or(true, |required| all_present(required, collected_vim_keys));
        let collectibles_met = self
            .unlock_conditions
            .required_collectible_keys
            .as_deref()
            .map_or(true, |required| {
                all_present(required, collected_collectible_key_ids)
            });
        vim_keys_met && collectibles_met
    }

    pub(crate) fn shift(&mut self, dx: i32, dy: i32) {
        self.position = self.position.translate(dx, dy);
    }
}

pub(crate) fn all_present(required: &[String], collected: &BTreeSet<String>) -> bool {
    required.iter().all(|key| collected.contains(key))
}
