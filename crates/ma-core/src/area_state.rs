//! Area state tags and the state set an area holds

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Named states an area can hold
///
/// Occupied and Clear are mutually exclusive; exactly one of the pair is
/// present after every evaluation. All other tags are overlays that combine
/// freely, except Dark/Bright which are complements when a dark-tracking
/// entity is configured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AreaState {
    Occupied,
    Clear,
    Extended,
    Sleep,
    Dark,
    Bright,
}

impl AreaState {
    /// The state tag as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaState::Occupied => "occupied",
            AreaState::Clear => "clear",
            AreaState::Extended => "extended",
            AreaState::Sleep => "sleep",
            AreaState::Dark => "dark",
            AreaState::Bright => "bright",
        }
    }

    /// Whether this tag is one of the core occupied/clear pair
    pub fn is_core(&self) -> bool {
        matches!(self, AreaState::Occupied | AreaState::Clear)
    }
}

impl fmt::Display for AreaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of named states an area currently holds
///
/// Diffed between evaluations to produce (new_states, lost_states).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSet(BTreeSet<AreaState>);

impl StateSet {
    /// Create an empty state set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state tag
    pub fn insert(&mut self, state: AreaState) {
        self.0.insert(state);
    }

    /// Remove a state tag
    pub fn remove(&mut self, state: AreaState) {
        self.0.remove(&state);
    }

    /// Check whether a state tag is held
    pub fn contains(&self, state: AreaState) -> bool {
        self.0.contains(&state)
    }

    /// Check whether no state tags are held
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of state tags held
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the held state tags
    pub fn iter(&self) -> impl Iterator<Item = AreaState> + '_ {
        self.0.iter().copied()
    }

    /// The held state tags as a vector (for attribute exposure)
    pub fn to_vec(&self) -> Vec<AreaState> {
        self.0.iter().copied().collect()
    }

    /// Diff against a previous state set
    ///
    /// Returns (new_states, lost_states): tags present here but not in
    /// `previous`, and tags present in `previous` but not here.
    pub fn diff(&self, previous: &StateSet) -> (StateSet, StateSet) {
        let new_states = self.0.difference(&previous.0).copied().collect();
        let lost_states = previous.0.difference(&self.0).copied().collect();
        (StateSet(new_states), StateSet(lost_states))
    }
}

impl FromIterator<AreaState> for StateSet {
    fn from_iter<I: IntoIterator<Item = AreaState>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StateSet {
    type Item = AreaState;
    type IntoIter = std::collections::btree_set::IntoIter<AreaState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
