// Flat, identifier-keyed match arena. Brackets are not pointer trees: every
// lookup between rounds goes through the identifier index.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, EngineResult};
use crate::model::{BracketKind, Match};

/// All matches of a tournament (main, plate and group) in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCollection {
    matches: Vec<Match>,
    index: HashMap<String, usize>,
}

impl MatchCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate identifiers.
    pub fn from_matches(matches: Vec<Match>) -> EngineResult<Self> {
        let mut collection = Self::new();
        for m in matches {
            collection.insert(m)?;
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Match> {
        self.index.get(id).map(|&i| &self.matches[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Match> {
        self.index.get(id).map(|&i| &mut self.matches[i])
    }

    /// Look up a match or fail with `MatchNotFound`.
    pub fn require(&self, id: &str) -> EngineResult<&Match> {
        self.get(id)
            .ok_or_else(|| EngineError::MatchNotFound(id.to_string()))
    }

    pub fn require_mut(&mut self, id: &str) -> EngineResult<&mut Match> {
        self.get_mut(id)
            .ok_or_else(|| EngineError::MatchNotFound(id.to_string()))
    }

    pub fn insert(&mut self, m: Match) -> EngineResult<()> {
        if self.index.contains_key(&m.id) {
            return Err(EngineError::DuplicateMatch(m.id));
        }
        self.index.insert(m.id.clone(), self.matches.len());
        self.matches.push(m);
        Ok(())
    }

    /// Whole-record replace. The last accepted write wins in its entirety.
    pub fn replace(&mut self, mut m: Match) -> EngineResult<()> {
        let slot = self.require_mut(&m.id)?;
        m.revision = slot.revision + 1;
        *slot = m;
        Ok(())
    }

    /// Whole-record replace that fails if the stored record has moved on
    /// since `m` was read.
    pub fn replace_if_current(&mut self, m: Match) -> EngineResult<()> {
        let current = self.require(&m.id)?.revision;
        if current != m.revision {
            return Err(EngineError::StaleRevision {
                match_id: m.id,
                expected: m.revision,
                actual: current,
            });
        }
        self.replace(m)
    }

    /// Keep only the matches for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Match) -> bool) {
        self.matches.retain(keep);
        self.reindex();
    }

    pub fn extend(&mut self, matches: impl IntoIterator<Item = Match>) -> EngineResult<()> {
        for m in matches {
            self.insert(m)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Match> {
        self.matches.iter_mut()
    }

    pub fn iter_kind(&self, kind: BracketKind) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.kind == kind)
    }

    /// Largest round size present for a bracket kind (the earliest round).
    pub fn max_round_size(&self, kind: BracketKind) -> Option<u32> {
        self.iter_kind(kind).filter_map(|m| m.round_size).max()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.matches
    }

    fn reindex(&mut self) {
        self.index = self
            .matches
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
    }
}

impl Serialize for MatchCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.matches.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatchCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let matches = Vec::<Match>::deserialize(deserializer)?;
        MatchCollection::from_matches(matches).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
