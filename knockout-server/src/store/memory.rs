use std::collections::hash_map::Entry;
use std::collections::HashMap;

use knockout_core::Bracket;
use parking_lot::RwLock;

use super::{Store, TournamentId};
use crate::Error;

/// A [`Store`] keeping all brackets in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    brackets: RwLock<HashMap<TournamentId, Bracket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, id: TournamentId) -> Result<Option<Bracket>, Error> {
        let brackets = self.brackets.read();
        Ok(brackets.get(&id).cloned())
    }

    fn insert(&self, id: TournamentId, bracket: &Bracket) -> Result<(), Error> {
        let mut brackets = self.brackets.write();

        match brackets.entry(id) {
            Entry::Occupied(_) => Err(Error::BracketExists(id)),
            Entry::Vacant(entry) => {
                entry.insert(bracket.clone());
                Ok(())
            }
        }
    }

    fn compare_and_swap(
        &self,
        id: TournamentId,
        expected: u64,
        bracket: &Bracket,
    ) -> Result<(), Error> {
        let mut brackets = self.brackets.write();

        let stored = brackets
            .get_mut(&id)
            .ok_or(Error::TournamentNotFound(id))?;

        if stored.version() != expected {
            return Err(Error::ConcurrentModification {
                expected,
                found: stored.version(),
            });
        }

        *stored = bracket.clone();
        Ok(())
    }
}
