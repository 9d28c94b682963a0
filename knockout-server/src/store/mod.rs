mod file;
mod id;
mod memory;

pub use file::FileStore;
pub use id::TournamentId;
pub use memory::MemoryStore;

use std::fmt::Debug;

use knockout_core::Bracket;

use crate::config::{StoreConfig, StoreKind};
use crate::Error;

/// Durable storage for brackets, keyed by [`TournamentId`].
///
/// Writes are guarded by the version of the stored bracket: a write only succeeds if the
/// stored version is still the one the caller has read.
///
/// All methods are called from async tasks. Implementations doing blocking I/O must move it
/// off the async worker, see [`FileStore`].
pub trait Store: Send + Sync + Debug {
    /// Returns the bracket of the tournament `id`, if one exists.
    fn get(&self, id: TournamentId) -> Result<Option<Bracket>, Error>;

    /// Stores a new bracket for the tournament `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BracketExists`] if the tournament already has a bracket.
    fn insert(&self, id: TournamentId, bracket: &Bracket) -> Result<(), Error>;

    /// Replaces the bracket of the tournament `id` if the stored bracket still has the
    /// version `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConcurrentModification`] if the stored version differs from
    /// `expected` and [`Error::TournamentNotFound`] if no bracket is stored.
    fn compare_and_swap(
        &self,
        id: TournamentId,
        expected: u64,
        bracket: &Bracket,
    ) -> Result<(), Error>;
}

/// Creates the [`Store`] selected by `config`.
pub fn from_config(config: &StoreConfig) -> Result<Box<dyn Store>, Error> {
    log::info!("Using {} store", config.kind);

    match config.kind {
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
        StoreKind::File => Ok(Box::new(FileStore::new(&config.path)?)),
    }
}
