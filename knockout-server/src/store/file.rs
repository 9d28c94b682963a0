use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use knockout_core::Bracket;
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::{Store, TournamentId};
use crate::Error;

/// A [`Store`] writing every bracket to a json file `{tournament_id}.json` in a directory.
///
/// Files are replaced atomically: a bracket is written to a temporary file first and then
/// renamed over the old one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-compare-write sequences within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a new `FileStore` in the directory `path`. The directory is created if it
    /// doesn't exist.
    pub fn new<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_owned();
        fs::create_dir_all(&path)?;

        log::info!("Storing brackets in {:?}", path);

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    fn file(&self, id: TournamentId) -> PathBuf {
        self.path.join(format!("{}.json", id))
    }

    fn read(&self, id: TournamentId) -> Result<Option<Bracket>, Error> {
        let buf = match fs::read(self.file(id)) {
            Ok(buf) => buf,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(serde_json::from_slice(&buf)?))
    }

    fn write(&self, id: TournamentId, bracket: &Bracket) -> Result<(), Error> {
        let path = self.file(id);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec(bracket)?)?;
        fs::rename(&tmp, &path)?;

        log::trace!("Wrote bracket {} to {:?}", id, path);
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, id: TournamentId) -> Result<Option<Bracket>, Error> {
        blocking(|| {
            let _guard = self.lock.lock();
            self.read(id)
        })
    }

    fn insert(&self, id: TournamentId, bracket: &Bracket) -> Result<(), Error> {
        blocking(|| {
            let _guard = self.lock.lock();

            if self.file(id).exists() {
                return Err(Error::BracketExists(id));
            }

            self.write(id, bracket)
        })
    }

    fn compare_and_swap(
        &self,
        id: TournamentId,
        expected: u64,
        bracket: &Bracket,
    ) -> Result<(), Error> {
        blocking(|| {
            let _guard = self.lock.lock();

            let stored = self.read(id)?.ok_or(Error::TournamentNotFound(id))?;
            if stored.version() != expected {
                return Err(Error::ConcurrentModification {
                    expected,
                    found: stored.version(),
                });
            }

            self.write(id, bracket)
        })
    }
}

/// Runs `f` on the current worker thread after handing its other tasks to the remaining
/// workers. Outside of a multi-threaded runtime `f` is called directly.
fn blocking<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use knockout_core::{Bracket, MatchId, MatchState, Participant, ParticipantId};

    use super::{FileStore, Store, TournamentId};
    use crate::Error;

    fn temp_dir(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "knockout-file-store-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&path);
        path
    }

    fn bracket() -> Bracket {
        Bracket::new((1..=5).map(|id| Participant::new(ParticipantId(id), format!("Team {}", id))))
            .unwrap()
    }

    #[test]
    fn test_file_store_resume() {
        let path = temp_dir("resume");
        let id = TournamentId(7);

        let store = FileStore::new(&path).unwrap();
        assert_eq!(store.get(id).unwrap(), None);
        store.insert(id, &bracket()).unwrap();

        let mut next = bracket();
        next.commit_winner(MatchId::new(1, 1), ParticipantId(2))
            .unwrap();
        next.set_version(1);
        store.compare_and_swap(id, 0, &next).unwrap();
        drop(store);

        // A new store on the same directory sees the same bracket.
        let store = FileStore::new(&path).unwrap();
        let bracket = store.get(id).unwrap().unwrap();
        assert_eq!(bracket, next);
        assert_eq!(bracket.version(), 1);
        assert_eq!(
            bracket.get(MatchId::new(1, 1)).unwrap().state(),
            MatchState::Decided
        );

        fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_file_store_conflicts() {
        let path = temp_dir("conflicts");
        let id = TournamentId(1);

        let store = FileStore::new(&path).unwrap();
        store.insert(id, &bracket()).unwrap();

        assert!(matches!(
            store.insert(id, &bracket()),
            Err(Error::BracketExists(TournamentId(1)))
        ));
        assert!(matches!(
            store.compare_and_swap(id, 3, &bracket()),
            Err(Error::ConcurrentModification {
                expected: 3,
                found: 0
            })
        ));
        assert!(matches!(
            store.compare_and_swap(TournamentId(2), 0, &bracket()),
            Err(Error::TournamentNotFound(TournamentId(2)))
        ));

        fs::remove_dir_all(&path).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_store_multi_thread_runtime() {
        let path = temp_dir("multi-thread");
        let store = FileStore::new(&path).unwrap();

        store.insert(TournamentId(1), &bracket()).unwrap();
        store.compare_and_swap(TournamentId(1), 0, &bracket()).unwrap();
        assert_eq!(store.get(TournamentId(1)).unwrap(), Some(bracket()));

        fs::remove_dir_all(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_store_current_thread_runtime() {
        let path = temp_dir("current-thread");
        let store = FileStore::new(&path).unwrap();

        store.insert(TournamentId(1), &bracket()).unwrap();
        assert_eq!(store.get(TournamentId(1)).unwrap(), Some(bracket()));

        fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_file_store_corrupt() {
        let path = temp_dir("corrupt");
        let store = FileStore::new(&path).unwrap();

        fs::write(path.join("3.json"), b"{\"version\": 0, \"matches\": []}").unwrap();
        assert!(matches!(store.get(TournamentId(3)), Err(Error::Json(_))));

        fs::remove_dir_all(&path).unwrap();
    }
}
