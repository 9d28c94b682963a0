use std::collections::HashMap;
use std::sync::Arc;

use knockout_core::{Bracket, Commit, Match, MatchId, Participant, ParticipantId};
use parking_lot::Mutex;

use crate::events::{Event, EventWriter};
use crate::store::{Store, TournamentId};
use crate::Error;

/// Applies bracket operations to the brackets in a [`Store`].
///
/// All mutations of a single tournament are serialized by a per-tournament lock, mutations of
/// different tournaments run in parallel. Events are emitted after the lock is released.
#[derive(Debug)]
pub struct Engine {
    store: Box<dyn Store>,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
    events: EventWriter,
}

impl Engine {
    pub fn new(store: Box<dyn Store>, events: EventWriter) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn lock(&self, id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(id).or_default().clone()
    }

    /// Builds and stores the bracket of tournament `id`.
    pub fn build_bracket(
        &self,
        id: TournamentId,
        participants: Vec<Participant>,
    ) -> Result<Bracket, Error> {
        let lock = self.lock(id);
        let _guard = lock.lock();

        let bracket = Bracket::new(participants)?;
        self.store.insert(id, &bracket)?;

        log::info!(
            "Built bracket for tournament {} with {} participants",
            id,
            bracket.size().entrants()
        );

        Ok(bracket)
    }

    /// Replaces the bracket of tournament `id` with a freshly built one. All results of the
    /// previous bracket are discarded.
    pub fn redraw(
        &self,
        id: TournamentId,
        participants: Vec<Participant>,
    ) -> Result<Bracket, Error> {
        let lock = self.lock(id);
        let _guard = lock.lock();

        let old = self.get_bracket(id)?;

        let mut bracket = Bracket::new(participants)?;
        bracket.set_version(old.version() + 1);
        self.store.compare_and_swap(id, old.version(), &bracket)?;

        log::info!(
            "Redrew bracket for tournament {} with {} participants",
            id,
            bracket.size().entrants()
        );

        Ok(bracket)
    }

    /// Commits `winner` as the winner of the match `match_id`.
    pub async fn commit_winner(
        &self,
        id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
    ) -> Result<Match, Error> {
        let commit = self.commit_locked(id, match_id, winner)?;

        for round in commit.rounds_completed {
            self.events
                .send(Event::RoundCompleted {
                    tournament_id: id,
                    round,
                })
                .await;
        }

        if let Some(champion) = commit.champion {
            self.events
                .send(Event::ChampionDecided {
                    tournament_id: id,
                    champion,
                })
                .await;
        }

        Ok(commit.r#match)
    }

    fn commit_locked(
        &self,
        id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
    ) -> Result<Commit, Error> {
        let lock = self.lock(id);
        let _guard = lock.lock();

        let mut bracket = self.get_bracket(id)?;
        let version = bracket.version();

        let commit = bracket.commit_winner(match_id, winner)?;
        if commit.changed {
            bracket.set_version(version + 1);
            self.store.compare_and_swap(id, version, &bracket)?;

            log::debug!(
                "Tournament {}: {} won match {} (version {})",
                id,
                winner,
                match_id,
                version + 1
            );
        }

        Ok(commit)
    }

    /// Updates the scores of the match `match_id`.
    pub fn report_scores(
        &self,
        id: TournamentId,
        match_id: MatchId,
        scores: [i64; 2],
    ) -> Result<Match, Error> {
        let lock = self.lock(id);
        let _guard = lock.lock();

        let mut bracket = self.get_bracket(id)?;
        let version = bracket.version();

        let r#match = bracket.report_scores(match_id, scores)?.clone();
        bracket.set_version(version + 1);
        self.store.compare_and_swap(id, version, &bracket)?;

        Ok(r#match)
    }

    /// Returns the bracket of tournament `id`.
    pub fn get_bracket(&self, id: TournamentId) -> Result<Bracket, Error> {
        self.store.get(id)?.ok_or(Error::TournamentNotFound(id))
    }

    pub fn get_match(&self, id: TournamentId, match_id: MatchId) -> Result<Match, Error> {
        let bracket = self.get_bracket(id)?;

        match bracket.get(match_id) {
            Some(r#match) => Ok(r#match.clone()),
            None => Err(knockout_core::Error::MatchNotFound(match_id).into()),
        }
    }

    /// Returns the matches of `round` ordered by position. The list is empty if the round
    /// does not exist.
    pub fn get_round(&self, id: TournamentId, round: u32) -> Result<Vec<Match>, Error> {
        let bracket = self.get_bracket(id)?;
        Ok(bracket.matches_for_round(round).to_vec())
    }

    pub fn get_champion(&self, id: TournamentId) -> Result<Option<Participant>, Error> {
        let bracket = self.get_bracket(id)?;
        Ok(bracket.champion())
    }
}
