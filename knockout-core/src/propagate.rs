use crate::{Bracket, Error, Match, MatchId, MatchState, Participant, ParticipantId, Result, Slot};

/// The result of [`Bracket::commit_winner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The decided match.
    pub r#match: Match,
    /// `false` if the match was already decided with the same winner. Nothing was changed.
    pub changed: bool,
    /// The rounds that were completed by this commit, in ascending order. A commit completes
    /// more than one round if its winner advanced through a bye.
    pub rounds_completed: Vec<u32>,
    /// The champion if this commit decided the final match.
    pub champion: Option<Participant>,
}

impl Bracket {
    /// Commits `winner` as the winner of the match `id` and advances the winner into the
    /// following match.
    ///
    /// Committing the stored winner of an already decided match again is not an error and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::MatchNotFound`] if the match `id` does not exist.
    /// - [`Error::MatchAlreadyDecided`] if the match was decided with a different winner.
    /// - [`Error::InvalidWinner`] if either slot is not seated yet or `winner` is not one of
    /// the two seated participants.
    pub fn commit_winner(&mut self, id: MatchId, winner: ParticipantId) -> Result<Commit> {
        let index = self.size.index_of(id).ok_or(Error::MatchNotFound(id))?;
        let r#match = &self.matches[index];

        if let Some(stored) = r#match.winner {
            if stored != winner {
                return Err(Error::MatchAlreadyDecided {
                    match_id: id,
                    winner: stored,
                });
            }

            log::debug!("Match {} is already decided with winner {}", id, winner);

            return Ok(Commit {
                r#match: r#match.clone(),
                changed: false,
                rounds_completed: Vec::new(),
                champion: None,
            });
        }

        if r#match.state() != MatchState::AwaitingWinner {
            return Err(Error::InvalidWinner { match_id: id, winner });
        }

        let participant = match r#match.participant(winner) {
            Some(participant) => participant.clone(),
            None => return Err(Error::InvalidWinner { match_id: id, winner }),
        };

        let was_complete = self.is_complete();
        let last = self.advance(index, participant);

        let last_round = self.matches.get(last).map_or(id.round, |m| m.round());
        let rounds_completed = (id.round..=last_round)
            .filter(|round| {
                self.matches_for_round(*round)
                    .iter()
                    .all(|m| m.winner.is_some())
            })
            .collect();

        let champion = if was_complete {
            None
        } else {
            self.champion()
        };

        Ok(Commit {
            r#match: self.matches[index].clone(),
            changed: true,
            rounds_completed,
            champion,
        })
    }

    /// Decides the match at `index` with `winner` and writes the winner into its slot of the
    /// following match. A following match that now faces a bye is decided as well.
    ///
    /// Returns the index of the last match that was decided.
    pub(crate) fn advance(&mut self, mut index: usize, mut winner: Participant) -> usize {
        loop {
            let r#match = match self.matches.get_mut(index) {
                Some(r#match) => r#match,
                None => return index,
            };

            let id = r#match.id;
            r#match.winner = Some(winner.id);

            let (next, slot) = match self.size.downstream(id) {
                Some(next) => next,
                None => {
                    log::debug!("Match {} decided the final, champion is {}", id, winner.id);
                    return index;
                }
            };

            log::debug!("Advancing {} from {} to {}", winner.id, id, next);

            let decided = index;
            index = match self.size.index_of(next) {
                Some(index) => index,
                None => return decided,
            };

            let r#match = match self.matches.get_mut(index) {
                Some(r#match) => r#match,
                None => return decided,
            };

            r#match.entrants[slot] = Slot::participant(winner);

            match r#match.bye_winner() {
                Some(participant) => {
                    log::debug!("Match {} has a bye, advancing {}", next, participant.id);
                    winner = participant.clone();
                }
                None => return decided,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::participants;
    use crate::EntrantSpot;

    use super::*;

    fn id(round: u32, position: u32) -> MatchId {
        MatchId::new(round, position)
    }

    #[test]
    fn test_commit_winner_propagation() {
        let mut bracket = Bracket::new(participants(4)).unwrap();

        let commit = bracket.commit_winner(id(1, 1), ParticipantId(2)).unwrap();
        assert!(commit.changed);
        assert_eq!(commit.r#match.winner(), Some(ParticipantId(2)));
        assert_eq!(commit.r#match.state(), MatchState::Decided);
        assert!(commit.rounds_completed.is_empty());
        assert_eq!(commit.champion, None);

        let final_match = bracket.get(id(2, 1)).unwrap();
        assert_eq!(final_match.slot_a().participant_id(), Some(ParticipantId(2)));
        assert!(final_match.slot_b().spot.is_tbd());
        assert_eq!(final_match.state(), MatchState::Pending);

        let commit = bracket.commit_winner(id(1, 2), ParticipantId(3)).unwrap();
        assert_eq!(commit.rounds_completed, [1]);

        let final_match = bracket.get(id(2, 1)).unwrap();
        assert_eq!(final_match.slot_a().participant_id(), Some(ParticipantId(2)));
        assert_eq!(final_match.slot_b().participant_id(), Some(ParticipantId(3)));
        assert_eq!(final_match.slot_b().display_name(), "Artist 3");
        assert_eq!(final_match.state(), MatchState::AwaitingWinner);
    }

    #[test]
    fn test_commit_winner_champion() {
        let mut bracket = Bracket::new(participants(4)).unwrap();

        bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        bracket.commit_winner(id(1, 2), ParticipantId(4)).unwrap();
        assert_eq!(bracket.champion(), None);

        let commit = bracket.commit_winner(id(2, 1), ParticipantId(4)).unwrap();
        assert_eq!(commit.rounds_completed, [2]);
        assert_eq!(
            commit.champion,
            Some(Participant::new(ParticipantId(4), "Artist 4"))
        );
        assert_eq!(
            bracket.champion(),
            Some(Participant::new(ParticipantId(4), "Artist 4"))
        );
        assert!(bracket.is_complete());
        assert!(bracket
            .matches()
            .iter()
            .all(|m| m.state() == MatchState::Decided));
    }

    #[test]
    fn test_commit_winner_idempotent() {
        let mut bracket = Bracket::new(participants(4)).unwrap();

        bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        let before = bracket.clone();

        let commit = bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        assert!(!commit.changed);
        assert_eq!(commit.r#match.winner(), Some(ParticipantId(1)));
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_commit_winner_already_decided() {
        let mut bracket = Bracket::new(participants(4)).unwrap();

        bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        let before = bracket.clone();

        assert_eq!(
            bracket.commit_winner(id(1, 1), ParticipantId(2)),
            Err(Error::MatchAlreadyDecided {
                match_id: id(1, 1),
                winner: ParticipantId(1),
            })
        );
        assert_eq!(bracket, before);
        assert_eq!(bracket.get(id(1, 1)).unwrap().winner(), Some(ParticipantId(1)));
    }

    #[test]
    fn test_commit_winner_invalid() {
        let mut bracket = Bracket::new(participants(4)).unwrap();

        assert_eq!(
            bracket.commit_winner(id(3, 1), ParticipantId(1)),
            Err(Error::MatchNotFound(id(3, 1)))
        );
        assert_eq!(
            bracket.commit_winner(id(1, 3), ParticipantId(1)),
            Err(Error::MatchNotFound(id(1, 3)))
        );

        // Not a participant of this match.
        assert_eq!(
            bracket.commit_winner(id(1, 1), ParticipantId(3)),
            Err(Error::InvalidWinner {
                match_id: id(1, 1),
                winner: ParticipantId(3),
            })
        );

        // Slot B is still TBD.
        bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        assert_eq!(
            bracket.commit_winner(id(2, 1), ParticipantId(1)),
            Err(Error::InvalidWinner {
                match_id: id(2, 1),
                winner: ParticipantId(1),
            })
        );
    }

    #[test]
    fn test_commit_winner_bye_match() {
        let mut bracket = Bracket::new(participants(3)).unwrap();

        // Already decided through the bye.
        let commit = bracket.commit_winner(id(1, 2), ParticipantId(3)).unwrap();
        assert!(!commit.changed);

        let commit = bracket.commit_winner(id(1, 1), ParticipantId(1)).unwrap();
        assert_eq!(commit.rounds_completed, [1]);

        let commit = bracket.commit_winner(id(2, 1), ParticipantId(3)).unwrap();
        assert_eq!(
            commit.champion,
            Some(Participant::new(ParticipantId(3), "Artist 3"))
        );
    }

    #[test]
    fn test_commit_winner_bye_cascade() {
        // A stored bracket with a bye in the final.
        let mut matches = Bracket::new(participants(4)).unwrap().into_matches().to_vec();
        matches[2].entrants = [Slot::tbd(), Slot::bye()];

        let mut bracket = Bracket::resume(matches, 0).unwrap();

        let commit = bracket.commit_winner(id(1, 1), ParticipantId(2)).unwrap();
        assert!(commit.changed);
        assert_eq!(commit.r#match.id(), id(1, 1));
        assert_eq!(commit.rounds_completed, [2]);
        assert_eq!(
            commit.champion,
            Some(Participant::new(ParticipantId(2), "Artist 2"))
        );

        let final_match = bracket.get(id(2, 1)).unwrap();
        assert_eq!(final_match.winner(), Some(ParticipantId(2)));
        assert!(matches!(final_match.slot_b().spot, EntrantSpot::Bye));
        assert_eq!(
            bracket.champion(),
            Some(Participant::new(ParticipantId(2), "Artist 2"))
        );
    }

    #[test]
    fn test_commit_winner_full_run() {
        for n in 2..=33 {
            let mut bracket = Bracket::new(participants(n)).unwrap();

            // The participant with the lower id always wins.
            for round in 1..=bracket.size().rounds() {
                let ids: Vec<_> = bracket
                    .matches_for_round(round)
                    .iter()
                    .filter(|m| m.state() == MatchState::AwaitingWinner)
                    .map(|m| {
                        let winner = m.slot_a().participant_id().min(m.slot_b().participant_id());
                        (m.id(), winner.unwrap())
                    })
                    .collect();

                for (match_id, winner) in ids {
                    bracket.commit_winner(match_id, winner).unwrap();
                }

                assert!(bracket
                    .matches_for_round(round)
                    .iter()
                    .all(|m| m.state() == MatchState::Decided));
            }

            assert_eq!(
                bracket.champion().map(|p| p.id),
                Some(ParticipantId(1)),
                "n = {}",
                n
            );
        }
    }
}
