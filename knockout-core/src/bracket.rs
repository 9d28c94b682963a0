use crate::size::BracketSize;
use crate::{EntrantSpot, Error, Match, MatchId, Matches, Participant, Result, Slot};

use std::collections::HashSet;

/// A single elimination bracket.
///
/// The bracket owns all [`Match`]es of a tournament. Matches can only be changed through
/// [`commit_winner`] and [`report_scores`], which keep the bracket consistent.
///
/// [`commit_winner`]: Self::commit_winner
/// [`report_scores`]: Self::report_scores
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bracket {
    pub(crate) size: BracketSize,
    pub(crate) matches: Matches,
    version: u64,
}

impl Bracket {
    /// Creates a new `Bracket` from the ordered `participants`. The order of `participants`
    /// is the seeding order.
    ///
    /// Byes are appended at the end: the first pairings of round 1 take two consecutive
    /// participants each, the last `byes` pairings take a single participant and a bye. Every
    /// match with a bye is decided immediately and its participant advances.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientParticipants`] if less than 2 participants are given and
    /// [`Error::DuplicateParticipantId`] if a participant id is listed multiple times.
    pub fn new<I>(participants: I) -> Result<Self>
    where
        I: IntoIterator<Item = Participant>,
    {
        let participants: Vec<Participant> = participants.into_iter().collect();

        log::debug!(
            "Creating new bracket with {} participants",
            participants.len()
        );

        let size = BracketSize::new(participants.len())?;

        let mut seen = HashSet::with_capacity(participants.len());
        for participant in &participants {
            if !seen.insert(participant.id) {
                return Err(Error::DuplicateParticipantId(participant.id));
            }
        }

        let mut matches = Vec::with_capacity(size.total_matches());

        let first_round = size.matches_in_round(1);
        let paired = first_round - size.byes();

        let mut participants = participants.into_iter();
        for position in 1..=first_round {
            let first = participants.next().map(Slot::participant);

            let second = if position <= paired {
                participants.next().map(Slot::participant)
            } else {
                None
            };

            let id = MatchId::new(1, position as u32);
            let r#match = Match::new(
                id,
                [
                    first.unwrap_or_else(Slot::bye),
                    second.unwrap_or_else(Slot::bye),
                ],
            );

            if r#match.is_degenerate() {
                log::error!("Seeding produced a match without participants: {}", id);
                return Err(Error::DegenerateMatch(id));
            }

            matches.push(r#match);
        }

        // Fill all following rounds with `TBD` matches.
        for round in 2..=size.rounds() {
            for position in 1..=size.matches_in_round(round) {
                matches.push(Match::new(
                    MatchId::new(round, position as u32),
                    [Slot::tbd(), Slot::tbd()],
                ));
            }
        }

        let mut this = Self {
            size,
            matches: Matches::from_vec(matches),
            version: 0,
        };

        // Forward all participants with a bye.
        for index in 0..first_round {
            let winner = this.matches[index].bye_winner().cloned();

            if let Some(winner) = winner {
                this.advance(index, winner);
            }
        }

        log::debug!(
            "Created new bracket with {} matches in {} rounds ({} byes)",
            this.matches.len(),
            size.rounds(),
            size.byes(),
        );

        Ok(this)
    }

    /// Resumes the bracket from existing matches.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if `matches` has an invalid number of matches, a match is not
    /// at the position its id addresses, a match has two byes or a winner that is not seated in
    /// that match. A seated slot after round 1 must hold the winner of the match feeding it.
    pub fn resume(matches: Vec<Match>, version: u64) -> Result<Self> {
        log::debug!(
            "Trying to resume bracket with {} matches at version {}",
            matches.len(),
            version
        );

        let found = matches.len();
        let padded = found + 1;

        if found == 0 || !padded.is_power_of_two() {
            return Err(Error::InvalidNumberOfMatches {
                expected: padded.next_power_of_two().max(2) - 1,
                found,
            });
        }

        // The entrant count is recovered from the byes in round 1.
        let byes = matches
            .iter()
            .take(padded / 2)
            .flat_map(|m| m.entrants.iter())
            .filter(|slot| slot.spot.is_bye())
            .count();

        let size = BracketSize::new(padded - byes)?;

        if size.padded() != padded {
            return Err(Error::InvalidNumberOfMatches {
                expected: size.total_matches(),
                found,
            });
        }

        for (index, m) in matches.iter().enumerate() {
            if size.match_id(index) != Some(m.id) || m.is_degenerate() {
                return Err(Error::InvalidMatch(m.id));
            }

            if m.round() > 1 && m.entrants.iter().any(|slot| slot.spot.is_bye()) {
                log::warn!("Resuming bracket with a bye in match {}", m.id);
            }

            if let Some(winner) = m.winner {
                if m.participant(winner).is_none() {
                    return Err(Error::InvalidMatch(m.id));
                }
            }
        }

        for m in &matches {
            let (next, slot) = match size.downstream(m.id) {
                Some(next) => next,
                None => continue,
            };

            let spot = size
                .index_of(next)
                .and_then(|index| matches.get(index))
                .map(|next| &next.entrants[slot].spot);

            let consistent = match (m.winner, spot) {
                (Some(winner), Some(EntrantSpot::Entrant(participant))) => {
                    participant.id == winner
                }
                (None, Some(EntrantSpot::TBD | EntrantSpot::Bye)) => true,
                _ => false,
            };

            if !consistent {
                log::debug!("Match {} does not hold the winner of match {}", next, m.id);
                return Err(Error::InvalidMatch(next));
            }
        }

        Ok(Self {
            size,
            matches: Matches::from_vec(matches),
            version,
        })
    }

    /// Returns the geometry of the bracket.
    #[inline]
    pub fn size(&self) -> BracketSize {
        self.size
    }

    /// Returns all matches of the bracket, ordered by round and position.
    #[inline]
    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    /// Returns the matches from the bracket.
    #[inline]
    pub fn into_matches(self) -> Matches {
        self.matches
    }

    /// Returns the version of the bracket. The version is maintained by the storage layer and
    /// never changed by the bracket itself.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Returns the match with the given `id`.
    pub fn get(&self, id: MatchId) -> Option<&Match> {
        let index = self.size.index_of(id)?;
        self.matches.get(index)
    }

    /// Sets the scores of the match `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MatchNotFound`] if the match does not exist and [`Error::InvalidMatch`]
    /// if the match does not have two seated participants.
    pub fn report_scores(&mut self, id: MatchId, scores: [i64; 2]) -> Result<&Match> {
        let index = self.size.index_of(id).ok_or(Error::MatchNotFound(id))?;

        let r#match = match self.matches.get_mut(index) {
            Some(r#match) => r#match,
            None => return Err(Error::MatchNotFound(id)),
        };

        if !r#match
            .entrants
            .iter()
            .all(|slot| matches!(slot.spot, EntrantSpot::Entrant(_)))
        {
            return Err(Error::InvalidMatch(id));
        }

        for (slot, score) in r#match.entrants.iter_mut().zip(scores) {
            slot.score = score;
        }

        log::debug!("Updated scores of match {} to {:?}", id, scores);

        Ok(r#match)
    }
}
