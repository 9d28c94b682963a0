use crate::{Error, MatchId, Result};

/// The maximum number of participants a single bracket accepts.
pub const MAX_ENTRANTS: usize = 1 << 24;

/// Returns the smallest power of two greater than or equal to `n`.
///
/// # Errors
///
/// Returns [`Error::InsufficientParticipants`] if `n < 2` and [`Error::TooManyParticipants`]
/// if `n` exceeds [`MAX_ENTRANTS`].
pub fn next_power_of_two(n: usize) -> Result<usize> {
    if n < 2 {
        return Err(Error::InsufficientParticipants { found: n });
    }

    if n > MAX_ENTRANTS {
        return Err(Error::TooManyParticipants { found: n });
    }

    Ok(n.next_power_of_two())
}

/// Returns the number of rounds of a bracket with `padded_size` slots in the first round.
#[inline]
pub fn round_count(padded_size: usize) -> u32 {
    debug_assert!(padded_size.is_power_of_two());

    padded_size.trailing_zeros()
}

/// Returns the number of byes required to pad `n` participants to `padded_size`.
#[inline]
pub fn bye_count(n: usize, padded_size: usize) -> usize {
    padded_size.saturating_sub(n)
}

/// The geometry of a single elimination bracket.
///
/// Matches are laid out flat: all matches of round 1 ordered by position, followed by all
/// matches of round 2 and so on. The final match is always the last one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BracketSize {
    entrants: usize,
    padded: usize,
}

impl BracketSize {
    /// Creates the `BracketSize` for `entrants` participants.
    pub fn new(entrants: usize) -> Result<Self> {
        let padded = next_power_of_two(entrants)?;

        Ok(Self { entrants, padded })
    }

    #[inline]
    pub fn entrants(&self) -> usize {
        self.entrants
    }

    #[inline]
    pub fn padded(&self) -> usize {
        self.padded
    }

    #[inline]
    pub fn byes(&self) -> usize {
        bye_count(self.entrants, self.padded)
    }

    #[inline]
    pub fn rounds(&self) -> u32 {
        round_count(self.padded)
    }

    #[inline]
    pub fn total_matches(&self) -> usize {
        self.padded - 1
    }

    /// Returns the number of matches in `round`, or 0 if the round does not exist.
    pub fn matches_in_round(&self, round: u32) -> usize {
        if round == 0 || round > self.rounds() {
            0
        } else {
            self.padded >> round
        }
    }

    /// Returns the flat index of the first match in `round`. `round` must exist.
    #[inline]
    fn round_offset(&self, round: u32) -> usize {
        self.padded - (self.padded >> (round - 1))
    }

    /// Returns the flat indexes of all matches in `round`.
    pub fn round_range(&self, round: u32) -> std::ops::Range<usize> {
        match self.matches_in_round(round) {
            0 => 0..0,
            n => {
                let start = self.round_offset(round);
                start..start + n
            }
        }
    }

    /// Returns the flat index of the match `id`, or `None` if the match does not exist.
    pub fn index_of(&self, id: MatchId) -> Option<usize> {
        let matches = self.matches_in_round(id.round);

        if id.position == 0 || id.position as usize > matches {
            return None;
        }

        Some(self.round_offset(id.round) + id.position as usize - 1)
    }

    /// Returns the [`MatchId`] stored at the flat `index`.
    pub fn match_id(&self, index: usize) -> Option<MatchId> {
        if index >= self.total_matches() {
            return None;
        }

        let mut round = 1;
        while index >= self.round_offset(round) + self.matches_in_round(round) {
            round += 1;
        }

        let position = index - self.round_offset(round) + 1;
        Some(MatchId::new(round, position as u32))
    }

    /// Returns `true` if `id` is the final match.
    #[inline]
    pub fn is_final(&self, id: MatchId) -> bool {
        id == MatchId::new(self.rounds(), 1)
    }

    /// Returns the match the winner of `id` advances to together with the slot it is written
    /// to. Odd positions feed slot A (0), even positions feed slot B (1). Returns `None` for the
    /// final match.
    pub fn downstream(&self, id: MatchId) -> Option<(MatchId, usize)> {
        if id.round >= self.rounds() {
            return None;
        }

        let next = MatchId::new(id.round + 1, (id.position + 1) / 2);
        let slot = ((id.position - 1) % 2) as usize;

        Some((next, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(
            next_power_of_two(0),
            Err(Error::InsufficientParticipants { found: 0 })
        );
        assert_eq!(
            next_power_of_two(1),
            Err(Error::InsufficientParticipants { found: 1 })
        );
        assert_eq!(next_power_of_two(2), Ok(2));
        assert_eq!(next_power_of_two(3), Ok(4));
        assert_eq!(next_power_of_two(5), Ok(8));
        assert_eq!(next_power_of_two(8), Ok(8));
        assert_eq!(next_power_of_two(9), Ok(16));
        assert_eq!(next_power_of_two((1 << 16) - 1), Ok(1 << 16));
        assert_eq!(next_power_of_two(1 << 16), Ok(1 << 16));
        assert_eq!(next_power_of_two((1 << 16) + 1), Ok(1 << 17));
        assert_eq!(
            next_power_of_two(MAX_ENTRANTS + 1),
            Err(Error::TooManyParticipants {
                found: MAX_ENTRANTS + 1
            })
        );
    }

    #[test]
    fn test_round_and_bye_count() {
        assert_eq!(round_count(2), 1);
        assert_eq!(round_count(8), 3);
        assert_eq!(round_count(1 << 16), 16);

        assert_eq!(bye_count(5, 8), 3);
        assert_eq!(bye_count(8, 8), 0);
    }

    #[test]
    fn test_bracket_size() {
        let size = BracketSize::new(5).unwrap();

        assert_eq!(size.entrants(), 5);
        assert_eq!(size.padded(), 8);
        assert_eq!(size.byes(), 3);
        assert_eq!(size.rounds(), 3);
        assert_eq!(size.total_matches(), 7);

        assert_eq!(size.matches_in_round(0), 0);
        assert_eq!(size.matches_in_round(1), 4);
        assert_eq!(size.matches_in_round(2), 2);
        assert_eq!(size.matches_in_round(3), 1);
        assert_eq!(size.matches_in_round(4), 0);

        assert_eq!(size.round_range(1), 0..4);
        assert_eq!(size.round_range(2), 4..6);
        assert_eq!(size.round_range(3), 6..7);
        assert_eq!(size.round_range(4), 0..0);
    }

    #[test]
    fn test_bracket_size_index_of() {
        let size = BracketSize::new(8).unwrap();

        assert_eq!(size.index_of(MatchId::new(1, 1)), Some(0));
        assert_eq!(size.index_of(MatchId::new(1, 4)), Some(3));
        assert_eq!(size.index_of(MatchId::new(2, 1)), Some(4));
        assert_eq!(size.index_of(MatchId::new(2, 2)), Some(5));
        assert_eq!(size.index_of(MatchId::new(3, 1)), Some(6));

        assert_eq!(size.index_of(MatchId::new(1, 5)), None);
        assert_eq!(size.index_of(MatchId::new(1, 0)), None);
        assert_eq!(size.index_of(MatchId::new(0, 1)), None);
        assert_eq!(size.index_of(MatchId::new(3, 2)), None);
        assert_eq!(size.index_of(MatchId::new(4, 1)), None);

        for index in 0..size.total_matches() {
            let id = size.match_id(index).unwrap();
            assert_eq!(size.index_of(id), Some(index));
        }
        assert_eq!(size.match_id(size.total_matches()), None);
    }

    #[test]
    fn test_bracket_size_downstream() {
        let size = BracketSize::new(8).unwrap();

        assert_eq!(
            size.downstream(MatchId::new(1, 1)),
            Some((MatchId::new(2, 1), 0))
        );
        assert_eq!(
            size.downstream(MatchId::new(1, 2)),
            Some((MatchId::new(2, 1), 1))
        );
        assert_eq!(
            size.downstream(MatchId::new(1, 3)),
            Some((MatchId::new(2, 2), 0))
        );
        assert_eq!(
            size.downstream(MatchId::new(1, 4)),
            Some((MatchId::new(2, 2), 1))
        );
        assert_eq!(
            size.downstream(MatchId::new(2, 2)),
            Some((MatchId::new(3, 1), 1))
        );
        assert_eq!(size.downstream(MatchId::new(3, 1)), None);

        assert!(size.is_final(MatchId::new(3, 1)));
        assert!(!size.is_final(MatchId::new(2, 1)));
    }

    #[test]
    fn test_bracket_size_two_entrants() {
        let size = BracketSize::new(2).unwrap();

        assert_eq!(size.rounds(), 1);
        assert_eq!(size.total_matches(), 1);
        assert!(size.is_final(MatchId::new(1, 1)));
        assert_eq!(size.downstream(MatchId::new(1, 1)), None);
    }
}
