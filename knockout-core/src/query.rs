use crate::{Bracket, Match, Participant};

use std::borrow::Cow;
use std::iter::FusedIterator;

impl Bracket {
    /// Returns all matches of `round` ordered by their position. Returns an empty slice if
    /// `round` does not exist.
    pub fn matches_for_round(&self, round: u32) -> &[Match] {
        &self.matches[self.size.round_range(round)]
    }

    /// Returns the final match.
    #[inline]
    pub fn final_match(&self) -> &Match {
        // A bracket always has at least one match, the final is the last one.
        &self.matches[self.matches.len() - 1]
    }

    /// Returns the champion of the bracket once the final match is decided.
    pub fn champion(&self) -> Option<Participant> {
        let r#final = self.final_match();
        let winner = r#final.winner()?;

        r#final.participant(winner).cloned()
    }

    /// Returns `true` if the final match is decided.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.final_match().winner().is_some()
    }

    /// Returns an iterator over all rounds of the bracket.
    #[inline]
    pub fn rounds(&self) -> Rounds<'_> {
        Rounds {
            bracket: self,
            next: 1,
        }
    }
}

/// A view on all matches of a single round.
#[derive(Copy, Clone, Debug)]
pub struct Round<'a> {
    number: u32,
    total: u32,
    matches: &'a [Match],
}

impl<'a> Round<'a> {
    /// The 1-based number of the round.
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The matches of this round ordered by position.
    #[inline]
    pub fn matches(&self) -> &'a [Match] {
        self.matches
    }

    /// Returns `true` if all matches of this round are decided.
    pub fn is_decided(&self) -> bool {
        self.matches.iter().all(|m| m.winner().is_some())
    }

    /// Returns a human readable name of the round.
    pub fn label(&self) -> Cow<'static, str> {
        match self.total - self.number {
            0 => Cow::Borrowed("Final"),
            1 => Cow::Borrowed("Semifinals"),
            2 => Cow::Borrowed("Quarterfinals"),
            _ => Cow::Owned(format!("Round {}", self.number)),
        }
    }
}

/// An iterator over the [`Round`]s of a [`Bracket`]. See [`Bracket::rounds`].
#[derive(Clone, Debug)]
pub struct Rounds<'a> {
    bracket: &'a Bracket,
    next: u32,
}

impl<'a> Iterator for Rounds<'a> {
    type Item = Round<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.bracket.size.rounds();
        if self.next > total {
            return None;
        }

        let round = Round {
            number: self.next,
            total,
            matches: self.bracket.matches_for_round(self.next),
        };

        self.next += 1;
        Some(round)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.bracket.size.rounds() + 1).saturating_sub(self.next) as usize;
        (len, Some(len))
    }
}

impl<'a> ExactSizeIterator for Rounds<'a> {}

impl<'a> FusedIterator for Rounds<'a> {}
