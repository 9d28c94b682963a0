//! # Bracket Rendering
//!
//! The `render` module provides a single rendering contract for brackets of any size. A
//! [`Renderer`] receives the [`Rounds`] of a bracket, each with its matches ordered by position,
//! and lays them out as it likes. The number of rounds and matches per round is derived from
//! the [`BracketSize`] of the bracket.
//!
//! [`BracketSize`]: crate::BracketSize
use crate::{Bracket, Match, MatchState, Rounds, Slot};

use std::fmt::Write;

/// A renderer used to render any [`Bracket`].
pub trait Renderer {
    fn render(&mut self, rounds: Rounds<'_>);
}

impl Bracket {
    /// Renders the bracket using the given [`Renderer`].
    #[inline]
    pub fn render<R>(&self, renderer: &mut R)
    where
        R: Renderer,
    {
        renderer.render(self.rounds());
    }
}

/// A [`Renderer`] writing a plain text representation of the bracket.
///
/// ```text
/// Semifinals
///   R1M1  Artist 1 (0) vs Artist 2 (0)
///   R1M2  Artist 3 (0) vs BYE (0)  -> Artist 3
/// Final
///   R2M1  TBD (0) vs Artist 3 (0)
/// ```
#[derive(Clone, Debug, Default)]
pub struct TextRenderer {
    buf: String,
}

impl TextRenderer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.buf
    }

    fn write_match(&mut self, r#match: &Match) {
        let _ = write!(
            self.buf,
            "  {}  {} vs {}",
            r#match.id(),
            SlotDisplay(r#match.slot_a()),
            SlotDisplay(r#match.slot_b()),
        );

        if r#match.state() == MatchState::Decided {
            if let Some(winner) = r#match.winner().and_then(|id| r#match.participant(id)) {
                let _ = write!(self.buf, "  -> {}", winner.display_name);
            }
        }

        self.buf.push('\n');
    }
}

impl Renderer for TextRenderer {
    fn render(&mut self, rounds: Rounds<'_>) {
        for round in rounds {
            let _ = writeln!(self.buf, "{}", round.label());

            for r#match in round.matches() {
                self.write_match(r#match);
            }
        }
    }
}

struct SlotDisplay<'a>(&'a Slot);

impl<'a> std::fmt::Display for SlotDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0.display_name(), self.0.score)
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::participants;
    use crate::{MatchId, ParticipantId};

    use super::*;

    #[derive(Debug, Default)]
    struct TestRenderer {
        rounds: Vec<Vec<MatchId>>,
    }

    impl Renderer for TestRenderer {
        fn render(&mut self, rounds: Rounds<'_>) {
            for round in rounds {
                self.rounds
                    .push(round.matches().iter().map(|m| m.id()).collect());
            }
        }
    }

    #[test]
    fn test_render_generic() {
        for n in [2, 5, 8, 13] {
            let bracket = Bracket::new(participants(n)).unwrap();

            let mut renderer = TestRenderer::default();
            bracket.render(&mut renderer);

            let size = bracket.size();
            assert_eq!(renderer.rounds.len(), size.rounds() as usize);

            for (index, round) in renderer.rounds.iter().enumerate() {
                let number = index as u32 + 1;
                assert_eq!(round.len(), size.matches_in_round(number));
                assert!(round
                    .iter()
                    .enumerate()
                    .all(|(i, id)| *id == MatchId::new(number, i as u32 + 1)));
            }
        }
    }

    #[test]
    fn test_render_text() {
        let mut bracket = Bracket::new(participants(3)).unwrap();
        bracket
            .commit_winner(MatchId::new(1, 1), ParticipantId(1))
            .unwrap();

        let mut renderer = TextRenderer::new();
        bracket.render(&mut renderer);

        assert_eq!(
            renderer.into_inner(),
            "Semifinals\n  \
             R1M1  Artist 1 (0) vs Artist 2 (0)  -> Artist 1\n  \
             R1M2  Artist 3 (0) vs BYE (0)  -> Artist 3\n\
             Final\n  \
             R2M1  Artist 1 (0) vs Artist 3 (0)\n"
        );
    }
}
