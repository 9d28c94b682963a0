//! # knockout-core
//!
//! This crate contains the single elimination bracket engine: building a bracket from an
//! ordered list of participants, addressing matches by their round and position, resolving
//! byes and propagating winners until a champion is decided.
//!
//! Important types:
//! - [`Bracket`]: The aggregate of all matches of one tournament.
//! - [`Match`]: A *match* or *heat* of two [`Slot`]s, addressed by a [`MatchId`].
//! - [`Slot`]: A spot within a match. It contains a participant, a bye or a to-be-done spot.
//! - [`EntrantSpot`]: The state of a [`Slot`].
//! - [`BracketSize`]: The geometry of a bracket for a given number of participants.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to all public types.
//!
mod bracket;
mod propagate;
mod query;
pub mod render;
mod size;

#[cfg(feature = "serde")]
mod serde_impl;

pub use bracket::Bracket;
pub use propagate::Commit;
pub use query::{Round, Rounds};
pub use size::{bye_count, next_power_of_two, round_count, BracketSize, MAX_ENTRANTS};

use thiserror::Error;

use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::ops::{Deref, Index};
use std::result;
use std::str::FromStr;
use std::vec::IntoIter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An opaque identifier of a participant, supplied by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ParticipantId(pub u64);

impl Display for ParticipantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ParticipantId {
    type Err = ParseIntError;

    #[inline]
    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for ParticipantId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// An admitted participant of a tournament. The engine never modifies a `Participant`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
}

impl Participant {
    #[inline]
    pub fn new<T>(id: ParticipantId, display_name: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// A spot for an entrant in the bracket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntrantSpot<T> {
    Entrant(T),
    /// A permanently absent opponent.
    Bye,
    /// The winner of an undecided match.
    TBD,
}

impl<T> EntrantSpot<T> {
    /// Creates a new `EntrantSpot` from an [`Option`]. A `Some(T)` value will translate into
    /// a `Entrant(T)` value, a `None` value will translate into a `Bye` value.
    pub fn new(entrant: Option<T>) -> Self {
        match entrant {
            Some(entrant) => Self::Entrant(entrant),
            None => Self::Bye,
        }
    }

    /// Returns `true` if the `EntrantSpot` is [`Entrant`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use knockout_core::EntrantSpot;
    /// let spot = EntrantSpot::Entrant(());
    /// assert!(spot.is_entrant());
    /// ```
    ///
    /// [`Entrant`]: Self::Entrant
    pub fn is_entrant(&self) -> bool {
        matches!(self, Self::Entrant(_))
    }

    /// Returns `true` if the `EntrantSpot` is [`Bye`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use knockout_core::EntrantSpot;
    /// let spot: EntrantSpot<()> = EntrantSpot::Bye;
    /// assert!(spot.is_bye());
    /// ```
    ///
    /// [`Bye`]: Self::Bye
    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye)
    }

    /// Returns `true` if the `EntrantSpot` is [`TBD`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use knockout_core::EntrantSpot;
    /// let spot: EntrantSpot<()> = EntrantSpot::TBD;
    /// assert!(spot.is_tbd());
    /// ```
    ///
    /// [`TBD`]: Self::TBD
    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::TBD)
    }

    /// Returns the entrant if the spot is [`Self::Entrant`].
    pub fn entrant(&self) -> Option<&T> {
        match self {
            Self::Entrant(entrant) => Some(entrant),
            _ => None,
        }
    }

    /// Converts an `&EntrantSpot<T>` into an `EntrantSpot<&T>`.
    pub fn as_ref(&self) -> EntrantSpot<&T> {
        match *self {
            Self::Entrant(ref entrant) => EntrantSpot::Entrant(entrant),
            Self::Bye => EntrantSpot::Bye,
            Self::TBD => EntrantSpot::TBD,
        }
    }

    /// Maps `EntrantSpot<T>` to `EntrantSpot<U>` by applying `f` on it.
    pub fn map<U, F>(self, f: F) -> EntrantSpot<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Entrant(entrant) => EntrantSpot::Entrant(f(entrant)),
            Self::Bye => EntrantSpot::Bye,
            Self::TBD => EntrantSpot::TBD,
        }
    }
}

/// One of the two opponent positions within a [`Match`].
///
/// Serialized as `{ participantId, displayName, score }`. A slot without `participantId`
/// is a bye (`"BYE"`) or an unresolved winner (`"TBD"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub spot: EntrantSpot<Participant>,
    pub score: i64,
}

impl Slot {
    pub const BYE: &'static str = "BYE";
    pub const TBD: &'static str = "TBD";

    #[inline]
    pub fn participant(participant: Participant) -> Self {
        Self {
            spot: EntrantSpot::Entrant(participant),
            score: 0,
        }
    }

    #[inline]
    pub fn bye() -> Self {
        Self {
            spot: EntrantSpot::Bye,
            score: 0,
        }
    }

    #[inline]
    pub fn tbd() -> Self {
        Self {
            spot: EntrantSpot::TBD,
            score: 0,
        }
    }

    #[inline]
    pub fn participant_id(&self) -> Option<ParticipantId> {
        self.spot.entrant().map(|p| p.id)
    }

    pub fn display_name(&self) -> &str {
        match &self.spot {
            EntrantSpot::Entrant(participant) => &participant.display_name,
            EntrantSpot::Bye => Self::BYE,
            EntrantSpot::TBD => Self::TBD,
        }
    }
}

/// The stable identity of a [`Match`], derived from its round number and its 1-based
/// position within the round. Formatted as `R{round}M{position}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchId {
    pub round: u32,
    pub position: u32,
}

impl MatchId {
    #[inline]
    pub const fn new(round: u32, position: u32) -> Self {
        Self { round, position }
    }
}

impl Display for MatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "R{}M{}", self.round, self.position)
    }
}

impl FromStr for MatchId {
    type Err = ParseMatchIdError;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        let err = || ParseMatchIdError(s.to_owned());

        let (round, position) = s
            .strip_prefix('R')
            .and_then(|s| s.split_once('M'))
            .ok_or_else(err)?;

        // `u32::from_str` accepts a leading '+', which is never part of a match id.
        if !round.bytes().all(|b| b.is_ascii_digit())
            || !position.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let round = round.parse().map_err(|_| err())?;
        let position = position.parse().map_err(|_| err())?;

        if round == 0 || position == 0 {
            return Err(err());
        }

        Ok(Self { round, position })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid match id: {0:?}")]
pub struct ParseMatchIdError(String);

/// The progression state of a [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchState {
    /// At least one slot is still `TBD` or holds an unresolved bye.
    Pending,
    /// Both slots hold participants and no winner was chosen yet.
    AwaitingWinner,
    /// The winner is set.
    Decided,
}

/// A match between the two [`Slot`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    id: MatchId,
    pub entrants: [Slot; 2],
    winner: Option<ParticipantId>,
}

impl Match {
    #[inline]
    pub fn new(id: MatchId, entrants: [Slot; 2]) -> Self {
        Self {
            id,
            entrants,
            winner: None,
        }
    }

    #[inline]
    pub fn id(&self) -> MatchId {
        self.id
    }

    #[inline]
    pub fn round(&self) -> u32 {
        self.id.round
    }

    #[inline]
    pub fn position(&self) -> u32 {
        self.id.position
    }

    #[inline]
    pub fn slot_a(&self) -> &Slot {
        &self.entrants[0]
    }

    #[inline]
    pub fn slot_b(&self) -> &Slot {
        &self.entrants[1]
    }

    #[inline]
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    pub fn state(&self) -> MatchState {
        if self.winner.is_some() {
            MatchState::Decided
        } else if self.entrants.iter().all(|slot| slot.spot.is_entrant()) {
            MatchState::AwaitingWinner
        } else {
            MatchState::Pending
        }
    }

    /// Returns the participant with the given `id` if it is seated in this match.
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.entrants
            .iter()
            .filter_map(|slot| slot.spot.entrant())
            .find(|participant| participant.id == id)
    }

    /// Returns the participant that advances without playing, i.e. the opponent of a bye.
    pub fn bye_winner(&self) -> Option<&Participant> {
        match (&self.entrants[0].spot, &self.entrants[1].spot) {
            (EntrantSpot::Entrant(participant), EntrantSpot::Bye)
            | (EntrantSpot::Bye, EntrantSpot::Entrant(participant)) => Some(participant),
            _ => None,
        }
    }

    /// Returns `true` if both slots are byes.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.entrants.iter().all(|slot| slot.spot.is_bye())
    }
}

impl Index<usize> for Match {
    type Output = Slot;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.entrants[index]
    }
}

/// A read-only wrapper around a `Vec<Match>`, ordered by round and then by position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Matches {
    matches: Vec<Match>,
}

impl Matches {
    #[inline]
    pub(crate) fn from_vec(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Match> {
        self.matches.get_mut(index)
    }
}

impl Deref for Matches {
    type Target = [Match];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.matches
    }
}

impl IntoIterator for Matches {
    type Item = Match;
    type IntoIter = IntoIter<Match>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<U> PartialEq<U> for Matches
where
    U: AsRef<[Match]>,
{
    #[inline]
    fn eq(&self, other: &U) -> bool {
        self.matches == other.as_ref()
    }
}

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("insufficient participants: at least 2 are required, found {found}")]
    InsufficientParticipants { found: usize },
    #[error("too many participants: at most {} are supported, found {found}", MAX_ENTRANTS)]
    TooManyParticipants { found: usize },
    #[error("participant {0} is listed multiple times")]
    DuplicateParticipantId(ParticipantId),
    #[error("match {0} has two byes")]
    DegenerateMatch(MatchId),
    #[error("match {0} does not exist")]
    MatchNotFound(MatchId),
    #[error("match {match_id} is already decided with winner {winner}")]
    MatchAlreadyDecided {
        match_id: MatchId,
        winner: ParticipantId,
    },
    #[error("participant {winner} cannot win match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner: ParticipantId,
    },
    #[error("invalid number of matches: expected {expected}, found {found}")]
    InvalidNumberOfMatches { expected: usize, found: usize },
    #[error("invalid match {0}")]
    InvalidMatch(MatchId),
}
