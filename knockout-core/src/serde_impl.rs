//! serde impls for the bracket types.
//!
//! The serialized forms are flat records: a [`Slot`] without a participant carries the
//! `"BYE"` or `"TBD"` marker in its display name, a [`Match`] carries its id next to its round
//! and position.
use std::fmt::{self, Formatter};

use serde::de::{self, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Bracket, EntrantSpot, Match, MatchId, Participant, ParticipantId, Slot};

impl Serialize for MatchId {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MatchId {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(MatchIdVisitor)
    }
}

struct MatchIdVisitor;

impl<'de> Visitor<'de> for MatchIdVisitor {
    type Value = MatchId;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a match id in the form R{round}M{position}")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl Serialize for Slot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Slot", 3)?;
        state.serialize_field("participantId", &self.participant_id())?;
        state.serialize_field("displayName", self.display_name())?;
        state.serialize_field("score", &self.score)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "Slot", rename_all = "camelCase")]
struct RawSlot {
    #[serde(default)]
    participant_id: Option<ParticipantId>,
    display_name: String,
    #[serde(default)]
    score: i64,
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawSlot::deserialize(deserializer)?;

        let spot = match (raw.participant_id, raw.display_name.as_str()) {
            (Some(id), _) => EntrantSpot::Entrant(Participant::new(id, raw.display_name)),
            (None, Slot::BYE) => EntrantSpot::Bye,
            (None, Slot::TBD) => EntrantSpot::TBD,
            (None, name) => {
                return Err(de::Error::custom(format_args!(
                    "slot without participant must be {:?} or {:?}, found {:?}",
                    Slot::BYE,
                    Slot::TBD,
                    name
                )))
            }
        };

        Ok(Self {
            spot,
            score: raw.score,
        })
    }
}

impl Serialize for Match {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Match", 6)?;
        state.serialize_field("matchId", &self.id)?;
        state.serialize_field("roundNumber", &self.id.round)?;
        state.serialize_field("position", &self.id.position)?;
        state.serialize_field("slotA", &self.entrants[0])?;
        state.serialize_field("slotB", &self.entrants[1])?;
        state.serialize_field("winnerParticipantId", &self.winner)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "Match", rename_all = "camelCase")]
struct RawMatch {
    match_id: MatchId,
    round_number: u32,
    position: u32,
    slot_a: Slot,
    slot_b: Slot,
    #[serde(default)]
    winner_participant_id: Option<ParticipantId>,
}

impl<'de> Deserialize<'de> for Match {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawMatch::deserialize(deserializer)?;

        if raw.match_id != MatchId::new(raw.round_number, raw.position) {
            return Err(de::Error::custom(format_args!(
                "match id {} does not match round {} position {}",
                raw.match_id, raw.round_number, raw.position
            )));
        }

        Ok(Self {
            id: raw.match_id,
            entrants: [raw.slot_a, raw.slot_b],
            winner: raw.winner_participant_id,
        })
    }
}

impl Serialize for Bracket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let size = self.size();

        let mut state = serializer.serialize_struct("Bracket", 5)?;
        state.serialize_field("version", &self.version())?;
        state.serialize_field("paddedSize", &size.padded())?;
        state.serialize_field("rounds", &size.rounds())?;
        state.serialize_field("champion", &self.champion())?;
        state.serialize_field("matches", &**self.matches())?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "Bracket")]
struct RawBracket {
    version: u64,
    matches: Vec<Match>,
}

impl<'de> Deserialize<'de> for Bracket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawBracket::deserialize(deserializer)?;

        Bracket::resume(raw.matches, raw.version).map_err(de::Error::custom)
    }
}
