//! Delivery of bracket events to external listeners. For process logging see `logger.rs`.
//!
//! Events are handed to a background task over a channel so that a slow listener never
//! holds up the request that caused the event.
use hyper::header::CONTENT_TYPE;
use knockout_core::Participant;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::config;
use crate::store::TournamentId;
use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// All matches of `round` are decided.
    #[serde(rename_all = "camelCase")]
    RoundCompleted {
        tournament_id: TournamentId,
        round: u32,
    },
    /// The final match is decided.
    #[serde(rename_all = "camelCase")]
    ChampionDecided {
        tournament_id: TournamentId,
        champion: Participant,
    },
}

/// Creates a new event channel.
pub fn channel() -> (EventWriter, EventReader) {
    let (tx, rx) = mpsc::channel(32);
    (EventWriter { tx }, EventReader { rx })
}

/// Spawns a task delivering all events to `notifier`.
pub fn spawn(notifier: Notifier) -> EventWriter {
    let (tx, mut rx) = channel();

    tokio::task::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(err) = notifier.notify(&event).await {
                log::error!("Failed to deliver event {:?}: {}", event, err);
            }
        }

        log::debug!("All EventWriters dropped, stopping event delivery");
    });

    tx
}

#[derive(Debug)]
pub struct EventReader {
    rx: mpsc::Receiver<Event>,
}

impl EventReader {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[derive(Clone, Debug)]
pub struct EventWriter {
    tx: mpsc::Sender<Event>,
}

impl EventWriter {
    /// Queues `event` for delivery. Returns `false` and drops the event if the delivery task
    /// has stopped.
    pub async fn send(&self, event: Event) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Event delivery stopped, dropping event {:?}", err.0);
                false
            }
        }
    }
}

/// The receiver of bracket events.
#[derive(Clone, Debug)]
pub enum Notifier {
    /// Writes events to the process log.
    Log,
    /// POSTs every event as json to `url`.
    Webhook { client: reqwest::Client, url: String },
}

impl Notifier {
    pub fn new(config: &config::Notify) -> Self {
        match &config.webhook {
            Some(url) => Self::Webhook {
                client: reqwest::Client::new(),
                url: url.clone(),
            },
            None => Self::Log,
        }
    }

    pub async fn notify(&self, event: &Event) -> Result<(), Error> {
        match self {
            Self::Log => {
                match event {
                    Event::RoundCompleted {
                        tournament_id,
                        round,
                    } => log::info!("Tournament {}: round {} completed", tournament_id, round),
                    Event::ChampionDecided {
                        tournament_id,
                        champion,
                    } => log::info!(
                        "Tournament {}: {} ({}) is the champion",
                        tournament_id,
                        champion.display_name,
                        champion.id
                    ),
                }

                Ok(())
            }
            Self::Webhook { client, url } => {
                client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(serde_json::to_vec(event)?)
                    .send()
                    .await?
                    .error_for_status()?;

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use knockout_core::{Participant, ParticipantId};
    use serde_json::json;

    use super::{channel, Event, Notifier};
    use crate::config;
    use crate::store::TournamentId;

    #[test]
    fn test_event_json() {
        let event = Event::RoundCompleted {
            tournament_id: TournamentId(3),
            round: 2,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "round_completed", "tournamentId": 3, "round": 2 })
        );

        let event = Event::ChampionDecided {
            tournament_id: TournamentId(3),
            champion: Participant::new(ParticipantId(9), "Team 9"),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "champion_decided",
                "tournamentId": 3,
                "champion": { "id": 9, "displayName": "Team 9" },
            })
        );
    }

    #[tokio::test]
    async fn test_event_channel() {
        let (writer, mut reader) = channel();

        let event = Event::RoundCompleted {
            tournament_id: TournamentId(1),
            round: 1,
        };
        assert!(writer.send(event.clone()).await);
        assert_eq!(reader.recv().await, Some(event));
        assert_eq!(reader.try_recv(), None);

        drop(writer);
        assert_eq!(reader.recv().await, None);
    }

    #[tokio::test]
    async fn test_event_channel_closed() {
        let (writer, reader) = channel();
        drop(reader);

        let event = Event::RoundCompleted {
            tournament_id: TournamentId(1),
            round: 1,
        };
        assert!(!writer.send(event).await);
    }

    #[test]
    fn test_notifier_new() {
        assert!(matches!(
            Notifier::new(&config::Notify::default()),
            Notifier::Log
        ));

        let config = config::Notify {
            webhook: Some("http://localhost:9000".to_owned()),
        };
        assert!(matches!(
            Notifier::new(&config),
            Notifier::Webhook { url, .. } if url == "http://localhost:9000"
        ));
    }
}
