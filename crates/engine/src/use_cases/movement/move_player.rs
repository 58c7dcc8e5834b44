//! Move player use case.
//!
//! Moves within locally hosted rooms are applied in place. Moves into a room
//! hosted by another engine start a handoff instead.

use std::sync::Arc;

use mudmesh_domain::{RoomId, SessionId};

use crate::infrastructure::ports::{ClockPort, PlayerRepo, RepoError};
use crate::use_cases::handoff::{HandoffError, HandoffManager, HandoffResult, RoomLocality};

const BLOCKED_IN_TRANSIT: &str = "You are already crossing over.";
const BLOCKED_NO_ENGINE: &str = "Nothing lies in that direction.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Player now stands in `room_id` on this engine.
    Moved { room_id: RoomId },
    /// Another engine owns `room_id`; a handoff is under way.
    HandoffStarted { room_id: RoomId },
    /// The move was refused; `reason` is player-facing.
    Blocked { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Handoff error: {0}")]
    Handoff(#[from] HandoffError),
}

pub struct MovePlayer {
    players: Arc<dyn PlayerRepo>,
    handoff: Arc<HandoffManager>,
    is_room_local: RoomLocality,
    clock: Arc<dyn ClockPort>,
}

impl MovePlayer {
    pub fn new(
        players: Arc<dyn PlayerRepo>,
        handoff: Arc<HandoffManager>,
        is_room_local: RoomLocality,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            players,
            handoff,
            is_room_local,
            clock,
        }
    }

    pub async fn execute(
        &self,
        session_id: SessionId,
        target_room: RoomId,
    ) -> Result<MoveResult, MoveError> {
        let mut player = self
            .players
            .get(session_id)
            .await?
            .ok_or(MoveError::PlayerNotFound)?;

        if self.handoff.is_in_transit(session_id).await {
            return Ok(MoveResult::Blocked {
                reason: BLOCKED_IN_TRANSIT.to_string(),
            });
        }

        if (self.is_room_local)(&target_room) {
            player.room_id = target_room.clone();
            player.last_seen_epoch_ms = self.clock.now_epoch_ms();
            self.players.save(&player).await?;
            tracing::debug!(session_id = %session_id, room_id = %target_room, "Player moved");
            return Ok(MoveResult::Moved {
                room_id: target_room,
            });
        }

        match self
            .handoff
            .initiate_handoff(session_id, target_room.clone())
            .await?
        {
            HandoffResult::Initiated => Ok(MoveResult::HandoffStarted {
                room_id: target_room,
            }),
            HandoffResult::PlayerNotFound => Err(MoveError::PlayerNotFound),
            HandoffResult::NoEngineForZone => Ok(MoveResult::Blocked {
                reason: BLOCKED_NO_ENGINE.to_string(),
            }),
            HandoffResult::AlreadyInTransit => Ok(MoveResult::Blocked {
                reason: BLOCKED_IN_TRANSIT.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::in_memory::{InMemoryItemRepo, InMemoryPlayerRepo};
    use crate::infrastructure::ports::MockPlayerRepo;
    use crate::test_fixtures::{engine, room, two_engine_registry, RecordingBus, RecordingOutbound};
    use crate::use_cases::handoff::HandoffConfig;
    use mudmesh_domain::PlayerState;

    const SESSION: SessionId = SessionId::new(7);

    struct Setup {
        move_player: MovePlayer,
        players: Arc<InMemoryPlayerRepo>,
        bus: Arc<RecordingBus>,
    }

    fn town_only() -> RoomLocality {
        Arc::new(|room: &RoomId| room.zone() == "town")
    }

    async fn setup() -> Setup {
        let players = Arc::new(InMemoryPlayerRepo::new());
        let bus = Arc::new(RecordingBus::new());
        let clock = Arc::new(ManualClock::at(5_000));
        let handoff = Arc::new(HandoffManager::new(
            engine("engine-a"),
            two_engine_registry(),
            bus.clone(),
            players.clone(),
            Arc::new(InMemoryItemRepo::new()),
            Arc::new(RecordingOutbound::new()),
            clock.clone(),
            town_only(),
            HandoffConfig::default(),
        ));
        players
            .save(&PlayerState::new(SESSION, "Ash", room("town:square"), 0))
            .await
            .expect("save");

        Setup {
            move_player: MovePlayer::new(players.clone(), handoff, town_only(), clock),
            players,
            bus,
        }
    }

    #[tokio::test]
    async fn local_move_updates_room() {
        let s = setup().await;

        let result = s
            .move_player
            .execute(SESSION, room("town:gate"))
            .await
            .expect("move");

        assert_eq!(result, MoveResult::Moved { room_id: room("town:gate") });
        let player = s.players.get(SESSION).await.expect("get").expect("present");
        assert_eq!(player.room_id, room("town:gate"));
        assert_eq!(player.last_seen_epoch_ms, 5_000);
        assert!(s.bus.sent().is_empty());
    }

    #[tokio::test]
    async fn remote_move_starts_handoff_and_blocks_further_moves() {
        let s = setup().await;

        let first = s
            .move_player
            .execute(SESSION, room("forest:edge"))
            .await
            .expect("move");
        let second = s
            .move_player
            .execute(SESSION, room("town:gate"))
            .await
            .expect("move");

        assert_eq!(first, MoveResult::HandoffStarted { room_id: room("forest:edge") });
        assert_eq!(
            second,
            MoveResult::Blocked {
                reason: BLOCKED_IN_TRANSIT.to_string()
            }
        );
        assert_eq!(s.bus.handoffs(), 1);
        let player = s.players.get(SESSION).await.expect("get").expect("present");
        assert_eq!(player.room_id, room("town:square"));
    }

    #[tokio::test]
    async fn unowned_zone_is_blocked() {
        let s = setup().await;

        let result = s
            .move_player
            .execute(SESSION, room("ocean:reef"))
            .await
            .expect("move");

        assert_eq!(
            result,
            MoveResult::Blocked {
                reason: BLOCKED_NO_ENGINE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn missing_player_is_an_error() {
        let s = setup().await;

        let result = s.move_player.execute(SessionId::new(999), room("town:gate")).await;

        assert!(matches!(result, Err(MoveError::PlayerNotFound)));
    }

    #[tokio::test]
    async fn repo_failure_propagates() {
        let mut players = MockPlayerRepo::new();
        players
            .expect_get()
            .returning(|_| Err(RepoError::storage("get", "disk on fire")));
        let players: Arc<dyn PlayerRepo> = Arc::new(players);
        let clock = Arc::new(ManualClock::at(0));
        let handoff = Arc::new(HandoffManager::new(
            engine("engine-a"),
            two_engine_registry(),
            Arc::new(RecordingBus::new()),
            players.clone(),
            Arc::new(InMemoryItemRepo::new()),
            Arc::new(RecordingOutbound::new()),
            clock.clone(),
            town_only(),
            HandoffConfig::default(),
        ));
        let move_player = MovePlayer::new(players, handoff, town_only(), clock);

        let result = move_player.execute(SESSION, room("town:gate")).await;

        assert!(matches!(result, Err(MoveError::Repo(_))));
    }
}
