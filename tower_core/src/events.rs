use std::fmt::Debug;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;

use bevy::prelude::Event;

use crate::anti_spam::SpamVerdict;

/// Notifications the core raises for whoever draws the game.
#[derive(Clone, Copy, Debug, Eq, Event, PartialEq)]
pub enum GameEvent {
    /// A merge produced `value`. Not raised for the expansion milestones.
    TileMerged { value: u32, speed_bonus: bool },
    ScoreChanged { score: u64 },
    /// Raised once, on the move that ends the session.
    GameOver { final_score: u64, max_tile: u32 },
    /// An expansion milestone was judged, whether or not the grid grew.
    MilestoneReached { value: u32, speed_bonus: bool },
    /// The move rate left the normal band: a spam warning or an expert bolt.
    RateNotice { verdict: SpamVerdict },
    SessionReset,
}

/// Where the core sends its [GameEvent]s. Handed to the orchestrator at
/// construction.
pub trait GameEventSink: Debug + Send + Sync {
    fn publish(&self, event: GameEvent);
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl GameEventSink for NullSink {
    fn publish(&self, _event: GameEvent) {}
}

/// Sending half of an event channel. See [channel].
#[derive(Clone, Debug)]
pub struct ChannelSink {
    send: Sender<GameEvent>,
}

impl GameEventSink for ChannelSink {
    fn publish(&self, event: GameEvent) {
        if self.send.send(event).is_err() {
            log::warn!("Event inbox is gone, dropping {event:?}");
        }
    }
}

/// Receiving half of an event channel, drained by the front end.
#[derive(Debug)]
pub struct GameEventInbox {
    recv: Mutex<Receiver<GameEvent>>, // Mutex so the inbox can live in a bevy Resource
}

impl GameEventInbox {
    /// Every event published since the last drain, oldest first.
    pub fn drain(&self) -> Vec<GameEvent> {
        match self.recv.lock() {
            Ok(recv) => recv.try_iter().collect(),
            Err(poisoned) => poisoned.into_inner().try_iter().collect(),
        }
    }
}

pub fn channel() -> (ChannelSink, GameEventInbox) {
    let (send, recv) = std::sync::mpsc::channel();
    (
        ChannelSink { send },
        GameEventInbox {
            recv: Mutex::new(recv),
        },
    )
}
