pub mod anti_spam;
pub mod clock;
pub mod configuration;
pub mod events;
pub mod grid;
pub mod grid_engine;
pub mod milestone;
pub mod orchestrator;
pub mod prelude;
pub mod session;

use std::sync::Arc;

use thiserror::Error;

use self::events::GameEventInbox;
use self::prelude::*;
use self::session::GameSession;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("grid is {found}x{found} but the engine expects {expected}x{expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("grid row {row} has {len} cells, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("tile value {0} is not a power of two")]
    InvalidTile(u32),
    #[error("merging two {0} tiles does not fit in a tile")]
    TileOverflow(u32),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("could not parse configuration: {0}")]
    ConfigurationParse(#[from] toml::de::Error),
}

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TowerCoreSet {
    ProcessInputs,
    PublishEvents,
}

/// Ask the active session to slide the board.
#[derive(Clone, Copy, Debug, Event)]
pub struct MoveInput(pub Direction);

/// Ask for a fresh game.
#[derive(Clone, Copy, Debug, Default, Event)]
pub struct ResetInput;

#[derive(Debug, Deref, DerefMut, Resource)]
pub struct ActiveSession(pub GameSession);

#[derive(Debug, Deref, Resource)]
pub struct CoreEventInbox(GameEventInbox);

/// Runs a [GameSession] inside a bevy app: [MoveInput] and [ResetInput] events
/// go in, [GameEvent]s come out.
#[derive(Debug, Default)]
pub struct TowerCorePlugin {
    pub configuration: CoreConfiguration,
}

impl Plugin for TowerCorePlugin {
    fn build(&self, app: &mut App) {
        let (sink, inbox) = events::channel();
        let sink: Arc<dyn GameEventSink> = Arc::new(sink);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::default());
        let session = GameSession::new(self.configuration.clone(), sink.clone(), clock.clone())
            .or_else(|e| {
                log::error!("Falling back to default configuration: {e}");
                GameSession::new(CoreConfiguration::default(), sink, clock)
            })
            .expect("default configuration should always be valid");

        app.add_event::<MoveInput>()
            .add_event::<ResetInput>()
            .add_event::<GameEvent>()
            .insert_resource(ActiveSession(session))
            .insert_resource(CoreEventInbox(inbox))
            .configure_sets(
                Update,
                (TowerCoreSet::ProcessInputs, TowerCoreSet::PublishEvents).chain(),
            )
            .add_systems(
                Update,
                (
                    sys_apply_inputs.in_set(TowerCoreSet::ProcessInputs),
                    sys_publish_events.in_set(TowerCoreSet::PublishEvents),
                ),
            );
    }
}

fn sys_apply_inputs(
    mut session: ResMut<ActiveSession>,
    mut ev_resets: EventReader<ResetInput>,
    mut ev_moves: EventReader<MoveInput>,
) {
    if ev_resets.read().count() > 0 {
        session.reset();
    }
    for MoveInput(direction) in ev_moves.read() {
        session.apply(*direction);
    }
}

fn sys_publish_events(inbox: Res<CoreEventInbox>, mut ev_game: EventWriter<GameEvent>) {
    for event in inbox.drain() {
        ev_game.send(event);
    }
}

#[cfg(test)]
mod test {
    use bevy::ecs::event::Events;
    use test_log::test;

    use super::*;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(TowerCorePlugin {
            configuration: CoreConfiguration {
                initial_grid_size: 4,
                seed: Some(11),
            },
        });
        app
    }

    fn published(app: &App) -> Vec<GameEvent> {
        let events = app.world().resource::<Events<GameEvent>>();
        let mut reader = events.get_reader();
        reader.read(events).copied().collect()
    }

    #[test]
    fn move_inputs_reach_the_session() {
        let mut app = app();
        for direction in Direction::ALL_DIRECTIONS {
            app.world_mut().send_event(MoveInput(direction));
        }
        app.update();

        let published = published(&app);
        assert!(published
            .iter()
            .any(|event| matches!(event, GameEvent::ScoreChanged { .. })));
        assert!(!app.world().resource::<ActiveSession>().status().is_terminal());
    }

    #[test]
    fn reset_input_publishes_session_reset() {
        let mut app = app();
        app.world_mut().send_event(ResetInput);
        app.update();
        assert_eq!(published(&app), vec![GameEvent::SessionReset]);
    }

    #[test]
    fn invalid_configuration_falls_back_to_default() {
        let mut app = App::new();
        app.add_plugins(TowerCorePlugin {
            configuration: CoreConfiguration {
                initial_grid_size: 1,
                seed: None,
            },
        });
        assert_eq!(app.world().resource::<ActiveSession>().orchestrator().grid_size(), 4);
    }
}
