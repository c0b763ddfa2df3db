use std::sync::Arc;
use std::time::Duration;

use getset::Getters;

use crate::orchestrator::{GameOrchestrator, GameStatus, MoveOutcome};
use crate::prelude::*;

/// What a front end draws: the board, the score and the end-of-game flags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameState {
    pub grid: Grid,
    pub score: u64,
    pub game_over: bool,
    pub game_won: bool,
}

/// One play session: the current [GameState] plus the orchestrator that
/// advances it.
#[derive(Debug, Getters)]
pub struct GameSession {
    #[getset(get = "pub")]
    configuration: CoreConfiguration,
    #[getset(get = "pub")]
    orchestrator: GameOrchestrator,
    #[getset(get = "pub")]
    state: GameState,
    /// Message of the fault that ended this session, if one did.
    #[getset(get = "pub")]
    last_fault: Option<String>,
    sink: Arc<dyn GameEventSink>,
    clock: Arc<dyn Clock>,
}

impl GameSession {
    pub fn new(
        configuration: CoreConfiguration,
        sink: Arc<dyn GameEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        configuration.validate()?;
        let (orchestrator, state) = Self::deal(&configuration, &sink, &clock);
        Ok(GameSession {
            configuration,
            orchestrator,
            state,
            last_fault: None,
            sink,
            clock,
        })
    }

    fn deal(
        configuration: &CoreConfiguration,
        sink: &Arc<dyn GameEventSink>,
        clock: &Arc<dyn Clock>,
    ) -> (GameOrchestrator, GameState) {
        let mut orchestrator = GameOrchestrator::new(configuration, sink.clone(), clock.clone());
        let grid = orchestrator.start();
        let state = GameState {
            grid,
            score: 0,
            game_over: false,
            game_won: false,
        };
        (orchestrator, state)
    }

    pub fn status(&self) -> GameStatus {
        self.orchestrator.status()
    }

    pub fn game_clock(&self) -> Option<Duration> {
        self.orchestrator.game_clock()
    }

    pub fn apply(&mut self, direction: Direction) -> MoveOutcome {
        let outcome = self
            .orchestrator
            .process_move(&self.state.grid, direction, self.state.score);
        self.absorb(&outcome);
        outcome
    }

    pub fn apply_intent(&mut self, intent: &str) -> MoveOutcome {
        let outcome = self
            .orchestrator
            .process_intent(&self.state.grid, intent, self.state.score);
        self.absorb(&outcome);
        outcome
    }

    fn absorb(&mut self, outcome: &MoveOutcome) {
        if outcome.moved {
            self.state.grid = outcome.grid.clone();
            self.state.score = outcome.score;
        }
        self.state.game_over = outcome.game_over;
        self.state.game_won = outcome.game_won;
        if let Some(fault) = &outcome.fault {
            self.last_fault = Some(fault.to_string());
        }
    }

    /// Throws the orchestrator away and deals a fresh game at the configured size.
    pub fn reset(&mut self) {
        let (orchestrator, state) = Self::deal(&self.configuration, &self.sink, &self.clock);
        self.orchestrator = orchestrator;
        self.state = state;
        self.last_fault = None;
        log::info!("Session reset");
        self.sink.publish(GameEvent::SessionReset);
    }
}
