use std::sync::Arc;
use std::time::Duration;

use crate::anti_spam::{AntiSpamGuard, SpamVerdict, SPAM_PENALTY_TILES};
use crate::grid_engine::{GridEngine, MoveResult};
use crate::milestone::MilestoneTimer;
use crate::prelude::*;

/// What happens when a move first makes an expansion milestone the largest tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpansionRule {
    pub milestone: u32,
    /// Only a grid of this size grows, so each rule fires at most once per session.
    pub from_size: usize,
    /// Tiles strictly below this are cleared after growing.
    pub cleanup_floor: u32,
    /// Random tiles dropped instead of growing when the milestone came too slowly.
    pub penalty_tiles: usize,
}

pub const EXPANSION_RULES: [ExpansionRule; 2] = [
    ExpansionRule {
        milestone: 64,
        from_size: 4,
        cleanup_floor: 2,
        penalty_tiles: 4,
    },
    ExpansionRule {
        milestone: 256,
        from_size: 5,
        cleanup_floor: 4,
        penalty_tiles: 6,
    },
];

pub fn expansion_rule(milestone: u32) -> Option<&'static ExpansionRule> {
    EXPANSION_RULES
        .iter()
        .find(|rule| rule.milestone == milestone)
}

pub fn is_expansion_milestone(value: u32) -> bool {
    expansion_rule(value).is_some()
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum GameStatus {
    #[default]
    Playing,
    GameOver,
    Won,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Playing)
    }

    fn from_flags(game_over: bool, game_won: bool) -> Self {
        if game_over {
            GameStatus::GameOver
        } else if game_won {
            GameStatus::Won
        } else {
            GameStatus::Playing
        }
    }
}

/// How an expansion milestone was judged.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpansionOutcome {
    pub milestone: u32,
    pub speed_bonus: bool,
    /// Grid size after the move.
    pub grid_size: usize,
    /// Penalty tiles dropped for a slow milestone. Zero when the grid grew.
    pub penalty_tiles: usize,
}

/// Everything a caller needs after one move intent.
#[derive(Debug)]
pub struct MoveOutcome {
    pub grid: Grid,
    pub score: u64,
    pub moved: bool,
    pub merged_values: Vec<u32>,
    pub spam: SpamVerdict,
    pub expansion: Option<ExpansionOutcome>,
    pub game_over: bool,
    pub game_won: bool,
    /// The fault that ended the session on this move.
    pub fault: Option<CoreError>,
}

impl MoveOutcome {
    fn unchanged(grid: &Grid, score: u64, status: GameStatus) -> Self {
        MoveOutcome {
            grid: grid.clone(),
            score,
            moved: false,
            merged_values: Vec::new(),
            spam: SpamVerdict::Normal,
            expansion: None,
            game_over: status == GameStatus::GameOver,
            game_won: status == GameStatus::Won,
            fault: None,
        }
    }

    pub fn status(&self) -> GameStatus {
        GameStatus::from_flags(self.game_over, self.game_won)
    }
}

/// Runs one move at a time through the engine, the milestone timer and the
/// spam guard, and reports the result to the injected event sink.
///
/// One orchestrator serves one play session. Reset by replacing it.
#[derive(Debug)]
pub struct GameOrchestrator {
    engine: GridEngine,
    timer: MilestoneTimer,
    guard: AntiSpamGuard,
    status: GameStatus,
    sink: Arc<dyn GameEventSink>,
    clock: Arc<dyn Clock>,
}

impl GameOrchestrator {
    pub fn new(
        configuration: &CoreConfiguration,
        sink: Arc<dyn GameEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        GameOrchestrator {
            engine: GridEngine::new(configuration.initial_grid_size, configuration.seed),
            timer: MilestoneTimer::new(),
            guard: AntiSpamGuard::new(),
            status: GameStatus::Playing,
            sink,
            clock,
        }
    }

    /// Starts the game clock and deals the opening grid.
    pub fn start(&mut self) -> Grid {
        self.timer.start_game_timer(self.clock.now());
        self.engine.initialize_grid()
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn grid_size(&self) -> usize {
        self.engine.grid_size()
    }

    pub fn milestone_timer(&self) -> &MilestoneTimer {
        &self.timer
    }

    /// Time since the game timer started.
    pub fn game_clock(&self) -> Option<Duration> {
        let started = self.timer.game_start_time()?;
        Some(self.clock.now().saturating_sub(started))
    }

    /// Like [GameOrchestrator::process_move], but for a raw intent such as
    /// `"ArrowLeft"` or `"up"`. Unknown intents change nothing.
    pub fn process_intent(&mut self, grid: &Grid, intent: &str, current_score: u64) -> MoveOutcome {
        match intent.parse::<Direction>() {
            Ok(direction) => self.process_move(grid, direction, current_score),
            Err(e) => {
                log::debug!("Ignoring intent: {e}");
                MoveOutcome::unchanged(grid, current_score, self.status)
            },
        }
    }

    pub fn process_move(
        &mut self,
        grid: &Grid,
        direction: Direction,
        current_score: u64,
    ) -> MoveOutcome {
        if self.status.is_terminal() {
            log::debug!("Session is {:?}, ignoring {direction:?}", self.status);
            return MoveOutcome::unchanged(grid, current_score, self.status);
        }

        let mut events = Vec::new();
        match self.try_move(grid, direction, current_score, &mut events) {
            Ok(outcome) => {
                self.status = outcome.status();
                if outcome.game_over {
                    log::info!("Game over with score {}", outcome.score);
                    events.push(GameEvent::GameOver {
                        final_score: outcome.score,
                        max_tile: outcome.grid.max_tile(),
                    });
                }
                for event in events {
                    self.sink.publish(event);
                }
                outcome
            },
            Err(fault) => {
                // Events from a move that did not complete are never published
                log::error!("Move {direction:?} failed, ending session: {fault}");
                self.status = GameStatus::GameOver;
                self.sink.publish(GameEvent::GameOver {
                    final_score: current_score,
                    max_tile: grid.max_tile(),
                });
                MoveOutcome {
                    fault: Some(fault),
                    ..MoveOutcome::unchanged(grid, current_score, self.status)
                }
            },
        }
    }

    fn try_move(
        &mut self,
        grid: &Grid,
        direction: Direction,
        current_score: u64,
        events: &mut Vec<GameEvent>,
    ) -> Result<MoveOutcome, CoreError> {
        if grid.size() != self.engine.grid_size() {
            return Err(CoreError::DimensionMismatch {
                expected: self.engine.grid_size(),
                found: grid.size(),
            });
        }
        let now = self.clock.now();
        let spam = self.guard.record_move(now);
        if spam != SpamVerdict::Normal {
            events.push(GameEvent::RateNotice { verdict: spam });
        }

        let MoveResult {
            grid: shifted,
            score_increase,
            moved,
            merged_values,
        } = self.engine.shift(grid, direction)?;
        if !moved {
            return Ok(MoveOutcome {
                spam,
                ..MoveOutcome::unchanged(grid, current_score, self.status)
            });
        }

        for &value in &merged_values {
            let speed_bonus = self
                .timer
                .observe_merge(value, now)
                .is_some_and(|verdict| verdict.speed_bonus);
            if !is_expansion_milestone(value) {
                events.push(GameEvent::TileMerged { value, speed_bonus });
            }
        }

        let mut next = self.engine.add_random_number(&shifted)?;
        let score = current_score + score_increase;
        events.push(GameEvent::ScoreChanged { score });

        if spam.applies_penalty() {
            next = self.add_penalty_tiles(&next, SPAM_PENALTY_TILES)?;
        }

        let max_tile = next.max_tile();
        let mut expansion = None;
        if let Some(rule) = expansion_rule(max_tile) {
            if self.engine.grid_size() == rule.from_size {
                let (expanded, outcome) = self.judge_expansion(rule, &next, now)?;
                events.push(GameEvent::MilestoneReached {
                    value: outcome.milestone,
                    speed_bonus: outcome.speed_bonus,
                });
                next = expanded;
                expansion = Some(outcome);
            }
        }

        // Penalty tiles are already on the board, so they can end the game too
        let game_over = self.engine.is_game_over(&next);
        let game_won = self.engine.has_won(&next);
        Ok(MoveOutcome {
            grid: next,
            score,
            moved: true,
            merged_values,
            spam,
            expansion,
            game_over,
            game_won,
            fault: None,
        })
    }

    /// Grows the grid for a fast milestone, or drops penalty tiles for a slow
    /// one. Either way the previous milestone's timer is retired afterwards.
    fn judge_expansion(
        &mut self,
        rule: &ExpansionRule,
        grid: &Grid,
        now: Duration,
    ) -> Result<(Grid, ExpansionOutcome), CoreError> {
        let speed_bonus = self.timer.check_speed_bonus(rule.milestone, now);
        let (judged, penalty_tiles) = if speed_bonus {
            log::info!("Milestone {} reached fast, growing the grid", rule.milestone);
            let expanded = self.engine.expand_grid(grid)?;
            (
                self.engine.cleanup_low_tiles(&expanded, rule.cleanup_floor)?,
                0,
            )
        } else {
            log::warn!(
                "Milestone {} reached slowly, adding {} tiles",
                rule.milestone,
                rule.penalty_tiles
            );
            (
                self.add_penalty_tiles(grid, rule.penalty_tiles)?,
                rule.penalty_tiles,
            )
        };
        self.timer.retire_milestone(rule.milestone);
        Ok((
            judged,
            ExpansionOutcome {
                milestone: rule.milestone,
                speed_bonus,
                grid_size: self.engine.grid_size(),
                penalty_tiles,
            },
        ))
    }

    fn add_penalty_tiles(&mut self, grid: &Grid, count: usize) -> Result<Grid, CoreError> {
        let mut grid = grid.clone();
        for _ in 0..count {
            grid = self.engine.add_random_number(&grid)?;
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod test {
    use test_log::test;

    use super::*;
    use crate::events::{channel, GameEventInbox};
    use crate::grid::grid;

    fn orchestrator(size: usize) -> (GameOrchestrator, GameEventInbox, ManualClock) {
        let (sink, inbox) = channel();
        let clock = ManualClock::new();
        let configuration = CoreConfiguration {
            initial_grid_size: size,
            seed: Some(64),
        };
        let orchestrator =
            GameOrchestrator::new(&configuration, Arc::new(sink), Arc::new(clock.clone()));
        (orchestrator, inbox, clock)
    }

    fn top_row(row: &[u32]) -> Grid {
        let empty = [0; 4];
        grid(&[row, &empty, &empty, &empty])
    }

    /// A `size`x`size` grid holding `row` on top, zero padded.
    fn sized_top_row(size: usize, row: &[u32]) -> Grid {
        let mut rows = vec![vec![0; size]; size];
        rows[0][..row.len()].copy_from_slice(row);
        Grid::from_rows(&rows).unwrap()
    }

    #[test]
    fn merge_left_adds_one_tile_and_scores() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let outcome = orchestrator.process_move(&top_row(&[2, 2, 0, 0]), Direction::Left, 0);

        assert!(outcome.moved);
        assert_eq!(outcome.grid.get(0, 0), Some(4));
        assert_eq!(outcome.grid.count_tiles(), 2);
        assert_eq!(outcome.score, 4);
        assert!(!outcome.game_over);
        assert_eq!(outcome.status(), GameStatus::Playing);
        assert_eq!(
            inbox.drain(),
            vec![
                GameEvent::TileMerged {
                    value: 4,
                    speed_bonus: false
                },
                GameEvent::ScoreChanged { score: 4 },
            ]
        );
    }

    #[test]
    fn blocked_move_changes_nothing() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let before = top_row(&[2, 4, 8, 16]);
        let outcome = orchestrator.process_move(&before, Direction::Left, 10);

        assert!(!outcome.moved);
        assert_eq!(outcome.grid, before);
        assert_eq!(outcome.score, 10);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn unknown_intent_is_ignored() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let before = top_row(&[2, 2, 0, 0]);
        let outcome = orchestrator.process_intent(&before, "Escape", 0);
        assert!(!outcome.moved);
        assert_eq!(outcome.grid, before);
        assert!(inbox.drain().is_empty());

        let outcome = orchestrator.process_intent(&before, "ArrowLeft", 0);
        assert!(outcome.moved);
    }

    #[test]
    fn dimension_mismatch_ends_the_session_once() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let wrong = grid(&[&[2, 2, 0], &[0, 0, 0], &[0, 0, 0]]);
        let outcome = orchestrator.process_move(&wrong, Direction::Left, 8);

        assert!(outcome.game_over);
        assert!(!outcome.moved);
        assert_eq!(outcome.score, 8);
        assert!(matches!(
            outcome.fault,
            Some(CoreError::DimensionMismatch { expected: 4, found: 3 })
        ));
        assert_eq!(orchestrator.status(), GameStatus::GameOver);

        let outcome = orchestrator.process_move(&top_row(&[2, 2, 0, 0]), Direction::Left, 8);
        assert!(!outcome.moved);
        assert!(outcome.game_over);
        assert_eq!(
            inbox.drain(),
            vec![GameEvent::GameOver {
                final_score: 8,
                max_tile: 2
            }]
        );
    }

    #[test]
    fn full_board_without_merges_is_game_over() {
        let (mut orchestrator, inbox, _) = orchestrator(2);
        // Whatever tile lands in the gap, nothing can merge afterwards
        let outcome = orchestrator.process_move(&grid(&[&[8, 8], &[64, 32]]), Direction::Left, 0);

        assert!(outcome.moved);
        assert!(outcome.game_over);
        assert_eq!(orchestrator.status(), GameStatus::GameOver);
        assert_eq!(
            inbox.drain().last(),
            Some(&GameEvent::GameOver {
                final_score: 16,
                max_tile: 64
            })
        );
        let outcome = orchestrator.process_move(&outcome.grid, Direction::Right, 16);
        assert!(!outcome.moved);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn reaching_2048_wins_and_locks_the_board() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let outcome = orchestrator.process_move(&top_row(&[1024, 1024, 0, 0]), Direction::Left, 0);

        assert!(outcome.game_won);
        assert_eq!(orchestrator.status(), GameStatus::Won);
        assert!(inbox.drain().contains(&GameEvent::TileMerged {
            value: 2048,
            speed_bonus: false
        }));

        let outcome = orchestrator.process_move(&outcome.grid, Direction::Right, outcome.score);
        assert!(!outcome.moved);
        assert!(outcome.game_won);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn spam_rate_drops_penalty_tiles() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let stuck = top_row(&[2, 4, 8, 16]);
        for _ in 0..5 {
            assert!(!orchestrator.process_move(&stuck, Direction::Left, 0).moved);
        }
        let outcome = orchestrator.process_move(&stuck, Direction::Down, 0);

        assert_eq!(outcome.spam, SpamVerdict::Spam { moves_per_second: 6 });
        assert_eq!(outcome.grid.count_tiles(), 4 + 1 + SPAM_PENALTY_TILES);
        assert_eq!(
            inbox.drain().first(),
            Some(&GameEvent::RateNotice {
                verdict: SpamVerdict::Spam { moves_per_second: 6 }
            })
        );
    }

    #[test]
    fn expert_rate_is_not_penalized() {
        let (mut orchestrator, _inbox, _) = orchestrator(4);
        let stuck = top_row(&[2, 4, 8, 16]);
        for _ in 0..14 {
            orchestrator.process_move(&stuck, Direction::Left, 0);
        }
        let outcome = orchestrator.process_move(&stuck, Direction::Down, 0);

        assert_eq!(outcome.spam, SpamVerdict::Expert { moves_per_second: 15 });
        assert_eq!(outcome.grid.count_tiles(), 5);
    }

    /// Plays up to a 32 at `reached_32`, then merges two 32s at `reached_64`.
    fn reach_64(
        orchestrator: &mut GameOrchestrator,
        clock: &ManualClock,
        reached_32: Duration,
        reached_64: Duration,
    ) -> MoveOutcome {
        orchestrator.start();
        clock.set(reached_32);
        orchestrator.process_move(&top_row(&[16, 16, 0, 0]), Direction::Left, 0);
        clock.set(reached_64);
        orchestrator.process_move(&top_row(&[32, 32, 0, 0]), Direction::Left, 32)
    }

    #[test]
    fn fast_64_grows_the_grid() {
        let (mut orchestrator, inbox, clock) = orchestrator(4);
        let outcome = reach_64(
            &mut orchestrator,
            &clock,
            Duration::from_secs(5),
            Duration::from_secs(30),
        );

        assert_eq!(
            outcome.expansion,
            Some(ExpansionOutcome {
                milestone: 64,
                speed_bonus: true,
                grid_size: 5,
                penalty_tiles: 0,
            })
        );
        assert_eq!(outcome.grid.size(), 5);
        assert_eq!(orchestrator.grid_size(), 5);
        assert_eq!(outcome.grid.get(0, 0), Some(64));
        assert_eq!(outcome.grid.count_tiles(), 2);
        assert_eq!(orchestrator.milestone_timer().start_time(32), None);

        let events = inbox.drain();
        assert!(events.contains(&GameEvent::TileMerged {
            value: 32,
            speed_bonus: true
        }));
        assert!(events.contains(&GameEvent::MilestoneReached {
            value: 64,
            speed_bonus: true
        }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, GameEvent::TileMerged { value: 64, .. })));

        // The next move runs against the grown grid
        let next = orchestrator.process_move(&outcome.grid, Direction::Right, outcome.score);
        assert!(next.fault.is_none());
        assert!(next.moved);
    }

    #[test]
    fn slow_64_drops_penalty_tiles_on_every_move_at_size_4() {
        let (mut orchestrator, inbox, clock) = orchestrator(4);
        let outcome = reach_64(
            &mut orchestrator,
            &clock,
            Duration::from_secs(5),
            Duration::from_secs(31),
        );

        assert_eq!(
            outcome.expansion,
            Some(ExpansionOutcome {
                milestone: 64,
                speed_bonus: false,
                grid_size: 4,
                penalty_tiles: 4,
            })
        );
        assert_eq!(outcome.grid.size(), 4);
        assert_eq!(outcome.grid.count_tiles(), 1 + 1 + 4);
        assert!(inbox.drain().contains(&GameEvent::MilestoneReached {
            value: 64,
            speed_bonus: false
        }));

        // The 32 timer is retired, so every later move at size 4 is judged slow again
        clock.advance(Duration::from_secs(2));
        let next = orchestrator.process_move(&top_row(&[64, 2, 2, 0]), Direction::Left, 64);
        assert!(next.moved);
        assert_eq!(
            next.expansion,
            Some(ExpansionOutcome {
                milestone: 64,
                speed_bonus: false,
                grid_size: 4,
                penalty_tiles: 4,
            })
        );
        assert_eq!(next.grid.count_tiles(), 2 + 1 + 4);
        assert!(inbox.drain().contains(&GameEvent::MilestoneReached {
            value: 64,
            speed_bonus: false
        }));
    }

    /// Merges two 64s at `reached_128`, then two 128s at `reached_256`, on a 5x5 grid.
    fn reach_256(
        orchestrator: &mut GameOrchestrator,
        clock: &ManualClock,
        reached_128: Duration,
        reached_256: Duration,
        second_row: &[u32],
    ) -> MoveOutcome {
        orchestrator.start();
        clock.set(reached_128);
        let outcome = orchestrator.process_move(&sized_top_row(5, &[64, 64]), Direction::Left, 0);
        assert_eq!(outcome.expansion, None);
        clock.set(reached_256);
        orchestrator.process_move(&sized_top_row(5, second_row), Direction::Left, 128)
    }

    #[test]
    fn fast_256_grows_the_grid_and_clears_twos() {
        let (mut orchestrator, inbox, clock) = orchestrator(5);
        let outcome = reach_256(
            &mut orchestrator,
            &clock,
            Duration::from_secs(10),
            Duration::from_secs(80),
            &[128, 128, 2, 2],
        );

        assert_eq!(
            outcome.expansion,
            Some(ExpansionOutcome {
                milestone: 256,
                speed_bonus: true,
                grid_size: 6,
                penalty_tiles: 0,
            })
        );
        assert_eq!(outcome.grid.size(), 6);
        assert_eq!(orchestrator.grid_size(), 6);
        assert_eq!(outcome.grid.get(0, 0), Some(256));
        assert_eq!(outcome.grid.get(0, 1), Some(4));
        assert!(outcome.grid.rows().flatten().all(|&value| value != 2));
        assert_eq!(orchestrator.milestone_timer().start_time(128), None);

        let events = inbox.drain();
        assert!(events.contains(&GameEvent::MilestoneReached {
            value: 256,
            speed_bonus: true
        }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, GameEvent::TileMerged { value: 256, .. })));
    }

    #[test]
    fn slow_256_drops_six_penalty_tiles() {
        let (mut orchestrator, inbox, clock) = orchestrator(5);
        let outcome = reach_256(
            &mut orchestrator,
            &clock,
            Duration::from_secs(10),
            Duration::from_secs(81),
            &[128, 128],
        );

        assert_eq!(
            outcome.expansion,
            Some(ExpansionOutcome {
                milestone: 256,
                speed_bonus: false,
                grid_size: 5,
                penalty_tiles: 6,
            })
        );
        assert_eq!(outcome.grid.size(), 5);
        assert_eq!(outcome.grid.count_tiles(), 1 + 1 + 6);
        assert!(inbox.drain().contains(&GameEvent::MilestoneReached {
            value: 256,
            speed_bonus: false
        }));
    }

    #[test]
    fn expansion_milestones_at_other_sizes_do_nothing() {
        let (mut small, small_inbox, _) = orchestrator(4);
        small.start();
        let outcome = small.process_move(&top_row(&[128, 128, 0, 0]), Direction::Left, 0);
        assert_eq!(outcome.expansion, None);
        assert_eq!(outcome.grid.size(), 4);
        assert_eq!(outcome.grid.count_tiles(), 2);

        let (mut large, large_inbox, _) = orchestrator(5);
        large.start();
        let outcome = large.process_move(&sized_top_row(5, &[32, 32]), Direction::Left, 0);
        assert_eq!(outcome.expansion, None);
        assert_eq!(outcome.grid.size(), 5);
        assert_eq!(large.grid_size(), 5);

        for event in small_inbox.drain().into_iter().chain(large_inbox.drain()) {
            assert!(!matches!(event, GameEvent::MilestoneReached { .. }));
        }
    }

    #[test]
    fn overflowing_merge_ends_the_session() {
        let (mut orchestrator, inbox, _) = orchestrator(4);
        let huge = 1u32 << 31;
        let before = top_row(&[huge, huge, 0, 0]);
        let outcome = orchestrator.process_move(&before, Direction::Left, 12);

        assert!(matches!(outcome.fault, Some(CoreError::TileOverflow(tile)) if tile == huge));
        assert!(outcome.game_over);
        assert_eq!(outcome.grid, before);
        assert_eq!(outcome.score, 12);
        assert_eq!(
            inbox.drain(),
            vec![GameEvent::GameOver {
                final_score: 12,
                max_tile: huge
            }]
        );
    }

    #[test]
    fn game_clock_runs_from_start() {
        let (mut orchestrator, _inbox, clock) = orchestrator(4);
        assert_eq!(orchestrator.game_clock(), None);
        clock.set(Duration::from_secs(2));
        let opening = orchestrator.start();
        assert_eq!(opening.count_tiles(), 2);
        clock.advance(Duration::from_secs(3));
        assert_eq!(orchestrator.game_clock(), Some(Duration::from_secs(3)));
    }
}
