use std::path::PathBuf;
use std::time::Duration;

use bevy::prelude::*;
use getset::{CopyGetters, Getters};
use tower_core::anti_spam::SpamVerdict;
use tower_core::events::GameEvent;
use tower_core::orchestrator::{expansion_rule, GameStatus};
use tower_core::{ActiveSession, TowerCoreSet};

use crate::high_score::HighScoreStore;
use crate::tower_view::TowerView;

/// A message shown under the board.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Spam { moves_per_second: usize },
    Expert { moves_per_second: usize },
    Expanded { milestone: u32, grid_size: usize },
    Penalty { milestone: u32, tiles: usize },
    GameOver { final_score: u64 },
    Won,
    Fault(String),
}

impl Notice {
    /// How long the notice stays up. `None` keeps it until the next reset.
    pub fn lifetime(&self) -> Option<Duration> {
        match self {
            Notice::Spam { .. } => Some(Duration::from_secs(3)),
            Notice::Expert { .. } => Some(Duration::from_millis(1500)),
            Notice::Expanded { .. } | Notice::Penalty { .. } => Some(Duration::from_secs(5)),
            Notice::GameOver { .. } | Notice::Won | Notice::Fault(_) => None,
        }
    }

    fn is_final(&self) -> bool {
        self.lifetime().is_none()
    }

    pub fn message(&self) -> String {
        match self {
            Notice::Spam { moves_per_second } => {
                format!("Slow down! {moves_per_second} moves/s drops extra tiles")
            },
            Notice::Expert { moves_per_second } => {
                format!("⚡ Expert pace: {moves_per_second} moves/s")
            },
            Notice::Expanded {
                milestone,
                grid_size,
            } => format!("⚡ {milestone} in time! The board grows to {grid_size}x{grid_size}"),
            Notice::Penalty { milestone, tiles } => {
                format!("{milestone} came too slowly: {tiles} extra tiles dropped")
            },
            Notice::GameOver { final_score } => {
                format!("Game over with {final_score} points. Press r to play again")
            },
            Notice::Won => "2048! You win. Press r for a new game".to_string(),
            Notice::Fault(fault) => format!("Something went wrong ({fault}). Press r to restart"),
        }
    }
}

/// Everything drawn around the board that the session itself does not track.
#[derive(CopyGetters, Debug, Default, Getters, Resource)]
pub struct Hud {
    #[getset(get = "pub")]
    tower: TowerView,
    notice: Option<(Notice, Duration)>,
    #[getset(get_copy = "pub")]
    best_score: u64,
    high_scores: Option<HighScoreStore>,
}

impl Hud {
    pub fn new(high_scores: Option<HighScoreStore>) -> Self {
        Hud {
            best_score: high_scores.as_ref().map_or(0, HighScoreStore::best),
            high_scores,
            ..Default::default()
        }
    }

    /// The notice to show at game time `now`, if it has not expired.
    pub fn notice(&self, now: Duration) -> Option<&Notice> {
        let (notice, shown_at) = self.notice.as_ref()?;
        match notice.lifetime() {
            Some(lifetime) if now.saturating_sub(*shown_at) > lifetime => None,
            _ => Some(notice),
        }
    }

    fn show(&mut self, notice: Notice, now: Duration) {
        if matches!(&self.notice, Some((current, _)) if current.is_final()) && !notice.is_final() {
            return;
        }
        self.notice = Some((notice, now));
    }

    fn record_score(&mut self, score: u64) {
        self.best_score = self.best_score.max(score);
        if let Some(store) = self.high_scores.as_mut() {
            if let Err(e) = store.record(score) {
                log::warn!("Could not save high score: {e}");
            }
        }
    }

    pub fn observe(&mut self, event: &GameEvent, session: &ActiveSession, now: Duration) {
        self.tower.observe(event);
        match *event {
            GameEvent::ScoreChanged { score } => self.record_score(score),
            GameEvent::RateNotice {
                verdict: SpamVerdict::Spam { moves_per_second },
            } => self.show(Notice::Spam { moves_per_second }, now),
            GameEvent::RateNotice {
                verdict: SpamVerdict::Expert { moves_per_second },
            } => self.show(Notice::Expert { moves_per_second }, now),
            GameEvent::MilestoneReached {
                value,
                speed_bonus: true,
            } => self.show(
                Notice::Expanded {
                    milestone: value,
                    grid_size: session.orchestrator().grid_size(),
                },
                now,
            ),
            GameEvent::MilestoneReached {
                value,
                speed_bonus: false,
            } => {
                let tiles = expansion_rule(value).map_or(0, |rule| rule.penalty_tiles);
                self.show(
                    Notice::Penalty {
                        milestone: value,
                        tiles,
                    },
                    now,
                )
            },
            GameEvent::GameOver { final_score, .. } => {
                let notice = match session.last_fault() {
                    Some(fault) => Notice::Fault(fault.clone()),
                    None => Notice::GameOver { final_score },
                };
                self.show(notice, now)
            },
            GameEvent::SessionReset => self.notice = None,
            _ => {},
        }
    }
}

/// Keeps the [Hud] in step with the core's events. Needs [tower_core::TowerCorePlugin].
#[derive(Debug, Default)]
pub struct HudPlugin {
    pub high_score_file: Option<PathBuf>,
}

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        let high_scores = self
            .high_score_file
            .as_ref()
            .and_then(|path| match HighScoreStore::open(path) {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("Playing without a saved high score: {e}");
                    None
                },
            });
        app.insert_resource(Hud::new(high_scores)).add_systems(
            Update,
            sys_update_hud.after(TowerCoreSet::PublishEvents),
        );
    }
}

fn sys_update_hud(
    mut hud: ResMut<Hud>,
    session: Res<ActiveSession>,
    mut ev_game: EventReader<GameEvent>,
) {
    let now = session.game_clock().unwrap_or_default();
    for event in ev_game.read() {
        hud.observe(event, &session, now);
    }
    if session.status() == GameStatus::Won
        && !matches!(hud.notice(now), Some(Notice::Won | Notice::GameOver { .. }))
    {
        hud.show(Notice::Won, now);
    }
}
