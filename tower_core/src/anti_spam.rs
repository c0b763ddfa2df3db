use std::collections::VecDeque;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(1);
const SPAM_MIN_RATE: usize = 6;
const SPAM_MAX_RATE: usize = 14;

/// Extra random tiles dropped on the board for a spammed move.
pub const SPAM_PENALTY_TILES: usize = 4;

/// How the move rate of the last second is judged. Also the notice tier a
/// front end shows: a warning for spam, a bolt for expert play.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SpamVerdict {
    #[default]
    Normal,
    Spam { moves_per_second: usize },
    Expert { moves_per_second: usize },
}

impl SpamVerdict {
    pub fn applies_penalty(&self) -> bool {
        matches!(self, SpamVerdict::Spam { .. })
    }
}

/// Sliding one-second window over move timestamps.
#[derive(Clone, Debug, Default)]
pub struct AntiSpamGuard {
    recent_moves: VecDeque<Duration>,
}

impl AntiSpamGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a move made at `now` and classifies the rate including it.
    pub fn record_move(&mut self, now: Duration) -> SpamVerdict {
        self.recent_moves.push_back(now);
        while let Some(&oldest) = self.recent_moves.front() {
            if now.saturating_sub(oldest) >= WINDOW {
                self.recent_moves.pop_front();
            } else {
                break;
            }
        }

        let moves_per_second = self.recent_moves.len();
        match moves_per_second {
            rate if rate < SPAM_MIN_RATE => SpamVerdict::Normal,
            rate if rate <= SPAM_MAX_RATE => {
                log::warn!("Spam detected: {rate} moves in the last second");
                SpamVerdict::Spam { moves_per_second }
            },
            _ => SpamVerdict::Expert { moves_per_second },
        }
    }

    pub fn moves_in_window(&self) -> usize {
        self.recent_moves.len()
    }

    pub fn clear(&mut self) {
        self.recent_moves.clear();
    }
}
