use std::collections::BTreeMap;
use std::time::Duration;

/// Milestone tiles in the order a game reaches them.
pub const MILESTONES: [u32; 9] = [32, 64, 128, 256, 512, 1024, 2048, 4096, 8192];

/// Timer key for the moment the game started. Pacing for 32 is measured from it.
pub const GAME_START: u32 = 0;

const SEVERE_LATENESS_FACTOR: f64 = 1.5;

pub fn is_milestone(value: u32) -> bool {
    MILESTONES.contains(&value)
}

/// The milestone whose start time the pace of `milestone` is measured from.
pub fn previous_milestone(milestone: u32) -> Option<u32> {
    match MILESTONES.iter().position(|&m| m == milestone)? {
        0 => Some(GAME_START),
        index => Some(MILESTONES[index - 1]),
    }
}

/// Time allowed between the previous milestone and this one for a speed bonus.
pub fn speed_target(milestone: u32) -> Option<Duration> {
    let seconds = match milestone {
        32 => 12,
        64 => 25,
        128 => 35,
        256 => 70,
        512 => 90,
        1024 => 150,
        2048 => 200,
        4096 => 250,
        8192 => 300,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

/// Result of reaching a milestone for the first time this session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MilestoneVerdict {
    pub milestone: u32,
    pub speed_bonus: bool,
}

/// Start times per milestone for one play session.
///
/// Reading a previous milestone's time never removes it. Entries are retired
/// explicitly with [MilestoneTimer::retire_milestone] once every reader is done.
#[derive(Clone, Debug, Default)]
pub struct MilestoneTimer {
    start_times: BTreeMap<u32, Duration>,
    highest_reached: u32,
}

impl MilestoneTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the game start. Later calls keep the first time.
    pub fn start_game_timer(&mut self, now: Duration) {
        if !self.start_times.contains_key(&GAME_START) {
            self.start_times.insert(GAME_START, now);
            log::info!("Game timer started");
        }
    }

    pub fn game_start_time(&self) -> Option<Duration> {
        self.start_times.get(&GAME_START).copied()
    }

    pub fn start_time(&self, milestone: u32) -> Option<Duration> {
        self.start_times.get(&milestone).copied()
    }

    pub fn highest_reached(&self) -> u32 {
        self.highest_reached
    }

    /// Time since the previous milestone's start, if that start is still recorded.
    pub fn peek_previous_milestone_elapsed(&self, milestone: u32, now: Duration) -> Option<Duration> {
        let previous = previous_milestone(milestone)?;
        let started = self.start_times.get(&previous)?;
        Some(now.saturating_sub(*started))
    }

    pub fn check_speed_bonus(&self, milestone: u32, now: Duration) -> bool {
        let (Some(elapsed), Some(target)) = (
            self.peek_previous_milestone_elapsed(milestone, now),
            speed_target(milestone),
        ) else {
            log::debug!("No running timer for the milestone before {milestone}");
            return false;
        };
        if elapsed.as_secs_f64() > target.as_secs_f64() * SEVERE_LATENESS_FACTOR {
            log::warn!(
                "Milestone {milestone} reached far too late: {:.1}s against {}s",
                elapsed.as_secs_f64(),
                target.as_secs()
            );
        }
        elapsed <= target
    }

    /// Drops the start time of the milestone `milestone` was measured from.
    pub fn retire_milestone(&mut self, milestone: u32) {
        if let Some(previous) = previous_milestone(milestone) {
            if self.start_times.remove(&previous).is_some() {
                log::debug!("Retired timer {previous} after judging {milestone}");
            }
        }
    }

    /// Called for every merged tile. Returns a verdict only when `value` is a
    /// milestone above every milestone reached so far, and starts its timer.
    pub fn observe_merge(&mut self, value: u32, now: Duration) -> Option<MilestoneVerdict> {
        if !is_milestone(value) || value <= self.highest_reached {
            return None;
        }
        let speed_bonus = self.check_speed_bonus(value, now);
        if let Some(elapsed) = self.peek_previous_milestone_elapsed(value, now) {
            log::info!(
                "Milestone {value} after {:.1}s (speed bonus: {speed_bonus})",
                elapsed.as_secs_f64()
            );
        }
        self.start_times.insert(value, now);
        self.highest_reached = value;
        Some(MilestoneVerdict {
            milestone: value,
            speed_bonus,
        })
    }

    pub fn reset_speed_timers(&mut self) {
        self.start_times.clear();
        self.highest_reached = 0;
    }
}
