use tower_core::events::GameEvent;
use tower_core::milestone::is_milestone;

/// One milestone in the tower.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TowerFloor {
    pub value: u32,
    /// Reached within its speed target at least once.
    pub aura: bool,
}

/// The stack of milestone tiles reached this session, lowest first.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    floors: Vec<TowerFloor>,
}

impl TowerView {
    pub fn floors(&self) -> &[TowerFloor] {
        &self.floors
    }

    pub fn observe(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::TileMerged { value, speed_bonus }
            | GameEvent::MilestoneReached { value, speed_bonus } => {
                self.add_floor(value, speed_bonus)
            },
            GameEvent::SessionReset => self.floors.clear(),
            _ => {},
        }
    }

    fn add_floor(&mut self, value: u32, speed_bonus: bool) {
        if !is_milestone(value) {
            return;
        }
        match self.floors.iter_mut().find(|floor| floor.value == value) {
            Some(floor) => floor.aura |= speed_bonus,
            None => {
                self.floors.push(TowerFloor {
                    value,
                    aura: speed_bonus,
                });
                self.floors.sort_by_key(|floor| floor.value);
            },
        }
    }

    /// Top floor first, ready to print beside the board.
    pub fn render_lines(&self) -> Vec<String> {
        self.floors
            .iter()
            .rev()
            .map(|floor| {
                let aura = if floor.aura { " ⚡" } else { "" };
                format!("[{:^6}]{aura}", floor.value)
            })
            .collect()
    }
}
