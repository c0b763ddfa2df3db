use std::io::Write;
use std::time::Duration;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use tower_core::grid::Grid;
use tower_core::orchestrator::GameStatus;
use tower_core::session::GameSession;

use crate::hud::Hud;

const CELL_WIDTH: usize = 6;
const TOWER_GAP: &str = "   ";
const HELP: &str = "arrows/hjkl/wasd move  r restart  q quit";

fn format_clock(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn board_lines(grid: &Grid) -> Vec<String> {
    let border = format!("+{}+", vec!["-".repeat(CELL_WIDTH); grid.size()].join("+"));
    let mut lines = vec![border.clone()];
    for row in grid.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|&value| match value {
                0 => " ".repeat(CELL_WIDTH),
                value => format!("{value:^CELL_WIDTH$}"),
            })
            .collect();
        lines.push(format!("|{}|", cells.join("|")));
        lines.push(border.clone());
    }
    lines
}

/// The whole screen as text: status line, board with the tower beside it,
/// then the current notice and key help.
pub fn screen_lines(session: &GameSession, hud: &Hud) -> Vec<String> {
    let now = session.game_clock().unwrap_or_default();
    let state = session.state();
    let status = match session.status() {
        GameStatus::Playing => "",
        GameStatus::GameOver => "  [game over]",
        GameStatus::Won => "  [won]",
    };
    let mut lines = vec![
        format!(
            "Score {}   Best {}   Time {}{status}",
            state.score,
            hud.best_score().max(state.score),
            format_clock(now)
        ),
        String::new(),
    ];

    let board = board_lines(&state.grid);
    let board_width = board.first().map_or(0, |line| line.chars().count());
    let tower = hud.tower().render_lines();
    for i in 0..board.len().max(tower.len()) {
        let left = board.get(i).map_or("", String::as_str);
        match tower.get(i) {
            Some(floor) => lines.push(format!("{left:<board_width$}{TOWER_GAP}{floor}")),
            None => lines.push(left.to_string()),
        }
    }

    lines.push(String::new());
    lines.push(
        hud.notice(now)
            .map(|notice| notice.message())
            .unwrap_or_default(),
    );
    lines.push(HELP.to_string());
    lines
}

pub fn draw(out: &mut impl Write, lines: &[String]) -> std::io::Result<()> {
    queue!(out, Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        queue!(out, MoveTo(0, row as u16), Print(line))?;
    }
    out.flush()
}
