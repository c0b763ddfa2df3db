use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tower_core::grid::Direction;

/// What a key press asks of the game.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserInput {
    Move(Direction),
    Reset,
    Quit,
}

impl UserInput {
    pub fn from_event(event: &Event) -> Option<UserInput> {
        match event {
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => {
                if modifiers.contains(KeyModifiers::CONTROL) {
                    return match code {
                        KeyCode::Char('c') => Some(UserInput::Quit),
                        _ => None,
                    };
                }
                match code {
                    KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('w') => {
                        Some(UserInput::Move(Direction::Up))
                    },
                    KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('s') => {
                        Some(UserInput::Move(Direction::Down))
                    },
                    KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('a') => {
                        Some(UserInput::Move(Direction::Left))
                    },
                    KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('d') => {
                        Some(UserInput::Move(Direction::Right))
                    },
                    KeyCode::Char('r') => Some(UserInput::Reset),
                    KeyCode::Char('q') | KeyCode::Esc => Some(UserInput::Quit),
                    _ => None,
                }
            },
            _ => None,
        }
    }
}
