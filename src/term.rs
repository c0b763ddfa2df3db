use std::io::stdout;
use std::panic;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Mutex;
use std::time::Duration;

use bevy::app::AppExit;
use bevy::prelude::*;
use crossterm::cursor::{Hide, Show};
use crossterm::event::Event as TermEvent;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
};
use tower_core::{ActiveSession, MoveInput, ResetInput};

use crate::hud::Hud;
use crate::render;
use crate::user_input::UserInput;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const TITLE: &str = "2048 Tower";

/// Raw mode on the alternate screen with the cursor hidden, for as long as
/// this resource lives.
#[derive(Debug, Resource)]
pub struct TerminalScreen;

impl TerminalScreen {
    /// Takes over the terminal. A panic from here on restores it before the
    /// panic message prints.
    pub fn enter() -> std::io::Result<Self> {
        install_restore_hook();
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide, SetTitle(TITLE))?;
        Ok(TerminalScreen)
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        match restore_terminal() {
            Ok(()) => log::debug!("Terminal restored"),
            Err(e) => log::error!("Could not restore terminal: {e}"),
        }
    }
}

fn restore_terminal() -> std::io::Result<()> {
    execute!(stdout(), LeaveAlternateScreen, Show)?;
    disable_raw_mode()
}

fn install_restore_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if let Err(e) = restore_terminal() {
            log::error!("Could not restore terminal after panic: {e}");
        }
        log::error!("Game panicked: {info}");
        previous(info)
    }));
}

/// Terminal events read on a background thread, drained once per frame.
#[derive(Debug, Deref, Resource)]
struct TerminalInputs(Mutex<Receiver<TermEvent>>);

impl Default for TerminalInputs {
    fn default() -> Self {
        TerminalInputs(Mutex::new(spawn_input_thread()))
    }
}

fn next_terminal_event() -> std::io::Result<Option<TermEvent>> {
    if crossterm::event::poll(POLL_INTERVAL)? {
        crossterm::event::read().map(Some)
    } else {
        Ok(None)
    }
}

/// The thread ends when reading fails or when [TerminalInputs] is dropped.
fn spawn_input_thread() -> Receiver<TermEvent> {
    let (send, recv) = mpsc::channel();
    std::thread::spawn(move || loop {
        match next_terminal_event() {
            Ok(Some(event)) => {
                if send.send(event).is_err() {
                    break;
                }
            },
            Ok(None) => {},
            Err(e) => {
                log::error!("Stopped reading terminal input: {e}");
                break;
            },
        }
    });
    recv
}

/// Draws the game in the terminal and turns key presses into core inputs.
/// Expects the [TerminalScreen] resource to be inserted by the caller, so a
/// failure to set up the terminal is reported before the app starts.
#[derive(Debug, Default)]
pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerminalInputs>()
            .add_systems(First, sys_term_inputs)
            .add_systems(Last, sys_render);
    }
}

fn sys_term_inputs(
    inputs: Res<TerminalInputs>,
    mut ev_move: EventWriter<MoveInput>,
    mut ev_reset: EventWriter<ResetInput>,
    mut exit: EventWriter<AppExit>,
) {
    let Ok(recv) = inputs.try_lock() else {
        log::warn!("Terminal inputs are locked, skipping this frame");
        return;
    };
    loop {
        match recv.try_recv() {
            Ok(event) => match UserInput::from_event(&event) {
                Some(UserInput::Move(direction)) => {
                    ev_move.send(MoveInput(direction));
                },
                Some(UserInput::Reset) => {
                    ev_reset.send(ResetInput);
                },
                Some(UserInput::Quit) => {
                    log::info!("Quit requested");
                    exit.send(AppExit::Success);
                },
                None => {},
            },
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                log::error!("Terminal input thread closed, exiting");
                exit.send(AppExit::error());
                break;
            },
        }
    }
}

/// Redraws when the session or hud changed, and once a second for the clock.
fn sys_render(
    _screen: Res<TerminalScreen>,
    session: Res<ActiveSession>,
    hud: Res<Hud>,
    mut last_second: Local<Option<u64>>,
) {
    let second = session.game_clock().map(|clock| clock.as_secs());
    if !session.is_changed() && !hud.is_changed() && *last_second == second {
        return;
    }
    *last_second = second;
    let lines = render::screen_lines(&session, &hud);
    if let Err(e) = render::draw(&mut stdout(), &lines) {
        log::error!("Failed to draw screen: {e}");
    }
}

#[cfg(test)]
mod test {
    use bevy::ecs::event::Events;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use test_log::test;
    use tower_core::grid::Direction;

    use super::*;

    fn app_reading(recv: Receiver<TermEvent>) -> App {
        let mut app = App::new();
        app.add_event::<MoveInput>()
            .add_event::<ResetInput>()
            .insert_resource(TerminalInputs(Mutex::new(recv)))
            .add_systems(Update, sys_term_inputs);
        app
    }

    fn key(code: KeyCode) -> TermEvent {
        TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn sent<E: Event + Clone>(app: &App) -> Vec<E> {
        let events = app.world().resource::<Events<E>>();
        events.get_reader().read(events).cloned().collect()
    }

    #[test]
    fn keys_become_core_inputs() {
        let (send, recv) = mpsc::channel();
        let mut app = app_reading(recv);
        send.send(key(KeyCode::Left)).unwrap();
        send.send(key(KeyCode::Char('r'))).unwrap();
        send.send(key(KeyCode::Char('x'))).unwrap();
        app.update();

        let moves: Vec<Direction> = sent::<MoveInput>(&app).into_iter().map(|m| m.0).collect();
        assert_eq!(moves, vec![Direction::Left]);
        assert_eq!(sent::<ResetInput>(&app).len(), 1);
        assert!(sent::<AppExit>(&app).is_empty());
    }

    #[test]
    fn quit_key_exits_cleanly() {
        let (send, recv) = mpsc::channel();
        let mut app = app_reading(recv);
        send.send(key(KeyCode::Char('q'))).unwrap();
        app.update();
        assert_eq!(sent::<AppExit>(&app), vec![AppExit::Success]);
    }

    #[test]
    fn lost_input_thread_exits_with_error() {
        let (send, recv) = mpsc::channel::<TermEvent>();
        let mut app = app_reading(recv);
        drop(send);
        app.update();
        assert_eq!(sent::<AppExit>(&app), vec![AppExit::error()]);
    }
}
