//! Interactive terminal host
//!
//! Drives a select control from raw terminal input and redraws whenever the
//! control publishes a new snapshot or emits an event.

pub mod text_utils;
pub mod view;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::style::{Print, PrintStyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor::MoveTo, execute, queue};
use futures::StreamExt;
use pickr_core::{ControlSnapshot, Key, SelectHandle};
use std::io::{self, Write};
use tokio::sync::broadcast;
use tracing::debug;
use view::{EventLog, Tone, ViewLine};

/// Events kept on screen
const LOG_LINES: usize = 5;

/// What a terminal key means to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    Quit,
    ToggleFocus,
    Char(char),
    Backspace,
    Key(Key),
    Ignore,
}

/// Map a terminal key press to a host action
pub fn map_key(event: &KeyEvent) -> HostInput {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Char('c') | KeyCode::Char('d') if ctrl => HostInput::Quit,
        KeyCode::Char(_) if ctrl => HostInput::Ignore,
        KeyCode::Char(c) => HostInput::Char(c),
        KeyCode::Tab => HostInput::ToggleFocus,
        KeyCode::Backspace => HostInput::Backspace,
        KeyCode::Delete => HostInput::Key(Key::Delete),
        KeyCode::Enter => HostInput::Key(Key::Enter),
        KeyCode::Esc => HostInput::Key(Key::Escape),
        KeyCode::Up => HostInput::Key(Key::ArrowUp),
        KeyCode::Down => HostInput::Key(Key::ArrowDown),
        KeyCode::Left => HostInput::Key(Key::ArrowLeft),
        KeyCode::Right => HostInput::Key(Key::ArrowRight),
        _ => HostInput::Ignore,
    }
}

/// Raw mode and alternate screen for as long as it lives
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        let guard = Self;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
            .context("Failed to prepare terminal")?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Run the terminal UI until the user quits
pub async fn run_interactive(handle: SelectHandle) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut stdout = io::stdout();
    let mut input = EventStream::new();
    let mut snapshots = handle.watch();
    let mut events = handle.subscribe();
    let mut log = EventLog::new(LOG_LINES);

    handle.focus_gained()?;
    let mut snapshot = handle.snapshot().await?;
    draw(&mut stdout, &snapshot, &log)?;

    loop {
        tokio::select! {
            terminal_event = input.next() => {
                let Some(terminal_event) = terminal_event else { break };
                match terminal_event.context("Failed to read terminal event")? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        if !forward_key(&handle, &snapshot, map_key(&key))? {
                            break;
                        }
                        snapshot = handle.snapshot().await?;
                    }
                    Event::Mouse(mouse) => {
                        forward_mouse(&handle, &snapshot, &mouse)?;
                        snapshot = handle.snapshot().await?;
                    }
                    Event::Resize(..) => {}
                    _ => continue,
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                snapshot = snapshots.borrow_and_update().clone();
            }
            event = events.recv() => match event {
                Ok(event) => log.push(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Event log skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        draw(&mut stdout, &snapshot, &log)?;
    }

    Ok(())
}

/// Returns false when the user asked to quit
fn forward_key(handle: &SelectHandle, snapshot: &ControlSnapshot, input: HostInput) -> Result<bool> {
    match input {
        HostInput::Quit => return Ok(false),
        HostInput::ToggleFocus => {
            if snapshot.focused {
                handle.focus_lost()?;
            } else {
                handle.focus_gained()?;
            }
        }
        HostInput::Char(c) => {
            let mut term = snapshot.term.clone();
            term.push(c);
            handle.input(term)?;
        }
        HostInput::Backspace => {
            // The key reaches the control before the text changes
            handle.press(Key::Backspace)?;
            let mut term = snapshot.term.clone();
            if term.pop().is_some() {
                handle.input(term)?;
            }
        }
        HostInput::Key(key) => {
            handle.press(key)?;
        }
        HostInput::Ignore => {}
    }
    Ok(true)
}

fn forward_mouse(handle: &SelectHandle, snapshot: &ControlSnapshot, mouse: &MouseEvent) -> Result<()> {
    match mouse.kind {
        MouseEventKind::Moved => {
            handle.pointer_moved()?;
            if let Some(index) = view::candidate_at(snapshot, mouse.row) {
                handle.hover(index)?;
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(index) = view::candidate_at(snapshot, mouse.row) {
                handle.select_at(index)?;
            } else if mouse.row == view::INPUT_ROW {
                handle.focus_gained()?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn draw(stdout: &mut impl Write, snapshot: &ControlSnapshot, log: &EventLog) -> Result<()> {
    let width = text_utils::get_terminal_width();
    let lines = view::render(snapshot, log, width);

    queue!(stdout, Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(stdout, MoveTo(0, row))?;
        print_line(stdout, line)?;
    }
    queue!(stdout, MoveTo(view::cursor_column(snapshot), view::INPUT_ROW))?;
    stdout.flush()?;
    Ok(())
}

fn print_line(stdout: &mut impl Write, line: &ViewLine) -> io::Result<()> {
    let text = line.text.as_str();
    match line.tone {
        Tone::Plain => queue!(stdout, Print(text)),
        Tone::Muted => queue!(stdout, PrintStyledContent(text.dark_grey())),
        Tone::Active => queue!(stdout, PrintStyledContent(text.reverse())),
        Tone::Selected => queue!(stdout, PrintStyledContent(text.green())),
        Tone::Status => queue!(stdout, PrintStyledContent(text.yellow())),
        Tone::Error => queue!(stdout, PrintStyledContent(text.red())),
    }
}
