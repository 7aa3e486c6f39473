//! Script command: replay host events against a control
//!
//! A script is a text file with one command per line. Blank lines and lines
//! starting with `#` are skipped.
//!
//! ```text
//! focus                 focus gained
//! blur                  focus lost
//! type <text>           raw input text (may be empty)
//! key <name>            key-down then key-up
//! keydown <name>
//! keyup <name>
//! hover <index>         pointer over a visible candidate
//! pointer               pointer moved
//! click <index>         pointer click on a visible candidate
//! wait <ms>             let timers and searches run
//! write <json>          write_value with a JSON value (null clears)
//! remove <id>           remove the selected item with this id
//! open                  focus_and_show_results
//! disable / enable
//! snapshot              print the render state
//! ```
//!
//! Every emitted event is printed as one JSON line, followed by the final
//! external value.

use crate::config::CliConfigLoader;
use crate::data::DataOptions;
use anyhow::{Context, Result};
use pickr_core::{ExternalValue, Item, ItemId, Key, SelectEvent, SelectHandle};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors found while parsing a script
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: '{command}' needs an argument")]
    MissingArgument { line: usize, command: String },

    #[error("line {line}: invalid argument for '{command}': {message}")]
    InvalidArgument {
        line: usize,
        command: String,
        message: String,
    },
}

/// One scripted host event
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Focus,
    Blur,
    Type(String),
    Key(Key),
    KeyDown(Key),
    KeyUp(Key),
    Hover(usize),
    PointerMoved,
    Click(usize),
    Wait(Duration),
    Write(ExternalValue),
    Remove(ItemId),
    Open,
    Disable(bool),
    Snapshot,
}

/// Parse a whole script
pub fn parse_script(source: &str) -> Result<Vec<Step>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim_end_matches('\r');
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                None
            } else {
                Some(parse_line(index + 1, trimmed))
            }
        })
        .collect()
}

fn parse_line(line: usize, text: &str) -> Result<Step, ScriptError> {
    let (command, argument) = match text.split_once(' ') {
        Some((command, argument)) => (command, Some(argument)),
        None => (text, None),
    };

    let required = || {
        argument
            .map(str::trim)
            .filter(|argument| !argument.is_empty())
            .ok_or_else(|| ScriptError::MissingArgument {
                line,
                command: command.to_string(),
            })
    };
    let invalid = |message: String| ScriptError::InvalidArgument {
        line,
        command: command.to_string(),
        message,
    };

    let step = match command {
        "focus" => Step::Focus,
        "blur" => Step::Blur,
        "type" => Step::Type(argument.unwrap_or_default().to_string()),
        "key" => Step::Key(required()?.parse().map_err(invalid)?),
        "keydown" => Step::KeyDown(required()?.parse().map_err(invalid)?),
        "keyup" => Step::KeyUp(required()?.parse().map_err(invalid)?),
        "hover" => Step::Hover(parse_index(required()?).map_err(invalid)?),
        "pointer" => Step::PointerMoved,
        "click" => Step::Click(parse_index(required()?).map_err(invalid)?),
        "wait" => {
            let millis = required()?
                .parse::<u64>()
                .map_err(|e| invalid(e.to_string()))?;
            Step::Wait(Duration::from_millis(millis))
        }
        "write" => {
            let value: serde_json::Value =
                serde_json::from_str(required()?).map_err(|e| invalid(e.to_string()))?;
            Step::Write(ExternalValue::from_json(value))
        }
        "remove" => {
            let raw = required()?;
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            let id = ItemId::from_value(&value)
                .ok_or_else(|| invalid(format!("not an id: {}", raw)))?;
            Step::Remove(id)
        }
        "open" => Step::Open,
        "disable" => Step::Disable(true),
        "enable" => Step::Disable(false),
        "snapshot" => Step::Snapshot,
        other => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_string(),
            })
        }
    };
    Ok(step)
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>().map_err(|e| e.to_string())
}

/// Run a script file against a control and print what it emits
pub async fn script_command(
    file: PathBuf,
    config_loader: CliConfigLoader,
    data: DataOptions,
) -> Result<()> {
    let source = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read script: {}", file.display()))?;
    let steps =
        parse_script(&source).with_context(|| format!("Invalid script: {}", file.display()))?;

    let config = config_loader.load().await?;
    let handle = data.spawn_control(config).await?;
    let mut events = handle.subscribe();

    debug!(steps = steps.len(), "Running script");
    for step in steps {
        run_step(&handle, &step).await?;

        // Round trip so every event from this step has been emitted
        let snapshot = handle.snapshot().await?;
        print_events(&mut events)?;

        if step == Step::Snapshot {
            println!("{}", json!({ "snapshot": snapshot }));
        }
    }

    let value = handle.value().await?;
    println!("{}", json!({ "value": value }));
    Ok(())
}

async fn run_step(handle: &SelectHandle, step: &Step) -> Result<()> {
    match step {
        Step::Focus => handle.focus_gained()?,
        Step::Blur => handle.focus_lost()?,
        Step::Type(text) => handle.input(text.clone())?,
        Step::Key(key) => {
            handle.press(*key)?;
        }
        Step::KeyDown(key) => {
            handle.key_down(*key)?;
        }
        Step::KeyUp(key) => handle.key_up(*key)?,
        Step::Hover(index) => handle.hover(*index)?,
        Step::PointerMoved => handle.pointer_moved()?,
        Step::Click(index) => handle.select_at(*index)?,
        Step::Wait(duration) => tokio::time::sleep(*duration).await,
        Step::Write(value) => {
            if let Err(e) = handle.write_value(Some(value.clone())).await {
                warn!("Value write failed: {}", e);
            }
        }
        Step::Remove(id) => handle.remove(Item::new(id.clone(), "", serde_json::Value::Null))?,
        Step::Open => handle.focus_and_show_results()?,
        Step::Disable(disabled) => handle.set_disabled(*disabled)?,
        Step::Snapshot => {}
    }
    Ok(())
}

fn print_events(events: &mut broadcast::Receiver<SelectEvent>) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Skipped {} events", skipped);
            }
            Err(_) => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = "\
# pick a fruit
focus
type ap
wait 300
key down
keyup enter
write [1, 2]
remove \"x\"
snapshot
";
        let steps = parse_script(script).unwrap();

        assert_eq!(
            steps,
            vec![
                Step::Focus,
                Step::Type("ap".to_string()),
                Step::Wait(Duration::from_millis(300)),
                Step::Key(Key::ArrowDown),
                Step::KeyUp(Key::Enter),
                Step::Write(ExternalValue::Many(vec![json!(1), json!(2)])),
                Step::Remove(ItemId::from("x")),
                Step::Snapshot,
            ]
        );
    }

    #[test]
    fn test_type_keeps_inner_spaces() {
        let steps = parse_script("type new zea\ntype").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Type("new zea".to_string()),
                Step::Type(String::new())
            ]
        );
    }

    #[test]
    fn test_remove_accepts_bare_and_numeric_ids() {
        let steps = parse_script("remove 7\nremove abc").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Remove(ItemId::Number(7)),
                Step::Remove(ItemId::from("abc"))
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            parse_script("focus\n\njump"),
            Err(ScriptError::UnknownCommand {
                line: 3,
                command: "jump".to_string()
            })
        );
        assert_eq!(
            parse_script("wait"),
            Err(ScriptError::MissingArgument {
                line: 1,
                command: "wait".to_string()
            })
        );
        assert!(matches!(
            parse_script("key hyper"),
            Err(ScriptError::InvalidArgument { line: 1, .. })
        ));
    }
}
