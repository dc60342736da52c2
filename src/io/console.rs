//! Line-based operator console.
//!
//! ```text
//! play                  start or resume playback
//! pause                 stop playback
//! ack                   acknowledge an error
//! lookahead <secs>      change the command lookahead
//! set <name> <value>    change a corrector parameter
//! scan <file.cloud>     submit a point cloud file as a sensor reading
//! quit                  stop replay
//! ```

use std::io::BufRead;
use std::path::PathBuf;

use crate::config::RuntimeParams;
use crate::io::teach::load_point_cloud;
use crate::threads::{OperatorInput, ReplayCommand, ReplayHandle};

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Operator(OperatorInput),
    Lookahead(f64),
    Set(String, f64),
    Scan(PathBuf),
    Quit,
    Help,
}

/// Parse a console line. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("play", []) => ConsoleCommand::Operator(OperatorInput::StartPlay),
        ("pause", []) => ConsoleCommand::Operator(OperatorInput::StopPlay),
        ("ack", []) => ConsoleCommand::Operator(OperatorInput::AcknowledgeError),
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        ("help" | "?", []) => ConsoleCommand::Help,
        ("lookahead", [secs]) => {
            let secs = parse_number(secs)?;
            if secs < 0.0 {
                return Err(format!("lookahead must not be negative, got {}", secs));
            }
            ConsoleCommand::Lookahead(secs)
        }
        ("set", [name, value]) => ConsoleCommand::Set(name.to_string(), parse_number(value)?),
        ("scan", [path]) => ConsoleCommand::Scan(PathBuf::from(*path)),
        _ => return Err(format!("unrecognised command '{}'", line.trim())),
    };
    Ok(Some(command))
}

fn parse_number(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("'{}' is not a number", s)),
    }
}

/// Console state: the parameters it last sent.
pub struct Console {
    handle: ReplayHandle,
    params: RuntimeParams,
}

impl Console {
    pub fn new(handle: ReplayHandle, params: RuntimeParams) -> Self {
        Self { handle, params }
    }

    /// Turn a parsed command into a replay command.
    ///
    /// Returns `None` for commands handled locally.
    pub fn translate(&mut self, command: ConsoleCommand) -> Option<ReplayCommand> {
        match command {
            ConsoleCommand::Operator(input) => Some(ReplayCommand::Operator(input)),
            ConsoleCommand::Lookahead(secs) => {
                self.params.lookahead_secs = secs;
                Some(ReplayCommand::UpdateParams(self.params.clone()))
            }
            ConsoleCommand::Set(name, value) => {
                self.params.corrector.insert(name, value);
                Some(ReplayCommand::UpdateParams(self.params.clone()))
            }
            ConsoleCommand::Scan(path) => match load_point_cloud(&path) {
                Ok(cloud) => Some(ReplayCommand::Reading(cloud)),
                Err(e) => {
                    tracing::warn!("Cannot read scan: {}", e);
                    None
                }
            },
            ConsoleCommand::Quit => Some(ReplayCommand::Shutdown),
            ConsoleCommand::Help => {
                tracing::info!(
                    "Commands: play, pause, ack, lookahead <secs>, set <name> <value>, scan <file>, quit"
                );
                None
            }
        }
    }

    /// Read commands from `input` until end of input or `quit`.
    pub fn run<R: BufRead>(mut self, input: R) {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Console read error: {}", e);
                    break;
                }
            };

            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("{}", e);
                    continue;
                }
            };

            if let Some(replay_command) = self.translate(command) {
                let quit = matches!(replay_command, ReplayCommand::Shutdown);
                self.handle.send(replay_command);
                if quit {
                    return;
                }
            }
        }
        tracing::debug!("Console input closed");
    }
}
